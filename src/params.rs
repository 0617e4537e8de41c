//! Observable store for the live tunables.

use std::fmt;
use std::time::Instant;

use crate::config::BloomParams;
use crate::events::{ParamChange, ParamEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ParamEvent, &BloomParams)>;

impl BloomParams {
    /// Applies a change, clamping it into the range `validate` accepts.
    /// Non-finite values are dropped. Returns whether the stored value
    /// actually changed.
    pub fn apply(&mut self, change: ParamChange) -> bool {
        fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        }

        match change {
            ParamChange::GridSize(n) => replace(
                &mut self.grid_size,
                n.clamp(Self::MIN_GRID_SIZE, Self::MAX_GRID_SIZE),
            ),
            ParamChange::WaveAmplitude(v) if v.is_finite() => replace(&mut self.wave_amplitude, v),
            ParamChange::WaveFrequency(v) if v.is_finite() => replace(&mut self.wave_frequency, v),
            ParamChange::WaveSpeed(v) if v.is_finite() => replace(&mut self.wave_speed, v),
            ParamChange::ParticleDensity(v) if v.is_finite() => replace(
                &mut self.particle_density,
                v.clamp(0.0, Self::MAX_PARTICLE_DENSITY),
            ),
            ParamChange::ParticleSize(v) if v.is_finite() => {
                replace(&mut self.particle_size, v.max(f32::EPSILON))
            }
            _ => false,
        }
    }
}

/// Holds the current [`BloomParams`] and notifies subscribers on each write.
pub struct ParamStore {
    values: BloomParams,
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl fmt::Debug for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamStore")
            .field("values", &self.values)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ParamStore {
    pub fn new(values: BloomParams) -> Self {
        Self {
            values,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn values(&self) -> &BloomParams {
        &self.values
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ParamEvent, &BloomParams) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn set(&mut self, change: ParamChange) -> bool {
        self.set_at(change, Instant::now())
    }

    /// Writes `change`; listeners run in subscription order, and only when
    /// the value actually changed.
    pub fn set_at(&mut self, change: ParamChange, at: Instant) -> bool {
        if !self.values.apply(change) {
            return false;
        }
        let event = ParamEvent { change, at };
        for (_, listener) in &mut self.listeners {
            listener(&event, &self.values);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_see_new_values() {
        let mut store = ParamStore::new(BloomParams::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |event, params| {
            sink.borrow_mut().push((event.change, params.wave_speed));
        });
        assert!(store.set(ParamChange::WaveSpeed(1.5)));
        assert_eq!(*seen.borrow(), vec![(ParamChange::WaveSpeed(1.5), 1.5)]);
    }

    #[test]
    fn unchanged_values_do_not_notify() {
        let mut store = ParamStore::new(BloomParams::default());
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        store.subscribe(move |_, _| *sink.borrow_mut() += 1);
        let current = store.values().grid_size;
        assert!(!store.set(ParamChange::GridSize(current)));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let mut store = ParamStore::new(BloomParams::default());
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = store.subscribe(move |_, _| *sink.borrow_mut() += 1);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set(ParamChange::ParticleSize(0.5));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut params = BloomParams::default();
        params.apply(ParamChange::GridSize(0));
        params.apply(ParamChange::ParticleDensity(-3.0));
        assert_eq!(params.grid_size, 2);
        assert_eq!(params.particle_density, 0.0);

        params.apply(ParamChange::GridSize(u32::MAX));
        params.apply(ParamChange::ParticleDensity(1e12));
        assert_eq!(params.grid_size, BloomParams::MAX_GRID_SIZE);
        assert_eq!(params.particle_density, BloomParams::MAX_PARTICLE_DENSITY);
        params.validate().unwrap();
    }

    #[test]
    fn non_finite_edits_are_dropped_without_notifying() {
        let mut store = ParamStore::new(BloomParams::default());
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        store.subscribe(move |_, _| *sink.borrow_mut() += 1);

        assert!(!store.set(ParamChange::ParticleDensity(f32::INFINITY)));
        assert!(!store.set(ParamChange::ParticleDensity(f32::NAN)));
        assert!(!store.set(ParamChange::WaveSpeed(f32::NEG_INFINITY)));
        assert!(!store.set(ParamChange::ParticleSize(f32::NAN)));
        assert_eq!(*count.borrow(), 0);
        assert_eq!(store.values(), &BloomParams::default());
        store.values().validate().unwrap();
    }
}
