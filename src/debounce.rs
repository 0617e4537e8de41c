use std::time::{Duration, Instant};

/// Coalesces bursts of triggers into a single firing once no trigger has
/// arrived for `window`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Restarts the quiet period.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns `true` exactly once per burst, when the window has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_quiet_window() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(200));
        assert!(!d.poll(t0));
        d.trigger(t0);
        assert!(!d.poll(t0 + Duration::from_millis(199)));
        assert!(d.poll(t0 + Duration::from_millis(200)));
        assert!(!d.poll(t0 + Duration::from_millis(400)));
    }

    #[test]
    fn retrigger_extends_window() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(200));
        d.trigger(t0);
        d.trigger(t0 + Duration::from_millis(150));
        assert!(!d.poll(t0 + Duration::from_millis(250)));
        assert!(d.poll(t0 + Duration::from_millis(350)));
    }

    #[test]
    fn cancel_drops_pending_fire() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.trigger(t0);
        d.cancel();
        assert!(!d.is_pending());
        assert!(!d.poll(t0 + Duration::from_secs(1)));
    }
}
