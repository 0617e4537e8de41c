use std::time::Instant;

use crate::config::BloomParams;

/// A single edit of one tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    GridSize(u32),
    WaveAmplitude(f32),
    WaveFrequency(f32),
    WaveSpeed(f32),
    ParticleDensity(f32),
    ParticleSize(f32),
}

/// What applying a [`ParamChange`] requires from the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEffect {
    /// Push new uniform values into the existing materials.
    Uniform,
    /// Re-sample the grid and rebuild both layers.
    Rebuild,
}

impl ParamChange {
    pub fn effect(&self) -> ChangeEffect {
        match self {
            Self::GridSize(_) | Self::ParticleDensity(_) => ChangeEffect::Rebuild,
            Self::WaveAmplitude(_)
            | Self::WaveFrequency(_)
            | Self::WaveSpeed(_)
            | Self::ParticleSize(_) => ChangeEffect::Uniform,
        }
    }

    /// Changes that turn `old` into `new`, in field order.
    pub fn diff(old: &BloomParams, new: &BloomParams) -> Vec<ParamChange> {
        let mut changes = Vec::new();
        if old.grid_size != new.grid_size {
            changes.push(Self::GridSize(new.grid_size));
        }
        if old.wave_amplitude != new.wave_amplitude {
            changes.push(Self::WaveAmplitude(new.wave_amplitude));
        }
        if old.wave_frequency != new.wave_frequency {
            changes.push(Self::WaveFrequency(new.wave_frequency));
        }
        if old.wave_speed != new.wave_speed {
            changes.push(Self::WaveSpeed(new.wave_speed));
        }
        if old.particle_density != new.particle_density {
            changes.push(Self::ParticleDensity(new.particle_density));
        }
        if old.particle_size != new.particle_size {
            changes.push(Self::ParticleSize(new.particle_size));
        }
        changes
    }
}

/// Emitted by the parameter store after a change has been applied.
#[derive(Debug, Clone, Copy)]
pub struct ParamEvent {
    pub change: ParamChange,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    ImageLoaded,
    ParamsChanged,
    Requested,
}
