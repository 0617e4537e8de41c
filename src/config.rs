use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Live tunables of the bloom effect.
///
/// Grid size and particle density require re-sampling the grid; the wave
/// settings and particle size are pushed straight into material uniforms.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BloomParams {
    /// Number of grid cells along the long side of the image.
    pub grid_size: u32,
    /// Peak z displacement of the surface mesh, in world units.
    pub wave_amplitude: f32,
    /// Spatial frequency of the displacement noise.
    pub wave_frequency: f32,
    /// Time scale of the displacement noise.
    pub wave_speed: f32,
    /// Expected number of particles per scatter cell.
    pub particle_density: f32,
    /// Billboard half-extent of each particle, in world units.
    pub particle_size: f32,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            grid_size: 96,
            wave_amplitude: 0.25,
            wave_frequency: 0.6,
            wave_speed: 0.35,
            particle_density: 1.5,
            particle_size: 0.03,
        }
    }
}

impl BloomParams {
    pub const MIN_GRID_SIZE: u32 = 2;
    pub const MAX_GRID_SIZE: u32 = 1024;
    pub const MAX_PARTICLE_DENSITY: f32 = 64.0;

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (Self::MIN_GRID_SIZE..=Self::MAX_GRID_SIZE).contains(&self.grid_size),
            "grid-size must be within [{}, {}]",
            Self::MIN_GRID_SIZE,
            Self::MAX_GRID_SIZE
        );
        ensure!(
            self.particle_density.is_finite()
                && (0.0..=Self::MAX_PARTICLE_DENSITY).contains(&self.particle_density),
            "particle-density must be within [0, {}]",
            Self::MAX_PARTICLE_DENSITY
        );
        ensure!(
            self.particle_size.is_finite() && self.particle_size > 0.0,
            "particle-size must be positive"
        );
        ensure!(
            self.wave_amplitude.is_finite()
                && self.wave_frequency.is_finite()
                && self.wave_speed.is_finite(),
            "wave settings must be finite"
        );
        Ok(())
    }
}

/// Visually tuned constants of the mesh build.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct TuningConstants {
    /// Fraction of a cell covered by its surface quad.
    pub gap_factor: f32,
    /// Chance that a drawn scatter particle is actually emitted.
    pub emission_probability: f64,
    /// Quiet period before grid-affecting edits trigger a rebuild.
    #[serde(with = "humantime_serde")]
    pub rebuild_debounce: Duration,
    /// World-space length of the image's shorter side.
    pub world_short_side: f32,
    /// Disk radius as a fraction of half the shorter world side.
    pub base_radius_fraction: f32,
}

impl Default for TuningConstants {
    fn default() -> Self {
        Self {
            gap_factor: 0.85,
            emission_probability: 0.8,
            rebuild_debounce: Duration::from_millis(200),
            world_short_side: 5.0,
            base_radius_fraction: 0.95,
        }
    }
}

impl TuningConstants {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.gap_factor > 0.0 && self.gap_factor <= 1.0,
            "gap-factor must be within (0, 1]"
        );
        ensure!(
            (0.0..=1.0).contains(&self.emission_probability),
            "emission-probability must be within [0, 1]"
        );
        ensure!(
            self.world_short_side.is_finite() && self.world_short_side > 0.0,
            "world-short-side must be positive"
        );
        ensure!(
            self.base_radius_fraction > 0.0,
            "base-radius-fraction must be positive"
        );
        Ok(())
    }
}

/// Shape of the organic disk boundary separating surface and scatter cells.
///
/// Amplitudes are relative to the base radius. Frequencies should be whole
/// numbers so the boundary closes without a seam at ±π.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BoundaryNoise {
    pub low_frequency: f32,
    pub low_amplitude: f32,
    pub high_frequency: f32,
    pub high_amplitude: f32,
    /// Uniform per-cell jitter, relative to the base radius.
    pub jitter: f32,
    pub phase: f32,
}

impl Default for BoundaryNoise {
    fn default() -> Self {
        Self {
            low_frequency: 3.0,
            low_amplitude: 0.06,
            high_frequency: 9.0,
            high_amplitude: 0.03,
            jitter: 0.08,
            phase: 0.0,
        }
    }
}

impl BoundaryNoise {
    /// A perfect circle: no angular noise and no jitter.
    pub fn none() -> Self {
        Self {
            low_amplitude: 0.0,
            high_amplitude: 0.0,
            jitter: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.jitter >= 0.0, "boundary jitter must not be negative");
        ensure!(
            self.low_amplitude + self.high_amplitude + self.jitter < 1.0,
            "boundary noise amplitudes must sum to less than 1"
        );
        Ok(())
    }
}

/// Outward drift of scatter particles.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DriftSettings {
    /// Loops per second of the slowest particle.
    pub min_speed: f32,
    /// Loops per second of the fastest particle.
    pub max_speed: f32,
    /// World distance covered over one loop.
    pub distance: f32,
}

impl Default for DriftSettings {
    fn default() -> Self {
        Self {
            min_speed: 0.04,
            max_speed: 0.16,
            distance: 2.5,
        }
    }
}

impl DriftSettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_speed >= 0.0 && self.max_speed >= self.min_speed,
            "drift speeds must satisfy 0 <= min-speed <= max-speed"
        );
        ensure!(self.distance >= 0.0, "drift distance must not be negative");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SceneSettings {
    /// Vertical field of view of the camera, in degrees.
    pub camera_fov_degrees: f32,
    /// Direction the directional light travels.
    pub light_direction: [f32; 3],
    pub light_intensity: f32,
    pub ambient_intensity: f32,
    pub background: [u8; 3],
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            camera_fov_degrees: 45.0,
            light_direction: [-0.4, -0.6, -1.0],
            light_intensity: 0.8,
            ambient_intensity: 0.45,
            background: [12, 10, 18],
        }
    }
}

impl SceneSettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.camera_fov_degrees > 1.0 && self.camera_fov_degrees < 179.0,
            "camera-fov-degrees must be within (1, 179)"
        );
        let [x, y, z] = self.light_direction;
        ensure!(
            (x * x + y * y + z * z) > f32::EPSILON,
            "light-direction must not be the zero vector"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Photo turned into the bloom.
    pub image: Option<PathBuf>,
    /// Optional deterministic seed for jitter, emission and boundary noise.
    pub seed: Option<u64>,
    pub params: BloomParams,
    pub tuning: TuningConstants,
    pub boundary: BoundaryNoise,
    pub drift: DriftSettings,
    pub scene: SceneSettings,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut cfg: Self = serde_yaml::from_str(&s)?;
        // Relative image paths resolve against the config file location.
        if let (Some(image), Some(dir)) = (cfg.image.as_mut(), path.parent()) {
            if image.is_relative() {
                *image = dir.join(&*image);
            }
        }
        Ok(cfg)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.params.validate().context("invalid params")?;
        self.tuning.validate().context("invalid tuning")?;
        self.boundary
            .validate()
            .context("invalid boundary configuration")?;
        self.drift.validate().context("invalid drift configuration")?;
        self.scene.validate().context("invalid scene configuration")?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Configuration::default().validated().unwrap();
    }

    #[test]
    fn zero_grid_size_is_rejected() {
        let cfg = Configuration {
            params: BloomParams {
                grid_size: 0,
                ..BloomParams::default()
            },
            ..Configuration::default()
        };
        let err = cfg.validated().unwrap_err();
        assert!(format!("{err:#}").contains("grid-size"));
    }

    #[test]
    fn oversized_grid_and_density_are_rejected() {
        let huge_grid = BloomParams {
            grid_size: BloomParams::MAX_GRID_SIZE + 1,
            ..BloomParams::default()
        };
        assert!(huge_grid.validate().is_err());
        let dense = BloomParams {
            particle_density: 1e12,
            ..BloomParams::default()
        };
        assert!(dense.validate().is_err());
        let infinite = BloomParams {
            particle_density: f32::INFINITY,
            ..BloomParams::default()
        };
        assert!(infinite.validate().is_err());
    }

    #[test]
    fn boundary_without_noise_is_circle() {
        let noise = BoundaryNoise::none();
        assert_eq!(noise.low_amplitude, 0.0);
        assert_eq!(noise.high_amplitude, 0.0);
        assert_eq!(noise.jitter, 0.0);
        noise.validate().unwrap();
    }
}
