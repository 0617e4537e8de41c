use image::RgbaImage;
use rand::Rng;

use super::grid::{CellKind, GridCell, GridLayout};
use crate::config::DriftSettings;
use crate::processing::noise::hash21;

/// A loose point sprite shed by a scatter cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterParticle {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// One billboard corner. All four corners of a sprite share its position;
/// the shader expands them by `corner * size` in view space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub corner: [f32; 2],
    pub color: [f32; 4],
}

const BILLBOARD_CORNERS: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
const BILLBOARD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

#[derive(Debug, Clone, Default)]
pub struct ParticleGeometry {
    pub particles: Vec<ScatterParticle>,
    pub vertices: Vec<ParticleVertex>,
    pub indices: Vec<u32>,
}

impl ParticleGeometry {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    fn push(&mut self, particle: ScatterParticle) {
        let base = self.vertices.len() as u32;
        let [r, g, b] = particle.color;
        for corner in BILLBOARD_CORNERS {
            self.vertices.push(ParticleVertex {
                position: particle.position,
                corner,
                color: [r, g, b, 1.0],
            });
        }
        self.indices
            .extend(BILLBOARD_INDICES.iter().map(|i| base + i));
        self.particles.push(particle);
    }
}

/// Per-cell outcome of the scatter pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterCellReport {
    pub row: u32,
    pub col: u32,
    /// Particles drawn from the density.
    pub drawn: u32,
    /// Particles that passed the emission roll and pixel lookup.
    pub emitted: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ScatterBuild {
    pub geometry: ParticleGeometry,
    pub cells: Vec<ScatterCellReport>,
}

/// `floor(density)` plus one more with probability `fract(density)`.
pub fn draw_count<R: Rng + ?Sized>(density: f32, rng: &mut R) -> u32 {
    let density = density.max(0.0);
    let whole = density.floor();
    let extra = f64::from(density - whole);
    whole as u32 + u32::from(extra > 0.0 && rng.random_bool(extra))
}

/// Nearest source pixel to a grid uv, or `None` outside the image.
fn sample_pixel(image: &RgbaImage, uv: [f32; 2]) -> Option<[f32; 3]> {
    let (w, h) = image.dimensions();
    if uv[0] < 0.0 || uv[1] < 0.0 {
        return None;
    }
    let px = (uv[0] * w as f32).floor() as u32;
    let py = (uv[1] * h as f32).floor() as u32;
    if px >= w || py >= h {
        return None;
    }
    let [r, g, b, _] = image.get_pixel(px, py).0;
    Some([
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
    ])
}

/// Sheds colored sprites from every scatter cell.
pub fn build_scatter<R: Rng + ?Sized>(
    layout: &GridLayout,
    cells: &[GridCell],
    image: &RgbaImage,
    density: f32,
    emission_probability: f64,
    rng: &mut R,
) -> ScatterBuild {
    let mut build = ScatterBuild::default();
    let emission_probability = emission_probability.clamp(0.0, 1.0);
    for cell in cells.iter().filter(|c| c.kind == CellKind::Scatter) {
        let drawn = draw_count(density, rng);
        let mut emitted = 0;
        let uv = layout.uv_at(cell.center[0], cell.center[1]);
        for _ in 0..drawn {
            if !rng.random_bool(emission_probability) {
                continue;
            }
            let Some(color) = sample_pixel(image, uv) else {
                continue;
            };
            let jx = rng.random_range(-0.5f32..0.5) * layout.cell_size;
            let jy = rng.random_range(-0.5f32..0.5) * layout.cell_size;
            build.geometry.push(ScatterParticle {
                position: [cell.center[0] + jx, cell.center[1] + jy, 0.0],
                color,
            });
            emitted += 1;
        }
        build.cells.push(ScatterCellReport {
            row: cell.row,
            col: cell.col,
            drawn,
            emitted,
        });
    }
    build
}

/// Animated state of a sprite, as computed by the particle shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftState {
    pub offset: [f32; 3],
    pub alpha: f32,
    pub progress: f32,
}

/// Outward drift along the sprite's direction from the origin, looping with
/// a sawtooth and fading out towards the end of each loop.
pub fn drift_state(position: [f32; 3], time: f32, drift: &DriftSettings) -> DriftState {
    let [x, y, _] = position;
    let len = (x * x + y * y).sqrt();
    let dir = if len > f32::EPSILON {
        [x / len, y / len]
    } else {
        [1.0, 0.0]
    };
    let speed = drift.min_speed + (drift.max_speed - drift.min_speed) * hash21(x, y);
    let phase = hash21(y, x);
    let t = time * speed + phase;
    let progress = t - t.floor();
    let travel = progress * drift.distance;
    DriftState {
        offset: [dir[0] * travel, dir[1] * travel, 0.0],
        alpha: 1.0 - progress,
        progress,
    }
}
