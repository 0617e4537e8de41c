use rand::Rng;

use crate::config::BoundaryNoise;
use crate::processing::noise::angular_noise;

/// Grid laid over the image's world-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cols: u32,
    pub rows: u32,
    pub cell_size: f32,
    pub world_width: f32,
    pub world_height: f32,
}

impl GridLayout {
    /// Derives the grid for an image of `width` x `height` pixels.
    ///
    /// `grid_size` cells span the longer side; the shorter side gets as many
    /// whole square cells as fit. The shorter world side is always
    /// `world_short_side` long. Returns `None` for empty images or grids.
    pub fn new(grid_size: u32, width: u32, height: u32, world_short_side: f32) -> Option<Self> {
        if grid_size == 0 || width == 0 || height == 0 {
            return None;
        }
        let aspect = f64::from(width) / f64::from(height);
        let n = f64::from(grid_size);
        let short = f64::from(world_short_side);
        let (cols, rows, world_width, world_height) = if aspect >= 1.0 {
            let rows = ((n / aspect).floor() as u32).max(1);
            (grid_size, rows, short * aspect, short)
        } else {
            let cols = ((n * aspect).floor() as u32).max(1);
            (cols, grid_size, short, short / aspect)
        };
        let long = world_width.max(world_height);
        Some(Self {
            cols,
            rows,
            cell_size: (long / n) as f32,
            world_width: world_width as f32,
            world_height: world_height as f32,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Width and height covered by the cells themselves.
    pub fn grid_extent(&self) -> (f32, f32) {
        (
            self.cols as f32 * self.cell_size,
            self.rows as f32 * self.cell_size,
        )
    }

    /// World-space center of a cell; row 0 is the top of the image.
    pub fn cell_center(&self, row: u32, col: u32) -> [f32; 2] {
        let (gw, gh) = self.grid_extent();
        [
            (col as f32 + 0.5) * self.cell_size - gw * 0.5,
            gh * 0.5 - (row as f32 + 0.5) * self.cell_size,
        ]
    }

    /// Maps a world-space point to texture coordinates over the grid extent.
    pub fn uv_at(&self, x: f32, y: f32) -> [f32; 2] {
        let (gw, gh) = self.grid_extent();
        [(x + gw * 0.5) / gw, (gh * 0.5 - y) / gh]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Inside the noisy disk; becomes a mesh quad.
    Surface,
    /// Outside the disk; sheds particles.
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
    pub center: [f32; 2],
    pub kind: CellKind,
}

/// Organic disk centered on the grid.
#[derive(Debug, Clone)]
pub struct BoundaryShape {
    base_radius: f32,
    noise: BoundaryNoise,
}

impl BoundaryShape {
    pub fn new(layout: &GridLayout, base_radius_fraction: f32, noise: BoundaryNoise) -> Self {
        let short = layout.world_width.min(layout.world_height);
        Self {
            base_radius: base_radius_fraction * short * 0.5,
            noise,
        }
    }

    pub fn base_radius(&self) -> f32 {
        self.base_radius
    }

    /// Radius at angle `theta` for a jitter sample in `[-0.5, 0.5)`.
    pub fn threshold(&self, theta: f32, jitter_sample: f32) -> f32 {
        self.base_radius
            * (1.0 + angular_noise(theta, &self.noise) + self.noise.jitter * jitter_sample)
    }

    pub fn classify(&self, center: [f32; 2], jitter_sample: f32) -> CellKind {
        let [x, y] = center;
        let distance = (x * x + y * y).sqrt();
        if distance <= self.threshold(y.atan2(x), jitter_sample) {
            CellKind::Surface
        } else {
            CellKind::Scatter
        }
    }
}

/// Walks the grid row by row and classifies every cell.
///
/// One jitter sample is drawn per cell even when jitter is disabled so the
/// random stream consumed by later stages does not depend on it.
pub fn sample_grid<R: Rng + ?Sized>(
    layout: &GridLayout,
    shape: &BoundaryShape,
    rng: &mut R,
) -> Vec<GridCell> {
    let mut cells = Vec::with_capacity(layout.cell_count());
    for row in 0..layout.rows {
        for col in 0..layout.cols {
            let center = layout.cell_center(row, col);
            let jitter_sample = rng.random_range(-0.5f32..0.5);
            cells.push(GridCell {
                row,
                col,
                center,
                kind: shape.classify(center, jitter_sample),
            });
        }
    }
    cells
}
