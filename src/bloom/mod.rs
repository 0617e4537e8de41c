//! Point-cloud bloom generation.
//!
//! A photo is covered by a grid; cells inside a noisy disk become quads of a
//! solid surface mesh, cells outside shed loose colored sprites.

pub mod grid;
pub mod scatter;
pub mod surface;

use image::RgbaImage;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::{BloomParams, BoundaryNoise, TuningConstants};
use crate::error::{Error, Result};

use grid::{BoundaryShape, CellKind, GridLayout, sample_grid};
use scatter::{ParticleGeometry, ScatterCellReport, build_scatter};
use surface::{SurfaceGeometry, build_surface};

/// Inputs of a build that are not live tunables.
#[derive(Debug, Clone, Default)]
pub struct BuildSettings {
    pub tuning: TuningConstants,
    pub boundary: BoundaryNoise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BuildStats {
    pub cols: u32,
    pub rows: u32,
    pub surface_cells: usize,
    pub scatter_cells: usize,
    pub drawn_particles: usize,
    pub emitted_particles: usize,
}

/// Output of one build; replaced wholesale on every rebuild.
#[derive(Debug, Clone)]
pub struct BloomMesh {
    pub layout: GridLayout,
    pub surface: SurfaceGeometry,
    pub particles: ParticleGeometry,
    pub scatter_cells: Vec<ScatterCellReport>,
    pub stats: BuildStats,
}

pub fn build_bloom<R: Rng + ?Sized>(
    image: &RgbaImage,
    params: &BloomParams,
    settings: &BuildSettings,
    rng: &mut R,
) -> Result<BloomMesh> {
    let (width, height) = image.dimensions();
    let layout = GridLayout::new(
        params.grid_size,
        width,
        height,
        settings.tuning.world_short_side,
    )
    .ok_or(Error::EmptyImage { width, height })?;

    let shape = BoundaryShape::new(
        &layout,
        settings.tuning.base_radius_fraction,
        settings.boundary.clone(),
    );
    let cells = sample_grid(&layout, &shape, rng);
    let surface = build_surface(&layout, &cells, settings.tuning.gap_factor);
    let scatter = build_scatter(
        &layout,
        &cells,
        image,
        params.particle_density,
        settings.tuning.emission_probability,
        rng,
    );

    let scatter_cells = cells.iter().filter(|c| c.kind == CellKind::Scatter).count();
    let stats = BuildStats {
        cols: layout.cols,
        rows: layout.rows,
        surface_cells: cells.len() - scatter_cells,
        scatter_cells,
        drawn_particles: scatter.cells.iter().map(|c| c.drawn as usize).sum(),
        emitted_particles: scatter.geometry.len(),
    };
    debug!(
        cols = stats.cols,
        rows = stats.rows,
        surface = stats.surface_cells,
        scatter = stats.scatter_cells,
        particles = stats.emitted_particles,
        "bloom mesh built"
    );

    Ok(BloomMesh {
        layout,
        surface,
        particles: scatter.geometry,
        scatter_cells: scatter.cells,
        stats,
    })
}
