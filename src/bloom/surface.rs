use super::grid::{CellKind, GridCell, GridLayout};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Quads of every surface cell, four vertices and six indices each.
#[derive(Debug, Clone, Default)]
pub struct SurfaceGeometry {
    pub vertices: Vec<SurfaceVertex>,
    pub indices: Vec<u32>,
}

// Counter-clockwise seen from +z.
const QUAD_CORNERS: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

impl SurfaceGeometry {
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn push_quad(&mut self, layout: &GridLayout, center: [f32; 2], half: f32) {
        let base = self.vertices.len() as u32;
        for [dx, dy] in QUAD_CORNERS {
            let x = center[0] + dx * half;
            let y = center[1] + dy * half;
            self.vertices.push(SurfaceVertex {
                position: [x, y, 0.0],
                normal: [0.0, 0.0, 1.0],
                uv: layout.uv_at(x, y),
            });
        }
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }
}

/// Emits one quad of side `cell_size * gap_factor` per surface cell.
pub fn build_surface(layout: &GridLayout, cells: &[GridCell], gap_factor: f32) -> SurfaceGeometry {
    let surface_cells = cells.iter().filter(|c| c.kind == CellKind::Surface);
    let count = surface_cells.clone().count();
    let mut geometry = SurfaceGeometry {
        vertices: Vec::with_capacity(count * 4),
        indices: Vec::with_capacity(count * 6),
    };
    let half = layout.cell_size * gap_factor * 0.5;
    for cell in surface_cells {
        geometry.push_quad(layout, cell.center, half);
    }
    geometry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(layout: &GridLayout, row: u32, col: u32, kind: CellKind) -> GridCell {
        GridCell {
            row,
            col,
            center: layout.cell_center(row, col),
            kind,
        }
    }

    #[test]
    fn only_surface_cells_emit_quads() {
        let layout = GridLayout::new(4, 100, 100, 4.0).unwrap();
        let cells = vec![
            cell(&layout, 0, 0, CellKind::Scatter),
            cell(&layout, 1, 1, CellKind::Surface),
            cell(&layout, 2, 2, CellKind::Surface),
        ];
        let geometry = build_surface(&layout, &cells, 0.85);
        assert_eq!(geometry.quad_count(), 2);
        assert_eq!(geometry.indices.len(), 12);
        assert_eq!(&geometry.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn quad_is_scaled_by_gap_factor() {
        let layout = GridLayout::new(4, 100, 100, 4.0).unwrap();
        let cells = [cell(&layout, 1, 1, CellKind::Surface)];
        let geometry = build_surface(&layout, &cells, 0.5);
        let xs: Vec<f32> = geometry.vertices.iter().map(|v| v.position[0]).collect();
        let width = xs.iter().cloned().fold(f32::MIN, f32::max)
            - xs.iter().cloned().fold(f32::MAX, f32::min);
        assert!((width - 0.5).abs() < 1e-6);
        assert!(geometry.vertices.iter().all(|v| v.position[2] == 0.0));
        assert!(geometry.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn winding_is_counter_clockwise() {
        let layout = GridLayout::new(4, 100, 100, 4.0).unwrap();
        let cells = [cell(&layout, 0, 0, CellKind::Surface)];
        let geometry = build_surface(&layout, &cells, 0.85);
        for tri in geometry.indices.chunks(3) {
            let a = geometry.vertices[tri[0] as usize].position;
            let b = geometry.vertices[tri[1] as usize].position;
            let c = geometry.vertices[tri[2] as usize].position;
            let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
            assert!(cross > 0.0);
        }
    }

    #[test]
    fn uvs_cover_unit_square_at_full_coverage() {
        let layout = GridLayout::new(2, 100, 100, 2.0).unwrap();
        let cells: Vec<GridCell> = (0..2)
            .flat_map(|r| (0..2).map(move |c| (r, c)))
            .map(|(r, c)| cell(&layout, r, c, CellKind::Surface))
            .collect();
        let geometry = build_surface(&layout, &cells, 1.0);
        for v in &geometry.vertices {
            assert!((0.0..=1.0).contains(&v.uv[0]));
            assert!((0.0..=1.0).contains(&v.uv[1]));
        }
        // Top-left corner of the top-left cell samples the image origin.
        let top_left = geometry.vertices[3];
        assert_eq!(top_left.uv, [0.0, 0.0]);
    }
}
