//! Scene graph hosting the bloom layers.
//!
//! Nodes live in an arena keyed by [`LayerId`]. A rebuild swaps the arena
//! entries; uniform edits mutate the materials of the current entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::bloom::BloomMesh;
use crate::bloom::scatter::ParticleGeometry;
use crate::bloom::surface::SurfaceGeometry;
use crate::config::{BloomParams, DriftSettings, SceneSettings};
use crate::processing::noise::surface_displacement;

pub type Mat4 = [[f32; 4]; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerId {
    Surface,
    Particles,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(fov_y_degrees: f32) -> Self {
        Self {
            position: [0.0, 0.0, 10.0],
            target: [0.0; 3],
            fov_y_degrees,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Moves the camera back along +z until a `width` x `height` rectangle
    /// centered on the origin fits the vertical field of view.
    pub fn frame(&mut self, width: f32, height: f32, margin: f32) {
        let half = 0.5 * width.max(height) + margin;
        let tan = (0.5 * self.fov_y_degrees.to_radians()).tan();
        let distance = half / tan.max(f32::EPSILON);
        self.position = [0.0, 0.0, distance];
        self.target = [0.0; 3];
        self.far = (distance * 4.0).max(self.near + 1.0);
    }

    /// Right-handed view matrix, column-major.
    pub fn view(&self) -> Mat4 {
        let eye = self.position;
        let f = normalize(sub(self.target, eye));
        let s = normalize(cross(f, [0.0, 1.0, 0.0]));
        let u = cross(s, f);
        [
            [s[0], u[0], -f[0], 0.0],
            [s[1], u[1], -f[1], 0.0],
            [s[2], u[2], -f[2], 0.0],
            [-dot(s, eye), -dot(u, eye), dot(f, eye), 1.0],
        ]
    }

    /// Perspective projection with depth in `[0, 1]`, column-major.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let f = 1.0 / (0.5 * self.fov_y_degrees.to_radians()).tan();
        let range = self.far / (self.near - self.far);
        [
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, range, -1.0],
            [0.0, 0.0, range * self.near, 0.0],
        ]
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        mul(&self.projection(aspect), &self.view())
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = dot(v, v).sqrt();
    if len <= f32::EPSILON {
        return [0.0, 0.0, -1.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (col, out_col) in out.iter_mut().enumerate() {
        for (row, cell) in out_col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    out
}

/// Applies a column-major matrix to a point.
pub fn transform_point(m: &Mat4, p: [f32; 3]) -> [f32; 4] {
    let v = [p[0], p[1], p[2], 1.0];
    let mut out = [0.0; 4];
    for (row, cell) in out.iter_mut().enumerate() {
        *cell = (0..4).map(|k| m[k][row] * v[k]).sum();
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Double-sided material of the surface mesh with its displacement uniforms.
#[derive(Debug, Clone)]
pub struct SurfaceMaterial {
    pub amplitude: f32,
    pub frequency: f32,
    pub speed: f32,
    pub double_sided: bool,
    pub texture: Arc<RgbaImage>,
}

impl SurfaceMaterial {
    pub fn displacement(&self, x: f32, y: f32, time: f32) -> f32 {
        surface_displacement(x, y, time, self.amplitude, self.frequency, self.speed)
    }
}

#[derive(Debug, Clone)]
pub struct ParticleMaterial {
    pub size: f32,
    pub drift: DriftSettings,
    pub transparent: bool,
}

#[derive(Debug, Clone)]
pub enum Material {
    Surface(SurfaceMaterial),
    Particles(ParticleMaterial),
}

#[derive(Debug, Clone)]
pub enum Geometry {
    Surface(SurfaceGeometry),
    Particles(ParticleGeometry),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub layer: LayerId,
    pub parent: Option<LayerId>,
    pub geometry: Geometry,
    pub material: Material,
    /// Scene generation the node was built in.
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub sun: DirectionalLight,
    pub ambient: AmbientLight,
    pub background: [u8; 3],
    nodes: BTreeMap<LayerId, SceneNode>,
    generation: u64,
}

impl Scene {
    pub fn new(settings: &SceneSettings) -> Self {
        Self {
            camera: Camera::new(settings.camera_fov_degrees),
            sun: DirectionalLight {
                direction: normalize(settings.light_direction),
                color: [1.0, 1.0, 1.0],
                intensity: settings.light_intensity,
            },
            ambient: AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: settings.ambient_intensity,
            },
            background: settings.background,
            nodes: BTreeMap::new(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn node(&self, layer: LayerId) -> Option<&SceneNode> {
        self.nodes.get(&layer)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    pub fn children(&self, parent: LayerId) -> impl Iterator<Item = &SceneNode> {
        self.nodes
            .values()
            .filter(move |node| node.parent == Some(parent))
    }

    pub fn surface_material(&self) -> Option<&SurfaceMaterial> {
        match self.node(LayerId::Surface).map(|n| &n.material) {
            Some(Material::Surface(material)) => Some(material),
            _ => None,
        }
    }

    pub fn particle_material(&self) -> Option<&ParticleMaterial> {
        match self.node(LayerId::Particles).map(|n| &n.material) {
            Some(Material::Particles(material)) => Some(material),
            _ => None,
        }
    }

    /// Inserts a node, returning the one it replaced.
    pub fn attach(&mut self, node: SceneNode) -> Option<SceneNode> {
        self.nodes.insert(node.layer, node)
    }

    /// Removes a node together with its children.
    pub fn detach(&mut self, layer: LayerId) -> Vec<SceneNode> {
        let Some(node) = self.nodes.remove(&layer) else {
            return Vec::new();
        };
        let children: Vec<LayerId> = self.children(layer).map(|c| c.layer).collect();
        let mut removed = vec![node];
        for child in children {
            removed.extend(self.detach(child));
        }
        removed
    }

    /// Swaps in freshly built layers and re-frames the camera.
    pub fn replace_bloom(
        &mut self,
        mesh: BloomMesh,
        texture: Arc<RgbaImage>,
        params: &BloomParams,
        drift: &DriftSettings,
    ) -> u64 {
        self.detach(LayerId::Surface);
        self.generation += 1;
        let generation = self.generation;

        self.camera.frame(
            mesh.layout.world_width,
            mesh.layout.world_height,
            drift.distance,
        );
        self.attach(SceneNode {
            layer: LayerId::Surface,
            parent: None,
            geometry: Geometry::Surface(mesh.surface),
            material: Material::Surface(SurfaceMaterial {
                amplitude: params.wave_amplitude,
                frequency: params.wave_frequency,
                speed: params.wave_speed,
                double_sided: true,
                texture,
            }),
            generation,
        });
        self.attach(SceneNode {
            layer: LayerId::Particles,
            parent: Some(LayerId::Surface),
            geometry: Geometry::Particles(mesh.particles),
            material: Material::Particles(ParticleMaterial {
                size: params.particle_size,
                drift: drift.clone(),
                transparent: true,
            }),
            generation,
        });
        generation
    }

    /// Pushes the uniform-backed tunables into every live material.
    /// Returns how many materials were updated.
    pub fn apply_uniforms(&mut self, params: &BloomParams) -> usize {
        let mut updated = 0;
        for node in self.nodes.values_mut() {
            match &mut node.material {
                Material::Surface(material) => {
                    material.amplitude = params.wave_amplitude;
                    material.frequency = params.wave_frequency;
                    material.speed = params.wave_speed;
                }
                Material::Particles(material) => {
                    material.size = params.particle_size;
                }
            }
            updated += 1;
        }
        updated
    }
}
