//! Hash and value-noise helpers.
//!
//! These mirror the functions in `gpu/shaders/*.wgsl` so displacement and
//! drift can be evaluated on the CPU exactly as the shaders do.

use crate::config::BoundaryNoise;

/// Integer hash of a lattice point to `[0, 1)`.
pub fn hash3(x: i32, y: i32, z: i32) -> f32 {
    let mut h = (x as u32).wrapping_mul(0x8DA6_B343)
        ^ (y as u32).wrapping_mul(0xD816_3841)
        ^ (z as u32).wrapping_mul(0xCB1A_B31F);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846C_A68B);
    h ^= h >> 16;
    (h >> 8) as f32 / (1u32 << 24) as f32
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Trilinear value noise in `[0, 1]`.
pub fn value_noise3(p: [f32; 3]) -> f32 {
    let [px, py, pz] = p;
    let (x0, y0, z0) = (px.floor(), py.floor(), pz.floor());
    let (tx, ty, tz) = (
        smoothstep(px - x0),
        smoothstep(py - y0),
        smoothstep(pz - z0),
    );
    let (ix, iy, iz) = (x0 as i32, y0 as i32, z0 as i32);

    let corner = |dx: i32, dy: i32, dz: i32| hash3(ix + dx, iy + dy, iz + dz);

    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), tx);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), tx);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), tx);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), tx);
    let y0v = lerp(x00, x10, ty);
    let y1v = lerp(x01, x11, ty);
    lerp(y0v, y1v, tz)
}

pub const FBM_OCTAVES: u32 = 3;

/// Fractal sum of [`FBM_OCTAVES`] value-noise octaves, remapped to `[-1, 1]`.
pub fn fbm3(p: [f32; 3]) -> f32 {
    let mut sum = 0.0;
    let mut norm = 0.0;
    let mut amp = 1.0;
    let mut freq = 1.0;
    for _ in 0..FBM_OCTAVES {
        let n = value_noise3([p[0] * freq, p[1] * freq, p[2] * freq]);
        sum += amp * (2.0 * n - 1.0);
        norm += amp;
        amp *= 0.5;
        freq *= 2.0;
    }
    sum / norm
}

/// Z offset the surface shader applies to a vertex at `(x, y)`.
pub fn surface_displacement(
    x: f32,
    y: f32,
    time: f32,
    amplitude: f32,
    frequency: f32,
    speed: f32,
) -> f32 {
    amplitude * fbm3([x * frequency, y * frequency, time * speed])
}

/// Relative radius perturbation at polar angle `theta`.
pub fn angular_noise(theta: f32, noise: &BoundaryNoise) -> f32 {
    noise.low_amplitude * (theta * noise.low_frequency + noise.phase).sin()
        + noise.high_amplitude * (theta * noise.high_frequency + 1.7 * noise.phase).sin()
}

/// Classic shader hash of a 2D point to `[0, 1)`.
pub fn hash21(x: f32, y: f32) -> f32 {
    let v = (x * 12.9898 + y * 78.233).sin() * 43_758.547;
    (v - v.floor()).min(1.0 - f32::EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_in_range() {
        for x in -20..20 {
            for y in -3..3 {
                let h = hash3(x, y, 7);
                assert_eq!(h, hash3(x, y, 7));
                assert!((0.0..1.0).contains(&h));
            }
        }
        assert_ne!(hash3(1, 2, 3), hash3(3, 2, 1));
    }

    #[test]
    fn value_noise_matches_lattice_hash() {
        assert_eq!(value_noise3([2.0, -3.0, 5.0]), hash3(2, -3, 5));
    }

    #[test]
    fn fbm_stays_in_unit_range() {
        for i in 0..200 {
            let t = i as f32 * 0.137;
            let v = fbm3([t, t * 0.5 - 3.0, t * 1.3]);
            assert!((-1.0..=1.0).contains(&v), "fbm out of range: {v}");
        }
    }

    #[test]
    fn zero_amplitude_means_flat_surface() {
        assert_eq!(surface_displacement(1.2, -0.4, 3.0, 0.0, 0.7, 0.2), 0.0);
    }

    #[test]
    fn angular_noise_vanishes_without_amplitude() {
        let noise = BoundaryNoise::none();
        assert_eq!(angular_noise(1.3, &noise), 0.0);
    }

    #[test]
    fn hash21_in_unit_range() {
        for i in 0..100 {
            let h = hash21(i as f32 * 0.31, -(i as f32) * 0.17);
            assert!((0.0..1.0).contains(&h));
        }
    }
}
