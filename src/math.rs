//! The single-step physics integrator and a few scalar helpers.
//!
//! World space is Y-up: gravity is subtracted from the vertical velocity.
//! Renderers that draw top-down flip the axis themselves.

pub use glam::Vec3;

/// Unit vector from an azimuth around the Z axis and an inclination
/// measured from +Z, matching the layout the emission patterns use.
#[inline]
pub fn spherical_direction(azimuth: f32, inclination: f32) -> Vec3 {
    let s = inclination.sin();
    Vec3::new(s * azimuth.cos(), s * azimuth.sin(), inclination.cos())
}

/// One integration step: gravity, then uniform damping, then position.
///
/// Pure and deterministic; callers write the returned pair back into their
/// own state.
#[inline]
pub fn integrate(position: Vec3, velocity: Vec3, gravity: f32, friction: f32) -> (Vec3, Vec3) {
    let mut velocity = velocity;
    velocity.y -= gravity;
    velocity *= friction;
    (position + velocity, velocity)
}

/// Hermite ramp from 0 at `edge0` to 1 at `edge1`.
pub fn smoothstep(x: f32, edge0: f32, edge1: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
