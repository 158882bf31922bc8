//! Emission patterns: pure functions from an explosion shape plus burst
//! parameters to the initial particle specs.
//!
//! All velocities are in the Y-up world frame. Most shapes subtract a small
//! bias from the vertical component so bursts sag as they open; the palm is
//! the exception and launches mostly upward.

use crate::color::{ColorScheme, Tint};
use crate::math::{spherical_direction, Vec3};
use crate::particle::ParticleSpec;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Golden ratio, used as the azimuth increment of the fibonacci sphere.
pub const PHI: f32 = 1.618_034;
pub const WILLOW_GRAVITY_SCALE: f32 = 2.5;
pub const WILLOW_TRAIL: usize = 20;
pub const PALM_GRAVITY_SCALE: f32 = 1.8;
pub const DEFAULT_FIBONACCI_JITTER: f32 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExplosionKind {
    Sphere,
    Ring,
    Double,
    Willow,
    Chrysanthemum,
    Palm,
    Heart,
    Star,
    FibonacciSphere,
}

impl ExplosionKind {
    pub const CLASSIC: [ExplosionKind; 8] = [
        ExplosionKind::Sphere,
        ExplosionKind::Ring,
        ExplosionKind::Double,
        ExplosionKind::Willow,
        ExplosionKind::Chrysanthemum,
        ExplosionKind::Palm,
        ExplosionKind::Heart,
        ExplosionKind::Star,
    ];

    pub fn random_classic(rng: &mut fastrand::Rng) -> Self {
        Self::CLASSIC[rng.usize(0..Self::CLASSIC.len())]
    }

    pub fn name(self) -> &'static str {
        match self {
            ExplosionKind::Sphere => "sphere",
            ExplosionKind::Ring => "ring",
            ExplosionKind::Double => "double",
            ExplosionKind::Willow => "willow",
            ExplosionKind::Chrysanthemum => "chrysanthemum",
            ExplosionKind::Palm => "palm",
            ExplosionKind::Heart => "heart",
            ExplosionKind::Star => "star",
            ExplosionKind::FibonacciSphere => "fibonacci-sphere",
        }
    }
}

impl fmt::Display for ExplosionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExplosionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CLASSIC
            .iter()
            .chain(std::iter::once(&ExplosionKind::FibonacciSphere))
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown explosion kind: {s}"))
    }
}

/// An explosion shape with its drawn parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Explosion {
    Sphere,
    Ring { rings: u32 },
    Double,
    Willow,
    Chrysanthemum { spokes: u32 },
    Palm { branches: u32 },
    Heart,
    Star { points: u32 },
    FibonacciSphere { jitter: f32 },
}

impl Explosion {
    /// Draw the per-shape parameters for `kind`.
    pub fn roll(kind: ExplosionKind, rng: &mut fastrand::Rng) -> Self {
        match kind {
            ExplosionKind::Sphere => Explosion::Sphere,
            ExplosionKind::Ring => Explosion::Ring { rings: rng.u32(2..=3) },
            ExplosionKind::Double => Explosion::Double,
            ExplosionKind::Willow => Explosion::Willow,
            ExplosionKind::Chrysanthemum => Explosion::Chrysanthemum { spokes: rng.u32(12..20) },
            ExplosionKind::Palm => Explosion::Palm { branches: rng.u32(6..10) },
            ExplosionKind::Heart => Explosion::Heart,
            ExplosionKind::Star => Explosion::Star { points: 5 },
            ExplosionKind::FibonacciSphere => Explosion::FibonacciSphere {
                jitter: DEFAULT_FIBONACCI_JITTER,
            },
        }
    }

    pub fn kind(&self) -> ExplosionKind {
        match self {
            Explosion::Sphere => ExplosionKind::Sphere,
            Explosion::Ring { .. } => ExplosionKind::Ring,
            Explosion::Double => ExplosionKind::Double,
            Explosion::Willow => ExplosionKind::Willow,
            Explosion::Chrysanthemum { .. } => ExplosionKind::Chrysanthemum,
            Explosion::Palm { .. } => ExplosionKind::Palm,
            Explosion::Heart => ExplosionKind::Heart,
            Explosion::Star { .. } => ExplosionKind::Star,
            Explosion::FibonacciSphere { .. } => ExplosionKind::FibonacciSphere,
        }
    }
}

/// Burst-wide inputs to a pattern.
#[derive(Clone, Copy, Debug)]
pub struct BurstShape<'a> {
    pub count: usize,
    pub force: f32,
    pub scheme: &'a ColorScheme,
}

#[inline]
fn signed_unit(rng: &mut fastrand::Rng) -> f32 {
    rng.f32() - 0.5
}

#[inline]
fn range(rng: &mut fastrand::Rng, lo: f32, hi: f32) -> f32 {
    lo + rng.f32() * (hi - lo)
}

pub fn generate(explosion: &Explosion, shape: &BurstShape, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    match *explosion {
        Explosion::Sphere => sphere(shape, rng),
        Explosion::Ring { rings } => ring(shape, rings, rng),
        Explosion::Double => double(shape, rng),
        Explosion::Willow => willow(shape, rng),
        Explosion::Chrysanthemum { spokes } => chrysanthemum(shape, spokes, rng),
        Explosion::Palm { branches } => palm(shape, branches, rng),
        Explosion::Heart => heart(shape, rng),
        Explosion::Star { points } => star(shape, points, rng),
        Explosion::FibonacciSphere { jitter } => fibonacci_sphere(shape, jitter, rng),
    }
}

/// Unit direction uniform over the sphere. Inclination comes from
/// `acos(2u - 1)`; drawing it uniformly would bunch points at the poles.
pub fn shell_direction(rng: &mut fastrand::Rng) -> Vec3 {
    let azimuth = rng.f32() * TAU;
    let inclination = (2.0 * rng.f32() - 1.0).clamp(-1.0, 1.0).acos();
    spherical_direction(azimuth, inclination)
}

fn sphere(shape: &BurstShape, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    (0..shape.count)
        .map(|_| {
            let dir = shell_direction(rng);
            let speed = shape.force * range(rng, 0.5, 1.0);
            let velocity = Vec3::new(dir.x * speed, dir.y * speed - speed * 0.3, dir.z * speed * 0.3);
            ParticleSpec::new(velocity, shape.scheme.random_slot(rng))
        })
        .collect()
}

fn ring(shape: &BurstShape, rings: u32, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    let rings = rings.max(1);
    let per_ring = shape.count / rings as usize;
    let mut specs = Vec::with_capacity(per_ring * rings as usize);

    for r in 0..rings {
        let force = shape.force * (0.7 + r as f32 * 0.25);
        let tint = if r == 0 { Tint::Primary } else { Tint::Secondary };
        for i in 0..per_ring {
            let angle = (i as f32 / per_ring as f32) * TAU + rng.f32() * 0.1;
            let velocity = Vec3::new(
                force * angle.cos(),
                force * angle.sin() * 0.5 - force * 0.2,
                force * 0.15 * signed_unit(rng),
            );
            specs.push(ParticleSpec::new(velocity, tint));
        }
    }
    specs
}

fn double(shape: &BurstShape, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    let inner = (shape.count as f32 * 0.4).round() as usize;
    let outer = shape.count - inner;
    let mut specs = Vec::with_capacity(shape.count);

    let force = shape.force * 0.5;
    for _ in 0..inner {
        let angle = rng.f32() * TAU;
        let velocity = Vec3::new(
            force * angle.cos() * range(rng, 0.8, 1.2),
            force * angle.sin() * range(rng, 0.8, 1.2) - force * 0.3,
            force * signed_unit(rng) * 0.4,
        );
        specs.push(ParticleSpec::new(velocity, Tint::Accent).with_fade_scale(1.5));
    }

    for _ in 0..outer {
        let angle = rng.f32() * TAU;
        let force = shape.force * range(rng, 0.9, 1.2);
        let velocity = Vec3::new(
            force * angle.cos(),
            force * angle.sin() - force * 0.3,
            force * signed_unit(rng) * 0.4,
        );
        specs.push(ParticleSpec::new(velocity, shape.scheme.random_slot(rng)));
    }
    specs
}

fn willow(shape: &BurstShape, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    (0..shape.count)
        .map(|_| {
            let angle = rng.f32() * TAU;
            let force = shape.force * range(rng, 0.6, 1.1);
            let velocity = Vec3::new(
                force * angle.cos() * 0.7,
                force * angle.sin() * 0.4 - force * 0.15,
                force * signed_unit(rng) * 0.25,
            );
            ParticleSpec::new(velocity, shape.scheme.random_slot(rng))
                .with_gravity_scale(WILLOW_GRAVITY_SCALE)
                .with_fade_scale(0.5)
                .with_trail(WILLOW_TRAIL)
        })
        .collect()
}

fn chrysanthemum(shape: &BurstShape, spokes: u32, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    let spokes = spokes.max(1);
    let per_spoke = shape.count / spokes as usize;
    let mut specs = Vec::with_capacity(per_spoke * spokes as usize);

    for s in 0..spokes {
        let base = (s as f32 / spokes as f32) * TAU;
        for i in 0..per_spoke {
            let progress = i as f32 / per_spoke as f32;
            let force = shape.force * (0.2 + progress * 0.9);
            let angle = base + signed_unit(rng) * 0.08;
            let velocity = Vec3::new(
                force * angle.cos(),
                force * angle.sin() * 0.6 - force * 0.15,
                force * signed_unit(rng) * 0.2,
            );
            let tint = if progress < 0.5 { Tint::Primary } else { Tint::Secondary };
            specs.push(ParticleSpec::new(velocity, tint).with_fade_scale(0.7 + progress * 0.5));
        }
    }
    specs
}

fn palm(shape: &BurstShape, branches: u32, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    let branches = branches.max(1);
    let per_branch = shape.count / branches as usize;
    let mut specs = Vec::with_capacity(per_branch * branches as usize);

    for b in 0..branches {
        let base = (b as f32 / branches as f32) * TAU;
        for i in 0..per_branch {
            let progress = i as f32 / per_branch as f32;
            let force = shape.force * (0.3 + progress * 0.8);
            let angle = base + signed_unit(rng) * progress * 0.4;
            let velocity = Vec3::new(
                force * angle.cos(),
                force * 0.7 - progress * force * 0.4,
                force * signed_unit(rng) * 0.3,
            );
            let tint = if progress < 0.4 { Tint::Secondary } else { Tint::Primary };
            specs.push(ParticleSpec::new(velocity, tint).with_gravity_scale(PALM_GRAVITY_SCALE));
        }
    }
    specs
}

/// Point on the classic heart curve for `t` in [0, 2π), lobes toward +Y.
pub fn heart_curve(t: f32) -> (f32, f32) {
    let x = 16.0 * t.sin().powi(3);
    let y = 13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos();
    (x, y)
}

/// Multiplier from the heart curve's units to velocity.
pub fn heart_scale(force: f32) -> f32 {
    force * 0.15
}

fn heart(shape: &BurstShape, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    let scale = heart_scale(shape.force);
    (0..shape.count)
        .map(|i| {
            let t = (i as f32 / shape.count as f32) * TAU;
            let (hx, hy) = heart_curve(t);
            let velocity = Vec3::new(
                hx * scale * range(rng, 0.9, 1.1),
                hy * scale * range(rng, 0.9, 1.1),
                signed_unit(rng) * shape.force * 0.2,
            );
            ParticleSpec::new(velocity, Tint::Primary).with_fade_scale(0.7)
        })
        .collect()
}

fn star(shape: &BurstShape, points: u32, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    let points = points.max(1) as f32;
    (0..shape.count)
        .map(|i| {
            let angle = (i as f32 / shape.count as f32) * TAU;
            let even = i % 2 == 0;
            let r = if even { shape.force } else { shape.force * 0.5 };
            let velocity = Vec3::new(
                r * (angle * points).cos() * range(rng, 0.9, 1.1),
                r * (angle * points).sin() * range(rng, 0.9, 1.1) - r * 0.2,
                signed_unit(rng) * shape.force * 0.3,
            );
            let tint = if even { Tint::Primary } else { Tint::Accent };
            ParticleSpec::new(velocity, tint)
        })
        .collect()
}

/// Azimuth and inclination of point `i` of `n` on the golden-angle spiral:
/// `θ = i·2π·φ`, `inclination = acos(1 - 2t)` with `t = i/n`. Point 0 sits
/// on the +Z pole.
pub fn fibonacci_angles(i: usize, n: usize) -> (f32, f32) {
    let t = i as f32 / n.max(1) as f32;
    let azimuth = i as f32 * TAU * PHI;
    let inclination = (1.0 - 2.0 * t).clamp(-1.0, 1.0).acos();
    (azimuth, inclination)
}

/// Golden-angle spiral over the sphere: near-uniform without the clumping of
/// independent random draws, plus a small perturbation so it doesn't look
/// latticed.
fn fibonacci_sphere(shape: &BurstShape, jitter: f32, rng: &mut fastrand::Rng) -> Vec<ParticleSpec> {
    let base_speed = shape.force * range(rng, 0.8, 1.2);
    (0..shape.count)
        .map(|i| {
            let (azimuth, inclination) = fibonacci_angles(i, shape.count);
            let dir = spherical_direction(azimuth, inclination);
            let perturb = Vec3::new(signed_unit(rng), signed_unit(rng), signed_unit(rng)) * (2.0 * jitter);
            let dir = (dir + perturb).normalize_or_zero();
            let speed = base_speed * range(rng, 0.8, 1.2);
            let color = shape.scheme.resolve(shape.scheme.random_slot(rng));
            ParticleSpec::new(dir * speed, Tint::Rgb(color)).with_brightness(range(rng, 0.5, 1.3))
        })
        .collect()
}
