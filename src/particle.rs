//! Burst particles and the per-firework pool that steps them.

use crate::color::Tint;
use crate::math::{integrate, Vec3};
use std::collections::VecDeque;

/// Alpha at or below which a particle is dead.
pub const DEAD_ALPHA: f32 = 0.01;
/// Velocity multiplier applied every tick unless the regime overrides it.
pub const DEFAULT_FRICTION: f32 = 0.985;
/// A twinkling particle re-brightens when a uniform draw exceeds this.
pub const TWINKLE_THRESHOLD: f32 = 0.92;
pub const TWINKLE_BOOST: f32 = 0.25;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParticleFlags {
    pub twinkle: bool,
    pub sparkle: bool,
}

/// Bounded history of positions, oldest first.
#[derive(Clone, Debug, Default)]
pub struct Trail {
    points: VecDeque<Vec3>,
    capacity: usize,
}

impl Trail {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { points: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, point: Vec3) {
        if self.capacity == 0 {
            return;
        }
        while self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Vec3> + ExactSizeIterator {
        self.points.iter()
    }
}

/// Initial state produced by an emission pattern, before it is placed in
/// the world. Scale factors apply to the firework's base values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSpec {
    pub velocity: Vec3,
    pub tint: Tint,
    pub brightness: Option<f32>,
    pub gravity_scale: Option<f32>,
    pub fade_scale: Option<f32>,
    pub trail_capacity: Option<usize>,
}

impl ParticleSpec {
    pub fn new(velocity: Vec3, tint: Tint) -> Self {
        Self {
            velocity,
            tint,
            brightness: None,
            gravity_scale: None,
            fade_scale: None,
            trail_capacity: None,
        }
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = Some(scale);
        self
    }

    pub fn with_fade_scale(mut self, scale: f32) -> Self {
        self.fade_scale = Some(scale);
        self
    }

    pub fn with_trail(mut self, capacity: usize) -> Self {
        self.trail_capacity = Some(capacity);
        self
    }

    pub fn with_brightness(mut self, brightness: f32) -> Self {
        self.brightness = Some(brightness);
        self
    }
}

/// Per-burst values a [`ParticleSpec`]'s scale factors are relative to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleDefaults {
    pub size: f32,
    pub gravity: f32,
    pub fade_rate: f32,
    pub friction: f32,
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub tint: Tint,
    pub brightness: f32,
    pub alpha: f32,
    pub size: f32,
    pub gravity: f32,
    pub fade_rate: f32,
    pub friction: f32,
    pub flags: ParticleFlags,
    pub trail: Trail,
}

impl Particle {
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.alpha <= DEAD_ALPHA
    }

    /// Rolls the per-particle variance (size, trail length, flags) around
    /// the burst defaults, then applies its overrides.
    pub fn from_spec(
        origin: Vec3,
        spec: &ParticleSpec,
        defaults: &ParticleDefaults,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let size = defaults.size * (1.0 + rng.f32() * 1.5);
        let trail_capacity = spec.trail_capacity.unwrap_or_else(|| 6 + rng.usize(0..6));
        let flags = ParticleFlags {
            twinkle: rng.f32() > 0.75,
            sparkle: rng.f32() > 0.9,
        };

        Self {
            position: origin,
            velocity: spec.velocity,
            tint: spec.tint,
            brightness: spec.brightness.unwrap_or(1.0),
            alpha: 1.0,
            size,
            gravity: defaults.gravity * spec.gravity_scale.unwrap_or(1.0),
            fade_rate: defaults.fade_rate * spec.fade_scale.unwrap_or(1.0),
            friction: defaults.friction,
            flags,
            trail: Trail::with_capacity(trail_capacity),
        }
    }
}

/// Materialize one particle per [`ParticleSpec`] at `origin`, fully opaque.
pub fn spawn_burst(
    origin: Vec3,
    specs: &[ParticleSpec],
    defaults: &ParticleDefaults,
    rng: &mut fastrand::Rng,
) -> Vec<Particle> {
    specs
        .iter()
        .map(|spec| Particle::from_spec(origin, spec, defaults, rng))
        .collect()
}

/// Modifiers the owning firework applies on top of each particle's own
/// constants for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickRegime {
    pub gravity_scale: f32,
    pub friction: Option<f32>,
    pub fade_scale: f32,
}

impl TickRegime {
    pub const UNIFORM: TickRegime = TickRegime {
        gravity_scale: 1.0,
        friction: None,
        fade_scale: 1.0,
    };
}

impl Default for TickRegime {
    fn default() -> Self {
        Self::UNIFORM
    }
}

/// Dense storage; dead particles are swap-removed during the tick.
#[derive(Clone, Debug, Default)]
pub struct ParticlePool {
    particles: Vec<Particle>,
}

impl ParticlePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_burst(
        &mut self,
        origin: Vec3,
        specs: &[ParticleSpec],
        defaults: &ParticleDefaults,
        rng: &mut fastrand::Rng,
    ) -> usize {
        self.particles.reserve(specs.len());
        for spec in specs {
            self.particles.push(Particle::from_spec(origin, spec, defaults, rng));
        }
        specs.len()
    }

    pub fn tick(&mut self, regime: TickRegime, rng: &mut fastrand::Rng) {
        let mut i = 0;
        while i < self.particles.len() {
            let p = &mut self.particles[i];
            if p.is_dead() {
                self.particles.swap_remove(i);
                continue;
            }

            p.trail.push(p.position);

            let friction = regime.friction.unwrap_or(p.friction);
            (p.position, p.velocity) =
                integrate(p.position, p.velocity, p.gravity * regime.gravity_scale, friction);

            p.alpha = (p.alpha - p.fade_rate * regime.fade_scale).clamp(0.0, 1.0);

            if p.flags.twinkle && !p.is_dead() && rng.f32() > TWINKLE_THRESHOLD {
                p.alpha = (p.alpha + TWINKLE_BOOST).min(1.0);
            }

            if p.is_dead() {
                self.particles.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// True when no particle is above [`DEAD_ALPHA`]; an empty pool is dead.
    pub fn is_fully_dead(&self) -> bool {
        self.particles.iter().all(Particle::is_dead)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.particles.shrink_to_fit();
    }
}

impl<'a> IntoIterator for &'a ParticlePool {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(fade_rate: f32) -> ParticleDefaults {
        ParticleDefaults {
            size: 1.0,
            gravity: 0.01,
            fade_rate,
            friction: DEFAULT_FRICTION,
        }
    }

    fn steady(velocity: Vec3) -> ParticleSpec {
        ParticleSpec::new(velocity, Tint::Primary)
    }

    fn no_twinkle(pool: &mut ParticlePool) {
        for p in pool.particles.iter_mut() {
            p.flags.twinkle = false;
        }
    }

    #[test]
    fn test_spawn_burst_preserves_count_and_alpha() {
        let mut rng = fastrand::Rng::with_seed(3);
        let specs: Vec<_> = (0..37).map(|i| steady(Vec3::new(i as f32, 0.0, 0.0))).collect();
        let origin = Vec3::new(10.0, 20.0, 0.0);
        let particles = spawn_burst(origin, &specs, &defaults(0.01), &mut rng);
        assert_eq!(particles.len(), 37);
        for p in &particles {
            assert_eq!(p.alpha, 1.0);
            assert_eq!(p.position, origin);
        }
    }

    #[test]
    fn test_spec_overrides_scale_defaults() {
        let mut rng = fastrand::Rng::with_seed(3);
        let spec = steady(Vec3::ZERO)
            .with_gravity_scale(2.5)
            .with_fade_scale(0.5)
            .with_trail(20);
        let p = Particle::from_spec(Vec3::ZERO, &spec, &defaults(0.02), &mut rng);
        assert!((p.gravity - 0.025).abs() < 1e-6);
        assert!((p.fade_rate - 0.01).abs() < 1e-6);
        assert_eq!(p.trail.capacity(), 20);
        assert!(p.size >= 1.0 && p.size <= 2.5);
    }

    #[test]
    fn test_alpha_decays_linearly() {
        let mut rng = fastrand::Rng::with_seed(11);
        let fade = 0.013;
        let mut pool = ParticlePool::new();
        let specs: Vec<_> = (0..50).map(|_| steady(Vec3::new(0.5, 1.0, 0.0))).collect();
        pool.spawn_burst(Vec3::ZERO, &specs, &defaults(fade), &mut rng);
        no_twinkle(&mut pool);

        for k in 1..=60u32 {
            pool.tick(TickRegime::UNIFORM, &mut rng);
            let expected = (1.0 - k as f32 * fade).max(0.0);
            for p in pool.iter() {
                assert!((p.alpha - expected).abs() < 1e-4, "tick {k}: {} vs {expected}", p.alpha);
            }
        }
    }

    #[test]
    fn test_fully_dead_after_fade_completes() {
        let mut rng = fastrand::Rng::with_seed(5);
        let mut pool = ParticlePool::new();
        let specs: Vec<_> = (0..20).map(|_| steady(Vec3::Y)).collect();
        pool.spawn_burst(Vec3::ZERO, &specs, &defaults(0.1), &mut rng);
        no_twinkle(&mut pool);

        for _ in 0..50 {
            assert_eq!(pool.is_fully_dead(), pool.iter().all(|p| p.alpha <= DEAD_ALPHA));
            pool.tick(TickRegime::UNIFORM, &mut rng);
        }
        assert!(pool.is_fully_dead());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_twinkle_never_exceeds_one() {
        let mut rng = fastrand::Rng::with_seed(9);
        let mut pool = ParticlePool::new();
        let specs: Vec<_> = (0..200).map(|_| steady(Vec3::ZERO)).collect();
        pool.spawn_burst(Vec3::ZERO, &specs, &defaults(0.001), &mut rng);
        for p in pool.particles.iter_mut() {
            p.flags.twinkle = true;
        }
        for _ in 0..100 {
            pool.tick(TickRegime::UNIFORM, &mut rng);
            assert!(pool.iter().all(|p| (0.0..=1.0).contains(&p.alpha)));
        }
    }

    #[test]
    fn test_trail_is_bounded_and_ordered() {
        let mut rng = fastrand::Rng::with_seed(2);
        let mut pool = ParticlePool::new();
        pool.spawn_burst(
            Vec3::ZERO,
            &[steady(Vec3::new(1.0, 0.0, 0.0)).with_trail(4)],
            &ParticleDefaults { gravity: 0.0, friction: 1.0, ..defaults(0.0) },
            &mut rng,
        );
        for _ in 0..10 {
            pool.tick(TickRegime::UNIFORM, &mut rng);
        }
        let p = pool.iter().next().expect("particle survives with zero fade");
        assert_eq!(p.trail.len(), 4);
        let xs: Vec<f32> = p.trail.iter().map(|v| v.x).collect();
        assert_eq!(xs, vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(p.position.x, 10.0);
    }

    #[test]
    fn test_regime_overrides_friction_and_fade() {
        let mut rng = fastrand::Rng::with_seed(4);
        let mut pool = ParticlePool::new();
        pool.spawn_burst(Vec3::ZERO, &[steady(Vec3::new(1.0, 0.0, 0.0))], &defaults(0.1), &mut rng);
        no_twinkle(&mut pool);
        let hover = TickRegime { gravity_scale: 0.0, friction: Some(0.5), fade_scale: 0.0 };
        pool.tick(hover, &mut rng);
        let p = pool.iter().next().unwrap();
        assert_eq!(p.alpha, 1.0);
        assert_eq!(p.velocity, Vec3::new(0.5, 0.0, 0.0));
    }
}
