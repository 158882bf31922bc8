//! A single firework: a shell that rises, bursts once, and burns out.

use crate::color::ColorScheme;
use crate::config::{Config, Style, TICKS_PER_SECOND};
use crate::math::{smoothstep, Vec3};
use crate::particle::{Particle, ParticleDefaults, ParticlePool, TickRegime, Trail, DEFAULT_FRICTION};
use crate::pattern::{generate, BurstShape, Explosion, ExplosionKind};

/// Hard cap on exploding ticks so a burst that never fades still ends.
pub const MAX_EXPLODING_TICKS: u32 = 600;
pub const RISING_TRAIL_LEN: usize = 12;
/// Sideways wobble of the rising trail, in world units peak to peak.
pub const RISING_TRAIL_JITTER: f32 = 3.0;
/// Classic bursts spend this fraction of the configured particle budget.
pub const CLASSIC_COUNT_DIVISOR: f32 = 100.0;

pub const EXPANSION_FRICTION: f32 = 0.95494;
pub const EXPANSION_GRAVITY_SCALE: f32 = 0.0;
pub const FALLOUT_FRICTION: f32 = 0.98;
/// Ticks over which gravity ramps back in once the hover ends.
pub const FALLOUT_RAMP_TICKS: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FireworkId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Rising,
    Exploding,
    Done,
}

/// Two-stage burst: a high-drag hover with no gravity or fade, then a
/// low-drag fall with gravity eased back in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StagedPhysics {
    pub expansion_ticks: u32,
    pub expansion_friction: f32,
    pub expansion_gravity_scale: f32,
    pub fallout_friction: f32,
    pub ramp_ticks: u32,
}

impl StagedPhysics {
    pub fn from_hover(hover_secs: f32) -> Self {
        Self {
            expansion_ticks: (hover_secs.max(0.0) * TICKS_PER_SECOND).round() as u32,
            expansion_friction: EXPANSION_FRICTION,
            expansion_gravity_scale: EXPANSION_GRAVITY_SCALE,
            fallout_friction: FALLOUT_FRICTION,
            ramp_ticks: FALLOUT_RAMP_TICKS,
        }
    }

    pub fn regime_at(&self, age: u32) -> TickRegime {
        if age < self.expansion_ticks {
            TickRegime {
                gravity_scale: self.expansion_gravity_scale,
                friction: Some(self.expansion_friction),
                fade_scale: 0.0,
            }
        } else {
            let start = self.expansion_ticks as f32;
            TickRegime {
                gravity_scale: smoothstep(age as f32, start, start + self.ramp_ticks as f32),
                friction: Some(self.fallout_friction),
                fade_scale: 1.0,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhysicsRegime {
    Uniform,
    Staged(StagedPhysics),
}

impl PhysicsRegime {
    pub fn regime_at(&self, age: u32) -> TickRegime {
        match self {
            PhysicsRegime::Uniform => TickRegime::UNIFORM,
            PhysicsRegime::Staged(staged) => staged.regime_at(age),
        }
    }
}

/// Everything a firework takes from the configuration, frozen at
/// construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurstParams {
    pub particle_count: usize,
    pub particle_size: f32,
    pub fade_speed: f32,
    pub explosion_force: f32,
    pub gravity: f32,
    pub physics: PhysicsRegime,
}

impl BurstParams {
    pub fn snapshot(config: &Config, scale: f32, rng: &mut fastrand::Rng) -> Self {
        let mut vary = || 0.8 + rng.f32() * 0.4;
        let p = &config.particles;
        let ph = &config.physics;

        let (budget, physics) = match config.style {
            Style::Classic => (p.particle_count / CLASSIC_COUNT_DIVISOR, PhysicsRegime::Uniform),
            Style::Cinematic => (
                p.particle_count,
                PhysicsRegime::Staged(StagedPhysics::from_hover(ph.hover_duration)),
            ),
        };

        let count = (budget * scale * vary()).max(0.0);
        Self {
            particle_count: if count.is_finite() { count as usize } else { 0 },
            particle_size: p.particle_size * scale,
            fade_speed: p.fade_speed * vary(),
            explosion_force: ph.explosion_force * scale * vary(),
            gravity: ph.gravity * scale,
            physics,
        }
    }
}

/// Where and what to launch. Out-of-range values are clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireworkSpec {
    pub origin: Vec3,
    pub target_height: f32,
    pub depth: f32,
    pub kind: ExplosionKind,
}

/// Emitted once per firework, at the moment it bursts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExplosionEvent {
    pub id: FireworkId,
    pub position: Vec3,
    pub depth: f32,
    pub kind: ExplosionKind,
    pub particles: usize,
}

pub struct Firework {
    id: FireworkId,
    phase: Phase,
    head: Vec3,
    launch_y: f32,
    target_height: f32,
    ticks_to_apex: u32,
    depth: f32,
    scale: f32,
    rise_speed: f32,
    explosion: Explosion,
    scheme: ColorScheme,
    params: BurstParams,
    pool: ParticlePool,
    age_ticks: u32,
    rising_trail: Trail,
    rng: fastrand::Rng,
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

impl Firework {
    pub fn new(id: FireworkId, spec: &FireworkSpec, config: &Config, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);

        let depth = finite_or(spec.depth, 0.5).clamp(0.0, 1.0);
        let scale = 0.4 + depth;
        let rise_speed = 5.0 + depth * 5.0;

        let origin = if spec.origin.is_finite() { spec.origin } else { Vec3::ZERO };
        let target_height = finite_or(spec.target_height, origin.y);
        let climb = (target_height - origin.y).max(0.0);
        let ticks_to_apex = ((climb / rise_speed).ceil() as u32).max(1);

        let scheme = match config.style {
            Style::Classic => ColorScheme::classic(&mut rng),
            Style::Cinematic => ColorScheme::harmony(&mut rng),
        };
        let explosion = Explosion::roll(spec.kind, &mut rng);
        let params = BurstParams::snapshot(config, scale, &mut rng);

        Self {
            id,
            phase: Phase::Rising,
            head: origin,
            launch_y: origin.y,
            target_height,
            ticks_to_apex,
            depth,
            scale,
            rise_speed,
            explosion,
            scheme,
            params,
            pool: ParticlePool::new(),
            age_ticks: 0,
            rising_trail: Trail::with_capacity(RISING_TRAIL_LEN),
            rng,
        }
    }

    /// Skip the climb: burst right away at `position`.
    pub fn exploding_at(
        id: FireworkId,
        position: Vec3,
        depth: f32,
        kind: ExplosionKind,
        config: &Config,
        seed: u64,
    ) -> (Self, ExplosionEvent) {
        let spec = FireworkSpec { origin: position, target_height: position.y, depth, kind };
        let mut firework = Self::new(id, &spec, config, seed);
        let event = firework.explode();
        (firework, event)
    }

    /// Advance one tick. Returns the burst event on the tick the shell
    /// reaches its apex.
    pub fn tick(&mut self) -> Option<ExplosionEvent> {
        match self.phase {
            Phase::Rising => {
                self.age_ticks += 1;
                self.head.y = self.launch_y + self.age_ticks as f32 * self.rise_speed;
                let wobble = (self.rng.f32() - 0.5) * RISING_TRAIL_JITTER;
                self.rising_trail.push(Vec3::new(self.head.x + wobble, self.head.y, self.head.z));

                if self.age_ticks >= self.ticks_to_apex {
                    self.head.y = self.head.y.max(self.target_height);
                    return Some(self.explode());
                }
                None
            }
            Phase::Exploding => {
                let regime = self.params.physics.regime_at(self.age_ticks);
                self.pool.tick(regime, &mut self.rng);
                self.age_ticks += 1;

                if self.pool.is_fully_dead() {
                    self.finish();
                } else if self.age_ticks >= MAX_EXPLODING_TICKS {
                    log::debug!(
                        "firework {:?} hit the {} tick ceiling with {} particles left",
                        self.id,
                        MAX_EXPLODING_TICKS,
                        self.pool.len()
                    );
                    self.finish();
                }
                None
            }
            Phase::Done => None,
        }
    }

    fn explode(&mut self) -> ExplosionEvent {
        self.phase = Phase::Exploding;
        self.rising_trail.clear();
        self.age_ticks = 0;

        let shape = BurstShape {
            count: self.params.particle_count,
            force: self.params.explosion_force,
            scheme: &self.scheme,
        };
        let specs = generate(&self.explosion, &shape, &mut self.rng);
        let defaults = ParticleDefaults {
            size: self.params.particle_size,
            gravity: self.params.gravity,
            fade_rate: self.params.fade_speed,
            friction: DEFAULT_FRICTION,
        };
        let spawned = self.pool.spawn_burst(self.head, &specs, &defaults, &mut self.rng);

        log::debug!(
            "firework {:?} burst as {} with {} particles at ({:.1}, {:.1})",
            self.id,
            self.explosion.kind(),
            spawned,
            self.head.x,
            self.head.y
        );

        ExplosionEvent {
            id: self.id,
            position: self.head,
            depth: self.depth,
            kind: self.explosion.kind(),
            particles: spawned,
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Done;
        self.pool.clear();
        self.rising_trail.clear();
    }

    pub fn id(&self) -> FireworkId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn head(&self) -> Vec3 {
        self.head
    }

    pub fn target_height(&self) -> f32 {
        self.target_height
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rise_speed(&self) -> f32 {
        self.rise_speed
    }

    pub fn explosion(&self) -> &Explosion {
        &self.explosion
    }

    pub fn scheme(&self) -> &ColorScheme {
        &self.scheme
    }

    pub fn params(&self) -> &BurstParams {
        &self.params
    }

    pub fn age_ticks(&self) -> u32 {
        self.age_ticks
    }

    pub fn rising_trail(&self) -> &Trail {
        &self.rising_trail
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.pool.iter()
    }

    pub fn particle_count(&self) -> usize {
        self.pool.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: ExplosionKind) -> FireworkSpec {
        FireworkSpec {
            origin: Vec3::new(100.0, -50.0, 0.0),
            target_height: 400.0,
            depth: 0.5,
            kind,
        }
    }

    fn rise(firework: &mut Firework) -> (u32, ExplosionEvent) {
        let mut ticks = 0;
        loop {
            ticks += 1;
            if let Some(event) = firework.tick() {
                return (ticks, event);
            }
            assert!(ticks < 10_000, "never exploded");
        }
    }

    #[test]
    fn test_depth_derives_scale_and_speed() {
        let fw = Firework::new(FireworkId(1), &spec(ExplosionKind::Sphere), &Config::default(), 1);
        assert!((fw.scale() - 0.9).abs() < 1e-6);
        assert!((fw.rise_speed() - 7.5).abs() < 1e-6);
        assert_eq!(fw.phase(), Phase::Rising);
        assert_eq!(fw.particle_count(), 0);
    }

    #[test]
    fn test_explodes_within_bound_exactly_once() {
        let config = Config::default();
        let mut fw = Firework::new(FireworkId(1), &spec(ExplosionKind::Ring), &config, 9);
        let bound = ((400.0f32 + 50.0) / fw.rise_speed()).ceil() as u32;
        let (ticks, event) = rise(&mut fw);
        assert!(ticks <= bound, "{ticks} > {bound}");
        assert!(fw.head().y >= 400.0);
        assert_eq!(event.kind, ExplosionKind::Ring);
        assert_eq!(fw.phase(), Phase::Exploding);
        assert!(fw.rising_trail().is_empty());

        for _ in 0..MAX_EXPLODING_TICKS + 5 {
            assert!(fw.tick().is_none());
        }
    }

    #[test]
    fn test_rising_trail_is_bounded() {
        let mut s = spec(ExplosionKind::Sphere);
        s.target_height = 5000.0;
        let mut fw = Firework::new(FireworkId(1), &s, &Config::default(), 2);
        for _ in 0..40 {
            fw.tick();
        }
        assert_eq!(fw.rising_trail().len(), RISING_TRAIL_LEN);
        let latest = fw.rising_trail().iter().next_back().unwrap();
        assert_eq!(latest.y, fw.head().y);
    }

    #[test]
    fn test_burst_spawns_at_head_with_snapshot_count() {
        let config = Config::default();
        let mut fw = Firework::new(FireworkId(3), &spec(ExplosionKind::Heart), &config, 4);
        let (_, event) = rise(&mut fw);
        assert_eq!(event.particles, fw.params().particle_count);
        assert_eq!(fw.particle_count(), fw.params().particle_count);
        for p in fw.particles() {
            assert_eq!(p.position, event.position);
            assert_eq!(p.alpha, 1.0);
        }
    }

    #[test]
    fn test_ceiling_forces_done_exactly() {
        let mut config = Config::default();
        config.particles.fade_speed = 0.0;
        let (mut fw, _) = Firework::exploding_at(
            FireworkId(7),
            Vec3::new(0.0, 300.0, 0.0),
            0.8,
            ExplosionKind::Sphere,
            &config,
            5,
        );
        assert!(fw.particle_count() > 0);
        for tick in 1..MAX_EXPLODING_TICKS {
            fw.tick();
            assert_eq!(fw.phase(), Phase::Exploding, "done early at {tick}");
        }
        fw.tick();
        assert_eq!(fw.phase(), Phase::Done);
        assert_eq!(fw.particle_count(), 0);
    }

    #[test]
    fn test_empty_burst_finishes_immediately() {
        let mut config = Config::default();
        config.particles.particle_count = 0.0;
        let (mut fw, event) =
            Firework::exploding_at(FireworkId(2), Vec3::ZERO, 0.5, ExplosionKind::Star, &config, 1);
        assert_eq!(event.particles, 0);
        fw.tick();
        assert!(fw.is_done());
    }

    #[test]
    fn test_config_edits_do_not_reach_live_fireworks() {
        let mut config = Config::default();
        let fw = Firework::new(FireworkId(1), &spec(ExplosionKind::Sphere), &config, 3);
        let before = *fw.params();
        config.physics.gravity = 10.0;
        config.particles.fade_speed = 1.0;
        assert_eq!(*fw.params(), before);
    }

    #[test]
    fn test_same_seed_same_firework() {
        let config = Config::default();
        let mut a = Firework::new(FireworkId(1), &spec(ExplosionKind::Chrysanthemum), &config, 77);
        let mut b = Firework::new(FireworkId(1), &spec(ExplosionKind::Chrysanthemum), &config, 77);
        for _ in 0..120 {
            a.tick();
            b.tick();
        }
        let pa: Vec<_> = a.particles().map(|p| (p.position, p.alpha)).collect();
        let pb: Vec<_> = b.particles().map(|p| (p.position, p.alpha)).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_staged_physics_hovers_then_falls() {
        let staged = StagedPhysics::from_hover(1.5);
        assert_eq!(staged.expansion_ticks, 90);
        let hover = staged.regime_at(10);
        assert_eq!(hover.fade_scale, 0.0);
        assert_eq!(hover.gravity_scale, EXPANSION_GRAVITY_SCALE);
        assert_eq!(hover.friction, Some(EXPANSION_FRICTION));

        let early_fall = staged.regime_at(90);
        assert_eq!(early_fall.gravity_scale, 0.0);
        assert_eq!(early_fall.friction, Some(FALLOUT_FRICTION));
        let late_fall = staged.regime_at(90 + FALLOUT_RAMP_TICKS);
        assert_eq!(late_fall.gravity_scale, 1.0);
        assert_eq!(late_fall.fade_scale, 1.0);
    }

    #[test]
    fn test_cinematic_burst_holds_alpha_while_hovering() {
        let mut config = Config::default();
        config.style = Style::Cinematic;
        config.particles.particle_count = 2000.0;
        let (mut fw, event) = Firework::exploding_at(
            FireworkId(1),
            Vec3::ZERO,
            0.5,
            ExplosionKind::FibonacciSphere,
            &config,
            11,
        );
        assert!(event.particles > 1000);
        assert!(fw.particles().all(|p| p.alpha == 1.0));
        for _ in 0..30 {
            fw.tick();
        }
        // Only twinkle can touch alpha during the hover, and it caps at 1.
        assert!(fw.particles().all(|p| p.alpha == 1.0));
    }
}
