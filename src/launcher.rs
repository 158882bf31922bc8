//! The show: owns every live firework, decides when to launch more, and
//! steps everything once per tick.

use crate::config::{Cadence, Config, Mode, Style};
use crate::error::{ConfigError, ListenerError};
use crate::firework::{ExplosionEvent, Firework, FireworkId, FireworkSpec};
use crate::math::Vec3;
use crate::pattern::ExplosionKind;

/// Shells start this far below the bottom of the stage.
pub const LAUNCH_BELOW: f32 = 50.0;

/// World-space rectangle launches are randomized within. `y = 0` is the
/// ground, `y = height` the top.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stage {
    pub width: f32,
    pub height: f32,
}

impl Stage {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width: width.max(1.0), height: height.max(1.0) }
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(self.width / 2.0, self.height / 2.0, 0.0)
    }
}

/// Optional launch parameters; anything left `None` (or non-finite) is
/// randomized.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LaunchOverrides {
    pub x: Option<f32>,
    pub z: Option<f32>,
    pub origin_y: Option<f32>,
    pub target_height: Option<f32>,
    pub depth: Option<f32>,
    pub kind: Option<ExplosionKind>,
}

/// Notified whenever a firework bursts. Calls are fire-and-forget: an error
/// is logged and the simulation continues.
pub trait ExplosionListener {
    fn on_explosion(&mut self, event: &ExplosionEvent) -> Result<(), ListenerError>;
}

impl<F> ExplosionListener for F
where
    F: FnMut(&ExplosionEvent) -> Result<(), ListenerError>,
{
    fn on_explosion(&mut self, event: &ExplosionEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingLaunch {
    due_tick: u64,
    overrides: LaunchOverrides,
}

pub struct Launcher {
    config: Config,
    stage: Stage,
    mode: Mode,
    auto_launch: bool,
    fireworks: Vec<Firework>,
    pending: Vec<PendingLaunch>,
    schedule: Vec<(u64, Mode)>,
    listeners: Vec<Box<dyn ExplosionListener>>,
    rng: fastrand::Rng,
    ticks: u64,
    last_launch: u64,
    next_id: u64,
}

fn finite(value: Option<f32>) -> Option<f32> {
    value.filter(|v| v.is_finite())
}

impl Launcher {
    pub fn new(config: Config, stage: Stage) -> Self {
        Self::with_rng(config, stage, fastrand::Rng::new())
    }

    /// Fully reproducible show: every firework seed derives from `seed`.
    pub fn with_seed(config: Config, stage: Stage, seed: u64) -> Self {
        Self::with_rng(config, stage, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(config: Config, stage: Stage, rng: fastrand::Rng) -> Self {
        let config = config.sanitized();
        let mode = config.current_mode();
        let mut launcher = Self {
            stage,
            mode,
            auto_launch: true,
            fireworks: Vec::new(),
            pending: Vec::new(),
            schedule: Vec::new(),
            listeners: Vec::new(),
            rng,
            ticks: 0,
            last_launch: 0,
            next_id: 0,
            config,
        };
        for (at_tick, mode) in launcher.config.resolved_schedule() {
            launcher.schedule_mode(at_tick, mode);
        }
        launcher
    }

    pub fn add_listener(&mut self, listener: Box<dyn ExplosionListener>) {
        self.listeners.push(listener);
    }

    /// Advance the whole show by one step.
    pub fn tick(&mut self) {
        self.ticks += 1;
        self.apply_schedule();

        let mut events = Vec::new();
        for firework in &mut self.fireworks {
            if let Some(event) = firework.tick() {
                events.push(event);
            }
        }
        for event in &events {
            self.notify(event);
        }

        let mut i = 0;
        while i < self.fireworks.len() {
            if self.fireworks[i].is_done() {
                let done = self.fireworks.swap_remove(i);
                log::debug!("evicting firework {:?}", done.id());
            } else {
                i += 1;
            }
        }

        if self.auto_launch {
            self.auto_launch_step();
        }
        self.flush_pending();

        log::trace!(
            "tick {}: {} fireworks, {} particles, {} pending",
            self.ticks,
            self.fireworks.len(),
            self.particle_count(),
            self.pending.len()
        );
    }

    fn auto_launch_step(&mut self) {
        let mode = self.mode;
        if self.ticks.saturating_sub(self.last_launch) < mode.interval {
            return;
        }
        let clear = match mode.cadence {
            Cadence::FixedInterval => true,
            Cadence::WaitForSilence => self.fireworks.is_empty() && self.pending.is_empty(),
        };
        if clear {
            self.last_launch = self.ticks;
            self.schedule_burst(mode.burst_count, mode.burst_delay, 0);
        }
    }

    fn apply_schedule(&mut self) {
        while let Some(&(at_tick, mode)) = self.schedule.first() {
            if at_tick > self.ticks {
                break;
            }
            self.schedule.remove(0);
            self.set_mode(mode);
        }
    }

    fn flush_pending(&mut self) {
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due_tick <= self.ticks {
                let launch = self.pending.swap_remove(i);
                self.spawn(launch.overrides);
            } else {
                i += 1;
            }
        }
    }

    fn schedule_burst(&mut self, count: u32, stagger: u64, jitter: u64) {
        for i in 0..count as u64 {
            let wobble = if jitter > 0 { self.rng.u64(0..=jitter) } else { 0 };
            self.pending.push(PendingLaunch {
                due_tick: self.ticks.saturating_add(i.saturating_mul(stagger)).saturating_add(wobble),
                overrides: LaunchOverrides::default(),
            });
        }
    }

    fn notify(&mut self, event: &ExplosionEvent) {
        for listener in &mut self.listeners {
            if let Err(e) = listener.on_explosion(event) {
                log::warn!("explosion listener failed for {:?}: {}", event.id, e);
            }
        }
    }

    fn default_kind(&mut self) -> ExplosionKind {
        match self.config.style {
            Style::Classic => ExplosionKind::random_classic(&mut self.rng),
            Style::Cinematic => ExplosionKind::FibonacciSphere,
        }
    }

    fn allocate_id(&mut self) -> FireworkId {
        self.next_id += 1;
        FireworkId(self.next_id)
    }

    fn spawn(&mut self, overrides: LaunchOverrides) -> FireworkId {
        let stage = self.stage;
        let x = finite(overrides.x).unwrap_or_else(|| self.rng.f32() * stage.width);
        let z = finite(overrides.z).unwrap_or(0.0);
        let origin_y = finite(overrides.origin_y).unwrap_or(-LAUNCH_BELOW);
        let target_height = finite(overrides.target_height)
            .unwrap_or_else(|| stage.height * (1.0 - (0.12 + self.rng.f32() * 0.35)));
        let depth = finite(overrides.depth).unwrap_or_else(|| self.rng.f32());
        let kind = match overrides.kind {
            Some(kind) => kind,
            None => self.default_kind(),
        };

        let id = self.allocate_id();
        let spec = FireworkSpec {
            origin: Vec3::new(x, origin_y, z),
            target_height,
            depth,
            kind,
        };
        let seed = self.rng.u64(..);
        let firework = Firework::new(id, &spec, &self.config, seed);
        log::debug!(
            "launched {:?}: {} from x={:.1} to y={:.1}, depth {:.2}",
            id,
            kind,
            x,
            target_height,
            firework.depth()
        );
        self.fireworks.push(firework);
        id
    }

    /// Launch one firework right now.
    pub fn launch_one(&mut self, overrides: LaunchOverrides) -> FireworkId {
        self.spawn(overrides)
    }

    /// Queue `count` launches spaced `stagger` ticks apart, each delayed by a
    /// further random `0..=stagger` ticks. They go up on later ticks.
    pub fn launch_burst(&mut self, count: u32, stagger: u64) {
        self.schedule_burst(count, stagger, stagger);
    }

    /// Burst at `position` without a climb. Non-finite coordinates fall back
    /// to the stage centre.
    pub fn explode_immediately_at(&mut self, position: Vec3) -> FireworkId {
        let center = self.stage.center();
        let pick = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };
        let position = Vec3::new(
            pick(position.x, center.x),
            pick(position.y, center.y),
            pick(position.z, center.z),
        );

        let depth = 0.7 + self.rng.f32() * 0.3;
        let kind = self.default_kind();
        let id = self.allocate_id();
        let seed = self.rng.u64(..);
        let (firework, event) = Firework::exploding_at(id, position, depth, kind, &self.config, seed);
        self.fireworks.push(firework);
        self.notify(&event);
        id
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            log::info!(
                "mode -> every {} ticks, {} x{} ({:?})",
                mode.interval,
                mode.burst_count,
                mode.burst_delay,
                mode.cadence
            );
        }
        self.mode = mode;
    }

    /// Switch to a mode from the configured table by name.
    pub fn select_mode(&mut self, name: &str) -> Result<(), ConfigError> {
        let mode = self.config.mode_named(name)?;
        self.config.mode = name.to_string();
        self.set_mode(mode);
        Ok(())
    }

    /// Step to the next configured mode, wrapping around. Returns its name.
    pub fn cycle_mode(&mut self) -> Option<String> {
        let names: Vec<String> = self.config.mode_names().map(str::to_string).collect();
        if names.is_empty() {
            return None;
        }
        let next = names
            .iter()
            .position(|n| *n == self.config.mode)
            .map(|i| (i + 1) % names.len())
            .unwrap_or(0);
        let name = names[next].clone();
        self.select_mode(&name).ok()?;
        Some(name)
    }

    /// Switch to `mode` once the tick counter reaches `at_tick`.
    pub fn schedule_mode(&mut self, at_tick: u64, mode: Mode) {
        let idx = self.schedule.partition_point(|(t, _)| *t <= at_tick);
        self.schedule.insert(idx, (at_tick, mode));
    }

    pub fn set_auto_launch(&mut self, enabled: bool) {
        self.auto_launch = enabled;
    }

    /// Replace the configuration. Fireworks already in the air keep the
    /// values they were built with.
    pub fn set_config(&mut self, config: Config) {
        self.config = config.sanitized();
        self.set_mode(self.config.current_mode());
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Drop every firework and queued launch.
    pub fn clear(&mut self) {
        self.fireworks.clear();
        self.pending.clear();
    }

    pub fn fireworks(&self) -> &[Firework] {
        &self.fireworks
    }

    pub fn firework(&self, id: FireworkId) -> Option<&Firework> {
        self.fireworks.iter().find(|f| f.id() == id)
    }

    pub fn active_count(&self) -> usize {
        self.fireworks.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn particle_count(&self) -> usize {
        self.fireworks.iter().map(Firework::particle_count).sum()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn auto_launch(&self) -> bool {
        self.auto_launch
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firework::Phase;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn stage() -> Stage {
        Stage::new(800.0, 600.0)
    }

    fn manual(config: Config) -> Launcher {
        let mut launcher = Launcher::with_seed(config, stage(), 1234);
        launcher.set_auto_launch(false);
        launcher
    }

    #[test]
    fn test_launch_one_uses_overrides() {
        let mut launcher = manual(Config::default());
        let id = launcher.launch_one(LaunchOverrides {
            x: Some(42.0),
            target_height: Some(300.0),
            depth: Some(1.0),
            kind: Some(ExplosionKind::Palm),
            ..Default::default()
        });
        let fw = launcher.firework(id).unwrap();
        assert_eq!(fw.head().x, 42.0);
        assert_eq!(fw.head().y, -LAUNCH_BELOW);
        assert_eq!(fw.target_height(), 300.0);
        assert_eq!(fw.depth(), 1.0);
        assert_eq!(fw.explosion().kind(), ExplosionKind::Palm);
    }

    #[test]
    fn test_random_launch_stays_on_stage() {
        let mut launcher = manual(Config::default());
        for _ in 0..100 {
            let id = launcher.launch_one(LaunchOverrides::default());
            let fw = launcher.firework(id).unwrap();
            assert!((0.0..800.0).contains(&fw.head().x));
            let t = fw.target_height();
            assert!(t >= 600.0 * 0.53 - 1e-3 && t <= 600.0 * 0.88 + 1e-3, "target {t}");
            assert_ne!(fw.explosion().kind(), ExplosionKind::FibonacciSphere);
        }
    }

    #[test]
    fn test_nan_overrides_are_randomized() {
        let mut launcher = manual(Config::default());
        let id = launcher.launch_one(LaunchOverrides {
            x: Some(f32::NAN),
            depth: Some(f32::INFINITY),
            ..Default::default()
        });
        let fw = launcher.firework(id).unwrap();
        assert!(fw.head().x.is_finite());
        assert!((0.0..=1.0).contains(&fw.depth()));
    }

    #[test]
    fn test_burst_is_spread_over_ticks() {
        let mut launcher = manual(Config::default());
        launcher.launch_burst(5, 10);
        assert_eq!(launcher.active_count(), 0);
        assert_eq!(launcher.pending_count(), 5);
        for _ in 0..60 {
            launcher.tick();
        }
        assert_eq!(launcher.pending_count(), 0);
        assert_eq!(launcher.active_count(), 5);
    }

    #[test]
    fn test_huge_burst_delay_saturates() {
        let config = Config::from_json(
            r#"{ "mode": "wild", "modes": { "wild": { "interval": 1, "burst_count": 3, "burst_delay": 9223372036854775807 } } }"#,
        )
        .unwrap();
        let mut launcher = Launcher::with_seed(config, stage(), 9);
        for _ in 0..10 {
            launcher.tick();
        }
        assert!(launcher.active_count() >= 1);
        assert!(launcher.pending_count() >= 2);
    }

    #[test]
    fn test_manual_burst_with_max_stagger() {
        let mut launcher = manual(Config::default());
        launcher.launch_burst(2, u64::MAX);
        for _ in 0..5 {
            launcher.tick();
        }
        assert!(launcher.active_count() + launcher.pending_count() == 2);
        assert!(launcher.pending_count() >= 1);
    }

    #[test]
    fn test_explode_immediately_skips_rising() {
        let mut launcher = manual(Config::default());
        let id = launcher.explode_immediately_at(Vec3::new(100.0, 200.0, 0.0));
        let fw = launcher.firework(id).unwrap();
        assert_eq!(fw.phase(), Phase::Exploding);
        assert!(fw.depth() >= 0.7);
        assert!(fw.particle_count() > 0);
        for p in fw.particles() {
            assert_eq!(p.position, Vec3::new(100.0, 200.0, 0.0));
        }
    }

    #[test]
    fn test_listener_hears_each_explosion_once() {
        let heard = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&heard);
        let mut launcher = manual(Config::default());
        launcher.add_listener(Box::new(move |e: &ExplosionEvent| -> Result<(), ListenerError> {
            sink.borrow_mut().push(e.id);
            Ok(())
        }));

        let a = launcher.launch_one(LaunchOverrides { target_height: Some(100.0), ..Default::default() });
        let b = launcher.explode_immediately_at(Vec3::new(10.0, 10.0, 0.0));
        for _ in 0..200 {
            launcher.tick();
        }
        let heard = heard.borrow();
        assert_eq!(heard.iter().filter(|id| **id == a).count(), 1);
        assert_eq!(heard.iter().filter(|id| **id == b).count(), 1);
    }

    #[test]
    fn test_failing_listener_does_not_stop_the_show() {
        let mut launcher = manual(Config::default());
        launcher.add_listener(Box::new(|_: &ExplosionEvent| -> Result<(), ListenerError> {
            Err(ListenerError::Other("speaker unplugged".into()))
        }));
        let id = launcher.launch_one(LaunchOverrides { target_height: Some(50.0), ..Default::default() });
        for _ in 0..30 {
            launcher.tick();
        }
        assert_eq!(launcher.firework(id).unwrap().phase(), Phase::Exploding);
    }

    #[test]
    fn test_schedule_switches_mode_on_tick() {
        let mut launcher = manual(Config::default());
        launcher.schedule_mode(10, Mode::intense());
        for _ in 0..9 {
            launcher.tick();
        }
        assert_eq!(launcher.mode(), Mode::relaxed());
        launcher.tick();
        assert_eq!(launcher.mode(), Mode::intense());
    }

    #[test]
    fn test_config_schedule_is_loaded() {
        let mut config = Config::default();
        config.schedule.push(crate::config::ScheduledSwitch { after_secs: 0.5, mode: "intense".into() });
        let mut launcher = manual(config);
        for _ in 0..30 {
            launcher.tick();
        }
        assert_eq!(launcher.mode(), Mode::intense());
    }

    #[test]
    fn test_select_and_cycle_modes() {
        let mut launcher = manual(Config::default());
        assert!(launcher.select_mode("bogus").is_err());
        launcher.select_mode("intense").unwrap();
        assert_eq!(launcher.mode(), Mode::intense());
        assert_eq!(launcher.cycle_mode().as_deref(), Some("relaxed"));
        assert_eq!(launcher.mode(), Mode::relaxed());
    }

    #[test]
    fn test_cinematic_defaults_to_fibonacci() {
        let mut config = Config::default();
        config.style = Style::Cinematic;
        let mut launcher = manual(config);
        let id = launcher.launch_one(LaunchOverrides::default());
        assert_eq!(launcher.firework(id).unwrap().explosion().kind(), ExplosionKind::FibonacciSphere);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut launcher = manual(Config::default());
        launcher.explode_immediately_at(Vec3::new(1.0, 1.0, 0.0));
        launcher.launch_burst(3, 5);
        launcher.clear();
        assert_eq!(launcher.active_count(), 0);
        assert_eq!(launcher.pending_count(), 0);
        assert_eq!(launcher.particle_count(), 0);
    }
}
