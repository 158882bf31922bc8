//! Configuration: particle and physics tunables, launch modes, and the mode
//! schedule.
//!
//! The engine never reads this live. A firework copies what it needs into a
//! [`BurstParams`] when it is built, so later edits only shape later
//! fireworks.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Fixed simulation rate the tick-denominated defaults assume.
pub const TICKS_PER_SECOND: f32 = 60.0;

pub const DEFAULT_PARTICLE_COUNT: f32 = 23000.0;
pub const DEFAULT_PARTICLE_SIZE: f32 = 0.8;
pub const DEFAULT_FADE_SPEED: f32 = 0.00482;
pub const DEFAULT_EXPLOSION_FORCE: f32 = 3.3975;
pub const DEFAULT_GRAVITY: f32 = 0.00265;
pub const DEFAULT_HOVER_DURATION: f32 = 1.5;
pub const DEFAULT_MODE: &str = "relaxed";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    /// Budget for the cinematic style; classic bursts use a hundredth of it.
    pub particle_count: f32,
    pub particle_size: f32,
    pub fade_speed: f32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            particle_size: DEFAULT_PARTICLE_SIZE,
            fade_speed: DEFAULT_FADE_SPEED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub explosion_force: f32,
    pub gravity: f32,
    /// Seconds the cinematic burst hangs before it starts to fall.
    pub hover_duration: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            explosion_force: DEFAULT_EXPLOSION_FORCE,
            gravity: DEFAULT_GRAVITY,
            hover_duration: DEFAULT_HOVER_DURATION,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sound_enabled: bool,
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { sound_enabled: true, volume: 0.5 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    /// Mixed shell types, fixed palettes, single physics regime.
    #[default]
    Classic,
    /// Huge fibonacci shells, hue palettes, hover-then-fall physics.
    Cinematic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cadence {
    /// Fire every `interval` ticks whatever is on screen.
    #[default]
    FixedInterval,
    /// Fire only once the sky is empty and `interval` ticks have passed.
    WaitForSilence,
}

/// Automatic launch policy. Durations are in ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mode {
    pub interval: u64,
    pub burst_count: u32,
    pub burst_delay: u64,
    pub cadence: Cadence,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::relaxed()
    }
}

impl Mode {
    pub fn relaxed() -> Self {
        Self {
            interval: 120,
            burst_count: 1,
            burst_delay: 0,
            cadence: Cadence::WaitForSilence,
        }
    }

    pub fn intense() -> Self {
        Self {
            interval: 36,
            burst_count: 3,
            burst_delay: 6,
            cadence: Cadence::FixedInterval,
        }
    }
}

/// Switch to `mode` once `after_secs` of simulated time have passed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSwitch {
    pub after_secs: f32,
    pub mode: String,
}

impl ScheduledSwitch {
    pub fn at_tick(&self) -> u64 {
        (self.after_secs.max(0.0) * TICKS_PER_SECOND).round() as u64
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub particles: ParticleSettings,
    pub physics: PhysicsSettings,
    pub audio: AudioSettings,
    pub style: Style,
    pub mode: String,
    pub modes: BTreeMap<String, Mode>,
    pub schedule: Vec<ScheduledSwitch>,
}

impl Default for Config {
    fn default() -> Self {
        let mut modes = BTreeMap::new();
        modes.insert(DEFAULT_MODE.to_string(), Mode::relaxed());
        modes.insert("intense".to_string(), Mode::intense());
        Self {
            particles: ParticleSettings::default(),
            physics: PhysicsSettings::default(),
            audio: AudioSettings::default(),
            style: Style::Classic,
            mode: DEFAULT_MODE.to_string(),
            modes,
            schedule: Vec::new(),
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn non_negative(value: f32, fallback: f32) -> f32 {
    finite_or(value, fallback).max(0.0)
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace garbage with something inert instead of rejecting it: NaNs
    /// fall back to defaults, negatives clamp to zero.
    pub fn sanitized(mut self) -> Self {
        let p = &mut self.particles;
        p.particle_count = non_negative(p.particle_count, DEFAULT_PARTICLE_COUNT);
        p.particle_size = non_negative(p.particle_size, DEFAULT_PARTICLE_SIZE);
        p.fade_speed = non_negative(p.fade_speed, DEFAULT_FADE_SPEED);

        let ph = &mut self.physics;
        ph.explosion_force = non_negative(ph.explosion_force, DEFAULT_EXPLOSION_FORCE);
        ph.gravity = finite_or(ph.gravity, DEFAULT_GRAVITY);
        ph.hover_duration = non_negative(ph.hover_duration, DEFAULT_HOVER_DURATION);

        self.audio.volume = finite_or(self.audio.volume, 0.5).clamp(0.0, 1.0);

        if self.modes.is_empty() {
            self.modes = Config::default().modes;
        }
        if !self.modes.contains_key(&self.mode) {
            let fallback = if self.modes.contains_key(DEFAULT_MODE) {
                DEFAULT_MODE.to_string()
            } else {
                self.modes.keys().next().cloned().unwrap_or_default()
            };
            log::warn!("mode {:?} is not configured, falling back to {:?}", self.mode, fallback);
            self.mode = fallback;
        }
        self
    }

    pub fn mode_named(&self, name: &str) -> Result<Mode, ConfigError> {
        self.modes
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownMode(name.to_string()))
    }

    pub fn current_mode(&self) -> Mode {
        self.modes.get(&self.mode).copied().unwrap_or_default()
    }

    /// The scheduled switches resolved to ticks, skipping unknown modes.
    pub fn resolved_schedule(&self) -> Vec<(u64, Mode)> {
        self.schedule
            .iter()
            .filter_map(|s| match self.mode_named(&s.mode) {
                Ok(mode) => Some((s.at_tick(), mode)),
                Err(e) => {
                    log::warn!("dropping scheduled switch: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Mode names in table order, for cycling.
    pub fn mode_names(&self) -> impl Iterator<Item = &str> {
        self.modes.keys().map(String::as_str)
    }
}
