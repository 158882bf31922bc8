//! Particle firework simulation.
//!
//! A [`Launcher`] owns the show. Each [`Firework`] climbs, bursts into a
//! pattern of particles once, then burns out. Everything advances in fixed
//! ticks; rendering and sound hang off the launcher from outside.

pub mod color;
pub mod config;
pub mod error;
pub mod firework;
pub mod launcher;
pub mod math;
pub mod particle;
pub mod pattern;

pub use config::{Cadence, Config, Mode, Style};
pub use error::{ConfigError, ListenerError};
pub use firework::{ExplosionEvent, Firework, FireworkId, FireworkSpec, Phase};
pub use launcher::{ExplosionListener, LaunchOverrides, Launcher, Stage};
pub use math::Vec3;
pub use pattern::{Explosion, ExplosionKind};
