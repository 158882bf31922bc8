use anyhow::{Context, Result};
use clap::Parser;
use skyburst::color::Rgb;
use skyburst::config::{Config, ScheduledSwitch, Style};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fireworks in the terminal", long_about = None)]
pub struct Cli {
    /// JSON configuration file; missing sections use the defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Launch mode to start in (e.g. relaxed, intense)
    #[arg(long)]
    pub mode: Option<String>,

    /// Shell style: classic or cinematic
    #[arg(long, value_parser = parse_style)]
    pub style: Option<Style>,

    /// Seed for a reproducible show
    #[arg(long)]
    pub seed: Option<u64>,

    /// Only launch on key press or click
    #[arg(long)]
    pub no_auto: bool,

    /// Don't ring the terminal bell on bursts
    #[arg(long)]
    pub no_sound: bool,

    /// Background color as hex (e.g. --bg-color 1a1b26)
    #[arg(long, value_parser = parse_hex_color)]
    pub bg_color: Option<Rgb>,

    /// Switch mode after a delay, as SECS=MODE (repeatable)
    #[arg(long = "schedule", value_parser = parse_schedule)]
    pub schedule: Vec<ScheduledSwitch>,

    /// Write logs here; RUST_LOG sets the level
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub dump_config: bool,
}

impl Cli {
    /// The config file (or defaults) with command line overrides applied.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(style) = self.style {
            config.style = style;
        }
        if let Some(mode) = &self.mode {
            config.mode_named(mode)?;
            config.mode = mode.clone();
        }
        if self.no_sound {
            config.audio.sound_enabled = false;
        }
        for switch in &self.schedule {
            config.mode_named(&switch.mode)?;
            config.schedule.push(switch.clone());
        }
        Ok(config.sanitized())
    }
}

/// Route `log` output to `path`. Without a file logging stays off, since
/// anything on stderr would scribble over the alternate screen.
pub fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn parse_style(s: &str) -> Result<Style, String> {
    match s.to_ascii_lowercase().as_str() {
        "classic" => Ok(Style::Classic),
        "cinematic" => Ok(Style::Cinematic),
        other => Err(format!("unknown style '{}', expected classic or cinematic", other)),
    }
}

fn parse_hex_color(hex: &str) -> Result<Rgb, String> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("expected RRGGBB, got '{}'", hex));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|e| format!("bad hex color '{}': {}", hex, e))
    };
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn parse_schedule(s: &str) -> Result<ScheduledSwitch, String> {
    let (secs, mode) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SECS=MODE, got '{}'", s))?;
    let after_secs: f32 = secs
        .trim()
        .parse()
        .map_err(|e| format!("bad delay '{}': {}", secs, e))?;
    if !after_secs.is_finite() || after_secs < 0.0 {
        return Err(format!("delay must be a non-negative number of seconds, got {}", secs));
    }
    Ok(ScheduledSwitch { after_secs, mode: mode.trim().to_string() })
}
