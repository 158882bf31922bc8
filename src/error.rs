//! Error types.
//!
//! The simulation itself never fails; these cover loading configuration and
//! collaborator hooks reporting back.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while loading or querying configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    Io { path: PathBuf, source: std::io::Error },
    /// The file is not valid configuration JSON.
    Parse(serde_json::Error),
    /// A mode name that is not in the configured mode table.
    UnknownMode(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "Invalid config: {}", e),
            ConfigError::UnknownMode(name) => write!(f, "Unknown mode: {}", name),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::UnknownMode(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Failure reported by an explosion listener. The launcher logs it and
/// carries on.
#[derive(Debug)]
pub enum ListenerError {
    Io(std::io::Error),
    Other(String),
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerError::Io(e) => write!(f, "listener I/O error: {}", e),
            ListenerError::Other(msg) => write!(f, "listener error: {}", msg),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Io(e) => Some(e),
            ListenerError::Other(_) => None,
        }
    }
}

impl From<std::io::Error> for ListenerError {
    fn from(e: std::io::Error) -> Self {
        ListenerError::Io(e)
    }
}
