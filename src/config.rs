//! Configuration for ephemeral.
//!
//! The configuration file is optional and lives at `~/.ephemeral/config.toml`:
//!
//! ```toml
//! # Shell used to interpret the command line (default: sh, or cmd.exe on Windows)
//! shell = "bash"
//!
//! # Text shown on the alternate screen
//! prompt = "extra args> "
//!
//! # Log file verbosity: error, warn, info, debug, trace
//! log_level = "debug"
//! ```
//!
//! A missing or malformed file falls back to the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::core::session::DEFAULT_PROMPT;

/// Name of the per-user directory holding config and log
pub const APP_DIR: &str = ".ephemeral";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell program overriding the platform default
    pub shell: Option<String>,
    /// Prompt text
    pub prompt: String,
    /// Log level filter for the log file
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            prompt: DEFAULT_PROMPT.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.ephemeral/config.toml`
    pub fn load() -> Self {
        match app_dir() {
            Some(dir) => Self::load_from(&dir.join("config.toml")),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                // Logging is configured from this file, so say it on stderr too
                eprintln!("ephemeral: ignoring {}: {}", path.display(), e);
                warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("ephemeral: could not read {}: {}", path.display(), e);
                warn!("Could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// `~/.ephemeral`, without creating it
pub fn app_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(APP_DIR))
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
