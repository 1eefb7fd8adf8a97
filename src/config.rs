//! Application configuration.

use std::path::Path;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::client::{AnimationTiming, BoardGeometry};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "dropfour.toml";

/// Settings for the server and the terminal client.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct DropFourConfig {
    /// Base URL the client talks to.
    #[serde(default = "default_server_url")]
    server_url: String,

    /// Authoritative game database used by `serve`.
    #[serde(default = "default_database_path")]
    database_path: String,

    /// Local replay database used by the client.
    #[serde(default = "default_replay_database_path")]
    replay_database_path: String,

    /// Player identifier used when none is given on the command line.
    #[serde(default)]
    owner_identifier: Option<i32>,

    /// Animation pacing.
    #[serde(default)]
    animation: AnimationTiming,

    /// Board layout.
    #[serde(default)]
    geometry: BoardGeometry,
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_database_path() -> String {
    "dropfour.db".to_string()
}

fn default_replay_database_path() -> String {
    "dropfour_replays.db".to_string()
}

impl Default for DropFourConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            database_path: default_database_path(),
            replay_database_path: default_replay_database_path(),
            owner_identifier: None,
            animation: AnimationTiming::default(),
            geometry: BoardGeometry::default(),
        }
    }
}

impl DropFourConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(server_url = %config.server_url, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML or invalid values.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, else `dropfour.toml` if present, else defaults,
    /// then applies `DROPFOUR_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly named file is missing or any
    /// file present fails to parse.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => {
                debug!("No config file, using defaults");
                Self::default()
            }
        };
        config.apply_env()?;
        Ok(config)
    }

    #[instrument(skip(self))]
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("DROPFOUR_SERVER_URL") {
            self.server_url = url;
        }
        if let Ok(path) = std::env::var("DROPFOUR_DATABASE") {
            self.database_path = path;
        }
        if let Ok(path) = std::env::var("DROPFOUR_REPLAY_DATABASE") {
            self.replay_database_path = path;
        }
        if let Ok(owner) = std::env::var("DROPFOUR_OWNER") {
            let owner = owner.parse().map_err(|e| {
                ConfigError::new(format!("Invalid DROPFOUR_OWNER '{}': {}", owner, e))
            })?;
            self.owner_identifier = Some(owner);
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.animation.tick_interval_ms == 0 {
            return Err(ConfigError::new("animation.tick_interval_ms must be > 0".to_string()));
        }
        if self.animation.pixels_per_tick == 0 {
            return Err(ConfigError::new("animation.pixels_per_tick must be > 0".to_string()));
        }
        if self.geometry.disc_size() <= 0 {
            return Err(ConfigError::new(
                "geometry.piece_padding leaves no room for a disc".to_string(),
            ));
        }
        if let Some(owner) = self.owner_identifier.filter(|&o| o <= 0) {
            return Err(ConfigError::new(format!("owner_identifier must be > 0, got {}", owner)));
        }
        Ok(())
    }

    /// Overrides the server URL.
    pub fn set_server_url(&mut self, url: String) {
        self.server_url = url;
    }

    /// Overrides the authoritative database path.
    pub fn set_database_path(&mut self, path: String) {
        self.database_path = path;
    }

    /// Overrides the replay database path.
    pub fn set_replay_database_path(&mut self, path: String) {
        self.replay_database_path = path;
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
