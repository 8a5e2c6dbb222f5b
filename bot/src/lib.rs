use banroyale_types::{settings, ChannelId, GameSettings, RoleId, SettingsError};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr};
use thiserror::Error;
use tracing::Level;

pub mod commands;
pub mod local;

/// Host configuration, read from YAML.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub controller_role: RoleId,
    pub elimination_channel: ChannelId,
    pub log_channel: ChannelId,
    pub store_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_elimination_chance")]
    pub elimination_chance: f64,
    #[serde(default = "default_elimination_delay_secs")]
    pub elimination_delay_secs: f64,
    #[serde(default)]
    pub decay_mode: bool,
    #[serde(default = "default_min_decay_chance")]
    pub min_decay_chance: f64,
    #[serde(default = "default_max_decay_chance")]
    pub max_decay_chance: f64,
    #[serde(default = "default_react_marker")]
    pub react_marker: String,
    #[serde(default = "default_spectator_role")]
    pub spectator_role: String,

    /// Seed for the elimination draws. Unset draws from OS entropy.
    #[serde(default)]
    pub deterministic_seed: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_elimination_chance() -> f64 {
    settings::DEFAULT_ELIMINATION_CHANCE
}

fn default_elimination_delay_secs() -> f64 {
    settings::DEFAULT_ELIMINATION_DELAY_SECS
}

fn default_min_decay_chance() -> f64 {
    settings::DEFAULT_MIN_DECAY_CHANCE
}

fn default_max_decay_chance() -> f64 {
    settings::DEFAULT_MAX_DECAY_CHANCE
}

fn default_react_marker() -> String {
    settings::DEFAULT_REACT_MARKER.to_string()
}

fn default_spectator_role() -> String {
    settings::DEFAULT_SPECTATOR_ROLE.to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub struct ValidatedConfig {
    pub settings: GameSettings,
    pub store_path: PathBuf,
    pub log_level: Level,
    pub log_json: bool,
    pub deterministic_seed: Option<u64>,
}

fn ensure_not_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { field });
    }
    Ok(())
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        ensure_not_empty("store_path", &self.store_path)?;
        ensure_not_empty("react_marker", &self.react_marker)?;
        ensure_not_empty("spectator_role", &self.spectator_role)?;
        let log_level = Level::from_str(&self.log_level).map_err(|_| {
            ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            }
        })?;

        let mut settings = GameSettings::new(
            self.controller_role,
            self.elimination_channel,
            self.log_channel,
        );
        settings.set_elimination_chance(self.elimination_chance)?;
        settings.set_elimination_delay_secs(self.elimination_delay_secs)?;
        settings.set_decay_range(self.min_decay_chance, self.max_decay_chance)?;
        settings.set_decay_mode(self.decay_mode);
        settings.set_react_marker(self.react_marker);
        settings.set_spectator_role(self.spectator_role);

        Ok(ValidatedConfig {
            settings,
            store_path: PathBuf::from(self.store_path),
            log_level,
            log_json: self.log_json,
            deterministic_seed: self.deterministic_seed,
        })
    }
}

/// Install the global subscriber. Logs go to stderr so console output stays
/// readable.
pub fn init_tracing(level: Level, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
