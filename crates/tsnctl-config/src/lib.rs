//! Configuration for tsnctl.
//!
//! Layered loading with figment: serialized defaults, then a TOML file,
//! then `TSNCTL_*` environment variables (`__` separates nested keys, so
//! `TSNCTL_CORE__POLL_INTERVAL_MS=500` sets `core.poll_interval_ms`).
//! The result translates into [`tsnctl_core::CoreConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use tsnctl_core::CoreConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub core: CoreSection,

    #[serde(default)]
    pub log: LogSection,
}

/// `[core]`: runtime tuning for the controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreSection {
    pub history_limit: usize,
    pub poll_interval_ms: u64,
    pub max_listeners: usize,
    pub listener_queue: usize,
    pub command_channel_size: usize,
    pub transaction_warn_size: usize,
}

impl Default for CoreSection {
    fn default() -> Self {
        let core = CoreConfig::default();
        Self {
            history_limit: core.history_limit,
            poll_interval_ms: u64::try_from(core.poll_interval.as_millis()).unwrap_or(1000),
            max_listeners: core.max_listeners,
            listener_queue: core.listener_queue,
            command_channel_size: core.command_channel_size,
            transaction_warn_size: core.transaction_warn_size,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// `[log]`: defaults for the binary's tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSection {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("core.poll_interval_ms", self.core.poll_interval_ms == 0),
            ("core.max_listeners", self.core.max_listeners == 0),
            ("core.history_limit", self.core.history_limit == 0),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, zero)| *zero) {
            return Err(ConfigError::Validation {
                field: (*field).into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.log.level.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "log.level".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn core_config(&self) -> CoreConfig {
        let core = &self.core;
        CoreConfig {
            history_limit: core.history_limit,
            poll_interval: Duration::from_millis(core.poll_interval_ms),
            max_listeners: core.max_listeners,
            listener_queue: core.listener_queue,
            command_channel_size: core.command_channel_size,
            transaction_warn_size: core.transaction_warn_size,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "tsnctl", "tsnctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tsnctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// The provider stack for a given file. A missing file contributes nothing.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TSNCTL_").split("__"))
}

/// Load and validate the config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load and validate the config from an explicit file.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
