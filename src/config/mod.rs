//! Configuration management for smolvid
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Environment Variables
//!
//! Any key can be overridden with `SMOLVID__<section>__<key>`:
//! - `SMOLVID__TRANSCODE__TARGET_SIZE=8MB`
//! - `SMOLVID__LOCATOR__BROWSER_DOMAINS=tiktok.com,x.com`
//! - `SMOLVID__WORKSPACE__OUTPUT_DIR=/tmp/smolvid`
//!
//! The bare `PORT` variable wins over everything for the listen port.
//!
//! # Configuration File
//!
//! Loaded from `config/smolvid.toml` unless `SMOLVID_CONFIG` points elsewhere.
//! A missing file is not an error.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, FetchConfig, LocatorConfig, ServerConfig, TranscodeConfig, WorkspaceConfig,
};
pub use sources::apply_port_override;
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Effective configuration as TOML, for `smolvid config`
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
