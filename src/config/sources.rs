use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "SMOLVID_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/smolvid.toml";
const ENV_PREFIX: &str = "SMOLVID";
const ENV_SEPARATOR: &str = "__";
const PORT_ENV_VAR: &str = "PORT";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables, then the bare `PORT` variable
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    apply_port_override(&mut config, env::var(PORT_ENV_VAR).ok().as_deref());

    Ok(config)
}

/// Hosting platforms hand the listen port over in `PORT`.
/// An unparseable value is logged and ignored.
pub fn apply_port_override(config: &mut Config, port: Option<&str>) {
    let Some(raw) = port else {
        return;
    };

    match raw.trim().parse::<u16>() {
        Ok(port) => config.server.port = port,
        Err(_) => tracing::warn!(value = raw, "Ignoring invalid PORT value"),
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // SMOLVID__TRANSCODE__TARGET_SIZE -> transcode.target_size
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("locator.strategies")
            .with_list_parse_key("locator.browser_domains")
            .with_list_parse_key("locator.blocked_domains")
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
