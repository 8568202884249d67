use super::schemas::Config;
/// Configuration utilities - loading and access helpers
///
/// - Loading configuration from disk (defaults when the file is missing)
/// - `.env` and environment overrides for deployment secrets
/// - Thread-safe global access via `with_config`
use crate::logger::{self, LogTag};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::path::Path;

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Environment variable overriding `source.upstream_url`
pub const ENV_UPSTREAM_URL: &str = "METERLINK_UPSTREAM_URL";
/// Environment variable overriding `storage.database_path`
pub const ENV_DB_PATH: &str = "METERLINK_DB_PATH";
/// Environment variable overriding `webserver.port`
pub const ENV_PORT: &str = "METERLINK_PORT";

/// Parse a TOML document into a Config
pub fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str::<Config>(contents).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Load configuration from a specific file path
///
/// A missing file is not an error: defaults are used. Environment overrides
/// (after loading `.env`) are applied on top of the file values.
pub fn load_config_from_path(path: &Path) -> Result<(), String> {
    let mut config = read_config_file(path)?;

    // .env is optional
    let _ = dotenv::dotenv();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(())
}

fn read_config_file(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path.display()),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
    parse_config(&contents).map_err(|e| format!("{} ({})", e, path.display()))
}

/// Apply environment overrides using `lookup` to resolve variables
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_UPSTREAM_URL).filter(|v| !v.trim().is_empty()) {
        config.source.upstream_url = url.trim().to_string();
    }

    if let Some(db_path) = lookup(ENV_DB_PATH).filter(|v| !v.trim().is_empty()) {
        config.storage.database_path = db_path.trim().to_string();
    }

    if let Some(port) = lookup(ENV_PORT) {
        match port.trim().parse::<u16>() {
            Ok(port) => config.webserver.port = port,
            Err(_) => logger::warning(
                LogTag::Config,
                &format!("Ignoring invalid {}='{}'", ENV_PORT, port),
            ),
        }
    }
}

/// Execute a function with read access to the configuration
///
/// Falls back to defaults when the global config was never loaded (tests,
/// embedding).
///
/// ```
/// use meterlink::config::with_config;
///
/// let capacity = with_config(|cfg| cfg.window.capacity);
/// assert!(capacity > 0);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    match CONFIG.get() {
        Some(lock) => f(&lock.read()),
        None => f(&Config::default()),
    }
}

/// Owned copy of the current configuration
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}
