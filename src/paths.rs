//! Centralized path resolution for meterlink
//!
//! All file and directory paths are resolved through this module so the
//! server, the debug tools and the tests agree on where data lives.
//!
//! ## Directory Structure
//!
//! ```text
//! <base>/
//! ├── data/
//! │ ├── config.toml
//! │ └── power.db
//! └── logs/
//!   └── meterlink_*.log
//! ```
//!
//! `<base>` is `$METERLINK_HOME` when set, otherwise the working directory.

use once_cell::sync::Lazy;
use std::path::PathBuf;

/// Lazy-initialized base directory (thread-safe)
static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(resolve_base_directory);

fn resolve_base_directory() -> PathBuf {
    match std::env::var("METERLINK_HOME") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => PathBuf::from("."),
    }
}

/// Returns the base directory for all meterlink data
pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

/// Returns the data directory (config and databases)
pub fn get_data_directory() -> PathBuf {
    get_base_directory().join("data")
}

/// Returns the logs directory
pub fn get_logs_directory() -> PathBuf {
    get_base_directory().join("logs")
}

/// Default configuration file path
pub fn get_config_path() -> PathBuf {
    get_data_directory().join("config.toml")
}

/// Default SQLite database path for persisted power samples
pub fn get_power_db_path() -> PathBuf {
    get_data_directory().join("power.db")
}

/// Creates every directory meterlink writes into
pub fn ensure_all_directories() -> Result<(), String> {
    for dir in [get_data_directory(), get_logs_directory()] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_directory_is_subdir() {
        let base = get_base_directory();
        assert!(get_data_directory().starts_with(&base));
        assert!(get_logs_directory().starts_with(&base));
    }

    #[test]
    fn test_database_paths_in_data_dir() {
        assert!(get_power_db_path().starts_with(get_data_directory()));
        assert!(get_config_path().starts_with(get_data_directory()));
    }
}
