/// Centralized argument handling system for meterlink
///
/// Command-line arguments are stored once in a process-wide vector so any
/// module can check debug flags without threading them through every call.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions for every module
/// - Value lookup for flags such as `--config <path>`
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by binaries and tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Telemetry source debug mode
pub fn is_debug_source_enabled() -> bool {
    has_arg("--debug-source")
}

/// Register decoder debug mode
pub fn is_debug_decoder_enabled() -> bool {
    has_arg("--debug-decoder")
}

/// Register classifier debug mode
pub fn is_debug_classifier_enabled() -> bool {
    has_arg("--debug-classifier")
}

/// Channel window debug mode
pub fn is_debug_window_enabled() -> bool {
    has_arg("--debug-window")
}

/// Broadcast hub debug mode
pub fn is_debug_hub_enabled() -> bool {
    has_arg("--debug-hub")
}

/// Webserver debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Storage debug mode
pub fn is_debug_storage_enabled() -> bool {
    has_arg("--debug-storage")
}

// =============================================================================
// MODE FLAGS
// =============================================================================

/// Force the synthetic telemetry generator even when an upstream is configured
pub fn is_synthetic_enabled() -> bool {
    has_arg("--synthetic")
}

/// Disable durable storage (samples are kept in memory only)
pub fn is_no_storage_enabled() -> bool {
    has_arg("--no-storage")
}

/// Config file override (`--config <path>`)
pub fn config_path_override() -> Option<String> {
    get_arg_value("--config")
}

pub mod patterns {
    use super::has_arg;

    /// True when help output was requested
    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }
}

/// Prints the debug flags that are active for this run
pub fn print_debug_info() {
    let flags: Vec<String> = get_cmd_args()
        .into_iter()
        .filter(|a| a.starts_with("--debug-") || a == "--verbose")
        .collect();

    if !flags.is_empty() {
        println!("Debug modes enabled: {}", flags.join(", "));
    }
}

pub fn print_help() {
    println!("meterlink - power meter telemetry classifier and live broadcast hub");
    println!();
    println!("USAGE:");
    println!("    meterlink [FLAGS]");
    println!();
    println!("CORE FLAGS:");
    println!("    --config <path>           Load configuration from <path> (default data/config.toml)");
    println!("    --synthetic               Use the synthetic telemetry generator");
    println!("    --no-storage              Keep samples in memory instead of SQLite");
    println!("    --quiet                   Only show warnings and errors");
    println!("    --verbose                 Show verbose trace output");
    println!("    --help, -h                Show this help message");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-classifier        Register classifier debug mode");
    println!("    --debug-decoder           Register decoder debug mode");
    println!("    --debug-hub               Broadcast hub debug mode");
    println!("    --debug-source            Telemetry source debug mode");
    println!("    --debug-storage           Storage debug mode");
    println!("    --debug-system            System debug mode");
    println!("    --debug-webserver         Webserver debug mode");
    println!("    --debug-window            Channel window debug mode");
    println!();
    println!("EXAMPLES:");
    println!("    meterlink                                   # Start with config defaults");
    println!("    meterlink --synthetic --debug-classifier    # Demo feed with classifier traces");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_value_lookup() {
        set_cmd_args(vec![
            "meterlink".to_string(),
            "--config".to_string(),
            "custom.toml".to_string(),
            "--debug-hub".to_string(),
        ]);

        assert_eq!(config_path_override().as_deref(), Some("custom.toml"));
        assert!(is_debug_hub_enabled());
        assert!(!is_debug_storage_enabled());
        assert_eq!(get_arg_value("--debug-hub"), None);

        set_cmd_args(vec!["meterlink".to_string()]);
    }
}
