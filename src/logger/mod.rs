//! Structured logging system for meterlink
//!
//! This module provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Dual output: colored console + file persistence
//!
//! ## Usage
//!
//! ```rust
//! use meterlink::logger::{self, LogTag};
//!
//! logger::warning(LogTag::Decoder, "No register data found in message");
//! logger::info(LogTag::Hub, "Observer connected");
//! logger::debug(LogTag::Classifier, "len=3 -> voltage"); // Only if --debug-classifier
//! logger::verbose(LogTag::Source, "raw frame: ..."); // Only if --verbose
//! ```
//!
//! Call [`init`] once at startup, before any service is started.

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Reads debug flags from the command line and opens the log file.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (shown unless --quiet raises nothing above warnings)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Only shown when the matching `--debug-<module>` flag is present.
///
/// ```rust
/// // Only shown with --debug-hub
/// meterlink::logger::debug(meterlink::logger::LogTag::Hub, "broadcast sent=3");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose or --verbose-<module>)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
///
/// Call this during shutdown to ensure all logs are written to disk.
pub fn flush() {
    file::flush_file_logging();
}
