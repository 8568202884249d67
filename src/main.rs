use meterlink::{
    arguments::{patterns, print_debug_info, print_help},
    logger::{self as logger, LogTag},
};

/// Main entry point for meterlink
///
/// Starts the telemetry pipeline, the observer hub and the webserver, then
/// runs until Ctrl-C.
#[tokio::main]
async fn main() {
    // Logger writes into logs/, so directories come first
    if let Err(e) = meterlink::paths::ensure_all_directories() {
        eprintln!("Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "meterlink starting up...");
    print_debug_info();

    let exit_code = match meterlink::run::run().await {
        Ok(()) => 0,
        Err(e) => {
            logger::error(LogTag::System, &format!("meterlink failed: {:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(exit_code);
}
