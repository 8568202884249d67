/// Process lifecycle: wire the pipeline, the hub and the webserver together
/// and run until Ctrl-C.
use crate::{
    arguments::{config_path_override, is_no_storage_enabled, is_synthetic_enabled},
    config::{self, Config, SourceConfig, StorageConfig},
    logger::{self, LogTag},
    paths,
    storage::{MemorySink, PersistenceSink, SqliteSink},
    telemetry::{run_pipeline, SyntheticSource, TelemetryPipeline, TelemetrySource, UpstreamSource},
    webserver::{self, state::AppState, ws::BroadcastHub},
    windows::LiveView,
};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Grace period for tasks to finish after shutdown was requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn run() -> Result<()> {
    paths::ensure_all_directories().map_err(|e| anyhow!(e))?;

    let config_path = config_path_override()
        .map(PathBuf::from)
        .unwrap_or_else(paths::get_config_path);
    config::load_config_from_path(&config_path).map_err(|e| anyhow!(e))?;
    let cfg: Config = config::get_config_clone();

    let hub = BroadcastHub::new(cfg.hub.clone());
    let live_view = Arc::new(LiveView::new(cfg.window.capacity));
    let sink = open_sink(&cfg.storage)?;
    logger::info(LogTag::Storage, &format!("Archiving samples via {}", sink.name()));

    let pipeline = Arc::new(TelemetryPipeline::new(
        Arc::clone(&hub),
        Arc::clone(&live_view),
        Some(Arc::clone(&sink)),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pipeline_task = tokio::spawn(run_pipeline(
        build_source(&cfg.source),
        Arc::clone(&pipeline),
        shutdown_rx,
        Duration::from_millis(cfg.source.reconnect_delay_ms),
    ));

    let state = Arc::new(
        AppState::new(cfg.webserver.clone(), Arc::clone(&hub), live_view)
            .with_sink(sink)
            .with_pipeline(pipeline),
    );
    let mut server_task = tokio::spawn(webserver::start_server(state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            logger::info(LogTag::System, "Shutdown requested");
        }
        result = &mut server_task => {
            let _ = shutdown_tx.send(true);
            return match result {
                Ok(Ok(())) => Err(anyhow!("Webserver stopped unexpectedly")),
                Ok(Err(e)) => Err(anyhow!(e)),
                Err(e) => Err(anyhow!("Webserver task failed: {}", e)),
            };
        }
    }

    let _ = shutdown_tx.send(true);
    webserver::shutdown();

    match tokio::time::timeout(SHUTDOWN_GRACE, server_task).await {
        Ok(Ok(Err(e))) => logger::error(LogTag::Webserver, &e),
        Ok(Err(e)) => logger::error(LogTag::Webserver, &format!("Webserver task failed: {}", e)),
        Err(_) => logger::warning(LogTag::Webserver, "Webserver did not stop in time"),
        Ok(Ok(Ok(()))) => {}
    }
    if tokio::time::timeout(SHUTDOWN_GRACE, pipeline_task).await.is_err() {
        logger::warning(LogTag::Source, "Telemetry pipeline did not stop in time");
    }

    logger::info(LogTag::System, "meterlink stopped");
    Ok(())
}

/// Archive backend for this run
fn open_sink(storage: &StorageConfig) -> Result<Arc<dyn PersistenceSink>> {
    if !storage.enabled || is_no_storage_enabled() {
        logger::warning(
            LogTag::Storage,
            "Durable storage disabled, samples are kept in memory only",
        );
        return Ok(Arc::new(MemorySink::default()));
    }

    let path = resolve_data_path(&storage.database_path);
    let sink = SqliteSink::open(&path)
        .with_context(|| format!("Failed to open power database at {}", path.display()))?;
    Ok(Arc::new(sink))
}

/// Relative paths are anchored at the base directory
fn resolve_data_path(path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        paths::get_base_directory().join(path)
    }
}

fn build_source(source: &SourceConfig) -> Box<dyn TelemetrySource> {
    let url = source.upstream_url.trim();
    if url.is_empty() || is_synthetic_enabled() {
        logger::warning(
            LogTag::Source,
            "No upstream telemetry configured, using synthetic meter data",
        );
        return Box::new(SyntheticSource::new(Duration::from_millis(
            source.synthetic_interval_ms,
        )));
    }

    logger::info(LogTag::Source, &format!("Using upstream telemetry at {}", url));
    Box::new(UpstreamSource::new(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_data_path_anchored_at_base() {
        let resolved = resolve_data_path("data/power.db");
        assert!(resolved.starts_with(paths::get_base_directory()));
        assert_eq!(resolve_data_path("/var/lib/power.db"), PathBuf::from("/var/lib/power.db"));
    }

    #[test]
    fn test_disabled_storage_uses_memory() {
        let storage = StorageConfig {
            enabled: false,
            ..StorageConfig::default()
        };
        assert_eq!(open_sink(&storage).unwrap().name(), "memory");
    }

    #[test]
    fn test_empty_upstream_selects_synthetic() {
        let source = SourceConfig::default();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        // Interval creation needs a runtime context
        let _guard = rt.enter();
        assert_eq!(build_source(&source).name(), "synthetic");
    }
}
