/// Shared application state for the webserver
///
/// Handles to the hub, the live view, the archive and the pipeline that
/// route handlers need.
use crate::config::WebserverConfig;
use crate::storage::PersistenceSink;
use crate::telemetry::TelemetryPipeline;
use crate::webserver::ws::BroadcastHub;
use crate::windows::LiveView;
use std::sync::Arc;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// Webserver configuration
    pub config: Arc<WebserverConfig>,

    /// Observer hub
    pub hub: Arc<BroadcastHub>,

    /// Live chart windows and readouts
    pub live_view: Arc<LiveView>,

    /// Durable archive (None when storage is disabled)
    pub sink: Option<Arc<dyn PersistenceSink>>,

    /// Telemetry pipeline, for stats
    pub pipeline: Option<Arc<TelemetryPipeline>>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: WebserverConfig, hub: Arc<BroadcastHub>, live_view: Arc<LiveView>) -> Self {
        Self {
            config: Arc::new(config),
            hub,
            live_view,
            sink: None,
            pipeline: None,
            startup_time: chrono::Utc::now(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_pipeline(mut self, pipeline: Arc<TelemetryPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
