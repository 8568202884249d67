use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    telemetry::PipelineStatsSnapshot,
    webserver::{
        state::AppState,
        utils::{error_response, success_response},
        ws::{hub::ConnectionInfo, metrics::HubMetricsSnapshot},
    },
};

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub observers: usize,
    pub storage: Option<&'static str>,
    pub pipeline: Option<PipelineStatsSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HubStatusResponse {
    pub metrics: HubMetricsSnapshot,
    pub connections: Vec<ConnectionInfo>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/live", get(live_snapshot))
        .route("/hub", get(hub_status))
        .route("/history", get(history))
}

/// GET /api/health
async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    if is_debug_webserver_enabled() {
        logger::debug(LogTag::Webserver, "Health check endpoint called");
    }

    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        observers: state.hub.count().await,
        storage: state.sink.as_ref().map(|sink| sink.name()),
        pipeline: state.pipeline.as_ref().map(|pipeline| pipeline.stats()),
    };

    success_response(response)
}

/// GET /api/live
async fn live_snapshot(State(state): State<Arc<AppState>>) -> Response {
    success_response(state.live_view.snapshot())
}

/// GET /api/hub
async fn hub_status(State(state): State<Arc<AppState>>) -> Response {
    success_response(HubStatusResponse {
        metrics: state.hub.metrics(),
        connections: state.hub.connections_info().await,
    })
}

/// GET /api/history?limit=N
async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let Some(sink) = state.sink.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "STORAGE_DISABLED",
            "Durable storage is disabled",
            None,
        );
    };

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    match sink.recent(limit).await {
        Ok(records) => success_response(records),
        Err(e) => {
            logger::error(
                LogTag::Webserver,
                &format!("History query via {} failed: {}", sink.name(), e),
            );
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "HISTORY_UNAVAILABLE",
                "Failed to load history",
                Some(e.to_string()),
            )
        }
    }
}
