/// Observer WebSocket endpoint
///
/// Every observer gets the same stream: raw `iot` relays, classified
/// `sample` envelopes and an initial `snapshot`. Inbound messages are
/// echoed back to their sender only.
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    webserver::{state::AppState, ws::connection::handle_connection},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_hub_handler))
}

/// GET /ws
pub async fn ws_hub_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    if is_debug_webserver_enabled() {
        logger::debug(LogTag::Webserver, "Observer upgrade requested");
    }

    let hub = Arc::clone(&state.hub);
    let live_view = Arc::clone(&state.live_view);
    ws.on_upgrade(move |socket| handle_connection(socket, hub, live_view))
}
