/// Observer connection handler
///
/// Runs one observer from upgrade to teardown:
/// - Registration with the hub and the retained-window snapshot
/// - Forwarding queued envelopes to the socket
/// - Echo replies for inbound messages
/// - Heartbeat pings and optional idle timeout
/// - Exactly-once removal on close or error
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::{
    arguments::is_debug_hub_enabled,
    errors::ConnectionError,
    logger::{self, LogTag},
    windows::LiveView,
};

use super::{
    health::ConnectionHealth,
    hub::{BroadcastHub, ConnectionId, Registration},
    message::{BroadcastEnvelope, EnvelopeKind},
    metrics::ConnectionMetrics,
};

/// Handle an upgraded observer socket until it closes
pub async fn handle_connection(socket: WebSocket, hub: Arc<BroadcastHub>, live_view: Arc<LiveView>) {
    let Registration {
        id: conn_id,
        mut receiver,
        handle,
    } = hub.register_connection().await;

    let (mut ws_tx, mut ws_rx) = socket.split();

    // axum hands over the socket after the upgrade completed
    handle.mark_open();
    let metrics = handle.metrics();
    let mut health = ConnectionHealth::new(hub.health_config());
    let mut heartbeat = health.heartbeat_ticker();

    logger::info(LogTag::Hub, &format!("Observer {} connected", conn_id));

    // Late joiners start from the retained windows
    match BroadcastEnvelope::from_payload(EnvelopeKind::Snapshot, &live_view.snapshot()) {
        Ok(envelope) => {
            if let Err(e) = hub.send_to(conn_id, envelope).await {
                logger::warning(
                    LogTag::Hub,
                    &format!("Connection {}: snapshot not queued: {}", conn_id, e),
                );
            }
        }
        Err(e) => logger::error(
            LogTag::Hub,
            &format!("Failed to serialize live snapshot: {}", e),
        ),
    }

    // Main message loop
    loop {
        tokio::select! {
            biased;

            // Envelopes queued by the hub
            envelope = receiver.recv() => {
                let Some(envelope) = envelope else {
                    if is_debug_hub_enabled() {
                        logger::debug(
                            LogTag::Hub,
                            &format!("Connection {}: queue closed by hub", conn_id),
                        );
                    }
                    break;
                };
                if let Err(e) = forward_to_client(&mut ws_tx, &envelope, &metrics).await {
                    logger::warning(
                        LogTag::Hub,
                        &format!("Connection {}: {}", conn_id, e),
                    );
                    break;
                }
            }

            // Messages from the observer
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        health.record_activity();
                        metrics.inc_inbound();
                        if let Err(e) = handle_client_message(&text, &mut ws_tx, conn_id, &metrics).await {
                            logger::warning(
                                LogTag::Hub,
                                &format!("Connection {}: echo not delivered: {}", conn_id, e),
                            );
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        health.record_activity();
                        metrics.inc_inbound();
                        match String::from_utf8(bytes) {
                            Ok(text) => {
                                if let Err(e) = handle_client_message(&text, &mut ws_tx, conn_id, &metrics).await {
                                    logger::warning(
                                        LogTag::Hub,
                                        &format!("Connection {}: echo not delivered: {}", conn_id, e),
                                    );
                                    break;
                                }
                            }
                            Err(_) => logger::warning(
                                LogTag::Hub,
                                &format!("Connection {}: binary message is not UTF-8", conn_id),
                            ),
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        health.record_activity();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        if is_debug_hub_enabled() {
                            logger::debug(
                                LogTag::Hub,
                                &format!("Connection {}: client closed", conn_id),
                            );
                        }
                        break;
                    }
                    Some(Err(e)) => {
                        let error = ConnectionError::Receive(e.to_string());
                        logger::warning(
                            LogTag::Hub,
                            &format!("Connection {}: {}", conn_id, error),
                        );
                        break;
                    }
                }
            }

            // Heartbeat
            _ = heartbeat.tick() => {
                if health.is_idle() {
                    logger::warning(
                        LogTag::Hub,
                        &format!(
                            "Connection {}: idle timeout ({}s)",
                            conn_id,
                            health.seconds_since_activity()
                        ),
                    );
                    break;
                }

                if handle.is_open() {
                    if let Err(e) = ws_tx.send(Message::Ping(Vec::new())).await {
                        logger::warning(
                            LogTag::Hub,
                            &format!("Connection {}: {}", conn_id, ConnectionError::Send(e.to_string())),
                        );
                        break;
                    }
                    metrics.inc_ping();
                }
            }
        }
    }

    // Cleanup
    handle.mark_closing();
    let _ = ws_tx.close().await;
    hub.unregister_connection(conn_id).await;

    let snapshot = metrics.snapshot();
    logger::info(
        LogTag::Hub,
        &format!(
            "Observer {} disconnected (sent={}, echoes={}, pings={})",
            conn_id, snapshot.frames_sent, snapshot.echoes_sent, snapshot.pings_sent
        ),
    );
}

/// Write one queued envelope
async fn forward_to_client(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    envelope: &BroadcastEnvelope,
    metrics: &Arc<ConnectionMetrics>,
) -> Result<(), ConnectionError> {
    match envelope.to_json() {
        Ok(json) => {
            ws_tx
                .send(Message::Text(json))
                .await
                .map_err(|e| ConnectionError::Send(e.to_string()))?;
            metrics.inc_sent();
            Ok(())
        }
        Err(e) => {
            logger::error(
                LogTag::Hub,
                &format!("Failed to serialize {} envelope: {}", envelope.kind, e),
            );
            Ok(()) // Skip the frame, keep the connection
        }
    }
}

/// Echo an observer message back to its sender only
///
/// Messages that are not JSON are logged and ignored; only socket write
/// failures are returned.
async fn handle_client_message(
    text: &str,
    ws_tx: &mut SplitSink<WebSocket, Message>,
    conn_id: ConnectionId,
    metrics: &Arc<ConnectionMetrics>,
) -> Result<(), ConnectionError> {
    let envelope = match BroadcastEnvelope::echo_of(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            logger::warning(
                LogTag::Hub,
                &format!("Connection {}: ignoring message: {}", conn_id, e),
            );
            return Ok(());
        }
    };

    if is_debug_hub_enabled() {
        logger::debug(
            LogTag::Hub,
            &format!("Connection {}: received {}", conn_id, envelope.data),
        );
    }

    forward_to_client(ws_tx, &envelope, metrics).await?;
    metrics.inc_echo();
    Ok(())
}
