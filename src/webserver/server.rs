/// Axum webserver implementation
///
/// Server lifecycle: bind, serve, graceful termination
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::compression::CompressionLayer;

use crate::{
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Start the webserver on the configured host and port
///
/// Blocks until the server is shut down.
pub async fn start_server(state: Arc<AppState>) -> Result<(), String> {
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .map_err(|e| format!("Invalid bind address: {}", e))?;

    let listener = TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => format!(
            "Failed to bind to {}: Address already in use\n\
             \n\
             Another meterlink instance (or another service) is using port {}.\n\
             Set webserver.port in the config or METERLINK_PORT to pick another.",
            addr, addr.port()
        ),
        std::io::ErrorKind::PermissionDenied => format!(
            "Failed to bind to {}: Permission denied\n\
             \n\
             Port {} requires elevated privileges on this system.\n\
             Consider using a port above 1024 or running with appropriate permissions.",
            addr,
            addr.port()
        ),
        _ => format!("Failed to bind to {}: {}", addr, e),
    })?;

    logger::info(
        LogTag::Webserver,
        &format!("Webserver listening on http://{}", addr),
    );
    logger::info(
        LogTag::Webserver,
        &format!("Observers connect to ws://{}/ws", addr),
    );

    serve_with_listener(listener, state).await
}

/// Serve on an already bound listener until `shutdown()` is called
pub async fn serve_with_listener(listener: TcpListener, state: Arc<AppState>) -> Result<(), String> {
    let hub = Arc::clone(&state.hub);
    let app = build_app(state);

    let shutdown_signal = async move {
        SHUTDOWN_NOTIFY.notified().await;
        logger::info(
            LogTag::Webserver,
            "Received shutdown signal, stopping webserver...",
        );
        // Ends every observer task so graceful shutdown can complete
        hub.close_all().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    logger::info(LogTag::Webserver, "Webserver stopped gracefully");
    Ok(())
}

/// Trigger webserver shutdown
pub fn shutdown() {
    logger::debug(LogTag::Webserver, "Triggering webserver shutdown...");
    SHUTDOWN_NOTIFY.notify_one();
}

/// Build the Axum application with all routes and middleware
pub fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state).layer(CompressionLayer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HubConfig, WebserverConfig};
    use crate::storage::MemorySink;
    use crate::webserver::ws::{BroadcastEnvelope, BroadcastHub, EnvelopeKind};
    use crate::windows::LiveView;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, build_app(state)).await;
        });
        addr
    }

    fn test_state() -> Arc<AppState> {
        let hub = BroadcastHub::new(HubConfig::default());
        let state = AppState::new(WebserverConfig::default(), hub, Arc::new(LiveView::new(20)))
            .with_sink(Arc::new(MemorySink::default()));
        Arc::new(state)
    }

    async fn next_json(client: &mut Client) -> Value {
        let read = async {
            loop {
                match client.next().await {
                    Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                    Some(Ok(_)) => continue,
                    other => panic!("observer stream ended: {:?}", other),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), read).await.unwrap()
    }

    async fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_observer_gets_snapshot_echo_and_broadcasts() {
        let state = test_state();
        let addr = spawn_server(Arc::clone(&state)).await;

        let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

        let snapshot = next_json(&mut client).await;
        assert_eq!(snapshot["type"], json!("snapshot"));
        assert!(snapshot["data"]["voltage"]["labels"].is_array());

        client
            .send(Message::Text(
                r#"{"message":"hi","data":{"type":"Buffer","data":[91,49,93]}}"#.to_string(),
            ))
            .await
            .unwrap();
        let echo = next_json(&mut client).await;
        assert_eq!(echo, json!({"type": "echo", "data": {"message": "hi", "data": "[1]"}}));

        let report = state
            .hub
            .broadcast(BroadcastEnvelope::iot("[230,229,231]"))
            .await;
        assert_eq!(report.delivered, 1);
        let relayed = next_json(&mut client).await;
        assert_eq!(relayed, json!({"type": "iot", "data": "[230,229,231]"}));

        client.close(None).await.unwrap();
        for _ in 0..50 {
            if state.hub.count().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(state.hub.count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_observers() {
        let state = test_state();
        let addr = spawn_server(Arc::clone(&state)).await;

        let mut clients = Vec::new();
        for _ in 0..3 {
            let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
            // Registered once the snapshot arrives
            assert_eq!(next_json(&mut client).await["type"], json!("snapshot"));
            clients.push(client);
        }

        let envelope =
            BroadcastEnvelope::new(EnvelopeKind::Sample, json!({"kind": "frequency", "value": 50.0}));
        assert_eq!(state.hub.broadcast(envelope).await.delivered, 3);

        for client in clients.iter_mut() {
            let received = next_json(client).await;
            assert_eq!(received["data"]["value"], json!(50.0));
        }
    }

    #[tokio::test]
    async fn test_favicon_and_health_routes() {
        let state = test_state();
        let addr = spawn_server(state).await;

        let favicon = http_get(addr, "/favicon.ico").await;
        assert!(favicon.starts_with("HTTP/1.1 204"), "{}", favicon);

        let health = http_get(addr, "/api/health").await;
        assert!(health.starts_with("HTTP/1.1 200"), "{}", health);
        assert!(health.contains("\"status\":\"ok\""));
        assert!(health.contains("\"storage\":\"memory\""));
    }

    #[tokio::test]
    async fn test_history_without_storage_is_unavailable() {
        let hub = BroadcastHub::new(HubConfig::default());
        let state = Arc::new(AppState::new(
            WebserverConfig::default(),
            hub,
            Arc::new(LiveView::new(20)),
        ));
        let addr = spawn_server(state).await;

        let response = http_get(addr, "/api/history?limit=5").await;
        assert!(response.starts_with("HTTP/1.1 503"), "{}", response);
        assert!(response.contains("STORAGE_DISABLED"));
    }
}
