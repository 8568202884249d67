/// Upstream meter feed over WebSocket
///
/// Text and binary frames become raw messages. A dropped connection is
/// reported as a stream error; the next call reconnects.
use super::source::TelemetrySource;
use crate::arguments::is_debug_source_enabled;
use crate::errors::TelemetryError;
use crate::logger::{self, LogTag};
use crate::registers::RawMessage;
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct UpstreamSource {
    url: String,
    stream: Option<UpstreamStream>,
}

impl UpstreamSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connect(&mut self) -> Result<(), TelemetryError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TelemetryError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        logger::info(
            LogTag::Source,
            &format!("Connected to upstream telemetry at {}", self.url),
        );
        self.stream = Some(stream);
        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for UpstreamSource {
    fn name(&self) -> &'static str {
        "upstream"
    }

    async fn next_message(&mut self) -> Result<Option<RawMessage>, TelemetryError> {
        loop {
            if self.stream.is_none() {
                self.connect().await?;
            }
            let Some(stream) = self.stream.as_mut() else {
                continue;
            };

            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if is_debug_source_enabled() {
                        logger::debug(LogTag::Source, &format!("Upstream text frame: {}", text));
                    }
                    return Ok(Some(RawMessage::Text(text)));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    if is_debug_source_enabled() {
                        logger::debug(
                            LogTag::Source,
                            &format!("Upstream binary frame ({} bytes)", bytes.len()),
                        );
                    }
                    return Ok(Some(RawMessage::Binary(bytes)));
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.stream = None;
                    return Err(TelemetryError::Stream("upstream closed the connection".to_string()));
                }
                Some(Ok(_)) => {
                    // Ping/pong handled by tungstenite
                }
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(TelemetryError::Stream(e.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_upstream_reports_connect_error() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut source = UpstreamSource::new(format!("ws://{}/stream", addr));
        match source.next_message().await {
            Err(TelemetryError::Connect { url, .. }) => assert!(url.ends_with("/stream")),
            other => panic!("expected connect error, got {:?}", other),
        }
    }
}
