/// Telemetry source contract
use crate::errors::TelemetryError;
use crate::registers::RawMessage;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Upstream producer of raw meter messages
#[async_trait]
pub trait TelemetrySource: Send {
    fn name(&self) -> &'static str;

    /// Next message; `Ok(None)` once the source is exhausted
    ///
    /// Errors are transient: the caller may call again after a delay.
    async fn next_message(&mut self) -> Result<Option<RawMessage>, TelemetryError>;
}

/// Source fed through an mpsc channel
pub struct ChannelSource {
    receiver: mpsc::Receiver<RawMessage>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<RawMessage>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self { receiver })
    }
}

#[async_trait]
impl TelemetrySource for ChannelSource {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn next_message(&mut self) -> Result<Option<RawMessage>, TelemetryError> {
        Ok(self.receiver.recv().await)
    }
}
