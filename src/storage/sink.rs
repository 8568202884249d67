/// Persistence contract
use super::record::PowerRecord;
use crate::arguments::is_debug_storage_enabled;
use crate::errors::PersistenceError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::sync::Arc;

/// Durable store for classified samples
///
/// Writes are best-effort: callers log failures and move on, there is no
/// retry queue.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Sink name for logs and the health endpoint
    fn name(&self) -> &'static str;

    /// Archive one record
    async fn write(&self, record: PowerRecord) -> Result<(), PersistenceError>;

    /// Most recent records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<PowerRecord>, PersistenceError>;
}

/// Write a record on a background task
///
/// The write may complete after the originating message (or observer) is
/// gone; failures are logged and the record is lost.
pub fn persist_detached(
    sink: Arc<dyn PersistenceSink>,
    record: PowerRecord,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let timestamp = record.timestamp;
        match sink.write(record).await {
            Ok(()) => {
                if is_debug_storage_enabled() {
                    logger::debug(
                        LogTag::Storage,
                        &format!("Stored record {} via {}", timestamp, sink.name()),
                    );
                }
            }
            Err(e) => {
                logger::error(
                    LogTag::Storage,
                    &format!("Failed to store record {} via {}: {}", timestamp, sink.name(), e),
                );
            }
        }
    })
}
