/// Telemetry pipeline
///
/// One message at a time: relay the raw text to observers, extract and
/// classify the registers, then fold the sample into the live view,
/// broadcast it and archive it in the background. Every failure is
/// handled here; nothing propagates past `run_pipeline`.
use super::source::TelemetrySource;
use crate::errors::PipelineError;
use crate::logger::{self, LogTag};
use crate::registers::{classify, decode_registers, payload_text, ClassifiedSample, RawMessage};
use crate::storage::{persist_detached, PersistenceSink, PowerRecord};
use crate::webserver::ws::{BroadcastEnvelope, BroadcastHub, EnvelopeKind};
use crate::windows::LiveView;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Default)]
struct PipelineStats {
    received: AtomicU64,
    classified: AtomicU64,
    decode_failures: AtomicU64,
    corrupt: AtomicU64,
    unclassifiable: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStatsSnapshot {
    pub received: u64,
    pub classified: u64,
    pub decode_failures: u64,
    pub corrupt: u64,
    pub unclassifiable: u64,
}

/// A message that produced a usable sample
#[derive(Debug)]
pub struct ProcessedSample {
    pub timestamp: DateTime<Utc>,
    pub sample: ClassifiedSample,
    /// Background archive write, if a sink is attached
    pub persistence: Option<JoinHandle<()>>,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct TelemetryPipeline {
    hub: Arc<BroadcastHub>,
    live_view: Arc<LiveView>,
    sink: Option<Arc<dyn PersistenceSink>>,
    stats: PipelineStats,
}

impl TelemetryPipeline {
    pub fn new(
        hub: Arc<BroadcastHub>,
        live_view: Arc<LiveView>,
        sink: Option<Arc<dyn PersistenceSink>>,
    ) -> Self {
        Self {
            hub,
            live_view,
            sink,
            stats: PipelineStats::default(),
        }
    }

    pub fn live_view(&self) -> &Arc<LiveView> {
        &self.live_view
    }

    /// Run one raw message through the pipeline
    pub async fn process(&self, raw: RawMessage) -> Result<ProcessedSample, PipelineError> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let text = raw.into_text().map_err(|e| {
            self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
            PipelineError::from(e)
        })?;

        // Observers see every message, even ones that fail to classify
        self.hub.broadcast(BroadcastEnvelope::iot(text.as_str())).await;

        let registers = payload_text(&text)
            .and_then(|payload| decode_registers(&payload))
            .map_err(|e| {
                self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                PipelineError::from(e)
            })?;

        let sample = classify(&registers);
        match sample {
            ClassifiedSample::Corrupt => {
                self.stats.corrupt.fetch_add(1, Ordering::Relaxed);
                return Err(PipelineError::CorruptRegisters {
                    values: registers.into_values(),
                });
            }
            ClassifiedSample::Unclassifiable => {
                self.stats.unclassifiable.fetch_add(1, Ordering::Relaxed);
                return Err(PipelineError::Unclassifiable {
                    values: registers.into_values(),
                });
            }
            _ => {}
        }

        let timestamp = Utc::now();
        self.stats.classified.fetch_add(1, Ordering::Relaxed);
        self.live_view.record(timestamp, &sample);

        match BroadcastEnvelope::from_payload(EnvelopeKind::Sample, &sample) {
            Ok(envelope) => {
                self.hub.broadcast(envelope).await;
            }
            Err(e) => logger::error(
                LogTag::Classifier,
                &format!("Failed to serialize {} sample: {}", sample.kind(), e),
            ),
        }

        let persistence = match (&self.sink, PowerRecord::from_sample(&sample, timestamp)) {
            (Some(sink), Some(record)) => Some(persist_detached(Arc::clone(sink), record)),
            _ => None,
        };

        Ok(ProcessedSample {
            timestamp,
            sample,
            persistence,
        })
    }

    /// Process a message and log the outcome
    pub async fn handle(&self, raw: RawMessage) {
        match self.process(raw).await {
            Ok(processed) => logger::verbose(
                LogTag::Classifier,
                &format!("Classified {}", processed.sample.kind()),
            ),
            Err(PipelineError::Decode(e)) => {
                logger::warning(LogTag::Decoder, &format!("Dropping message: {}", e))
            }
            Err(e @ PipelineError::CorruptRegisters { .. }) => {
                logger::warning(LogTag::Classifier, &format!("Discarding sample: {}", e))
            }
            Err(e @ PipelineError::Unclassifiable { .. }) => {
                logger::warning(LogTag::Classifier, &format!("Skipping sample: {}", e))
            }
        }
    }

    pub fn stats(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            received: self.stats.received.load(Ordering::Relaxed),
            classified: self.stats.classified.load(Ordering::Relaxed),
            decode_failures: self.stats.decode_failures.load(Ordering::Relaxed),
            corrupt: self.stats.corrupt.load(Ordering::Relaxed),
            unclassifiable: self.stats.unclassifiable.load(Ordering::Relaxed),
        }
    }
}

/// Pull messages from `source` until it ends or shutdown is signalled
///
/// Source errors are logged and retried after `retry_delay`.
pub async fn run_pipeline(
    mut source: Box<dyn TelemetrySource>,
    pipeline: Arc<TelemetryPipeline>,
    mut shutdown: watch::Receiver<bool>,
    retry_delay: Duration,
) {
    logger::info(
        LogTag::Source,
        &format!("Telemetry pipeline started (source={})", source.name()),
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                // Sender dropped: treat as shutdown
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            next = source.next_message() => {
                match next {
                    Ok(Some(raw)) => pipeline.handle(raw).await,
                    Ok(None) => {
                        logger::info(
                            LogTag::Source,
                            &format!("Telemetry source '{}' ended", source.name()),
                        );
                        break;
                    }
                    Err(e) => {
                        logger::warning(
                            LogTag::Source,
                            &format!(
                                "Telemetry source error: {} (retrying in {}ms)",
                                e,
                                retry_delay.as_millis()
                            ),
                        );
                        tokio::select! {
                            _ = shutdown.changed() => {}
                            _ = tokio::time::sleep(retry_delay) => {}
                        }
                    }
                }
            }
        }
    }

    let stats = pipeline.stats();
    logger::info(
        LogTag::Source,
        &format!(
            "Telemetry pipeline stopped (received={}, classified={}, dropped={})",
            stats.received,
            stats.classified,
            stats.decode_failures + stats.corrupt + stats.unclassifiable
        ),
    );
}
