use serde::Serialize;
/// Observer hub metrics
///
/// Lock-free counters shared between the hub and connection tasks, with
/// serializable snapshots for the HTTP API.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// CONNECTION METRICS
// ============================================================================

/// Per-connection metrics (thread-safe)
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Frames written to the socket
    frames_sent: AtomicU64,

    /// Protocol pings written
    pings_sent: AtomicU64,

    /// Messages received from the observer
    inbound_messages: AtomicU64,

    /// Echo replies written
    echoes_sent: AtomicU64,

    /// Envelopes evicted from this observer's queue
    messages_dropped: AtomicU64,
}

impl ConnectionMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ping(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_inbound(&self) {
        self.inbound_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_echo(&self) {
        self.echoes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped(&self, count: u64) {
        self.messages_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionMetricsSnapshot {
        ConnectionMetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
            inbound_messages: self.inbound_messages.load(Ordering::Relaxed),
            echoes_sent: self.echoes_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot (serializable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionMetricsSnapshot {
    pub frames_sent: u64,
    pub pings_sent: u64,
    pub inbound_messages: u64,
    pub echoes_sent: u64,
    pub messages_dropped: u64,
}

// ============================================================================
// HUB METRICS
// ============================================================================

/// Hub-level metrics (aggregate across all connections)
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Total connections (lifetime)
    total_connections: AtomicU64,

    /// Current active connections
    active_connections: AtomicUsize,

    /// Envelopes accepted into observer queues
    messages_queued: AtomicU64,

    /// Envelopes evicted by the drop-oldest policy
    messages_dropped: AtomicU64,

    /// Pushes that failed and closed their observer
    send_failures: AtomicU64,

    /// Connections not open when the liveness check fired
    liveness_warnings: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn message_queued(&self) {
        self.messages_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_dropped(&self, count: u64) {
        self.messages_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn send_failed(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn liveness_warning(&self) {
        self.liveness_warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            messages_queued: self.messages_queued.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            liveness_warnings: self.liveness_warnings.load(Ordering::Relaxed),
        }
    }
}

/// Hub metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubMetricsSnapshot {
    pub total_connections: u64,
    pub active_connections: usize,
    pub messages_queued: u64,
    pub messages_dropped: u64,
    pub send_failures: u64,
    pub liveness_warnings: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_metrics() {
        let metrics = ConnectionMetrics::new();

        metrics.inc_sent();
        metrics.inc_sent();
        metrics.inc_ping();
        metrics.inc_inbound();
        metrics.inc_echo();
        metrics.inc_dropped(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_sent, 2);
        assert_eq!(snapshot.pings_sent, 1);
        assert_eq!(snapshot.inbound_messages, 1);
        assert_eq!(snapshot.echoes_sent, 1);
        assert_eq!(snapshot.messages_dropped, 4);
    }

    #[test]
    fn test_hub_metrics() {
        let metrics = HubMetrics::new();

        metrics.connection_opened();
        metrics.connection_opened();
        metrics.message_queued();
        metrics.message_dropped(3);
        metrics.send_failed();
        metrics.liveness_warning();
        metrics.connection_closed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_connections, 2);
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.messages_queued, 1);
        assert_eq!(snapshot.messages_dropped, 3);
        assert_eq!(snapshot.send_failures, 1);
        assert_eq!(snapshot.liveness_warnings, 1);
    }
}
