/// Broadcast hub - owner of the live observer set
///
/// The hub manages:
/// - Registration and exactly-once removal of observer connections
/// - Per-connection bounded outbound queues with an overflow policy
/// - Fan-out of envelopes over a snapshot of the open connections
/// - The one-shot liveness check for each new connection
/// - Hub-level metrics
///
/// Callers never see the connection map; they get `broadcast`, `send_to`
/// and `count`.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::{
    arguments::is_debug_hub_enabled,
    config::HubConfig,
    errors::ConnectionError,
    logger::{self, LogTag},
};

use super::health::HealthConfig;
use super::message::BroadcastEnvelope;
use super::metrics::{ConnectionMetrics, ConnectionMetricsSnapshot, HubMetrics, HubMetricsSnapshot};
use super::outbound::{outbound_queue, OutboundReceiver, OutboundSender, PushOutcome};

// ============================================================================
// HUB TYPES
// ============================================================================

/// Connection ID (unique per observer connection)
pub type ConnectionId = u64;

/// Observer connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Open => 1,
            ConnectionState::Closing => 2,
            ConnectionState::Closed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// Hub-side record of one observer
struct ConnectionEntry {
    id: ConnectionId,
    state: AtomicU8,
    sender: OutboundSender,
    metrics: Arc<ConnectionMetrics>,
    liveness: parking_lot::Mutex<Option<JoinHandle<()>>>,
    connected_at: DateTime<Utc>,
}

impl ConnectionEntry {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move forward in the lifecycle; Closed is terminal
    fn advance_to(&self, next: ConnectionState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if ConnectionState::from_u8(current) == ConnectionState::Closed
                || current >= next.as_u8()
            {
                return false;
            }
            match self.state.compare_exchange(
                current,
                next.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn cancel_liveness(&self) {
        if let Some(handle) = self.liveness.lock().take() {
            handle.abort();
        }
    }
}

/// Connection task's view of its own hub entry
#[derive(Clone)]
pub struct ObserverHandle {
    entry: Arc<ConnectionEntry>,
}

impl ObserverHandle {
    pub fn id(&self) -> ConnectionId {
        self.entry.id
    }

    pub fn state(&self) -> ConnectionState {
        self.entry.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Handshake finished
    pub fn mark_open(&self) -> bool {
        self.entry.advance_to(ConnectionState::Open)
    }

    /// Teardown started
    pub fn mark_closing(&self) -> bool {
        self.entry.advance_to(ConnectionState::Closing)
    }

    pub fn metrics(&self) -> Arc<ConnectionMetrics> {
        Arc::clone(&self.entry.metrics)
    }
}

/// Everything a connection task needs after registering
pub struct Registration {
    pub id: ConnectionId,
    pub receiver: OutboundReceiver,
    pub handle: ObserverHandle,
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Observers the envelope was queued for
    pub delivered: usize,
    /// Of those, observers that had to evict an older envelope
    pub evicted: usize,
    /// Observers that failed and were removed
    pub failed: usize,
}

/// Per-connection row for the status API
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub state: ConnectionState,
    pub connected_at: DateTime<Utc>,
    pub queued: usize,
    pub metrics: ConnectionMetricsSnapshot,
}

// ============================================================================
// BROADCAST HUB
// ============================================================================

pub struct BroadcastHub {
    /// Active connections (connection_id -> entry)
    connections: RwLock<HashMap<ConnectionId, Arc<ConnectionEntry>>>,

    /// Next connection ID
    next_conn_id: AtomicU64,

    metrics: Arc<HubMetrics>,

    config: HubConfig,
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Arc<Self> {
        Arc::new(Self {
            connections: RwLock::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
            metrics: HubMetrics::new(),
            config,
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig::from_config(&self.config)
    }

    /// Register a new observer in the Connecting state
    ///
    /// Arms the liveness check: if the connection is not Open when it
    /// fires, a warning is logged. The check never closes the connection.
    pub async fn register_connection(&self) -> Registration {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = outbound_queue(
            conn_id,
            self.config.outbound_queue_capacity,
            self.config.overflow_policy,
        );

        let entry = Arc::new(ConnectionEntry {
            id: conn_id,
            state: AtomicU8::new(ConnectionState::Connecting.as_u8()),
            sender,
            metrics: ConnectionMetrics::new(),
            liveness: parking_lot::Mutex::new(None),
            connected_at: Utc::now(),
        });

        let liveness = spawn_liveness_check(
            Arc::downgrade(&entry),
            Arc::clone(&self.metrics),
            self.health_config().liveness_check,
        );
        *entry.liveness.lock() = Some(liveness);

        let active = {
            let mut connections = self.connections.write().await;
            connections.insert(conn_id, Arc::clone(&entry));
            connections.len()
        };
        self.metrics.connection_opened();

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!("Connection {} registered (active={})", conn_id, active),
            );
        }

        Registration {
            id: conn_id,
            receiver,
            handle: ObserverHandle { entry },
        }
    }

    /// Remove an observer and cancel its timers
    ///
    /// Returns false when the connection was already removed.
    pub async fn unregister_connection(&self, conn_id: ConnectionId) -> bool {
        let (removed, active) = {
            let mut connections = self.connections.write().await;
            let removed = connections.remove(&conn_id);
            (removed, connections.len())
        };

        let Some(entry) = removed else {
            return false;
        };

        entry.cancel_liveness();
        entry.sender.close();
        entry.state.store(ConnectionState::Closed.as_u8(), Ordering::Release);
        self.metrics.connection_closed();

        if is_debug_hub_enabled() {
            let snapshot = entry.metrics.snapshot();
            logger::debug(
                LogTag::Hub,
                &format!(
                    "Connection {} unregistered (active={}, sent={}, dropped={})",
                    conn_id, active, snapshot.frames_sent, snapshot.messages_dropped
                ),
            );
        }
        true
    }

    /// Queue an envelope for every open connection
    ///
    /// Iterates a snapshot of the set, so connects and disconnects during
    /// the fan-out are safe. Connections still in Connecting or already
    /// Closing are skipped. A failing observer is moved to Closing and
    /// removed; the others still receive the envelope.
    pub async fn broadcast(&self, envelope: BroadcastEnvelope) -> BroadcastReport {
        let targets: Vec<Arc<ConnectionEntry>> = self
            .connections
            .read()
            .await
            .values()
            .filter(|entry| entry.state() == ConnectionState::Open)
            .cloned()
            .collect();

        let mut report = BroadcastReport::default();
        if targets.is_empty() {
            return report;
        }

        let mut failed = Vec::new();
        for entry in &targets {
            match self.push_to(entry, envelope.clone()) {
                Ok(PushOutcome::Queued) => report.delivered += 1,
                Ok(PushOutcome::DroppedOldest) => {
                    report.delivered += 1;
                    report.evicted += 1;
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Hub,
                        &format!("Broadcast to connection {} failed: {}", entry.id, e),
                    );
                    failed.push(entry.id);
                }
            }
        }

        report.failed = failed.len();
        for conn_id in failed {
            self.unregister_connection(conn_id).await;
        }

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "Broadcast {} (delivered={}, evicted={}, failed={})",
                    envelope.kind, report.delivered, report.evicted, report.failed
                ),
            );
        }
        report
    }

    /// Queue an envelope for one connection
    pub async fn send_to(
        &self,
        conn_id: ConnectionId,
        envelope: BroadcastEnvelope,
    ) -> Result<(), ConnectionError> {
        let entry = self
            .connections
            .read()
            .await
            .get(&conn_id)
            .cloned()
            .ok_or(ConnectionError::Closed(conn_id))?;

        match self.push_to(&entry, envelope) {
            Ok(_) => Ok(()),
            Err(e) => {
                self.unregister_connection(conn_id).await;
                Err(e)
            }
        }
    }

    fn push_to(
        &self,
        entry: &ConnectionEntry,
        envelope: BroadcastEnvelope,
    ) -> Result<PushOutcome, ConnectionError> {
        match entry.sender.push(envelope) {
            Ok(outcome) => {
                self.metrics.message_queued();
                if outcome == PushOutcome::DroppedOldest {
                    self.metrics.message_dropped(1);
                    entry.metrics.inc_dropped(1);
                }
                Ok(outcome)
            }
            Err(e) => {
                entry.advance_to(ConnectionState::Closing);
                self.metrics.send_failed();
                Err(e)
            }
        }
    }

    /// Number of registered connections
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub fn metrics(&self) -> HubMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Per-connection status rows, ordered by id
    pub async fn connections_info(&self) -> Vec<ConnectionInfo> {
        let mut rows: Vec<ConnectionInfo> = self
            .connections
            .read()
            .await
            .values()
            .map(|entry| ConnectionInfo {
                id: entry.id,
                state: entry.state(),
                connected_at: entry.connected_at,
                queued: entry.sender.len(),
                metrics: entry.metrics.snapshot(),
            })
            .collect();
        rows.sort_by_key(|row| row.id);
        rows
    }

    /// Close every queue (server shutdown)
    pub async fn close_all(&self) {
        let ids: Vec<ConnectionId> = self.connections.read().await.keys().copied().collect();
        for conn_id in ids {
            self.unregister_connection(conn_id).await;
        }
    }
}

/// One-shot check that a new connection reached Open
fn spawn_liveness_check(
    entry: Weak<ConnectionEntry>,
    metrics: Arc<HubMetrics>,
    delay: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let Some(entry) = entry.upgrade() else {
            return;
        };
        let state = entry.state();
        if state != ConnectionState::Open {
            metrics.liveness_warning();
            logger::warning(
                LogTag::Hub,
                &format!(
                    "Connection {} not open {}ms after connect (state={:?})",
                    entry.id,
                    delay.as_millis(),
                    state
                ),
            );
        }
    })
}
