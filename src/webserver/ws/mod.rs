/// Observer WebSocket hub
///
/// ## Key Components
/// - `hub`: connection set, fan-out and liveness checks
/// - `connection`: per-observer task (echo, heartbeat, teardown)
/// - `outbound`: bounded per-observer queue with overflow policy
/// - `message`: `{type, data}` envelope schema
/// - `health`: heartbeat pacing and idle detection
/// - `metrics`: hub and per-connection counters
pub mod connection;
pub mod health;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod outbound;

pub use hub::{BroadcastHub, BroadcastReport, ConnectionId, ConnectionState, Registration};
pub use message::{BroadcastEnvelope, EnvelopeKind};
