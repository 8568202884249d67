/// Error taxonomy for the telemetry pipeline and observer hub
///
/// Every error is handled where it occurs (logged, message or sample
/// dropped); none of them terminates the process.
use thiserror::Error;

// =============================================================================
// DECODING
// =============================================================================

/// Raw payload could not be turned into a register array
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("empty payload")]
    EmptyPayload,

    #[error("payload is not valid UTF-8 text")]
    NotText,

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("buffer payload is malformed: {0}")]
    InvalidBuffer(String),

    #[error("no register data found in payload")]
    NoRegisterData,

    #[error("malformed register token '{token}'")]
    MalformedToken { token: String },
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Reasons a telemetry message produced no usable sample
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("corrupt register data: {values:?}")]
    CorruptRegisters { values: Vec<f64> },

    #[error("unclassifiable register data: {values:?}")]
    Unclassifiable { values: Vec<f64> },
}

// =============================================================================
// OBSERVER CONNECTIONS
// =============================================================================

/// Faults delivering to or receiving from one observer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectionError {
    #[error("connection {0} is closed")]
    Closed(u64),

    #[error("connection {0} outbound queue overflowed")]
    Overflow(u64),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Durable storage faults (logged, sample lost, no retry)
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to open store at {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("write failed: {0}")]
    Write(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

// =============================================================================
// TELEMETRY SOURCE
// =============================================================================

/// Upstream feed faults (the pipeline retries after a delay)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("stream error: {0}")]
    Stream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_converts_into_pipeline_error() {
        let err: PipelineError = DecodeError::NoRegisterData.into();
        assert_eq!(err, PipelineError::Decode(DecodeError::NoRegisterData));
        assert_eq!(err.to_string(), "no register data found in payload");
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = DecodeError::MalformedToken {
            token: "12a".to_string(),
        };
        assert_eq!(err.to_string(), "malformed register token '12a'");
        assert_eq!(ConnectionError::Overflow(7).to_string(), "connection 7 outbound queue overflowed");
        assert_eq!(
            ConnectionError::Send("broken pipe".to_string()).to_string(),
            "send failed: broken pipe"
        );
        assert_eq!(
            ConnectionError::Receive("reset".to_string()).to_string(),
            "receive failed: reset"
        );
    }
}
