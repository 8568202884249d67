/// Observer message schema
///
/// Every frame sent to an observer is a `{type, data}` envelope:
/// - `echo`: an observer's own message sent back to it
/// - `iot`: raw telemetry text as received from the source
/// - `sample`: a classified register sample
/// - `snapshot`: the retained live windows, sent once after connect
use crate::errors::DecodeError;
use crate::registers::normalize_buffer_data;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// ENVELOPE KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Echo,
    Iot,
    Sample,
    Snapshot,
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::Echo => "echo",
            EnvelopeKind::Iot => "iot",
            EnvelopeKind::Sample => "sample",
            EnvelopeKind::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// BROADCAST ENVELOPE
// ============================================================================

/// Unit delivered to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub data: Value,
}

impl BroadcastEnvelope {
    pub fn new(kind: EnvelopeKind, data: Value) -> Self {
        Self { kind, data }
    }

    /// Raw telemetry relay
    pub fn iot(text: impl Into<String>) -> Self {
        Self::new(EnvelopeKind::Iot, Value::String(text.into()))
    }

    /// Envelope carrying any serializable payload
    pub fn from_payload<T: Serialize>(
        kind: EnvelopeKind,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_value(payload)?))
    }

    /// Build the echo reply for an observer's inbound text
    ///
    /// The text must be JSON. A Buffer-shaped `data` field is decoded to
    /// a UTF-8 string before the message is wrapped.
    pub fn echo_of(text: &str) -> Result<Self, DecodeError> {
        let mut message: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
        normalize_buffer_data(&mut message)?;
        Ok(Self::new(EnvelopeKind::Echo, message))
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::ClassifiedSample;
    use serde_json::json;

    #[test]
    fn test_iot_envelope_wire_format() {
        let envelope = BroadcastEnvelope::iot("[230.1,229.8,231.0]");
        assert_eq!(
            envelope.to_json().unwrap(),
            r#"{"type":"iot","data":"[230.1,229.8,231.0]"}"#
        );
    }

    #[test]
    fn test_echo_decodes_buffer_data() {
        // "[1]" as bytes
        let text = r#"{"message":"hello","data":{"type":"Buffer","data":[91,49,93]}}"#;
        let envelope = BroadcastEnvelope::echo_of(text).unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Echo);
        assert_eq!(envelope.data, json!({"message": "hello", "data": "[1]"}));
    }

    #[test]
    fn test_echo_keeps_plain_messages() {
        let envelope = BroadcastEnvelope::echo_of(r#"{"message":"ping"}"#).unwrap();
        assert_eq!(envelope.data, json!({"message": "ping"}));
    }

    #[test]
    fn test_echo_rejects_non_json() {
        assert!(matches!(
            BroadcastEnvelope::echo_of("not json"),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_sample_envelope() {
        let envelope = BroadcastEnvelope::from_payload(
            EnvelopeKind::Sample,
            &ClassifiedSample::Frequency { value: 50.0 },
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"type": "sample", "data": {"kind": "frequency", "value": 50.0}})
        );
    }
}
