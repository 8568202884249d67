/// Register data model
use crate::errors::DecodeError;
use serde::{Deserialize, Serialize};

// ============================================================================
// RAW MESSAGE
// ============================================================================

/// Message as received from a transport, consumed once
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl RawMessage {
    /// Convert to text, decoding binary frames as UTF-8
    pub fn into_text(self) -> Result<String, DecodeError> {
        let text = match self {
            RawMessage::Text(text) => text,
            RawMessage::Binary(bytes) => {
                String::from_utf8(bytes).map_err(|_| DecodeError::NotText)?
            }
        };

        if text.trim().is_empty() {
            return Err(DecodeError::EmptyPayload);
        }
        Ok(text)
    }
}

impl From<String> for RawMessage {
    fn from(text: String) -> Self {
        RawMessage::Text(text)
    }
}

impl From<&str> for RawMessage {
    fn from(text: &str) -> Self {
        RawMessage::Text(text.to_string())
    }
}

// ============================================================================
// REGISTER ARRAY
// ============================================================================

/// Ordered register values decoded from one message (never empty)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NumericRegisterArray(Vec<f64>);

impl NumericRegisterArray {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.0
    }
}

// ============================================================================
// CLASSIFIED SAMPLE
// ============================================================================

/// One reading per electrical phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreePhase {
    #[serde(rename = "R")]
    pub r: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "B")]
    pub b: f64,
}

impl ThreePhase {
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [r, y, b] => Some(Self {
                r: *r,
                y: *y,
                b: *b,
            }),
            _ => None,
        }
    }

    pub fn average(&self) -> f64 {
        (self.r + self.y + self.b) / 3.0
    }

    pub fn labeled(&self) -> [(&'static str, f64); 3] {
        [("R", self.r), ("Y", self.y), ("B", self.b)]
    }
}

/// Physical quantity a register array was recognised as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedSample {
    PowerFactor {
        value: f64,
    },
    Frequency {
        value: f64,
    },
    #[serde(rename = "power_factor_thd", rename_all = "camelCase")]
    PowerFactorAndThd {
        power_factor: Option<f64>,
        thd: Option<f64>,
    },
    ThreePhaseVoltage(ThreePhase),
    ThreePhaseCurrent(ThreePhase),
    ActivePower {
        value: f64,
    },
    /// Range-violating or non-finite triple
    Corrupt,
    /// No rule matched
    Unclassifiable,
}

impl ClassifiedSample {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedSample::PowerFactor { .. } => "power_factor",
            ClassifiedSample::Frequency { .. } => "frequency",
            ClassifiedSample::PowerFactorAndThd { .. } => "power_factor_thd",
            ClassifiedSample::ThreePhaseVoltage(_) => "three_phase_voltage",
            ClassifiedSample::ThreePhaseCurrent(_) => "three_phase_current",
            ClassifiedSample::ActivePower { .. } => "active_power",
            ClassifiedSample::Corrupt => "corrupt",
            ClassifiedSample::Unclassifiable => "unclassifiable",
        }
    }

    /// True for samples that may be windowed and persisted
    pub fn is_measurement(&self) -> bool {
        !matches!(
            self,
            ClassifiedSample::Corrupt | ClassifiedSample::Unclassifiable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binary_message_decodes_utf8() {
        let raw = RawMessage::Binary(b"[1,2]".to_vec());
        assert_eq!(raw.into_text().unwrap(), "[1,2]");
    }

    #[test]
    fn test_invalid_utf8_is_not_text() {
        let raw = RawMessage::Binary(vec![0xff, 0xfe, 0x5b]);
        assert_eq!(raw.into_text(), Err(DecodeError::NotText));
    }

    #[test]
    fn test_empty_message_rejected() {
        assert_eq!(RawMessage::from("  ").into_text(), Err(DecodeError::EmptyPayload));
        assert_eq!(RawMessage::Binary(vec![]).into_text(), Err(DecodeError::EmptyPayload));
    }

    #[test]
    fn test_sample_serialization_shape() {
        let voltage = ClassifiedSample::ThreePhaseVoltage(ThreePhase {
            r: 230.0,
            y: 229.0,
            b: 231.0,
        });
        assert_eq!(
            serde_json::to_value(&voltage).unwrap(),
            json!({"kind": "three_phase_voltage", "R": 230.0, "Y": 229.0, "B": 231.0})
        );

        let pf_thd = ClassifiedSample::PowerFactorAndThd {
            power_factor: Some(0.9),
            thd: None,
        };
        assert_eq!(
            serde_json::to_value(&pf_thd).unwrap(),
            json!({"kind": "power_factor_thd", "powerFactor": 0.9, "thd": null})
        );
    }

    #[test]
    fn test_three_phase_average() {
        let phases = ThreePhase::from_slice(&[230.0, 229.0, 231.0]).unwrap();
        assert!((phases.average() - 230.0).abs() < 1e-9);
        assert!(ThreePhase::from_slice(&[1.0, 2.0]).is_none());
    }
}
