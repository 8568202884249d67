/// Persisted power record
use crate::registers::{ClassifiedSample, ThreePhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const ZERO_PHASES: ThreePhase = ThreePhase {
    r: 0.0,
    y: 0.0,
    b: 0.0,
};

/// One archived reading with every field filled in
///
/// Fields a sample does not carry take the storage defaults: zero per
/// phase for voltage and current, 1.0 power factor, 0.0 THD and active
/// power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerRecord {
    pub timestamp: DateTime<Utc>,
    pub voltage: ThreePhase,
    pub current: ThreePhase,
    pub power_factor: f64,
    pub thd: f64,
    pub active_power: f64,
}

impl PowerRecord {
    /// Record with every field at its default
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            voltage: ZERO_PHASES,
            current: ZERO_PHASES,
            power_factor: 1.0,
            thd: 0.0,
            active_power: 0.0,
        }
    }

    /// Build the archive row for a classified sample
    ///
    /// Frequency readings have no column of their own and are archived as a
    /// defaults-only row stamped with their arrival time. Corrupt and
    /// unclassifiable samples are never archived.
    pub fn from_sample(sample: &ClassifiedSample, timestamp: DateTime<Utc>) -> Option<Self> {
        let mut record = Self::empty(timestamp);

        match sample {
            ClassifiedSample::PowerFactor { value } => record.power_factor = *value,
            ClassifiedSample::Frequency { .. } => {}
            ClassifiedSample::PowerFactorAndThd { power_factor, thd } => {
                record.power_factor = power_factor.unwrap_or(1.0);
                record.thd = thd.unwrap_or(0.0);
            }
            ClassifiedSample::ThreePhaseVoltage(phases) => record.voltage = *phases,
            ClassifiedSample::ThreePhaseCurrent(phases) => record.current = *phases,
            ClassifiedSample::ActivePower { value } => record.active_power = *value,
            ClassifiedSample::Corrupt | ClassifiedSample::Unclassifiable => return None,
        }

        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_voltage_sample_defaults_other_fields() {
        let ts = Utc::now();
        let phases = ThreePhase {
            r: 230.0,
            y: 229.0,
            b: 231.0,
        };
        let record =
            PowerRecord::from_sample(&ClassifiedSample::ThreePhaseVoltage(phases), ts).unwrap();

        assert_eq!(record.voltage, phases);
        assert_eq!(record.current, ZERO_PHASES);
        assert_eq!(record.power_factor, 1.0);
        assert_eq!(record.thd, 0.0);
        assert_eq!(record.active_power, 0.0);
        assert_eq!(record.timestamp, ts);
    }

    #[test]
    fn test_missing_pf_and_thd_fall_back() {
        let record = PowerRecord::from_sample(
            &ClassifiedSample::PowerFactorAndThd {
                power_factor: None,
                thd: Some(4.2),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(record.power_factor, 1.0);
        assert_eq!(record.thd, 4.2);
    }

    #[test]
    fn test_discarded_samples_are_not_archived() {
        assert!(PowerRecord::from_sample(&ClassifiedSample::Corrupt, Utc::now()).is_none());
        assert!(PowerRecord::from_sample(&ClassifiedSample::Unclassifiable, Utc::now()).is_none());
    }

    #[test]
    fn test_record_wire_shape() {
        let record = PowerRecord::from_sample(
            &ClassifiedSample::ActivePower { value: 1500.0 },
            Utc::now(),
        )
        .unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["activePower"], json!(1500.0));
        assert_eq!(value["powerFactor"], json!(1.0));
        assert_eq!(value["voltage"], json!({"R": 0.0, "Y": 0.0, "B": 0.0}));
    }
}
