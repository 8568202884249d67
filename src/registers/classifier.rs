/// Heuristic register classifier
///
/// The meter publishes untyped register tuples; the quantity is inferred
/// from the tuple length and value ranges. Rules are evaluated top to
/// bottom and the first rule whose arity matches and whose predicate
/// accepts the values wins. Later rules assume earlier ones did not match.
///
/// Known limitation: ranges overlap (a 3-tuple of values in [0,100] is
/// always current, a 1-tuple of 0.5 is always power factor), so a reading
/// can be misattributed. The dispatch never looks at history.
use super::types::{ClassifiedSample, NumericRegisterArray, ThreePhase};
use crate::arguments::is_debug_classifier_enabled;
use crate::logger::{self, LogTag};
use std::ops::RangeInclusive;

// ============================================================================
// RANGES
// ============================================================================

pub const POWER_FACTOR_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const FREQUENCY_RANGE: RangeInclusive<f64> = 40.0..=60.0;
pub const THD_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const VOLTAGE_RANGE: RangeInclusive<f64> = 200.0..=500.0;
pub const CURRENT_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const ACTIVE_POWER_RANGE: RangeInclusive<f64> = 50.0..=50_000.0;

/// Any 3-tuple element above this is treated as corrupt
pub const CORRUPT_LIMIT: f64 = 1_000_000.0;

// ============================================================================
// RULE TABLE
// ============================================================================

/// Register count a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn matches(&self, len: usize) -> bool {
        match *self {
            Arity::Exactly(n) => len == n,
            Arity::AtLeast(n) => len >= n,
        }
    }
}

/// One row of the dispatch table
pub struct Rule {
    pub name: &'static str,
    pub arity: Arity,
    pub apply: fn(&[f64]) -> Option<ClassifiedSample>,
}

/// Dispatch table in evaluation order
pub const RULES: &[Rule] = &[
    Rule {
        name: "power_factor",
        arity: Arity::Exactly(1),
        apply: single_power_factor,
    },
    Rule {
        name: "frequency",
        arity: Arity::Exactly(1),
        apply: single_frequency,
    },
    Rule {
        name: "power_factor_thd",
        arity: Arity::Exactly(2),
        apply: power_factor_and_thd,
    },
    Rule {
        name: "corrupt",
        arity: Arity::Exactly(3),
        apply: corrupt_triple,
    },
    Rule {
        name: "three_phase",
        arity: Arity::Exactly(3),
        apply: three_phase,
    },
    Rule {
        name: "active_power",
        arity: Arity::AtLeast(4),
        apply: first_active_power,
    },
];

/// Classify a decoded register array
///
/// Pure and deterministic: the result depends only on the length and the
/// values of `registers`.
pub fn classify(registers: &NumericRegisterArray) -> ClassifiedSample {
    let values = registers.values();

    for rule in RULES.iter().filter(|rule| rule.arity.matches(values.len())) {
        if let Some(sample) = (rule.apply)(values) {
            if is_debug_classifier_enabled() {
                logger::debug(
                    LogTag::Classifier,
                    &format!("{:?} matched rule '{}' -> {}", values, rule.name, sample.kind()),
                );
            }
            return sample;
        }
    }

    if is_debug_classifier_enabled() {
        logger::debug(
            LogTag::Classifier,
            &format!("{:?} matched no rule", values),
        );
    }
    ClassifiedSample::Unclassifiable
}

// ============================================================================
// RULES
// ============================================================================

fn single_power_factor(values: &[f64]) -> Option<ClassifiedSample> {
    let value = values[0];
    POWER_FACTOR_RANGE
        .contains(&value)
        .then_some(ClassifiedSample::PowerFactor { value })
}

fn single_frequency(values: &[f64]) -> Option<ClassifiedSample> {
    let value = values[0];
    FREQUENCY_RANGE
        .contains(&value)
        .then_some(ClassifiedSample::Frequency { value })
}

/// Always matches: each field is kept only if it is in range
fn power_factor_and_thd(values: &[f64]) -> Option<ClassifiedSample> {
    let power_factor = Some(values[0]).filter(|v| POWER_FACTOR_RANGE.contains(v));
    let thd = Some(values[1]).filter(|v| THD_RANGE.contains(v));
    Some(ClassifiedSample::PowerFactorAndThd { power_factor, thd })
}

/// Short-circuits the triple rules
fn corrupt_triple(values: &[f64]) -> Option<ClassifiedSample> {
    values
        .iter()
        .any(|v| !v.is_finite() || *v > CORRUPT_LIMIT)
        .then_some(ClassifiedSample::Corrupt)
}

/// Voltage when any phase is in the voltage band, current when every phase
/// is in the current band
///
/// Both predicates are evaluated; voltage is checked first and wins if both
/// were ever to hold.
fn three_phase(values: &[f64]) -> Option<ClassifiedSample> {
    let phases = ThreePhase::from_slice(values)?;
    let is_voltage = values.iter().any(|v| VOLTAGE_RANGE.contains(v));
    let is_current = values.iter().all(|v| CURRENT_RANGE.contains(v));

    match (is_voltage, is_current) {
        (true, _) => Some(ClassifiedSample::ThreePhaseVoltage(phases)),
        (false, true) => Some(ClassifiedSample::ThreePhaseCurrent(phases)),
        (false, false) => None,
    }
}

/// First element in the active power band
fn first_active_power(values: &[f64]) -> Option<ClassifiedSample> {
    values
        .iter()
        .copied()
        .find(|v| ACTIVE_POWER_RANGE.contains(v))
        .map(|value| ClassifiedSample::ActivePower { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_values(values: &[f64]) -> ClassifiedSample {
        classify(&NumericRegisterArray::new(values.to_vec()))
    }

    #[test]
    fn test_single_value_rules() {
        assert_eq!(
            classify_values(&[0.85]),
            ClassifiedSample::PowerFactor { value: 0.85 }
        );
        assert_eq!(
            classify_values(&[50.0]),
            ClassifiedSample::Frequency { value: 50.0 }
        );
        assert_eq!(classify_values(&[1.5]), ClassifiedSample::Unclassifiable);
    }

    #[test]
    fn test_single_value_boundaries() {
        assert_eq!(classify_values(&[0.0]), ClassifiedSample::PowerFactor { value: 0.0 });
        assert_eq!(classify_values(&[1.0]), ClassifiedSample::PowerFactor { value: 1.0 });
        assert_eq!(classify_values(&[40.0]), ClassifiedSample::Frequency { value: 40.0 });
        assert_eq!(classify_values(&[60.0]), ClassifiedSample::Frequency { value: 60.0 });
        assert_eq!(classify_values(&[60.5]), ClassifiedSample::Unclassifiable);
    }

    #[test]
    fn test_pair_keeps_valid_fields() {
        assert_eq!(
            classify_values(&[0.9, 3.2]),
            ClassifiedSample::PowerFactorAndThd {
                power_factor: Some(0.9),
                thd: Some(3.2)
            }
        );
        assert_eq!(
            classify_values(&[1.5, 200.0]),
            ClassifiedSample::PowerFactorAndThd {
                power_factor: None,
                thd: None
            }
        );
        assert_eq!(
            classify_values(&[0.5, 150.0]),
            ClassifiedSample::PowerFactorAndThd {
                power_factor: Some(0.5),
                thd: None
            }
        );
    }

    #[test]
    fn test_three_phase_voltage() {
        assert_eq!(
            classify_values(&[230.0, 229.0, 231.0]),
            ClassifiedSample::ThreePhaseVoltage(ThreePhase {
                r: 230.0,
                y: 229.0,
                b: 231.0
            })
        );
        // One phase in band is enough
        assert!(matches!(
            classify_values(&[0.0, 0.0, 240.0]),
            ClassifiedSample::ThreePhaseVoltage(_)
        ));
    }

    #[test]
    fn test_three_phase_current() {
        assert_eq!(
            classify_values(&[10.0, 20.0, 30.0]),
            ClassifiedSample::ThreePhaseCurrent(ThreePhase {
                r: 10.0,
                y: 20.0,
                b: 30.0
            })
        );
    }

    #[test]
    fn test_three_phase_neither() {
        assert_eq!(
            classify_values(&[150.0, 120.0, 110.0]),
            ClassifiedSample::Unclassifiable
        );
        assert_eq!(
            classify_values(&[-5.0, 10.0, 20.0]),
            ClassifiedSample::Unclassifiable
        );
    }

    #[test]
    fn test_corrupt_short_circuits() {
        assert_eq!(
            classify_values(&[2_000_000.0, 1.0, 2.0]),
            ClassifiedSample::Corrupt
        );
        assert_eq!(
            classify_values(&[230.0, f64::INFINITY, 231.0]),
            ClassifiedSample::Corrupt
        );
        assert_eq!(
            classify_values(&[230.0, f64::NAN, 231.0]),
            ClassifiedSample::Corrupt
        );
    }

    #[test]
    fn test_active_power_first_in_range_wins() {
        assert_eq!(
            classify_values(&[5.0, 100.0, 200.0, 300.0]),
            ClassifiedSample::ActivePower { value: 100.0 }
        );
        assert_eq!(
            classify_values(&[1.0, 2.0, 3.0, 60_000.0, 4.0]),
            ClassifiedSample::Unclassifiable
        );
    }

    #[test]
    fn test_rule_order_is_stable() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "power_factor",
                "frequency",
                "power_factor_thd",
                "corrupt",
                "three_phase",
                "active_power"
            ]
        );
    }

    #[test]
    fn test_empty_is_unclassifiable() {
        assert_eq!(classify_values(&[]), ClassifiedSample::Unclassifiable);
    }
}
