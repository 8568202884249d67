/// Synthetic meter feed
///
/// Stands in for the meter when no upstream is configured. Every tick it
/// emits one realistic register payload, sometimes wrapped in a JSON
/// envelope or a serialized Buffer the way the real transport sends them.
use super::source::TelemetrySource;
use crate::arguments::is_debug_source_enabled;
use crate::errors::TelemetryError;
use crate::logger::{self, LogTag};
use crate::registers::RawMessage;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

pub struct SyntheticSource {
    ticker: Interval,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(period: Duration) -> Self {
        Self::with_rng(period, StdRng::from_entropy())
    }

    /// Deterministic feed for tests and demos
    pub fn with_seed(period: Duration, seed: u64) -> Self {
        Self::with_rng(period, StdRng::seed_from_u64(seed))
    }

    fn with_rng(period: Duration, rng: StdRng) -> Self {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker, rng }
    }
}

/// One random register list in wire format
pub fn random_register_text<R: Rng + ?Sized>(rng: &mut R) -> String {
    let values: Vec<f64> = match rng.gen_range(0..6) {
        0 => vec![rng.gen_range(0.80..0.99)],
        1 => vec![rng.gen_range(49.5..50.5)],
        2 => vec![rng.gen_range(0.80..0.99), rng.gen_range(1.0..8.0)],
        3 => (0..3).map(|_| rng.gen_range(220.0..240.0)).collect(),
        4 => (0..3).map(|_| rng.gen_range(5.0..40.0)).collect(),
        _ => vec![
            rng.gen_range(0.80..0.99),
            rng.gen_range(1.0..30.0),
            rng.gen_range(800.0..5000.0),
            rng.gen_range(1.0..8.0),
        ],
    };

    let tokens: Vec<String> = values.iter().map(|v| format!("{:.2}", v)).collect();
    format!("[{}]", tokens.join(","))
}

/// Random register list in one of the transport envelopes
pub fn random_payload<R: Rng + ?Sized>(rng: &mut R) -> String {
    let registers = random_register_text(rng);
    match rng.gen_range(0..3) {
        0 => registers,
        1 => serde_json::json!({ "data": registers }).to_string(),
        _ => serde_json::json!({
            "data": { "type": "Buffer", "data": registers.as_bytes() }
        })
        .to_string(),
    }
}

#[async_trait]
impl TelemetrySource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn next_message(&mut self) -> Result<Option<RawMessage>, TelemetryError> {
        self.ticker.tick().await;
        let payload = random_payload(&mut self.rng);

        if is_debug_source_enabled() {
            logger::debug(LogTag::Source, &format!("Synthetic payload: {}", payload));
        }
        Ok(Some(RawMessage::Text(payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{classify, decode_registers, payload_text};

    #[test]
    fn test_generated_payloads_classify_as_measurements() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let payload = random_payload(&mut rng);
            let text = payload_text(&payload).unwrap();
            let registers = decode_registers(&text).unwrap();
            let sample = classify(&registers);
            assert!(sample.is_measurement(), "{} -> {:?}", payload, sample);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_emits_on_every_tick() {
        let mut source = SyntheticSource::with_seed(Duration::from_millis(5000), 7);
        for _ in 0..3 {
            let message = source.next_message().await.unwrap();
            assert!(matches!(message, Some(RawMessage::Text(_))));
        }
    }
}
