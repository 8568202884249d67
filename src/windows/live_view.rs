/// Live dashboard state fed by classified samples
///
/// Holds the three chart windows and the latest single-value readouts.
/// Writers take a short lock per sample; readers get an owned snapshot so
/// rendering never holds the lock.
use super::channel_window::{ChannelWindow, WindowSnapshot};
use crate::arguments::is_debug_window_enabled;
use crate::logger::{self, LogTag};
use crate::registers::ClassifiedSample;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Latest single-value readings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveReadouts {
    pub power_factor: Option<f64>,
    pub frequency: Option<f64>,
    pub thd: Option<f64>,
    pub average_voltage: Option<f64>,
    pub active_power: Option<f64>,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct LiveState {
    voltage: ChannelWindow,
    current: ChannelWindow,
    power_quality: ChannelWindow,
    readouts: LiveReadouts,
}

/// Copy of the live state for observers and the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveViewSnapshot {
    pub voltage: WindowSnapshot,
    pub current: WindowSnapshot,
    pub power_quality: WindowSnapshot,
    pub readouts: LiveReadouts,
}

#[derive(Debug)]
pub struct LiveView {
    state: RwLock<LiveState>,
}

impl LiveView {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(LiveState {
                voltage: ChannelWindow::new(capacity),
                current: ChannelWindow::new(capacity),
                power_quality: ChannelWindow::new(capacity),
                readouts: LiveReadouts::default(),
            }),
        }
    }

    /// Fold one classified sample into the windows and readouts
    ///
    /// Returns false when the sample does not touch the live view
    /// (corrupt, unclassifiable).
    pub fn record(&self, timestamp: DateTime<Utc>, sample: &ClassifiedSample) -> bool {
        let mut state = self.state.write();

        match sample {
            ClassifiedSample::PowerFactor { value } => {
                state.readouts.power_factor = Some(*value);
            }
            ClassifiedSample::Frequency { value } => {
                state.readouts.frequency = Some(*value);
            }
            ClassifiedSample::PowerFactorAndThd { power_factor, thd } => {
                if let Some(pf) = power_factor {
                    state.readouts.power_factor = Some(*pf);
                }
                if let Some(thd) = thd {
                    state.readouts.thd = Some(*thd);
                }
                // Chart only complete pairs
                if let (Some(pf), Some(thd)) = (power_factor, thd) {
                    state
                        .power_quality
                        .append(timestamp, [("powerFactor", *pf), ("thd", *thd)]);
                }
            }
            ClassifiedSample::ThreePhaseVoltage(phases) => {
                state.voltage.append(timestamp, phases.labeled());
                state.readouts.average_voltage = Some(phases.average());
            }
            ClassifiedSample::ThreePhaseCurrent(phases) => {
                state.current.append(timestamp, phases.labeled());
            }
            ClassifiedSample::ActivePower { value } => {
                state.readouts.active_power = Some(*value);
            }
            ClassifiedSample::Corrupt | ClassifiedSample::Unclassifiable => return false,
        }

        state.readouts.last_update = Some(timestamp);

        if is_debug_window_enabled() {
            logger::debug(
                LogTag::Window,
                &format!(
                    "Recorded {} (voltage={}, current={}, pf/thd={})",
                    sample.kind(),
                    state.voltage.len(),
                    state.current.len(),
                    state.power_quality.len()
                ),
            );
        }
        true
    }

    pub fn snapshot(&self) -> LiveViewSnapshot {
        let state = self.state.read();
        LiveViewSnapshot {
            voltage: state.voltage.snapshot(),
            current: state.current.snapshot(),
            power_quality: state.power_quality.snapshot(),
            readouts: state.readouts.clone(),
        }
    }

    pub fn readouts(&self) -> LiveReadouts {
        self.state.read().readouts.clone()
    }
}

impl Default for LiveView {
    fn default() -> Self {
        Self::new(super::DEFAULT_WINDOW_CAPACITY)
    }
}
