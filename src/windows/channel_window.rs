/// Bounded per-quantity time series
///
/// Appends go to the tail; once a series exceeds the capacity its oldest
/// entry is evicted. The timestamp sequence follows the same rule, so
/// series that receive a value on every append stay index-aligned with
/// the timestamps.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// Points kept per series for live charts
pub const DEFAULT_WINDOW_CAPACITY: usize = 20;

#[derive(Debug, Clone)]
pub struct ChannelWindow {
    capacity: usize,
    timestamps: VecDeque<DateTime<Utc>>,
    series: BTreeMap<String, VecDeque<f64>>,
}

/// Owned copy of a window, safe to hand to a renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub labels: Vec<DateTime<Utc>>,
    pub series: BTreeMap<String, Vec<f64>>,
}

impl ChannelWindow {
    /// Create a window keeping at most `capacity` points (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            timestamps: VecDeque::with_capacity(capacity + 1),
            series: BTreeMap::new(),
        }
    }

    /// Append one labeled observation
    ///
    /// Series are created lazily on first use.
    pub fn append<I, L>(&mut self, timestamp: DateTime<Utc>, labeled_values: I)
    where
        I: IntoIterator<Item = (L, f64)>,
        L: Into<String>,
    {
        self.timestamps.push_back(timestamp);
        if self.timestamps.len() > self.capacity {
            self.timestamps.pop_front();
        }

        for (label, value) in labeled_values {
            let series = self
                .series
                .entry(label.into())
                .or_insert_with(|| VecDeque::with_capacity(self.capacity + 1));
            series.push_back(value);
            if series.len() > self.capacity {
                series.pop_front();
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained timestamps
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Retained values for one label, oldest first
    pub fn series(&self, label: &str) -> Option<Vec<f64>> {
        self.series.get(label).map(|s| s.iter().copied().collect())
    }

    /// Most recent value for one label
    pub fn latest(&self, label: &str) -> Option<f64> {
        self.series.get(label).and_then(|s| s.back().copied())
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            labels: self.timestamps.iter().copied().collect(),
            series: self
                .series
                .iter()
                .map(|(label, values)| (label.clone(), values.iter().copied().collect()))
                .collect(),
        }
    }
}

impl Default for ChannelWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_keeps_last_twenty_in_order() {
        let mut window = ChannelWindow::default();
        let start = Utc::now();

        for i in 0..35 {
            window.append(start + Duration::seconds(i), [("R", i as f64)]);
        }

        let expected: Vec<f64> = (15..35).map(|i| i as f64).collect();
        assert_eq!(window.series("R").unwrap(), expected);
        assert_eq!(window.len(), 20);
        assert_eq!(window.snapshot().labels.first(), Some(&(start + Duration::seconds(15))));
    }

    #[test]
    fn test_exactly_twenty_one_appends() {
        let mut window = ChannelWindow::new(20);
        for i in 0..21 {
            window.append(Utc::now(), [("thd", i as f64)]);
        }
        let series = window.series("thd").unwrap();
        assert_eq!(series.len(), 20);
        assert_eq!(series[0], 1.0);
        assert_eq!(window.latest("thd"), Some(20.0));
    }

    #[test]
    fn test_series_stay_aligned() {
        let mut window = ChannelWindow::new(3);
        for i in 0..5 {
            let v = i as f64;
            window.append(Utc::now(), [("R", v), ("Y", v + 0.5), ("B", v + 1.0)]);
        }

        let snapshot = window.snapshot();
        assert_eq!(snapshot.labels.len(), 3);
        for values in snapshot.series.values() {
            assert_eq!(values.len(), 3);
        }
        assert_eq!(window.series("Y").unwrap(), vec![2.5, 3.5, 4.5]);
    }

    #[test]
    fn test_series_created_lazily() {
        let mut window = ChannelWindow::new(5);
        assert!(window.series("powerFactor").is_none());
        window.append(Utc::now(), [("powerFactor".to_string(), 0.97)]);
        assert_eq!(window.series("powerFactor"), Some(vec![0.97]));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut window = ChannelWindow::new(0);
        window.append(Utc::now(), [("R", 1.0)]);
        window.append(Utc::now(), [("R", 2.0)]);
        assert_eq!(window.series("R"), Some(vec![2.0]));
    }
}
