/// Observer connection health
///
/// Heartbeat pacing and idle detection for one connection. Uses tokio's
/// clock so paused-time tests drive it deterministically.
use crate::config::HubConfig;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

// ============================================================================
// HEALTH CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Ping period while the connection is open
    pub heartbeat_interval: Duration,

    /// Delay before the one-shot liveness check
    pub liveness_check: Duration,

    /// Close after this much silence (None = never)
    pub idle_timeout: Option<Duration>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self::from_config(&HubConfig::default())
    }
}

impl HealthConfig {
    pub fn from_config(config: &HubConfig) -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms.max(1)),
            liveness_check: Duration::from_millis(config.liveness_check_ms),
            idle_timeout: (config.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(config.idle_timeout_secs)),
        }
    }
}

// ============================================================================
// CONNECTION HEALTH TRACKER
// ============================================================================

#[derive(Debug)]
pub struct ConnectionHealth {
    /// Last observer activity (any frame received)
    last_activity: Instant,

    config: HealthConfig,
}

impl ConnectionHealth {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            last_activity: Instant::now(),
            config,
        }
    }

    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// True when an idle timeout is configured and has elapsed
    pub fn is_idle(&self) -> bool {
        self.config
            .idle_timeout
            .map(|timeout| self.last_activity.elapsed() > timeout)
            .unwrap_or(false)
    }

    pub fn seconds_since_activity(&self) -> u64 {
        self.last_activity.elapsed().as_secs()
    }

    /// Ticker whose first tick lands one full period from now
    pub fn heartbeat_ticker(&self) -> Interval {
        let period = self.config.heartbeat_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_idle_timeout_disables_idle_check() {
        let config = HealthConfig::from_config(&HubConfig::default());
        assert!(config.idle_timeout.is_none());
        assert_eq!(config.heartbeat_interval, Duration::from_millis(5000));
        assert_eq!(config.liveness_check, Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_detection() {
        let mut health = ConnectionHealth::new(HealthConfig {
            heartbeat_interval: Duration::from_millis(50),
            liveness_check: Duration::from_millis(20),
            idle_timeout: Some(Duration::from_millis(100)),
        });

        assert!(!health.is_idle());
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(health.is_idle());

        health.record_activity();
        assert!(!health.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_first_tick_after_one_period() {
        let health = ConnectionHealth::new(HealthConfig {
            heartbeat_interval: Duration::from_millis(5000),
            liveness_check: Duration::from_millis(2000),
            idle_timeout: None,
        });
        let start = Instant::now();
        let mut ticker = health.heartbeat_ticker();
        ticker.tick().await;
        assert!(start.elapsed() >= Duration::from_millis(5000));
    }
}
