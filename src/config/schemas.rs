/// Configuration schemas - all config structures defined once with defaults
///
/// Each section is declared with `config_struct!`, so a TOML file only
/// needs to list the values it changes.
use crate::config_struct;
use serde::{Deserialize, Serialize};

// ============================================================================
// WEBSERVER CONFIGURATION
// ============================================================================

config_struct! {
    /// HTTP/WebSocket listener
    pub struct WebserverConfig {
        /// IP to bind: 127.0.0.1 = localhost only, 0.0.0.0 = all interfaces
        host: String = "0.0.0.0".to_string(),
        port: u16 = 8080,
        /// Directory holding index.html, dashboard.html and static assets
        public_dir: String = "public".to_string(),
    }
}

// ============================================================================
// BROADCAST HUB CONFIGURATION
// ============================================================================

/// What happens when an observer's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued envelope to make room
    DropOldest,
    /// Close the observer connection
    Disconnect,
}

config_struct! {
    /// Observer connection management
    pub struct HubConfig {
        /// Protocol-level ping period for open connections
        heartbeat_interval_ms: u64 = 5000,
        /// Delay before checking that a new connection reached Open
        liveness_check_ms: u64 = 2000,
        /// Per-observer outbound queue bound
        outbound_queue_capacity: usize = 256,
        overflow_policy: OverflowPolicy = OverflowPolicy::DropOldest,
        /// Close observers silent for this long (0 = never)
        idle_timeout_secs: u64 = 0,
    }
}

// ============================================================================
// WINDOW CONFIGURATION
// ============================================================================

config_struct! {
    /// Rolling history kept for live charts
    pub struct WindowConfig {
        capacity: usize = 20,
    }
}

// ============================================================================
// TELEMETRY SOURCE CONFIGURATION
// ============================================================================

config_struct! {
    /// Upstream telemetry feed
    pub struct SourceConfig {
        /// WebSocket URL of the upstream event stream (empty = synthetic generator)
        upstream_url: String = String::new(),
        synthetic_interval_ms: u64 = 5000,
        reconnect_delay_ms: u64 = 3000,
    }
}

// ============================================================================
// STORAGE CONFIGURATION
// ============================================================================

config_struct! {
    /// Durable sample archive
    pub struct StorageConfig {
        enabled: bool = true,
        database_path: String = "data/power.db".to_string(),
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration (data/config.toml)
    pub struct Config {
        webserver: WebserverConfig = WebserverConfig::default(),
        hub: HubConfig = HubConfig::default(),
        window: WindowConfig = WindowConfig::default(),
        source: SourceConfig = SourceConfig::default(),
        storage: StorageConfig = StorageConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_timings() {
        let config = Config::default();
        assert_eq!(config.hub.heartbeat_interval_ms, 5000);
        assert_eq!(config.hub.liveness_check_ms, 2000);
        assert_eq!(config.window.capacity, 20);
        assert_eq!(config.webserver.port, 8080);
        assert!(config.source.upstream_url.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [hub]
            overflow_policy = "disconnect"
            outbound_queue_capacity = 8

            [storage]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.overflow_policy, OverflowPolicy::Disconnect);
        assert_eq!(config.hub.outbound_queue_capacity, 8);
        assert_eq!(config.hub.heartbeat_interval_ms, 5000);
        assert!(!config.storage.enabled);
        assert_eq!(config.window.capacity, 20);
    }
}
