//! TOML file configuration structures.
//!
//! These structs directly map to the `parigo-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub monitor: MonitorSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// `[monitor]` section controlling the consistency reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSection {
    /// Seconds between reconciliation cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// How many minutes back the windowed store queries look.
    #[serde(default = "default_recency_window_minutes")]
    pub recency_window_minutes: u64,
    /// Minutes of silence before a cached snapshot entry is evicted.
    #[serde(default = "default_snapshot_ttl_minutes")]
    pub snapshot_ttl_minutes: u64,
    /// Broadcast channel capacity per attached session.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            recency_window_minutes: default_recency_window_minutes(),
            snapshot_ttl_minutes: default_snapshot_ttl_minutes(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_recency_window_minutes() -> u64 {
    5
}

fn default_snapshot_ttl_minutes() -> u64 {
    30
}

fn default_event_capacity() -> usize {
    256
}
