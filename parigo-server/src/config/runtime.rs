//! Validated runtime configuration derived from the TOML file.

use std::net::SocketAddr;

use parigo_core::processors::ReconcilerConfig;

/// Configuration after validation and unit conversion.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub listen: SocketAddr,
    pub monitor: ReconcilerConfig,
    pub event_capacity: usize,
}
