//! Application state shared across all request handlers.

use std::sync::Arc;

use parigo_core::events::EventBroadcaster;
use parigo_core::processors::MonitorStats;
use sqlx::PgPool;
use tokio::sync::RwLock;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc
/// or is itself a handle).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Fan-out channel for consistency stream events.
    pub events: EventBroadcaster,
    /// Counters of the reconciliation monitor, shared with its task.
    pub monitor_stats: Arc<RwLock<MonitorStats>>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        events: EventBroadcaster,
        monitor_stats: Arc<RwLock<MonitorStats>>,
    ) -> Self {
        Self {
            db,
            events,
            monitor_stats,
        }
    }
}
