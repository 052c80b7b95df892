//! Long-running processors built on the entity queries.

pub mod reconciler;
pub mod snapshot;
pub mod stats;

pub use reconciler::{MonitorHandle, Reconciler, ReconcilerConfig};
pub use snapshot::{EntityId, Observation, ObservedValue, SnapshotCache};
pub use stats::{ChangeSummary, MonitorStats, RECENT_CHANGES_CAPACITY, StatsSnapshot};
