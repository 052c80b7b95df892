//! Change events and their fan-out to transport sessions.

pub mod broadcaster;
pub mod types;

pub use broadcaster::{DEFAULT_EVENT_CAPACITY, EventBroadcaster, EventReceiver};
pub use types::{Change, ChangeEvent, ChangeKind, MonitorStatusEvent, StreamEvent};
