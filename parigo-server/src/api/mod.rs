//! HTTP and WebSocket API surface.

pub mod admin;
pub mod user;
