//! SDK for the Parigo betting game server.
//!
//! Contains the shared wire objects (bet requests, WebSocket envelopes,
//! monitor stats), the sequence-number tracker for stream consumers, and
//! the optimistic mutation client that applies bets locally ahead of
//! server confirmation.
//!
//! HTTP and WebSocket clients live behind the `client` cargo feature so
//! downstream crates that only need the shared types do not pull in
//! `reqwest` and `tokio-tungstenite`.

pub mod objects;
pub mod optimistic;
pub mod sequence;

#[cfg(feature = "client")]
pub mod client;
