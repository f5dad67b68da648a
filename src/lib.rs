#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

//! # Signal Relay Server
//!
//! An in-memory WebSocket signaling relay for WebRTC peers.
//!
//! Clients join a named channel, learn about each other through
//! `peer-joined`/`peer-left` notifications, exchange targeted signaling
//! payloads, and can ask for TURN relay credentials. Nothing is persisted.

/// Server configuration and environment variables
pub mod config;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Channel registry, sessions, and message routing
pub mod server;

/// TURN credential issuance
pub mod turn;

/// WebSocket connection handling and HTTP routes
pub mod websocket;
