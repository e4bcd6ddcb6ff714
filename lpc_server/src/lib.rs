//! HTTP and WebSocket front for the league live-ops core.
//!
//! Exposed as a library so integration tests can build the router without a
//! listener.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
