//! Hold'em table server: WebSocket transport, configuration, logging and
//! metrics around the `live_holdem` engine.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
