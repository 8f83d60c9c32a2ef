//! Wire protocol and connection bookkeeping.
//!
//! Messages travel as JSON `{type, payload}` envelopes. The transport
//! itself lives in the server crate; this module only knows how to encode,
//! decode and track liveness.

/// Protocol error types for inbound frames.
pub mod errors;

/// Heartbeat store and per-connection stop signal.
pub mod liveness;

/// Envelope types exchanged between clients and tables.
pub mod messages;
