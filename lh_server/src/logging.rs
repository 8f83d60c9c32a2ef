//! Structured logging configuration.
//!
//! The game library logs through the `log` facade; the subscriber's
//! `tracing-log` bridge picks those records up next to the server's own
//! events.

use std::fmt;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "info,hyper=warn,tungstenite=warn";

/// Initialize structured logging. Levels come from `RUST_LOG`.
///
/// ```no_run
/// use lh_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!(filter = DEFAULT_FILTER, "Logging initialized (RUST_LOG overrides)");
}

/// Milestones in a player connection's life.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionEvent {
    Connected,
    Seated,
    Refused,
    Closed,
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Connected => "connected",
            Self::Seated => "seated",
            Self::Refused => "refused",
            Self::Closed => "closed",
        };
        write!(f, "{repr}")
    }
}

/// Log a connection milestone with structured fields.
///
/// Refusals log at warn; everything else at info.
pub fn log_connection_event(
    event: ConnectionEvent,
    player_id: &str,
    table_id: Option<&str>,
    detail: &str,
) {
    if event == ConnectionEvent::Refused {
        tracing::warn!(%event, player_id, table_id, "CONNECTION: {}", detail);
    } else {
        tracing::info!(%event, player_id, table_id, "CONNECTION: {}", detail);
    }
}

/// Log a frame the server refused to act on.
pub fn log_rejected_frame(player_id: &str, reason: &dyn fmt::Display) {
    tracing::debug!(player_id, %reason, "Rejected frame");
}
