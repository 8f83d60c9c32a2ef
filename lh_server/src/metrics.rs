//! Prometheus metrics for tables and player connections.
//!
//! Exported in Prometheus text format when `METRICS_BIND` is set. Without
//! an installed exporter every recorder call is a no-op, so handlers record
//! unconditionally.
//!
//! ```rust,no_run
//! use lh_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! metrics::connection_opened();
//! ```

use live_holdem::table::TableStatus;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::api::rate_limiter::Window;

/// Install the Prometheus exporter, serving `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Connection Metrics
// ============================================================================

pub fn connection_opened() {
    metrics::counter!("holdem_connections_total").increment(1);
}

/// Connections currently holding a liveness record.
pub fn connections_active(count: usize) {
    metrics::gauge!("holdem_connections_active").set(count as f64);
}

pub fn frame_sent() {
    metrics::counter!("holdem_frames_sent_total").increment(1);
}

pub fn frame_received() {
    metrics::counter!("holdem_frames_received_total").increment(1);
}

pub fn liveness_expired() {
    metrics::counter!("holdem_liveness_expirations_total").increment(1);
}

pub fn frame_rate_limited(window: Window) {
    metrics::counter!("holdem_rate_limited_frames_total",
        "window" => window.as_str()
    )
    .increment(1);
}

// ============================================================================
// Table Metrics
// ============================================================================

/// Refresh the registry gauges from the latest table statuses.
pub fn record_tables(statuses: &[TableStatus]) {
    let seated: usize = statuses.iter().map(|s| s.seated).sum();
    let in_hand = statuses.iter().filter(|s| s.phase.is_betting()).count();
    let hands: u64 = statuses.iter().map(|s| s.hand_number).sum();

    metrics::gauge!("holdem_tables_active").set(statuses.len() as f64);
    metrics::gauge!("holdem_tables_in_hand").set(in_hand as f64);
    metrics::gauge!("holdem_players_seated").set(seated as f64);
    // Summed over live tables, so it drops when a table is reclaimed.
    metrics::gauge!("holdem_hands_started").set(hands as f64);
}

pub fn tables_reclaimed(count: usize) {
    metrics::counter!("holdem_tables_reclaimed_total").increment(count as u64);
}

pub fn action_processed(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    metrics::counter!("holdem_actions_total", "outcome" => outcome).increment(1);
}
