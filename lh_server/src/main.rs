//! Multi-table hold'em server using the async actor model.
//!
//! Players connect over WebSocket, get seated at a waiting table by the
//! table registry, and play until they disconnect.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use lh_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use live_holdem::{TableManager, liveness::LivenessRegistry};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a multi-table hold'em server

USAGE:
  lh_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  TABLE_MAX_PLAYERS        Seats per table
  TABLE_SMALL_BLIND        Small blind
  TABLE_BIG_BLIND          Big blind
  WINNER_RESOLVER          random or best_hand
  METRICS_BIND             Prometheus exporter address
  (See .env.example for all configuration options)
";

/// How often registry gauges are refreshed.
const STATS_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    logging::init();

    let config = ServerConfig::from_env(bind)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported at http://{}/metrics", addr);
    }

    info!(
        "Tables: {} seats, blinds {}, starting stack {}, winner resolver {}",
        config.table.max_players,
        config.table.blinds(),
        config.table.starting_stack,
        config.resolver
    );

    let table_manager = Arc::new(TableManager::new(
        config.table.clone(),
        config.resolver.build(),
    ));

    tokio::spawn(report_stats(
        table_manager.clone(),
        config.idle_table_reclaim,
    ));

    let bind = config.bind;
    let state = AppState {
        table_manager,
        liveness: LivenessRegistry::new(),
        config: Arc::new(config),
    };

    let app = api::create_router(state);

    info!("Starting HTTP/WebSocket server on {}", bind);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind, e))?;

    info!("Server is running at ws://{}/ws. Press Ctrl+C to stop.", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Refreshes registry gauges and, when configured, reclaims tables that
/// have sat empty too long.
async fn report_stats(table_manager: Arc<TableManager>, idle_reclaim: Option<Duration>) {
    let mut ticker = tokio::time::interval(STATS_INTERVAL);
    loop {
        ticker.tick().await;

        if let Some(max_idle) = idle_reclaim {
            let reclaimed = table_manager.reclaim_idle(max_idle).await;
            if reclaimed > 0 {
                metrics::tables_reclaimed(reclaimed);
            }
        }

        metrics::record_tables(&table_manager.statuses().await);
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
