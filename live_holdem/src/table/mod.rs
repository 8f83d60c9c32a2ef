//! Table module providing multi-table support with async actor model.
//!
//! This module implements:
//! - TableActor: Async actor that owns a single table and serializes every change to it
//! - TableManager: Registry that finds or creates tables for new connections
//! - Message-based communication with tokio channels
//!
//! ## Architecture
//!
//! Each table runs in a separate Tokio task with an mpsc message inbox.
//! Joins, actions, disconnects and restart timers all arrive as messages, so
//! the inbox is the table's lock: one message is handled, and its broadcast
//! pushed, before the next one is read.
//!
//! ## Example
//!
//! ```no_run
//! use live_holdem::game::showdown::RandomWinner;
//! use live_holdem::table::{TableConfig, TableManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = TableManager::new(TableConfig::default(), Arc::new(RandomWinner));
//!     let table = manager.find_or_create().await;
//!     println!("seating players at {}", table.table_id());
//! }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;

pub use actor::{TableActor, TableHandle};
pub use config::TableConfig;
pub use manager::TableManager;
pub use messages::{PlayerConnection, TableMessage, TableResponse, TableStatus};
