//! # Live Hold'em
//!
//! A real-time, multi-table Texas Hold'em engine.
//!
//! Players are seated at tables, each table runs its own betting state
//! machine, and every connected player receives a snapshot of the table
//! filtered for their eyes after each change.
//!
//! ## Architecture
//!
//! A table moves through six phases:
//!
//! - **Waiting**: fewer than two players ready
//! - **Preflop**: blinds posted, hole cards dealt
//! - **Flop/Turn/River**: community cards dealt, one betting street each
//! - **Showdown**: the pot is resolved, the next hand starts after a delay
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, table state machine and winner resolution
//! - [`table`]: Table actors and the table registry
//! - [`net`]: Wire envelopes, liveness tracking and stop signals
//!
//! ## Example
//!
//! ```
//! use live_holdem::game::{Table, entities::{Blinds, Player}, showdown::RandomWinner};
//!
//! let mut table = Table::new("t1".to_string(), Blinds { small: 5, big: 10 }, 9, 2);
//! table.seat(Player::new("a".to_string(), "Alice".to_string(), 1000)).unwrap();
//! table.seat(Player::new("b".to_string(), "Bob".to_string(), 1000)).unwrap();
//! table.start_round(&RandomWinner);
//! assert_eq!(table.pot(), 15);
//! ```

/// Networking components: message protocol and connection liveness.
pub mod net;
pub use net::{liveness, messages};

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{HandProgress, Table, UserError, entities};

/// Table actors and the table registry.
pub mod table;
pub use table::{TableConfig, TableHandle, TableManager};
