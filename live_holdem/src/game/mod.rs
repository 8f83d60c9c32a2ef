//! Poker game engine: cards, the table state machine and showdown.
//!
//! This module provides:
//! - Card, deck, player and view types
//! - The per-table betting state machine
//! - Pluggable winner resolution

pub mod entities;
pub mod showdown;
pub mod state_machine;

pub use state_machine::{HandProgress, PruneReport, Table, UserError};
