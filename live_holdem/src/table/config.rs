//! Table configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::entities::{Blinds, Chips};

/// Hard ceiling on seats: 23 players use 46 hole cards plus a 5-card board,
/// which is as many as a single deck can serve.
pub const MAX_SEATS: usize = 23;

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Seat cap per table (default: 9)
    pub max_players: usize,

    /// Small blind amount
    pub small_blind: Chips,

    /// Big blind amount
    pub big_blind: Chips,

    /// Connected players with chips needed before a hand starts (default: 2)
    pub min_players: usize,

    /// Stack handed to each newly connected player
    pub starting_stack: Chips,

    /// Pause between showdown and the next hand, in milliseconds
    pub showdown_delay_ms: u64,

    /// Per-connection outbound queue depth. A full queue counts as a
    /// failed push and disconnects the player.
    pub outbound_queue_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_players: 9,
            small_blind: 5,
            big_blind: 10,
            min_players: 2,
            starting_stack: 1000,
            showdown_delay_ms: 5000,
            outbound_queue_capacity: 64,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.small_blind == 0 {
            return Err("Small blind must be greater than zero".to_string());
        }

        if self.big_blind <= self.small_blind {
            return Err("Big blind must be greater than small blind".to_string());
        }

        if self.max_players < 2 || self.max_players > MAX_SEATS {
            return Err(format!("Max players must be between 2 and {MAX_SEATS}"));
        }

        if self.min_players < 2 || self.min_players > self.max_players {
            return Err("Min players must be between 2 and max players".to_string());
        }

        if self.starting_stack < self.big_blind {
            return Err("Starting stack must cover the big blind".to_string());
        }

        if self.starting_stack > self.max_starting_stack() {
            return Err(format!(
                "Starting stack must be at most {} so a full table's chips fit",
                self.max_starting_stack()
            ));
        }

        if self.outbound_queue_capacity == 0 {
            return Err("Outbound queue capacity must be at least 1".to_string());
        }

        Ok(())
    }

    /// Largest stack for which every seat's chips together still fit in
    /// [`Chips`].
    #[must_use]
    pub fn max_starting_stack(&self) -> Chips {
        let seats = Chips::try_from(self.max_players.max(1)).unwrap_or(Chips::MAX);
        Chips::MAX / seats
    }

    #[must_use]
    pub fn blinds(&self) -> Blinds {
        Blinds {
            small: self.small_blind,
            big: self.big_blind,
        }
    }

    #[must_use]
    pub fn showdown_delay(&self) -> Duration {
        Duration::from_millis(self.showdown_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TableConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.blinds(), Blinds { small: 5, big: 10 });
        assert_eq!(config.showdown_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_blind_ordering() {
        let config = TableConfig {
            small_blind: 10,
            big_blind: 10,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seat_bounds() {
        for max_players in [0, 1, MAX_SEATS + 1] {
            let config = TableConfig {
                max_players,
                ..TableConfig::default()
            };
            assert!(config.validate().is_err(), "max_players={max_players}");
        }

        let config = TableConfig {
            min_players: 10,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_starting_stack_must_cover_big_blind() {
        let config = TableConfig {
            starting_stack: 9,
            ..TableConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err("Starting stack must cover the big blind".to_string())
        );
    }

    #[test]
    fn test_starting_stack_capped_by_seat_count() {
        let config = TableConfig {
            max_players: 2,
            starting_stack: 3_000_000_000,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TableConfig {
            max_players: 2,
            starting_stack: Chips::MAX / 2,
            ..TableConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(
            Chips::try_from(config.max_players).unwrap() * config.starting_stack <= Chips::MAX
        );
    }
}
