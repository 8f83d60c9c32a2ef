//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use live_holdem::{game::showdown::ResolverKind, table::TableConfig};
use std::{net::SocketAddr, time::Duration};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Table settings shared by every table
    pub table: TableConfig,
    /// Per-connection settings
    pub connection: ConnectionConfig,
    /// Showdown strategy
    pub resolver: ResolverKind,
    /// Age at which an empty table is reclaimed (disabled when `None`)
    pub idle_table_reclaim: Option<Duration>,
    /// Prometheus exporter address (disabled when `None`)
    pub metrics_bind: Option<SocketAddr>,
}

/// Connection lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Silence allowed before a connection is dropped
    pub liveness_timeout: Duration,
    /// Interval between liveness probes
    pub liveness_period: Duration,
    /// Deadline for a single frame write
    pub write_timeout: Duration,
    /// Largest inbound frame accepted, in bytes
    pub max_message_size: usize,
    /// Frames allowed per second
    pub burst_limit: usize,
    /// Frames allowed per minute
    pub sustained_limit: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            liveness_timeout: Duration::from_secs(60),
            liveness_period: Duration::from_secs(54),
            write_timeout: Duration::from_secs(10),
            max_message_size: 512,
            burst_limit: 10,
            sustained_limit: 100,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let defaults = TableConfig::default();
        let table = TableConfig {
            max_players: parse_env_or("TABLE_MAX_PLAYERS", defaults.max_players)?,
            small_blind: parse_env_or("TABLE_SMALL_BLIND", defaults.small_blind)?,
            big_blind: parse_env_or("TABLE_BIG_BLIND", defaults.big_blind)?,
            min_players: parse_env_or("TABLE_MIN_PLAYERS", defaults.min_players)?,
            starting_stack: parse_env_or("STARTING_STACK", defaults.starting_stack)?,
            showdown_delay_ms: parse_env_or("SHOWDOWN_DELAY_MS", defaults.showdown_delay_ms)?,
            outbound_queue_capacity: parse_env_or(
                "OUTBOUND_QUEUE_CAPACITY",
                defaults.outbound_queue_capacity,
            )?,
        };

        let liveness_timeout_ms: u64 = parse_env_or("LIVENESS_TIMEOUT_MS", 60_000)?;
        // Probe at 9/10 of the timeout unless told otherwise.
        let liveness_period_ms: u64 =
            parse_env_or("LIVENESS_PERIOD_MS", liveness_timeout_ms / 10 * 9)?;
        let connection = ConnectionConfig {
            liveness_timeout: Duration::from_millis(liveness_timeout_ms),
            liveness_period: Duration::from_millis(liveness_period_ms),
            write_timeout: Duration::from_millis(parse_env_or("WRITE_TIMEOUT_MS", 10_000)?),
            max_message_size: parse_env_or("MAX_MESSAGE_SIZE", 512)?,
            burst_limit: parse_env_or("WS_BURST_LIMIT", 10)?,
            sustained_limit: parse_env_or("WS_SUSTAINED_LIMIT", 100)?,
        };

        let resolver = parse_env_or("WINNER_RESOLVER", ResolverKind::default())?;

        let reclaim_secs: u64 = parse_env_or("TABLE_IDLE_RECLAIM_SECS", 0)?;
        let idle_table_reclaim = (reclaim_secs > 0).then(|| Duration::from_secs(reclaim_secs));

        let metrics_bind = parse_env("METRICS_BIND")?;

        Ok(ServerConfig {
            bind,
            table,
            connection,
            resolver,
            idle_table_reclaim,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        let table = &self.table;

        // Validate blinds
        if table.small_blind == 0 {
            return Err(ConfigError::Invalid {
                var: "TABLE_SMALL_BLIND".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if table.big_blind <= table.small_blind {
            return Err(ConfigError::Invalid {
                var: "TABLE_BIG_BLIND".to_string(),
                reason: format!("Must be greater than small blind ({})", table.small_blind),
            });
        }

        // Validate player counts
        if table.max_players < 2 || table.max_players > 23 {
            return Err(ConfigError::Invalid {
                var: "TABLE_MAX_PLAYERS".to_string(),
                reason: "Must be between 2 and 23 (max players with 52-card deck)".to_string(),
            });
        }

        if table.min_players < 2 || table.min_players > table.max_players {
            return Err(ConfigError::Invalid {
                var: "TABLE_MIN_PLAYERS".to_string(),
                reason: format!("Must be between 2 and max players ({})", table.max_players),
            });
        }

        if table.starting_stack < table.big_blind {
            return Err(ConfigError::Invalid {
                var: "STARTING_STACK".to_string(),
                reason: format!("Must cover the big blind ({})", table.big_blind),
            });
        }

        if table.starting_stack > table.max_starting_stack() {
            return Err(ConfigError::Invalid {
                var: "STARTING_STACK".to_string(),
                reason: format!(
                    "Must be at most {} with {} seats",
                    table.max_starting_stack(),
                    table.max_players
                ),
            });
        }

        if table.outbound_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "OUTBOUND_QUEUE_CAPACITY".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        // Validate liveness timing
        let connection = &self.connection;
        if connection.liveness_period.is_zero() {
            return Err(ConfigError::Invalid {
                var: "LIVENESS_PERIOD_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if connection.liveness_period >= connection.liveness_timeout {
            return Err(ConfigError::Invalid {
                var: "LIVENESS_PERIOD_MS".to_string(),
                reason: format!(
                    "Must be shorter than the liveness timeout ({:?})",
                    connection.liveness_timeout
                ),
            });
        }

        if connection.max_message_size == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_MESSAGE_SIZE".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if connection.burst_limit == 0 || connection.sustained_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "WS_BURST_LIMIT".to_string(),
                reason: "Rate limits must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

const DEFAULT_BIND: SocketAddr = SocketAddr::V4(std::net::SocketAddrV4::new(
    std::net::Ipv4Addr::LOCALHOST,
    8080,
));

/// Helper to parse an optional environment variable. Unset or empty is
/// `None`; set but unparsable is an error.
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: format!("'{}': {}", value, e),
                })
        }
        _ => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_env(key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            table: TableConfig::default(),
            connection: ConnectionConfig::default(),
            resolver: ResolverKind::Random,
            idle_table_reclaim: None,
            metrics_bind: None,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "TABLE_BIG_BLIND".to_string(),
            reason: "Must be greater than small blind (5)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("TABLE_BIG_BLIND"));
        assert!(msg.contains("small blind"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
        assert_eq!(DEFAULT_BIND.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_config_validation_blind_zero() {
        let mut config = config();
        config.table.small_blind = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_validation_big_blind_too_small() {
        let mut config = config();
        config.table.small_blind = 20;
        config.table.big_blind = 10;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "TABLE_BIG_BLIND"));
    }

    #[test]
    fn test_config_validation_seat_cap() {
        let mut config = config();
        config.table.max_players = 24;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "TABLE_MAX_PLAYERS"));
    }

    #[test]
    fn test_config_validation_starting_stack_overflows_table() {
        let mut config = config();
        config.table.max_players = 2;
        config.table.starting_stack = 3_000_000_000;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "STARTING_STACK"));

        config.table.starting_stack = config.table.max_starting_stack();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_probe_period_with_huge_timeout() {
        unsafe {
            std::env::set_var("LIVENESS_TIMEOUT_MS", u64::MAX.to_string());
        }
        let loaded = ServerConfig::from_env(None).unwrap();
        unsafe {
            std::env::remove_var("LIVENESS_TIMEOUT_MS");
        }
        assert_eq!(
            loaded.connection.liveness_period,
            Duration::from_millis(u64::MAX / 10 * 9)
        );
    }

    #[test]
    fn test_config_validation_probe_slower_than_timeout() {
        let mut config = config();
        config.connection.liveness_period = Duration::from_secs(90);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "LIVENESS_PERIOD_MS"));
    }

    #[test]
    fn test_parse_env_reports_bad_values() {
        // Variable names unique to this test keep it independent of the others.
        unsafe {
            std::env::set_var("LH_TEST_PARSE_GOOD", "42");
            std::env::set_var("LH_TEST_PARSE_BAD", "forty-two");
        }
        assert_eq!(parse_env_or("LH_TEST_PARSE_GOOD", 7usize).unwrap(), 42);
        assert_eq!(parse_env_or("LH_TEST_PARSE_UNSET", 7usize).unwrap(), 7);
        assert!(matches!(
            parse_env_or("LH_TEST_PARSE_BAD", 7usize),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
