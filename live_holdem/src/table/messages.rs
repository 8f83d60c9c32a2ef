//! Table actor message types.

use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

use crate::game::{
    UserError,
    entities::{Action, Phase, Player, PlayerId, SeatIndex, TableView},
};
use crate::net::{liveness::StopSignal, messages::ServerMessage};

/// The table's way of reaching one connected player: an outbound queue
/// drained by the connection's writer, plus the connection's stop signal.
#[derive(Clone, Debug)]
pub struct PlayerConnection {
    pub outbound: mpsc::Sender<ServerMessage>,
    pub stop: StopSignal,
}

impl PlayerConnection {
    pub fn new(outbound: mpsc::Sender<ServerMessage>, stop: StopSignal) -> Self {
        Self { outbound, stop }
    }
}

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Seat a newly connected player
    Join {
        player: Player,
        connection: PlayerConnection,
        response: oneshot::Sender<TableResponse>,
    },

    /// Player action (fold, check, call, bet, raise)
    TakeAction {
        player_id: PlayerId,
        action: Action,
        response: oneshot::Sender<TableResponse>,
    },

    /// Relay a chat line to everyone at the table
    Chat { player_id: PlayerId, message: String },

    /// The player's connection is gone
    Disconnect { player_id: PlayerId },

    /// Internal: start the next hand after a showdown (sent by timer)
    RestartRound { hand_number: u64 },

    /// Get the table as a specific player sees it
    GetView {
        player_id: PlayerId,
        response: oneshot::Sender<Option<TableView>>,
    },

    /// Close table. With `if_idle` set, only an empty table closes.
    Close {
        if_idle: bool,
        response: oneshot::Sender<TableResponse>,
    },
}

/// Response from table operations
#[derive(Debug, Clone, PartialEq)]
pub enum TableResponse {
    /// Operation succeeded
    Success,

    /// Player was seated at the given index
    Seated(SeatIndex),

    /// Table is full
    TableFull,

    /// Table is mid-hand and not taking seats
    HandInProgress,

    /// Player not at table
    NotAtTable,

    /// Action broke a betting rule; nothing changed
    Rejected(UserError),

    /// Operation failed
    Error(String),
}

impl TableResponse {
    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(self, TableResponse::Success | TableResponse::Seated(_))
    }

    /// Whether a join should be retried at another table
    pub fn is_retryable(&self) -> bool {
        matches!(self, TableResponse::TableFull | TableResponse::HandInProgress)
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<String> {
        match self {
            TableResponse::Error(msg) => Some(msg.clone()),
            TableResponse::TableFull => Some(UserError::CapacityReached.to_string()),
            TableResponse::HandInProgress => Some(UserError::GameAlreadyInProgress.to_string()),
            TableResponse::NotAtTable => Some(UserError::UserDoesNotExist.to_string()),
            TableResponse::Rejected(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

impl From<UserError> for TableResponse {
    fn from(err: UserError) -> Self {
        match err {
            UserError::CapacityReached => Self::TableFull,
            UserError::GameAlreadyInProgress => Self::HandInProgress,
            UserError::UserDoesNotExist => Self::NotAtTable,
            other => Self::Rejected(other),
        }
    }
}

/// Summary the actor publishes after every message, read by the registry
/// without a round trip through the inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStatus {
    pub phase: Phase,
    pub seated: usize,
    pub connected: usize,
    pub max_players: usize,
    /// Hands dealt so far
    pub hand_number: u64,
    /// When the roster last became empty, if it is empty now
    pub idle_since: Option<Instant>,
    pub closed: bool,
}

impl TableStatus {
    /// A waiting table with a free seat.
    pub fn is_open(&self) -> bool {
        !self.closed && self.phase == Phase::Waiting && self.seated < self.max_players
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_mapping() {
        assert_eq!(
            TableResponse::from(UserError::CapacityReached),
            TableResponse::TableFull
        );
        assert_eq!(
            TableResponse::from(UserError::OutOfTurnAction).error_message(),
            Some("Not your turn.".to_string())
        );
        assert!(TableResponse::from(UserError::GameAlreadyInProgress).is_retryable());
        assert!(!TableResponse::Rejected(UserError::CannotCheck).is_retryable());
    }

    #[test]
    fn test_open_status() {
        let status = TableStatus {
            phase: Phase::Waiting,
            seated: 8,
            connected: 8,
            max_players: 9,
            hand_number: 0,
            idle_since: None,
            closed: false,
        };
        assert!(status.is_open());
        assert!(!TableStatus { seated: 9, ..status.clone() }.is_open());
        assert!(!TableStatus { phase: Phase::Flop, ..status.clone() }.is_open());
        assert!(!TableStatus { closed: true, ..status }.is_open());
    }
}
