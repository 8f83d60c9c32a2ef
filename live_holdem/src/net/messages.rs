use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{ProtocolError, Result};
use crate::game::{
    entities::{Action, Card, Chips, PlayerId, TableId, TableView},
    showdown::Award,
};

/// Sent once, right after a player is seated.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Welcome {
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    #[serde(rename = "playerName")]
    pub player_name: String,
    #[serde(rename = "tableID")]
    pub table_id: TableId,
}

/// One showdown award as announced to the table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WinnerNotice {
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub amount: Chips,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    #[serde(rename = "handRank", default, skip_serializing_if = "Option::is_none")]
    pub hand_rank: Option<String>,
}

impl From<&Award> for WinnerNotice {
    fn from(award: &Award) -> Self {
        Self {
            player_id: award.player_id.clone(),
            player_name: award.player_name.clone(),
            amount: award.amount,
            hand: award.hand.clone(),
            hand_rank: award.hand_rank.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChatNotice {
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub message: String,
}

/// A message from the server to one client, encoded as a
/// `{"type": ..., "payload": ...}` envelope.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "welcome")]
    Welcome(Welcome),
    /// The table as seen by the receiving player.
    #[serde(rename = "gameState")]
    GameState(Box<TableView>),
    #[serde(rename = "winner")]
    Winner(WinnerNotice),
    #[serde(rename = "chat")]
    Chat(ChatNotice),
    /// A rejected frame or action; nothing changed at the table.
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "heartbeat_ack")]
    HeartbeatAck { timestamp: i64, status: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Acknowledgement stamped with the current Unix time in milliseconds.
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::HeartbeatAck {
            timestamp: chrono::Utc::now().timestamp_millis(),
            status: "ok".to_string(),
        }
    }

    /// Wire name of the envelope, used for logs and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome(_) => "welcome",
            Self::GameState(_) => "gameState",
            Self::Winner(_) => "winner",
            Self::Chat(_) => "chat",
            Self::Error { .. } => "error",
            Self::HeartbeatAck { .. } => "heartbeat_ack",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<ProtocolError> for ServerMessage {
    fn from(err: ProtocolError) -> Self {
        Self::error(err.to_string())
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Error { message } => write!(f, "error: {message}"),
            Self::Chat(chat) => write!(f, "chat from {}: {}", chat.player_name, chat.message),
            Self::Winner(winner) => write!(f, "{} won {}", winner.player_name, winner.amount),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Raw inbound envelope before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Payload of an inbound `action` envelope.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: i64,
}

impl ActionRequest {
    /// Maps the request onto a table action. Amounts outside the chip
    /// range are clamped so the table rejects them as rule violations.
    pub fn into_action(self) -> Result<Action> {
        let amount = Chips::try_from(self.amount.max(0)).unwrap_or(Chips::MAX);
        match self.kind.as_str() {
            "fold" => Ok(Action::Fold),
            "check" => Ok(Action::Check),
            "call" => Ok(Action::Call),
            "bet" => Ok(Action::Bet(amount)),
            "raise" => Ok(Action::Raise(amount)),
            _ => Err(ProtocolError::UnknownActionType(self.kind)),
        }
    }
}

/// Chat payloads arrive either as a bare string or as `{"message": ...}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum ChatPayload {
    Text(String),
    Object { message: String },
}

impl ChatPayload {
    #[must_use]
    pub fn into_message(self) -> String {
        match self {
            Self::Text(message) | Self::Object { message } => message,
        }
    }
}

/// A decoded client frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClientMessage {
    Action(Action),
    Chat(String),
    Heartbeat,
}

impl ClientMessage {
    /// Decodes one text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|_| ProtocolError::InvalidFormat)?;
        match envelope.kind.as_str() {
            "action" => {
                let request: ActionRequest = serde_json::from_value(envelope.payload)
                    .map_err(|_| ProtocolError::InvalidActionData)?;
                request.into_action().map(Self::Action)
            }
            "chat" => {
                let payload: ChatPayload = serde_json::from_value(envelope.payload)
                    .map_err(|_| ProtocolError::InvalidChatFormat)?;
                Ok(Self::Chat(payload.into_message()))
            }
            "heartbeat" => Ok(Self::Heartbeat),
            _ => Err(ProtocolError::UnknownType(envelope.kind)),
        }
    }
}
