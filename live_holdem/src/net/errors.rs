//! Protocol errors for inbound client frames.

use thiserror::Error;

/// Errors raised while decoding a client frame. The display text is sent
/// back to the client verbatim; none of these close the connection.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ProtocolError {
    /// Frame is not a `{type, payload}` JSON envelope
    #[error("Invalid message format.")]
    InvalidFormat,

    /// Envelope `type` is not one the server understands
    #[error("Unknown message type.")]
    UnknownType(String),

    /// `action` payload has the wrong shape
    #[error("Invalid action data.")]
    InvalidActionData,

    /// `action` payload names an action that doesn't exist
    #[error("Unknown action type.")]
    UnknownActionType(String),

    /// `chat` payload is neither a string nor `{message}`
    #[error("Invalid chat message format.")]
    InvalidChatFormat,

    /// Binary frames carry no envelope
    #[error("Binary messages are not supported.")]
    UnsupportedFrame,

    /// Sender exceeded the inbound rate limit
    #[error("Rate limit exceeded. Slow down.")]
    RateLimited,
}

/// Result type for frame decoding
pub type Result<T> = std::result::Result<T, ProtocolError>;
