//! Error types for the chat broker
//!
//! Defines connection-level errors, room policy violations and
//! transport failures. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection or broker gone) and room policy
/// violations reported back to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - broker stopped)
    #[error("Channel send error")]
    ChannelSend,

    /// Upgrade request did not name a client
    #[error("Handshake rejected: {0}")]
    Handshake(String),

    /// Room operation refused
    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Room policy violations
///
/// Every variant is reported before any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Name is empty after normalization
    #[error("invalid room name")]
    InvalidName,

    /// A room with the same normalized name already exists
    #[error("room already exists")]
    AlreadyExists,

    /// No room with that name
    #[error("room not found")]
    NotFound,

    /// The room has no owner, so nobody may delete it
    #[error("room has no owner")]
    NoOwner,

    /// The caller is not the room's owner
    #[error("caller is not the room owner")]
    NotOwner,

    /// Owners delete their rooms, they never leave them
    #[error("owner cannot unsubscribe from own room")]
    OwnerCannotUnsubscribe,
}

impl RoomError {
    /// Stable machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            RoomError::InvalidName => "invalid_room",
            RoomError::AlreadyExists => "already_exists",
            RoomError::NotFound => "not_found",
            RoomError::NoOwner => "no_owner",
            RoomError::NotOwner => "not_owner",
            RoomError::OwnerCannotUnsubscribe => "owner_cannot_unsubscribe",
        }
    }
}

/// Transport errors
///
/// Any of these ends the session's inbound loop.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote side closed the channel
    #[error("transport closed")]
    Closed,

    /// Underlying I/O or protocol failure
    #[error("transport failure: {0}")]
    Io(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
            other => TransportError::Io(other.to_string()),
        }
    }
}
