//! Error types for the chat relay
//!
//! Defines application-level errors for both the server core and the
//! client connector. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::ClientId;

/// Application-level errors
///
/// Covers transport failures (fatal for the connection) and the two
/// conditions a Listen call can fail with: the identifier is unknown, or
/// the mailbox has been closed and drained.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal for the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal for the connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal channel send error (peer task gone)
    #[error("Channel send error")]
    ChannelSend,

    /// Listen invoked with an identifier absent from the registry
    #[error("client not found: {0}")]
    ClientNotFound(ClientId),

    /// Listen invoked on a mailbox closed with no buffered items left
    #[error("client mailbox closed")]
    MailboxClosed,

    /// The remote peer replied with something the protocol does not allow
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl AppError {
    /// Whether the caller's listen loop should stop polling.
    ///
    /// Both terminal conditions end the long-poll loop; transport failures
    /// are treated the same way by the client.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppError::ClientNotFound(_) | AppError::MailboxClosed | AppError::WebSocket(_)
        )
    }
}
