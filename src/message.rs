//! Envelope and wire protocol definitions
//!
//! The `Envelope` is the unit of broadcast: one copy lands in every other
//! client's mailbox. The wire protocol is JSON-based, using Serde's tagged
//! enums; every request carries a caller-chosen sequence number that the
//! matching response echoes, so a blocked `listen` call and a concurrent
//! `send_message` can share one connection.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::ClientId;

/// What kind of broadcast an envelope carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// A client registered
    Join,
    /// A client unregistered
    Leave,
    /// An ordinary chat message
    Message,
}

/// One unit of broadcast data
///
/// Immutable once constructed; recipients each get their own clone since
/// mailboxes are drained independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Identifier of the originating client
    pub sender_id: ClientId,
    /// Display name of the originating client
    pub sender_name: String,
    /// Message body
    pub text: String,
    /// Join, leave, or message
    pub kind: EnvelopeKind,
}

impl Envelope {
    /// Join notification broadcast when a client registers
    pub fn join(id: &ClientId, display_name: &str) -> Self {
        Self {
            sender_id: id.clone(),
            sender_name: display_name.to_string(),
            text: format!("User {} joined", id),
            kind: EnvelopeKind::Join,
        }
    }

    /// Leave notification broadcast when a client unregisters
    pub fn leave(id: &ClientId, display_name: &str) -> Self {
        Self {
            sender_id: id.clone(),
            sender_name: display_name.to_string(),
            text: format!("User {} left", id),
            kind: EnvelopeKind::Leave,
        }
    }

    /// Ordinary chat message
    pub fn message(id: &ClientId, display_name: &str, text: &str) -> Self {
        Self {
            sender_id: id.clone(),
            sender_name: display_name.to_string(),
            text: text.to_string(),
            kind: EnvelopeKind::Message,
        }
    }
}

/// Client → Server request frame
///
/// `seq` is chosen by the caller and echoed back in the response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Caller-chosen sequence number pairing this call with its response
    pub seq: u64,
    /// The call verb and its arguments
    #[serde(flatten)]
    pub call: Call,
}

/// The four protocol verbs. Tagged enum with snake_case naming.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    /// Register a display name; replies with the assigned identifier
    Register { display_name: String },
    /// Remove a session; always replies with success
    Unregister { client_id: ClientId },
    /// Long-poll for the next envelope; blocks until data or closure
    Listen { client_id: ClientId },
    /// Broadcast a chat message to every other session
    SendMessage {
        client_id: ClientId,
        display_name: String,
        text: String,
    },
}

/// Server → Client response frame
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Echo of the request's sequence number (0 for unparseable requests)
    pub seq: u64,
    /// The call outcome
    #[serde(flatten)]
    pub reply: Reply,
}

/// Call outcomes. Tagged enum with snake_case naming.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    /// Registration succeeded; identifier issued
    Registered { client_id: ClientId },
    /// Unregistration processed (success even if the id was unknown)
    Unregistered { success: bool },
    /// One envelope delivered to a listen call
    Delivery { envelope: Envelope },
    /// Message accepted for broadcast
    Sent { success: bool },
    /// Call failed
    Error { code: ErrorCode, message: String },
}

/// Error codes for Reply::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Listen with an identifier absent from the registry
    NotFound,
    /// Listen on a mailbox that is closed and drained
    Closed,
    /// Request frame could not be parsed
    InvalidRequest,
    /// Anything else (internal failure)
    Internal,
}

/// Convert an AppError into a wire error reply
impl From<&AppError> for Reply {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::ClientNotFound(_) => ErrorCode::NotFound,
            AppError::MailboxClosed => ErrorCode::Closed,
            AppError::Json(_) => ErrorCode::InvalidRequest,
            _ => ErrorCode::Internal,
        };
        Reply::Error {
            code,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialize() {
        let json = r#"{"seq": 7, "call": "register", "display_name": "alice"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.seq, 7);
        match req.call {
            Call::Register { display_name } => assert_eq!(display_name, "alice"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_response_serialize() {
        let resp = Response {
            seq: 3,
            reply: Reply::Registered {
                client_id: ClientId::from("alice"),
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"seq\":3"));
        assert!(json.contains("\"reply\":\"registered\""));
        assert!(json.contains("\"client_id\":\"alice\""));
    }

    #[test]
    fn test_delivery_serialize() {
        let resp = Response {
            seq: 1,
            reply: Reply::Delivery {
                envelope: Envelope::join(&ClientId::from("bob"), "bob"),
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"kind\":\"join\""));
        assert!(json.contains("\"text\":\"User bob joined\""));
    }

    #[test]
    fn test_error_reply_from_app_error() {
        let err = AppError::ClientNotFound(ClientId::from("ghost"));
        match Reply::from(&err) {
            Reply::Error { code, .. } => assert_eq!(code, ErrorCode::NotFound),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_envelope_texts() {
        let id = ClientId::from("carol");
        assert_eq!(Envelope::join(&id, "carol").text, "User carol joined");
        assert_eq!(Envelope::leave(&id, "carol").text, "User carol left");
        assert_eq!(Envelope::message(&id, "carol", "hi").text, "hi");
    }
}
