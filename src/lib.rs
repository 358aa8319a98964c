//! Chat relay library
//!
//! A centralized relay that lets multiple independently-connected clients
//! exchange short text messages. Clients register with a display name,
//! broadcast text to every other connected client, and receive other
//! clients' messages (plus join/leave notifications) through a long-poll
//! style blocking `listen` call.
//!
//! # Architecture
//! The core is the server-side session and delivery engine:
//! - [`ClientRegistry`] is the lock-protected source of truth for who is
//!   connected; it owns every session's lifetime.
//! - Each session owns one bounded [`Mailbox`] of outbound envelopes with a
//!   non-blocking producer side and a blocking consumer side.
//! - [`BroadcastEngine`] fans one envelope out into every other live
//!   mailbox; a full mailbox silently drops that copy, so a slow consumer
//!   never stalls the room.
//! - [`SessionService`] composes the two into the four protocol verbs:
//!   Register, Unregister, Listen, SendMessage.
//!
//! Transport is WebSocket with JSON frames; every request carries a
//! sequence number its response echoes, so a blocked `Listen` long-poll and
//! concurrent sends share one connection.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_relay::{handle_connection, SessionService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("0.0.0.0:9999").await.unwrap();
//!     let service = Arc::new(SessionService::new());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let service = Arc::clone(&service);
//!         tokio::spawn(handle_connection(stream, service));
//!     }
//! }
//! ```

/// Default relay address, fixed between the server and client binaries
pub const DEFAULT_ADDR: &str = "0.0.0.0:9999";

pub mod broadcast;
pub mod client;
pub mod error;
pub mod handler;
pub mod mailbox;
pub mod message;
pub mod registry;
pub mod service;
pub mod types;

// Re-export main types for convenience
pub use broadcast::BroadcastEngine;
pub use client::RelayClient;
pub use error::AppError;
pub use handler::handle_connection;
pub use mailbox::{Mailbox, MAILBOX_CAPACITY};
pub use message::{Call, Envelope, EnvelopeKind, ErrorCode, Reply, Request, Response};
pub use registry::{ClientRegistry, ClientSession};
pub use service::SessionService;
pub use types::ClientId;
