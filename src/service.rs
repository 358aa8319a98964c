//! Session service: the four protocol handlers
//!
//! Composes the client registry and the broadcast engine into the
//! externally visible protocol: Register, Unregister, Listen, SendMessage.
//! One instance is shared across every connection; each handler documents
//! its own critical section, and none holds the registry lock across the
//! long-poll wait.
//!
//! Per-identifier lifecycle: Unregistered → Registered → Unregistered,
//! terminal. A client that wants back in re-registers and receives a fresh
//! mailbox.

use std::sync::Arc;

use tracing::info;

use crate::broadcast::BroadcastEngine;
use crate::error::AppError;
use crate::message::Envelope;
use crate::registry::ClientRegistry;
use crate::types::ClientId;

/// Thread-safe service object handling every protocol verb
#[derive(Debug)]
pub struct SessionService {
    registry: Arc<ClientRegistry>,
    broadcast: BroadcastEngine,
}

impl SessionService {
    /// Create a service with an empty registry
    pub fn new() -> Self {
        let registry = Arc::new(ClientRegistry::new());
        let broadcast = BroadcastEngine::new(Arc::clone(&registry));
        Self {
            registry,
            broadcast,
        }
    }

    /// Register a display name, returning the assigned identifier.
    ///
    /// The session is visible to lookups as soon as the insert completes;
    /// the join notification then fans out to every OTHER session, so the
    /// newly joined client never sees its own join.
    pub fn register(&self, display_name: &str) -> ClientId {
        let id = self.registry.register(display_name);
        info!("User {} joined", id);
        self.broadcast
            .broadcast(&Envelope::join(&id, display_name), &id);
        id
    }

    /// Remove a session and notify the remaining clients.
    ///
    /// Removal closes the mailbox, which unblocks any pending listen call.
    /// An unknown identifier is a no-op that still reports success, so
    /// unregistration is idempotent from the caller's point of view.
    pub fn unregister(&self, id: &ClientId) -> bool {
        if let Some(session) = self.registry.unregister(id) {
            info!("User {} left", id);
            self.broadcast
                .broadcast(&Envelope::leave(id, &session.display_name), id);
        }
        true
    }

    /// Long-poll for the next envelope addressed to `id`.
    ///
    /// Fails with `ClientNotFound` if the identifier is absent from the
    /// registry, and with `MailboxClosed` once the mailbox is closed and
    /// drained; both are terminal for the caller's poll loop. Each call
    /// delivers exactly one envelope; callers loop to keep receiving.
    pub async fn listen(&self, id: &ClientId) -> Result<Envelope, AppError> {
        let session = self
            .registry
            .lookup(id)
            .ok_or_else(|| AppError::ClientNotFound(id.clone()))?;

        // The registry lock is released; only the mailbox wait suspends.
        session.mailbox.recv().await.ok_or(AppError::MailboxClosed)
    }

    /// Broadcast a chat message to every session except the sender.
    ///
    /// The sender's identifier is NOT validated against the registry: an
    /// unregistered identifier can still broadcast.
    pub fn send_message(&self, id: &ClientId, display_name: &str, text: &str) -> bool {
        info!("Message from {}: {}", display_name, text);
        self.broadcast
            .broadcast(&Envelope::message(id, display_name, text), id);
        true
    }

    /// Number of currently registered sessions
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for SessionService {
    fn default() -> Self {
        Self::new()
    }
}
