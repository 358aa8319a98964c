//! Broadcast fan-out
//!
//! Delivers one envelope to every registered session except the sender.
//! Delivery is best-effort, at-most-once, no retry: each recipient gets a
//! non-blocking enqueue attempt, and a full (or just-closed) mailbox means
//! that copy is silently dropped for that recipient only. A slow consumer
//! can never stall the rest of the room or fail the broadcasting call.

use std::sync::Arc;

use tracing::warn;

use crate::message::Envelope;
use crate::registry::ClientRegistry;
use crate::types::ClientId;

/// Fan-out engine over the client registry
#[derive(Debug, Clone)]
pub struct BroadcastEngine {
    registry: Arc<ClientRegistry>,
}

impl BroadcastEngine {
    /// Create an engine delivering into the given registry's sessions
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Enqueue a copy of `envelope` into every live mailbox except
    /// `exclude`'s.
    ///
    /// Runs under the registry lock, so the recipient list is a consistent
    /// snapshot and broadcasts are serialized against registration churn.
    /// Overflow is not an error: the drop is logged and the envelope is
    /// lost for that recipient.
    pub fn broadcast(&self, envelope: &Envelope, exclude: &ClientId) {
        self.registry.for_each_except(exclude, |session| {
            if !session.mailbox.try_enqueue(envelope.clone()) {
                warn!(
                    "could not deliver to client {} (mailbox full or closed)",
                    session.id
                );
            }
        });
    }
}
