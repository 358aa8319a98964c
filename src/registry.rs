//! Client registry
//!
//! The single source of truth for "who is connected": a lock-protected map
//! from client identifier to session. The registry is the sole owner of
//! session lifetime; sessions are created by `register` and destroyed by
//! `unregister`, and all map access goes through the one lock.
//!
//! Lock discipline: the lock guards only map reads and writes plus the
//! fan-out iteration, all of which are bounded and non-blocking. It is
//! never held across an await; the only suspension point in the crate is
//! `Mailbox::recv`, which callers reach after the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::mailbox::Mailbox;
use crate::types::ClientId;

/// One registered client: identifier, display name, and outbound mailbox
///
/// The mailbox's closed state doubles as the session's liveness flag.
#[derive(Debug)]
pub struct ClientSession {
    /// Unique identifier for this session
    pub id: ClientId,
    /// Display name supplied at registration
    pub display_name: String,
    /// Bounded FIFO of envelopes awaiting delivery to this client
    pub mailbox: Mailbox,
}

impl ClientSession {
    fn new(id: ClientId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            mailbox: Mailbox::new(),
        }
    }
}

/// Lock-protected mapping from client identifier to session
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, Arc<ClientSession>>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for the given display name and insert it.
    ///
    /// The identifier is the display name verbatim. A colliding identifier
    /// REPLACES the previous entry: the old session is orphaned with its
    /// mailbox left open and receives no further deliveries.
    pub fn register(&self, display_name: &str) -> ClientId {
        let id = ClientId::from_display_name(display_name);
        let session = Arc::new(ClientSession::new(id.clone(), display_name.to_string()));
        self.clients.lock().unwrap().insert(id.clone(), session);
        id
    }

    /// Remove a session and close its mailbox.
    ///
    /// The mailbox is closed before the lock is released, so no broadcast
    /// can enqueue into it once removal completes. Returns the removed
    /// session (for the leave notification) or `None` if the identifier
    /// was not registered.
    pub fn unregister(&self, id: &ClientId) -> Option<Arc<ClientSession>> {
        let mut clients = self.clients.lock().unwrap();
        let session = clients.remove(id);
        if let Some(session) = &session {
            session.mailbox.close();
        }
        session
    }

    /// Look up a session by identifier
    pub fn lookup(&self, id: &ClientId) -> Option<Arc<ClientSession>> {
        self.clients.lock().unwrap().get(id).cloned()
    }

    /// Invoke `f` with every registered session except `exclude`.
    ///
    /// Iteration holds the registry lock, which serializes fan-out against
    /// insertions and removals; `f` must therefore be non-blocking (the
    /// broadcast engine only attempts a non-blocking enqueue).
    pub fn for_each_except<F>(&self, exclude: &ClientId, mut f: F)
    where
        F: FnMut(&ClientSession),
    {
        for (id, session) in self.clients.lock().unwrap().iter() {
            if id != exclude {
                f(session);
            }
        }
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    /// Whether no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.clients.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = ClientRegistry::new();
        let id = registry.register("alice");
        assert_eq!(id, ClientId::from("alice"));

        let session = registry.lookup(&id).expect("session should exist");
        assert_eq!(session.display_name, "alice");
        assert!(!session.mailbox.is_closed());
    }

    #[test]
    fn test_unregister_removes_and_closes() {
        let registry = ClientRegistry::new();
        let id = registry.register("alice");

        let session = registry.unregister(&id).expect("session existed");
        assert!(session.mailbox.is_closed());
        assert!(registry.lookup(&id).is_none());

        // Idempotent from the registry's view: second removal finds nothing.
        assert!(registry.unregister(&id).is_none());
    }

    #[test]
    fn test_registration_isolation() {
        let registry = ClientRegistry::new();
        let alice = registry.register("alice");
        let bob = registry.register("bob");
        assert_eq!(registry.len(), 2);

        let bob_session = registry.lookup(&bob).unwrap();
        registry.unregister(&alice);

        // Bob's session, mailbox, and identifier are untouched.
        assert_eq!(registry.len(), 1);
        let still_bob = registry.lookup(&bob).unwrap();
        assert!(Arc::ptr_eq(&bob_session, &still_bob));
        assert!(!still_bob.mailbox.is_closed());
    }

    #[test]
    fn test_colliding_registration_replaces() {
        let registry = ClientRegistry::new();
        let first = registry.register("alice");
        let first_session = registry.lookup(&first).unwrap();

        let second = registry.register("alice");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        // The old session is orphaned: replaced in the map but its mailbox
        // is never closed.
        let current = registry.lookup(&second).unwrap();
        assert!(!Arc::ptr_eq(&first_session, &current));
        assert!(!first_session.mailbox.is_closed());
    }

    #[test]
    fn test_for_each_except_skips_excluded() {
        let registry = ClientRegistry::new();
        registry.register("alice");
        registry.register("bob");
        registry.register("carol");

        let mut visited = Vec::new();
        registry.for_each_except(&ClientId::from("bob"), |session| {
            visited.push(session.id.clone());
        });

        visited.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(visited, vec![ClientId::from("alice"), ClientId::from("carol")]);
    }
}
