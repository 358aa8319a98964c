//! Basic type definitions for the chat relay
//!
//! Provides the `ClientId` newtype: the opaque string identifier naming a
//! registered client session.

use serde::{Deserialize, Serialize};

/// Unique client identifier (newtype pattern)
///
/// Wraps the identifier string assigned at registration time. The current
/// allocation policy derives it verbatim from the supplied display name, so
/// two registrations with the same name collide (the second replaces the
/// first in the registry). Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Allocate an identifier for the given display name.
    ///
    /// Current policy: the identifier is the display name verbatim, with no
    /// uniqueness check.
    pub fn from_display_name(display_name: &str) -> Self {
        Self(display_name.to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_from_display_name_verbatim() {
        let id = ClientId::from_display_name("alice");
        assert_eq!(id.as_str(), "alice");
        assert_eq!(id.to_string(), "alice");
    }

    #[test]
    fn test_client_id_collision() {
        // Same display name yields the same identifier - no uniqueness.
        let id1 = ClientId::from_display_name("bob");
        let id2 = ClientId::from_display_name("bob");
        assert_eq!(id1, id2);
    }
}
