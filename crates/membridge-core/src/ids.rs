//! Branded ID newtypes for type safety.
//!
//! Every identifier this subsystem hands around is a distinct newtype over
//! `String` so that, for example, an `EventId` can never be passed where an
//! `OutboxItemId` is expected. IDs that this subsystem mints itself are UUID
//! v7 (time-ordered); IDs that originate from the host (`SessionKey`) or the
//! store (`StoreSessionId`) simply wrap whatever opaque string they were given.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing string value (host- or store-minted ids).
            #[must_use]
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrow the inner string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

branded_id! {
    /// Opaque host-side identifier for a logical conversation.
    ///
    /// Supplied by the host; this subsystem never generates one.
    SessionKey
}

branded_id! {
    /// Opaque store-side session identifier, discovered via `createSession`.
    StoreSessionId
}

branded_id! {
    /// Identifier for the host agent process, used as half of the
    /// `(agentId, endpoint)` memoisation key for per-agent singletons.
    AgentId
}

/// Unique identifier for a [`crate::events::SessionEvent`], unique within
/// the process that minted it. Always self-assigned (UUID v7).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Mint a new time-ordered event id.
    #[must_use]
    pub fn new() -> Self {
        Self(new_v7())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for an [`crate::outbox::OutboxItem`]. Always a UUID (v7).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboxItemId(String);

impl OutboxItemId {
    /// Mint a new time-ordered outbox item id.
    #[must_use]
    pub fn new() -> Self {
        Self(new_v7())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OutboxItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutboxItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
