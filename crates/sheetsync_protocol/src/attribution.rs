//! Actor attribution.
//!
//! Every mutation carries the identity of whoever produced it. The engine's
//! own identity is the sentinel: a change stamped with it is never forwarded
//! again, which is what keeps the two sync directions from feeding each other.

use std::fmt;

/// The engine's own actor identity.
pub const SENTINEL: &str = "sync_bot";

/// Identity used when no real actor is known.
pub const SYSTEM: &str = "system";

/// Identity written to the mirror by a full resync when a row has no
/// recorded last writer.
pub const RESYNC_FALLBACK: &str = "initial_sync";

/// An actor identity attached to a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribution(String);

impl Attribution {
    /// The engine's sentinel identity.
    pub fn sentinel() -> Self {
        Self(SENTINEL.to_string())
    }

    /// The `system` identity.
    pub fn system() -> Self {
        Self(SYSTEM.to_string())
    }

    /// Builds an attribution from an optional actor, defaulting to `system`
    /// when the actor is missing or blank.
    pub fn from_actor(actor: Option<&str>) -> Self {
        match actor.map(str::trim) {
            Some(actor) if !actor.is_empty() => Self(actor.to_string()),
            _ => Self::system(),
        }
    }

    /// Like [`Attribution::from_actor`] but falls back to the resync identity.
    pub fn for_resync(actor: Option<&str>) -> Self {
        match actor.map(str::trim) {
            Some(actor) if !actor.is_empty() => Self(actor.to_string()),
            _ => Self(RESYNC_FALLBACK.to_string()),
        }
    }

    /// Returns true if this is the engine's own identity.
    pub fn is_sentinel(&self) -> bool {
        self.0 == SENTINEL
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Attribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
