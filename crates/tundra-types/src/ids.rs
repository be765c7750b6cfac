//! Type-safe identifier wrappers.
//!
//! Agents (bots and players alike) are identified by UUIDs so the host
//! world and the bot runtime can mint identifiers independently. Rooms and
//! waddles are numbered by the host world's catalog and keep their numeric
//! form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for any entity that can stand in a room: a bot or a
/// human-controlled player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AgentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Generates a newtype wrapper around a catalog number with standard derives.
macro_rules! define_catalog_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Return the inner catalog number.
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }
    };
}

define_catalog_id! {
    /// Catalog number of a room in the host world (e.g. `100` for the town).
    RoomId
}

define_catalog_id! {
    /// Catalog number of a waddle (multi-seat game lobby) in the host world.
    WaddleId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_ids_are_unique() {
        assert_ne!(AgentId::new(), AgentId::new());
    }

    #[test]
    fn room_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&RoomId(330)).unwrap_or_default();
        assert_eq!(json, "330");
        let back: RoomId = serde_json::from_str("810").unwrap_or(RoomId(0));
        assert_eq!(back, RoomId(810));
    }

    #[test]
    fn display_matches_catalog_number() {
        assert_eq!(WaddleId(103).to_string(), "103");
    }
}
