//! Shared type definitions for the tundra bot runtime.
//!
//! This crate is the single source of truth for the values that cross crate
//! boundaries: identifiers, positions, outfits, room spots, and the events
//! exchanged with the host world.
//!
//! # Modules
//!
//! - [`ids`] -- Identifier newtypes for agents, rooms, and waddles
//! - [`enums`] -- Clothing slots, safe-chat phrases, pose and emote ids
//! - [`structs`] -- Positions, outfits, spots, and occupant snapshots
//! - [`events`] -- Outward room events and inward world events

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ClothingSlot, SafeMessage, emotes, frames};
pub use events::{RoomEvent, RoomEventKind, WorldEvent};
pub use ids::{AgentId, RoomId, WaddleId};
pub use structs::{Occupant, Outfit, Position, RoomSpot};
