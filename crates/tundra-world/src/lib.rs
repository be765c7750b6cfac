//! Room geometry, spot leasing, and the host-world seams for the tundra bot
//! runtime.
//!
//! Everything that both the behavior engine and the conversation
//! orchestrator need to know about the world lives here: the shared bot
//! entity, where a bot may walk, which scripted spots are free, and the two
//! ports through which the runtime reads from and writes to the host.
//!
//! # Modules
//!
//! - [`bot`] -- The [`Bot`] entity and its lock-guarded state.
//! - [`error`] -- Error types for geometry and layout construction.
//! - [`geometry`] -- Area-weighted random points inside room outlines.
//! - [`layouts`] -- Stock room outlines and spot layouts.
//! - [`mirror`] -- [`WorldMirror`], an event-fed room directory.
//! - [`ports`] -- [`RoomEvents`] and [`RoomDirectory`] collaborator traits,
//!   plus the recording [`EventLog`].
//! - [`spots`] -- Priority-tiered [`RoomSpotPool`] and the scoped
//!   [`SpotLease`].

pub mod bot;
pub mod error;
pub mod geometry;
pub mod layouts;
pub mod mirror;
pub mod ports;
pub mod spots;

pub use bot::{Bot, BotState};
pub use error::WorldError;
pub use geometry::{Point, Polygon};
pub use layouts::RoomLayouts;
pub use mirror::WorldMirror;
pub use ports::{EventLog, RoomDirectory, RoomEvents, announce};
pub use spots::{RoomSpotPool, SpotLease, is_occupied};
