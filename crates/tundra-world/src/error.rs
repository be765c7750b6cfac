//! Error types for the `tundra-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`].

use tundra_types::RoomId;

/// Errors that can occur while building room geometry or layouts.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A polygon needs at least three vertices to enclose an area.
    #[error("polygon needs at least 3 vertices, got {count}")]
    TooFewVertices {
        /// Number of vertices supplied.
        count: usize,
    },

    /// A room layout was registered twice.
    #[error("duplicate layout for room {0}")]
    DuplicateRoom(RoomId),
}
