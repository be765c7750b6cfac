//! Core value types: positions, outfits, room spots, and occupant snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::ClothingSlot;
use crate::ids::{AgentId, RoomId};

/// Integer screen coordinates inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal pixel coordinate.
    pub x: i32,
    /// Vertical pixel coordinate.
    pub y: i32,
}

impl Position {
    /// Create a position from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        dx.hypot(dy)
    }
}

/// An agent's worn items, keyed by slot. Missing slots are empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outfit(pub BTreeMap<ClothingSlot, u32>);

impl Outfit {
    /// An outfit with nothing worn.
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Build an outfit from `(slot, item)` pairs.
    pub fn from_items(items: impl IntoIterator<Item = (ClothingSlot, u32)>) -> Self {
        Self(items.into_iter().collect())
    }

    /// Item worn in `slot`, if any.
    pub fn item(&self, slot: ClothingSlot) -> Option<u32> {
        self.0.get(&slot).copied()
    }

    /// Replace every wearable slot with the override's item for that slot.
    ///
    /// Wearable slots the override leaves out end up empty, so a spot that
    /// hands out drum sticks also takes off the agent's hat. Color, flag,
    /// photo, and award are kept.
    pub fn apply_override(&mut self, over: &Self) {
        for slot in ClothingSlot::WEARABLE {
            match over.item(slot) {
                Some(item) => {
                    self.0.insert(slot, item);
                }
                None => {
                    self.0.remove(&slot);
                }
            }
        }
    }
}

/// A scripted pose position inside a room.
///
/// Spots are grouped into priority tiers; tier `1` is consulted first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpot {
    /// Where the bot stands.
    pub position: Position,
    /// Pose struck once the bot arrives.
    pub frame: u8,
    /// Priority tier (lower = higher precedence).
    pub priority: u32,
    /// Clothing worn for the duration of the visit.
    #[serde(default)]
    pub clothes: Option<Outfit>,
}

impl RoomSpot {
    /// A spot without a clothing override.
    pub const fn new(x: i32, y: i32, frame: u8, priority: u32) -> Self {
        Self {
            position: Position::new(x, y),
            frame,
            priority,
            clothes: None,
        }
    }

    /// Attach a clothing override to the spot.
    #[must_use]
    pub fn wearing(mut self, items: impl IntoIterator<Item = (ClothingSlot, u32)>) -> Self {
        self.clothes = Some(Outfit::from_items(items));
        self
    }
}

/// Point-in-time view of an entity standing in a room, as reported by the
/// host world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    /// Entity identifier.
    pub id: AgentId,
    /// Display name.
    pub nickname: String,
    /// Room the entity is in.
    pub room: RoomId,
    /// Current position.
    pub position: Position,
    /// Whether the entity is a bot driven by this runtime.
    #[serde(default)]
    pub is_bot: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert!((a.distance_to(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn override_empties_unlisted_wearables() {
        let mut outfit = Outfit::from_items([
            (ClothingSlot::Color, 4),
            (ClothingSlot::Head, 10),
            (ClothingSlot::Feet, 352),
        ]);
        outfit.apply_override(&Outfit::from_items([(ClothingSlot::Body, 262)]));

        assert_eq!(outfit.item(ClothingSlot::Body), Some(262));
        assert_eq!(outfit.item(ClothingSlot::Head), None);
        assert_eq!(outfit.item(ClothingSlot::Feet), None);
        assert_eq!(outfit.item(ClothingSlot::Color), Some(4));
    }
}
