//! Enumeration types shared between the behavior engine, the conversation
//! orchestrator, and the host world adapter.

use serde::{Deserialize, Serialize};

/// Clothing slot of an agent's outfit, numbered as in the host item catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClothingSlot {
    /// Body color.
    Color,
    /// Hats and hair.
    Head,
    /// Glasses, masks.
    Face,
    /// Necklaces, scarves.
    Neck,
    /// Shirts, costumes.
    Body,
    /// Held items (drum sticks, spatulas).
    Hand,
    /// Shoes.
    Feet,
    /// Pin or flag.
    Flag,
    /// Background photo.
    Photo,
    /// Award medal.
    Award,
}

impl ClothingSlot {
    /// Slots a spot's clothing override replaces while the spot is leased.
    ///
    /// Color, flag, photo, and award are never touched by spots.
    pub const WEARABLE: [Self; 6] = [
        Self::Head,
        Self::Face,
        Self::Neck,
        Self::Body,
        Self::Hand,
        Self::Feet,
    ];

    /// Item-type number used by the host catalog.
    pub const fn catalog_type(self) -> u8 {
        match self {
            Self::Color => 1,
            Self::Head => 2,
            Self::Face => 3,
            Self::Neck => 4,
            Self::Body => 5,
            Self::Hand => 6,
            Self::Feet => 7,
            Self::Flag => 8,
            Self::Photo => 9,
            Self::Award => 10,
        }
    }
}

/// Pre-written "safe chat" phrases players and bots can exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeMessage {
    /// "Ok".
    Ok,
    /// "Hi there!".
    HiThere,
    /// "Hello".
    Hello,
    /// "How are you doing?".
    HowUDoing,
    /// "See you later".
    SeeULater,
    /// "Follow me".
    FollowMe,
    /// "You are silly".
    UAreSilly,
    /// "Party at my igloo".
    PartyAtMyIgloo,
    /// "Where?".
    Where,
    /// "Go away".
    GoAway,
}

impl SafeMessage {
    /// Every safe message known to the runtime.
    pub const ALL: [Self; 10] = [
        Self::Ok,
        Self::HiThere,
        Self::Hello,
        Self::HowUDoing,
        Self::SeeULater,
        Self::FollowMe,
        Self::UAreSilly,
        Self::PartyAtMyIgloo,
        Self::Where,
        Self::GoAway,
    ];

    /// The host's numeric message id.
    pub const fn id(self) -> u32 {
        match self {
            Self::Ok => 22,
            Self::HiThere => 101,
            Self::Hello => 1,
            Self::HowUDoing => 151,
            Self::SeeULater => 212,
            Self::FollowMe => 310,
            Self::UAreSilly => 354,
            Self::PartyAtMyIgloo => 712,
            Self::Where => 410,
            Self::GoAway => 802,
        }
    }

    /// Look up a safe message by its host id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}

/// Emoticon ids understood by the host client.
pub mod emotes {
    /// Frowning face, used to lament being hit by a snowball.
    pub const SAD: u32 = 4;
}

/// Pose (frame) indices understood by the host client.
pub mod frames {
    /// Standing, facing the camera.
    pub const STANDING: u8 = 1;
    /// Default idle pose assigned to freshly created bots.
    pub const IDLE: u8 = 18;
    /// Waving.
    pub const WAVE: u8 = 25;
}
