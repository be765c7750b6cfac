//! Events crossing the boundary between the bot runtime and the host world.
//!
//! - [`RoomEvent`] flows outward: something a bot did that every client in
//!   the room must see.
//! - [`WorldEvent`] flows inward: something a player did that bots may react
//!   to, or an operator instruction already parsed by the host.

use serde::{Deserialize, Serialize};

use crate::enums::SafeMessage;
use crate::ids::{AgentId, RoomId, WaddleId};
use crate::structs::{Occupant, Outfit, Position};

/// An outward, fire-and-forget notification about a bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEvent {
    /// Room whose occupants receive the event.
    pub room: RoomId,
    /// The acting bot.
    pub agent: AgentId,
    /// What happened.
    pub kind: RoomEventKind,
}

impl RoomEvent {
    /// Build an event.
    pub const fn new(room: RoomId, agent: AgentId, kind: RoomEventKind) -> Self {
        Self { room, agent, kind }
    }
}

/// The payload of a [`RoomEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoomEventKind {
    /// The bot entered the room at a position.
    Joined {
        /// Where the bot appears.
        position: Position,
    },
    /// The bot left the room.
    Left,
    /// The bot walks to a position.
    Moved {
        /// Destination.
        position: Position,
    },
    /// The bot strikes a pose.
    Frame {
        /// Pose index.
        frame: u8,
    },
    /// The bot shows an emoticon.
    Emote {
        /// Emoticon id.
        emote: u32,
    },
    /// The bot throws a snowball.
    Snowball {
        /// Impact point.
        target: Position,
    },
    /// The bot says a safe-chat phrase.
    SafeMessage {
        /// The phrase.
        message: SafeMessage,
    },
    /// The bot says a line of free text.
    Chat {
        /// The line.
        text: String,
    },
    /// The bot's worn items changed.
    OutfitChanged {
        /// The full outfit after the change.
        outfit: Outfit,
    },
    /// The bot took a seat in a waddle.
    JoinedWaddle {
        /// The waddle joined.
        waddle: WaddleId,
    },
}

impl RoomEventKind {
    /// Short stable name, used for routing subjects and log fields.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "joined",
            Self::Left => "left",
            Self::Moved { .. } => "moved",
            Self::Frame { .. } => "frame",
            Self::Emote { .. } => "emote",
            Self::Snowball { .. } => "snowball",
            Self::SafeMessage { .. } => "safe_message",
            Self::Chat { .. } => "chat",
            Self::OutfitChanged { .. } => "outfit",
            Self::JoinedWaddle { .. } => "waddle",
        }
    }
}

/// An inbound notification from the host world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    /// A player entered a room.
    PlayerJoinedRoom {
        /// The player as they now stand.
        player: Occupant,
    },
    /// A player disconnected.
    PlayerLeft {
        /// The player.
        player: AgentId,
    },
    /// A player walked somewhere in their room.
    PlayerMoved {
        /// The player.
        player: AgentId,
        /// Destination.
        position: Position,
    },
    /// A player threw a snowball.
    SnowballThrown {
        /// The thrower.
        player: AgentId,
        /// Impact point.
        target: Position,
    },
    /// A player said a safe-chat phrase.
    SafeMessage {
        /// The speaker.
        player: AgentId,
        /// Host message id.
        message_id: u32,
    },
    /// A player sat down in a waddle.
    WaddleJoined {
        /// The player.
        player: AgentId,
        /// The waddle.
        waddle: WaddleId,
        /// Total seats of the waddle.
        seats: u32,
    },
    /// A player left a waddle.
    WaddleLeft {
        /// The player.
        player: AgentId,
        /// The waddle.
        waddle: WaddleId,
    },
    /// A player sent a free-text chat line.
    ChatMessage {
        /// The speaker.
        player: AgentId,
        /// The line.
        text: String,
    },
    /// A moderator summoned a named bot next to themselves.
    SummonBot {
        /// The moderator.
        player: AgentId,
        /// Bot to summon.
        nickname: String,
    },
    /// A moderator dismissed a summoned bot.
    DismissBot {
        /// Bot to dismiss.
        nickname: String,
    },
    /// A moderator changed the ambient bot population.
    SetPopulation {
        /// Desired number of active bots.
        population: usize,
    },
    /// A moderator flipped a runtime behavior toggle.
    ToggleSetting {
        /// Human-readable setting name (e.g. `random spots`).
        setting: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_event_uses_type_tag() {
        let raw = r#"{"type":"snowball_thrown","player":"01945c2a-3b4f-7def-8a12-bc34567890ab","target":{"x":10,"y":20}}"#;
        let event: Result<WorldEvent, _> = serde_json::from_str(raw);
        assert!(matches!(
            event,
            Ok(WorldEvent::SnowballThrown { target: Position { x: 10, y: 20 }, .. })
        ));
    }

    #[test]
    fn room_event_kind_names_are_stable() {
        assert_eq!(RoomEventKind::Left.name(), "left");
        assert_eq!(
            RoomEventKind::Chat { text: String::from("hi") }.name(),
            "chat"
        );
    }
}
