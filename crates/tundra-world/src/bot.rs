//! The bot agent entity shared by the behavior engine and the conversation
//! orchestrator.
//!
//! A [`Bot`] is handed around as `Arc<Bot>`. Its mutable state sits behind a
//! short-lived mutex; no caller holds the lock across an `.await`, so a step
//! of one bot's logic is never observed half-applied by another task.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tundra_types::{AgentId, Occupant, Outfit, Position, RoomId, frames};

/// Mutable state of a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotState {
    /// Room the bot currently stands in.
    pub room: Option<RoomId>,
    /// Current position.
    pub position: Position,
    /// Current pose.
    pub frame: u8,
    /// Worn items.
    pub outfit: Outfit,
    /// Player this bot trails, if any.
    pub following: Option<AgentId>,
    /// Set while the bot is part of a running conversation.
    pub talking: bool,
    /// Bumped each time a conversation enlists the bot.
    pub talk_claim: u64,
    /// Summoned by a moderator (scripted) rather than ambient.
    pub summoned: bool,
}

/// A simulated participant controlled by this runtime.
#[derive(Debug)]
pub struct Bot {
    id: AgentId,
    nickname: String,
    state: Mutex<BotState>,
}

impl Bot {
    /// Create a bot outside of any room.
    pub fn new(id: AgentId, nickname: impl Into<String>, outfit: Outfit) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            state: Mutex::new(BotState {
                room: None,
                position: Position::default(),
                frame: frames::IDLE,
                outfit,
                following: None,
                talking: false,
                talk_claim: 0,
                summoned: false,
            }),
        }
    }

    /// The bot's identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// The bot's display name.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    fn lock(&self) -> MutexGuard<'_, BotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> BotState {
        self.lock().clone()
    }

    /// Mutate the state under the lock and return the closure's result.
    pub fn update<R>(&self, f: impl FnOnce(&mut BotState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Room the bot stands in.
    pub fn room(&self) -> Option<RoomId> {
        self.lock().room
    }

    /// Current position.
    pub fn position(&self) -> Position {
        self.lock().position
    }

    /// Current outfit.
    pub fn outfit(&self) -> Outfit {
        self.lock().outfit.clone()
    }

    /// Whether the bot is mid-conversation.
    pub fn is_talking(&self) -> bool {
        self.lock().talking
    }

    /// Set or clear the mid-conversation flag.
    pub fn set_talking(&self, talking: bool) {
        self.lock().talking = talking;
    }

    /// Mark the bot as talking for a new exchange and return its claim.
    ///
    /// A later claim supersedes this one.
    pub fn claim_talking(&self) -> u64 {
        let mut state = self.lock();
        state.talking = true;
        state.talk_claim = state.talk_claim.wrapping_add(1);
        state.talk_claim
    }

    /// Clear the talking flag if `claim` is still the latest claim.
    ///
    /// Returns whether the flag was cleared.
    pub fn release_talking(&self, claim: u64) -> bool {
        let mut state = self.lock();
        if state.talk_claim != claim {
            return false;
        }
        state.talking = false;
        true
    }

    /// Whether a moderator summoned this bot.
    pub fn is_summoned(&self) -> bool {
        self.lock().summoned
    }

    /// Player the bot is following.
    pub fn following(&self) -> Option<AgentId> {
        self.lock().following
    }

    /// The bot as an occupant of its room, if it is in one.
    pub fn as_occupant(&self) -> Option<Occupant> {
        let state = self.lock();
        state.room.map(|room| Occupant {
            id: self.id,
            nickname: self.nickname.clone(),
            room,
            position: state.position,
            is_bot: true,
        })
    }
}
