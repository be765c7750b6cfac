//! Error types for the `tundra-behavior` crate.

use tundra_types::AgentId;

/// Errors raised inside a bot's activity loop or reactions.
///
/// Any of these ends the activity loop that hit it; the loop is not
/// restarted automatically.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    /// The bot was asked to act in its room but is not in one.
    #[error("bot {bot} is not in a room")]
    NotInRoom {
        /// The roomless bot.
        bot: AgentId,
    },

    /// No destination room could be chosen.
    #[error("no room available for bot {bot}: {reason}")]
    NoRoomAvailable {
        /// The bot that tried to move.
        bot: AgentId,
        /// Why the choice failed.
        reason: String,
    },
}
