//! How a bot answers what players do: snowballs, safe-chat phrases, room
//! joins, movement, and waddle sign-ups.
//!
//! Each reaction is a variant of a small enum with a fixed signature, chosen
//! from the triggering event and then performed.

use std::time::Duration;

use rand::seq::IndexedRandom;
use tracing::{debug, info};
use tundra_types::{AgentId, Occupant, Position, RoomEventKind, SafeMessage, WaddleId, emotes, frames};

use crate::actions::BotActions;
use crate::config::BehaviorConfig;
use crate::error::BehaviorError;
use crate::flags::Feature;

/// What a bot does after being hit by a snowball.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnowballReaction {
    /// Show a sad face.
    Lament,
    /// Throw one back at the thrower.
    ThrowBack,
}

impl SnowballReaction {
    /// Reactions switched on in `config`.
    pub fn enabled(config: &BehaviorConfig) -> Vec<Self> {
        let mut reactions = Vec::with_capacity(2);
        if config.enable_snowball_lament {
            reactions.push(Self::Lament);
        }
        if config.enable_snowball_throwback {
            reactions.push(Self::ThrowBack);
        }
        reactions
    }

    /// Carry out the reaction against `thrower`.
    pub fn perform(self, actions: &BotActions, thrower: &Occupant) {
        match self {
            Self::Lament => {
                actions.announce(RoomEventKind::Emote { emote: emotes::SAD });
            }
            Self::ThrowBack => {
                actions.announce(RoomEventKind::Snowball {
                    target: thrower.position,
                });
            }
        }
    }
}

/// What a bot does when a nearby player sends a safe-chat phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeMessageReaction {
    /// Greet back.
    Greet,
    /// Start trailing the sender.
    Follow,
    /// Stop trailing and wander off.
    StopFollowing,
    /// Walk somewhere random.
    RandomMove,
}

impl SafeMessageReaction {
    /// The reaction a phrase triggers, if any and if enabled.
    ///
    /// Summoned bots never greet back.
    pub fn for_message(message: SafeMessage, config: &BehaviorConfig, summoned: bool) -> Option<Self> {
        match message {
            SafeMessage::Hello if !summoned => Some(Self::Greet),
            SafeMessage::FollowMe if config.enable_follow_mode => Some(Self::Follow),
            SafeMessage::GoAway if config.enable_follow_mode => Some(Self::StopFollowing),
            SafeMessage::Where if config.enable_random_movement_on_demand => {
                Some(Self::RandomMove)
            }
            _ => None,
        }
    }

    /// Carry out the reaction toward `sender`.
    pub async fn perform(self, actions: &BotActions, sender: &Occupant) -> Result<(), BehaviorError> {
        match self {
            Self::Greet => {
                actions.greet();
            }
            Self::Follow => actions.follow(sender).await,
            Self::StopFollowing => actions.stop_following().await?,
            Self::RandomMove => {
                actions.random_move()?;
            }
        }
        Ok(())
    }
}

/// Whether a snowball landing at `target` hits a bot standing at `bot`.
///
/// The hit box spans `[bot - margin, bot + margin)` on both axes.
pub fn is_snowballed(bot: Position, target: Position, margin: i32) -> bool {
    let within = |center: i32, value: i32| {
        (center.saturating_sub(margin)..center.saturating_add(margin)).contains(&value)
    };
    within(bot.x, target.x) && within(bot.y, target.y)
}

/// Where a follower should stand: `distance` pixels from `target`, on the
/// line toward the follower's current position.
// Room coordinates stay within a few thousand pixels.
#[allow(clippy::cast_possible_truncation)]
pub fn trailing_position(follower: Position, target: Position, distance: f64) -> Position {
    let dx = f64::from(follower.x) - f64::from(target.x);
    let dy = f64::from(follower.y) - f64::from(target.y);
    let angle = dy.atan2(dx);
    let x = f64::from(target.x) + distance * angle.cos();
    let y = f64::from(target.y) + distance * angle.sin();
    Position::new(x.trunc() as i32, y.trunc() as i32)
}

impl BotActions {
    /// React to a snowball landing at `target`, thrown by `thrower`.
    ///
    /// Returns whether the bot was hit.
    pub async fn handle_snowball(&self, thrower: &Occupant, target: Position) -> bool {
        if self.bot.room() != Some(thrower.room)
            || !is_snowballed(self.bot.position(), target, self.config().snowball_margin)
        {
            return false;
        }

        tokio::time::sleep(Duration::from_millis(self.config().snowball_reaction_delay_ms)).await;

        let reaction = SnowballReaction::enabled(self.config())
            .choose(&mut rand::rng())
            .copied();
        if let Some(reaction) = reaction {
            debug!(bot = self.bot.nickname(), ?reaction, "snowball reaction");
            reaction.perform(self, thrower);
        }
        true
    }

    /// Whether `player` stands in the bot's room within interaction distance.
    pub fn meets_interaction_distance(&self, player: &Occupant) -> bool {
        let state = self.bot.snapshot();
        state.room == Some(player.room)
            && state.position.distance_to(player.position) < self.config().interaction_distance
    }

    /// React to a safe-chat phrase from `sender`.
    pub async fn handle_safe_message(
        &self,
        sender: &Occupant,
        message: SafeMessage,
    ) -> Result<(), BehaviorError> {
        if !self.meets_interaction_distance(sender) {
            debug!(
                bot = self.bot.nickname(),
                player = %sender.nickname,
                "safe message from too far away"
            );
            return Ok(());
        }

        let reaction =
            SafeMessageReaction::for_message(message, self.config(), self.bot.is_summoned());
        if let Some(reaction) = reaction {
            info!(
                bot = self.bot.nickname(),
                player = %sender.nickname,
                ?message,
                ?reaction,
                "reacting to safe message"
            );
            reaction.perform(self, sender).await?;
        }
        Ok(())
    }

    /// Say one of the configured greetings.
    pub fn greet(&self) -> Option<SafeMessage> {
        let message = self.config().greetings.choose(&mut rand::rng()).copied()?;
        info!(bot = self.bot.nickname(), ?message, "greeting the room");
        self.announce(RoomEventKind::SafeMessage { message });
        Some(message)
    }

    /// Start following `target`; a bot already following someone ignores
    /// the request.
    pub async fn follow(&self, target: &Occupant) {
        let started = self.bot.update(|state| {
            if state.following.is_some() {
                return false;
            }
            state.following = Some(target.id);
            true
        });
        if !started {
            return;
        }
        self.announce(RoomEventKind::SafeMessage {
            message: SafeMessage::Ok,
        });
        self.goto_coordinates(target, target.position).await;
    }

    /// Catch up with `target`, who is heading for `position`.
    pub async fn goto_coordinates(&self, target: &Occupant, position: Position) {
        let trail = trailing_position(self.bot.position(), position, self.config().follow_distance);
        self.bot.update(|state| {
            state.position = trail;
            state.frame = frames::STANDING;
        });
        info!(
            bot = self.bot.nickname(),
            player = %target.nickname,
            x = trail.x,
            y = trail.y,
            "following player"
        );
        tokio::time::sleep(Duration::from_millis(self.config().follow_delay_ms)).await;
        self.announce(RoomEventKind::Moved { position: trail });
    }

    /// Stop following, say goodbye, and wander off to another room.
    pub async fn stop_following(&self) -> Result<(), BehaviorError> {
        if self.bot.update(|state| state.following.take()).is_none() {
            return Ok(());
        }
        self.announce(RoomEventKind::SafeMessage {
            message: SafeMessage::SeeULater,
        });
        tokio::time::sleep(Duration::from_millis(self.config().farewell_delay_ms)).await;
        self.randomize_room()?;
        Ok(())
    }

    /// Join `player`'s room at `player`'s position.
    pub fn go_player_room(&self, player: &Occupant) {
        self.join_room(player.room, player.position);
    }

    /// A player entered a room: follow them in, or greet a quiet room.
    pub fn on_player_joined_room(&self, player: &Occupant) {
        if self.bot.following() == Some(player.id) {
            self.go_player_room(player);
            return;
        }
        if self.bot.room() == Some(player.room)
            && self.enabled(Feature::Greeting)
            && !self.bot.is_summoned()
            && self.ctx.directory.occupants(player.room).len()
                < self.config().greeting_max_occupants
        {
            self.greet();
        }
    }

    /// A player moved: a bot following them in the same room catches up.
    ///
    /// The bot trails the latest position in the directory rather than the
    /// one carried by the event, so a late dispatch never chases a stale spot.
    pub async fn on_player_moved(&self, player: AgentId) {
        if self.bot.following() != Some(player) {
            return;
        }
        let Some(target) = self.ctx.directory.occupant(player) else {
            return;
        };
        if self.bot.room() == Some(target.room) {
            self.goto_coordinates(&target, target.position).await;
        }
    }

    /// Take a seat in `waddle` next to `player` after the join delay.
    ///
    /// Returns whether the bot sat down.
    pub async fn enter_waddle(&self, player: AgentId, waddle: WaddleId) -> bool {
        if !self.config().waddle_ids.contains(&waddle) {
            return false;
        }
        info!(bot = self.bot.nickname(), waddle = %waddle, "scheduled to join waddle");
        tokio::time::sleep(Duration::from_secs(self.config().waddle_join_delay_secs)).await;

        if !self.ctx.directory.is_seated(waddle, player) {
            info!(
                bot = self.bot.nickname(),
                waddle = %waddle,
                "player left the waddle, not joining"
            );
            return false;
        }

        let previous = self.bot.room();
        let position = self.bot.position();
        if !self.announce(RoomEventKind::JoinedWaddle { waddle }) {
            return false;
        }
        // The game itself runs on the host; the bot walks back afterwards.
        if let Some(room) = previous {
            self.join_room(room, position);
        }
        true
    }
}
