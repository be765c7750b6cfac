//! What a bot does on its own: visit spots, strike poses, wander, and hop
//! between rooms.
//!
//! [`BotActions`] is cheap to clone; the activity loop owns one clone and
//! event reactions use another, both pointing at the same [`Bot`].

use std::sync::Arc;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use tracing::{debug, info};
use tundra_types::{Position, RoomEvent, RoomEventKind, RoomId};
use tundra_world::{Bot, SpotLease, announce, is_occupied};

use crate::config::BehaviorConfig;
use crate::context::BehaviorContext;
use crate::error::BehaviorError;
use crate::flags::Feature;

/// One bot bound to the shared behavior context.
#[derive(Debug, Clone)]
pub struct BotActions {
    pub(crate) bot: Arc<Bot>,
    pub(crate) ctx: Arc<BehaviorContext>,
}

impl BotActions {
    /// Bind a bot to the shared context.
    pub const fn new(bot: Arc<Bot>, ctx: Arc<BehaviorContext>) -> Self {
        Self { bot, ctx }
    }

    /// The controlled bot.
    pub const fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    /// The shared context.
    pub const fn context(&self) -> &Arc<BehaviorContext> {
        &self.ctx
    }

    pub(crate) fn config(&self) -> &BehaviorConfig {
        &self.ctx.config
    }

    pub(crate) fn enabled(&self, feature: Feature) -> bool {
        self.ctx.flags.enabled(feature)
    }

    pub(crate) fn announce(&self, kind: RoomEventKind) -> bool {
        announce(self.ctx.events.as_ref(), &self.bot, kind)
    }

    pub(crate) fn require_room(&self) -> Result<RoomId, BehaviorError> {
        self.bot
            .room()
            .ok_or(BehaviorError::NotInRoom { bot: self.bot.id() })
    }

    // -----------------------------------------------------------------------
    // Activity steps
    // -----------------------------------------------------------------------

    /// One inner step of the activity loop: spot, pose, move, in that order.
    pub async fn perform_activities(&self) -> Result<(), BehaviorError> {
        self.maybe_move_to_spot().await?;
        self.maybe_random_frame().await;
        self.maybe_random_move().await
    }

    /// Visit a spot when spots are enabled and the bot was not summoned.
    pub async fn maybe_move_to_spot(&self) -> Result<(), BehaviorError> {
        if self.enabled(Feature::SpotLocations) && !self.bot.is_summoned() {
            self.move_to_spot().await?;
        }
        Ok(())
    }

    /// Roll for a spot visit and, if a free spot comes up, perform it.
    ///
    /// The chance is a third of the free spots, capped by
    /// `spot_max_probability`. Returns whether a visit happened.
    pub async fn move_to_spot(&self) -> Result<bool, BehaviorError> {
        let room = self.require_room()?;
        let pool = self.ctx.layouts.spots_for(room);

        let free = u32::try_from(pool.available()).map_or(f64::MAX, f64::from);
        let chance = (free / 3.0).min(self.config().spot_max_probability);
        let roll: f64 = rand::rng().random();
        if roll >= chance {
            return Ok(false);
        }

        let Some(mut lease) = pool.acquire(Arc::clone(&self.bot), Arc::clone(&self.ctx.events))
        else {
            return Ok(false);
        };

        let occupants = self.ctx.directory.occupants(room);
        let spot_distance = self.config().spot_distance;
        if lease
            .spot()
            .is_some_and(|spot| is_occupied(spot, &occupants, spot_distance))
        {
            debug!(bot = self.bot.nickname(), room = %room, "spot occupied by a player");
            return Ok(false);
        }

        self.visit_spot(&lease).await;
        lease.release();
        Ok(true)
    }

    /// Walk to the leased spot, dress for it, strike its pose, and linger.
    async fn visit_spot(&self, lease: &SpotLease) {
        let Some(spot) = lease.spot().cloned() else {
            return;
        };

        let distance = self.bot.position().distance_to(spot.position);
        self.bot.update(|state| {
            state.position = spot.position;
            state.frame = spot.frame;
        });
        self.announce(RoomEventKind::Moved {
            position: spot.position,
        });
        lease.wear_clothes();

        tokio::time::sleep(self.config().travel_time(distance)).await;
        self.announce(RoomEventKind::Frame { frame: spot.frame });

        let dwell = self.config().spot_dwell_secs.pick_secs(&mut rand::rng());
        debug!(
            bot = self.bot.nickname(),
            dwell_secs = dwell.as_secs(),
            "posing at spot"
        );
        tokio::time::sleep(dwell).await;
    }

    /// Strike a random pose after a short wait, unless summoned.
    pub async fn maybe_random_frame(&self) {
        if self.enabled(Feature::RandomFrames) && !self.bot.is_summoned() {
            let delay = self.config().step_delay_secs.pick_secs(&mut rand::rng());
            tokio::time::sleep(delay).await;
            self.random_frame();
        }
    }

    /// Strike a pose drawn from the configured range.
    pub fn random_frame(&self) -> u8 {
        let frame = self.config().frames.pick(&mut rand::rng());
        self.bot.update(|state| state.frame = frame);
        self.announce(RoomEventKind::Frame { frame });
        frame
    }

    /// Walk to a random point after a short wait.
    pub async fn maybe_random_move(&self) -> Result<(), BehaviorError> {
        if self.enabled(Feature::RandomMovement) {
            let delay = self.config().step_delay_secs.pick_secs(&mut rand::rng());
            tokio::time::sleep(delay).await;
            self.random_move()?;
        }
        Ok(())
    }

    /// Walk to a point drawn uniformly from the room's walkable area.
    pub fn random_move(&self) -> Result<Position, BehaviorError> {
        let room = self.require_room()?;
        let position = self.ctx.layouts.area_for(room).sample(&mut rand::rng());
        self.bot.update(|state| state.position = position);
        self.announce(RoomEventKind::Moved { position });
        Ok(position)
    }

    /// Change rooms after a short wait, unless following someone or
    /// summoned.
    pub async fn move_if_idle(&self) -> Result<(), BehaviorError> {
        if self.enabled(Feature::RandomMovement)
            && self.bot.following().is_none()
            && !self.bot.is_summoned()
        {
            let delay = self.config().step_delay_secs.pick_secs(&mut rand::rng());
            tokio::time::sleep(delay).await;
            self.randomize_room()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Room membership
    // -----------------------------------------------------------------------

    /// Join a weighted-random room other than the current one, at a random
    /// walkable position.
    pub fn randomize_room(&self) -> Result<RoomId, BehaviorError> {
        let current = self.bot.room();
        let candidates: Vec<RoomId> = self
            .config()
            .bot_rooms
            .iter()
            .copied()
            .filter(|room| Some(*room) != current)
            .collect();
        let weights: Vec<f64> = candidates
            .iter()
            .map(|room| self.config().room_weight(*room))
            .collect();

        let no_room = |reason: String| BehaviorError::NoRoomAvailable {
            bot: self.bot.id(),
            reason,
        };
        let index = WeightedIndex::new(&weights).map_err(|e| no_room(e.to_string()))?;

        let (room, position) = {
            let mut rng = rand::rng();
            let room = candidates
                .get(index.sample(&mut rng))
                .copied()
                .ok_or_else(|| no_room(String::from("weighted pick out of range")))?;
            (room, self.ctx.layouts.area_for(room).sample(&mut rng))
        };

        self.join_room(room, position);
        Ok(room)
    }

    /// Leave the current room (if any) and enter `room` at `position`.
    pub fn join_room(&self, room: RoomId, position: Position) {
        let previous = self.bot.update(|state| {
            state.position = position;
            state.room.replace(room)
        });
        if let Some(previous) = previous {
            self.ctx
                .events
                .emit(RoomEvent::new(previous, self.bot.id(), RoomEventKind::Left));
        }
        self.announce(RoomEventKind::Joined { position });
        info!(
            bot = self.bot.nickname(),
            room = %room,
            x = position.x,
            y = position.y,
            "bot joined room"
        );
    }

    /// Leave the current room without entering another.
    pub fn leave_room(&self) -> Option<RoomId> {
        let previous = self.bot.update(|state| state.room.take())?;
        self.ctx
            .events
            .emit(RoomEvent::new(previous, self.bot.id(), RoomEventKind::Left));
        Some(previous)
    }
}
