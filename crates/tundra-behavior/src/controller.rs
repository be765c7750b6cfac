//! Per-bot lifecycle and the cancellable activity loop.
//!
//! A controller owns at most one running loop. [`BotController::begin_activity`]
//! always stops the previous loop before spawning a new one, and a stopped
//! loop is dropped at its current await point, which releases any spot lease
//! it was holding.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tundra_types::{AgentId, Occupant, Position, SafeMessage, WaddleId};
use tundra_world::Bot;

use crate::actions::BotActions;
use crate::context::BehaviorContext;
use crate::error::BehaviorError;

struct Activity {
    cancel: CancellationToken,
    task: JoinHandle<ActivityExit>,
}

/// Why an activity loop ended.
#[derive(Debug)]
pub enum ActivityExit {
    /// Stopped on request.
    Cancelled,
    /// An internal error ended the loop. It is not restarted.
    Failed(BehaviorError),
}

/// Drives one bot: lifecycle hooks, its activity loop, and event hooks.
pub struct BotController {
    actions: BotActions,
    activity: Mutex<Option<Activity>>,
}

impl BotController {
    /// Create a controller; nothing runs until [`Self::begin_activity`].
    pub fn new(bot: Arc<Bot>, ctx: Arc<BehaviorContext>) -> Self {
        Self {
            actions: BotActions::new(bot, ctx),
            activity: Mutex::new(None),
        }
    }

    /// The controlled bot.
    pub const fn bot(&self) -> &Arc<Bot> {
        self.actions.bot()
    }

    /// The bot's identifier.
    pub fn id(&self) -> AgentId {
        self.actions.bot().id()
    }

    /// Direct access to the bot's actions.
    pub const fn actions(&self) -> &BotActions {
        &self.actions
    }

    fn activity(&self) -> MutexGuard<'_, Option<Activity>> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Place an ambient bot in a random room. Summoned bots are placed by
    /// whoever summoned them.
    pub fn initialize(&self) -> Result<(), BehaviorError> {
        if !self.bot().is_summoned() {
            self.actions.randomize_room()?;
        }
        Ok(())
    }

    /// Start the activity loop, stopping any loop already running.
    pub fn begin_activity(&self) {
        self.stop_activity();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let actions = self.actions.clone();
        let nickname = self.bot().nickname().to_owned();

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    info!(bot = %nickname, "activity loop cancelled");
                    ActivityExit::Cancelled
                }
                result = activity_loop(actions) => match result {
                    Ok(never) => match never {},
                    Err(e) => {
                        error!(bot = %nickname, error = %e, "activity loop failed");
                        ActivityExit::Failed(e)
                    }
                },
            }
        });

        *self.activity() = Some(Activity { cancel, task });
    }

    /// Stop the activity loop if one is running.
    pub fn stop_activity(&self) {
        if let Some(activity) = self.activity().take() {
            activity.cancel.cancel();
        }
    }

    /// Whether an activity loop is currently running.
    pub fn is_active(&self) -> bool {
        self.activity()
            .as_ref()
            .is_some_and(|activity| !activity.task.is_finished())
    }

    /// Collect the exit of a loop that has already ended.
    ///
    /// Returns `None` while the loop still runs, after [`Self::stop_activity`],
    /// or when the exit was already collected. A supervisor uses this to
    /// decide on a restart.
    pub async fn collect_exit(&self) -> Option<ActivityExit> {
        let activity = {
            let mut slot = self.activity();
            if !slot.as_ref().is_some_and(|activity| activity.task.is_finished()) {
                return None;
            }
            slot.take()?
        };
        match activity.task.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                error!(bot = self.bot().nickname(), error = %e, "activity task aborted");
                None
            }
        }
    }

    /// Tear the bot down: stop its loop and take it out of its room.
    pub fn handle_disconnect(&self) {
        self.stop_activity();
        let room = self.actions.leave_room();
        self.bot().update(|state| {
            state.following = None;
            state.talking = false;
        });
        info!(
            bot = self.bot().nickname(),
            room = ?room.map(|r| r.get()),
            "bot disconnected"
        );
    }

    /// Bring a summoned bot to `player` and keep it there.
    pub fn summon_to(&self, player: &Occupant) {
        self.bot().update(|state| state.summoned = true);
        self.actions.go_player_room(player);
    }

    // -----------------------------------------------------------------------
    // Event hooks
    // -----------------------------------------------------------------------

    /// A player entered a room.
    pub fn on_player_joined_room(&self, player: &Occupant) {
        self.actions.on_player_joined_room(player);
    }

    /// A player moved inside their room.
    pub async fn on_player_moved(&self, player: AgentId) {
        self.actions.on_player_moved(player).await;
    }

    /// A snowball landed at `target`.
    pub async fn handle_snowball(&self, thrower: &Occupant, target: Position) -> bool {
        self.actions.handle_snowball(thrower, target).await
    }

    /// A player sent a safe-chat phrase.
    pub async fn handle_safe_message(
        &self,
        sender: &Occupant,
        message: SafeMessage,
    ) -> Result<(), BehaviorError> {
        self.actions.handle_safe_message(sender, message).await
    }

    /// A player sat down in a waddle this bot may join.
    pub async fn enter_waddle(&self, player: AgentId, waddle: WaddleId) -> bool {
        self.actions.enter_waddle(player, waddle).await
    }
}

impl Drop for BotController {
    fn drop(&mut self) {
        self.stop_activity();
    }
}

impl std::fmt::Debug for BotController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotController")
            .field("bot", &self.id())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// A cycle shorter than this did no real work and is padded with a delay.
const IDLE_CYCLE: Duration = Duration::from_secs(1);

/// Cycle forever: a random number of activity steps, then maybe a room
/// change. Only an error ends it.
async fn activity_loop(actions: BotActions) -> Result<Infallible, BehaviorError> {
    loop {
        let started = Instant::now();
        let steps = actions.config().cycle_steps.pick(&mut rand::rng());
        for _ in 0..steps {
            actions.perform_activities().await?;
        }
        actions.move_if_idle().await?;

        if started.elapsed() < IDLE_CYCLE {
            // Nothing in the cycle waited (features off, spot rolls missed).
            let delay = actions.config().step_delay_secs.pick_secs(&mut rand::rng());
            tokio::time::sleep(delay).await;
            tokio::task::yield_now().await;
        }
    }
}
