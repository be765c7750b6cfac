//! The bot population and world-event dispatch.
//!
//! [`BotManager`] owns one [`BotController`] per active bot. It grows and
//! shrinks the ambient population, rotates ambient bots in and out, brings
//! summoned bots to moderators, and routes every inbound [`WorldEvent`] to
//! the controllers or the conversation orchestrator.
//!
//! Events that several bots react to (snowballs, safe-chat phrases, player
//! movement, waddles) fan out concurrently, and dispatch returns once every
//! reaction has finished.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use futures::{Stream, StreamExt};
use rand::seq::{IndexedRandom, SliceRandom};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tundra_behavior::{BehaviorContext, BotController, Feature};
use tundra_dialogue::{
    ConversationRoster, ConversationTurn, ExchangeOutcome, Orchestrator, eligible_participants,
    sample_participants,
};
use tundra_types::{AgentId, Position, SafeMessage, WaddleId, WorldEvent};
use tundra_world::{Bot, RoomDirectory, WorldMirror};

use crate::config::{PopulationConfig, RosterEntry};
use crate::sink::MirroredEvents;

/// A roster entry with its stable identity.
#[derive(Debug, Clone)]
struct Account {
    id: AgentId,
    entry: RosterEntry,
}

/// Owns the active bots and routes world events to them.
pub struct BotManager {
    behavior: Arc<BehaviorContext>,
    orchestrator: Orchestrator,
    sink: Arc<MirroredEvents>,
    mirror: Arc<WorldMirror>,
    population: PopulationConfig,
    accounts: Vec<Account>,
    active: Mutex<Vec<Arc<BotController>>>,
}

impl BotManager {
    /// Create a manager with no active bots.
    ///
    /// `behavior` must emit through `sink` and read from `mirror`. Roster
    /// entries with a nickname already taken (ignoring case) are dropped.
    pub fn new(
        behavior: Arc<BehaviorContext>,
        orchestrator: Orchestrator,
        sink: Arc<MirroredEvents>,
        mirror: Arc<WorldMirror>,
        population: PopulationConfig,
    ) -> Self {
        let mut accounts: Vec<Account> = Vec::with_capacity(population.roster.len());
        for entry in &population.roster {
            if accounts
                .iter()
                .any(|a| a.entry.nickname.eq_ignore_ascii_case(&entry.nickname))
            {
                warn!(nickname = %entry.nickname, "duplicate roster entry ignored");
                continue;
            }
            accounts.push(Account {
                id: AgentId::new(),
                entry: entry.clone(),
            });
        }
        info!(accounts = accounts.len(), "bot roster loaded");

        Self {
            behavior,
            orchestrator,
            sink,
            mirror,
            population,
            accounts,
            active: Mutex::new(Vec::new()),
        }
    }

    fn active(&self) -> MutexGuard<'_, Vec<Arc<BotController>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the active controllers.
    pub fn active_bots(&self) -> Vec<Arc<BotController>> {
        self.active().clone()
    }

    /// Number of active bots.
    pub fn active_count(&self) -> usize {
        self.active().len()
    }

    /// The active controller for `nickname`, ignoring case.
    pub fn find_active(&self, nickname: &str) -> Option<Arc<BotController>> {
        self.active()
            .iter()
            .find(|c| c.bot().nickname().eq_ignore_ascii_case(nickname))
            .cloned()
    }

    fn account(&self, nickname: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.entry.nickname.eq_ignore_ascii_case(nickname))
    }

    fn idle_accounts(&self, active: &[Arc<BotController>]) -> Vec<&Account> {
        self.accounts
            .iter()
            .filter(|a| active.iter().all(|c| c.id() != a.id))
            .collect()
    }

    fn controller_for(&self, account: &Account) -> Arc<BotController> {
        let bot = Arc::new(Bot::new(
            account.id,
            account.entry.nickname.clone(),
            account.entry.outfit.clone(),
        ));
        self.sink.register(&bot);
        Arc::new(BotController::new(bot, Arc::clone(&self.behavior)))
    }

    /// Place an ambient bot and start its loop. Returns `None` if it could
    /// not be placed.
    fn bring_out(&self, account: &Account) -> Option<Arc<BotController>> {
        let controller = self.controller_for(account);
        if let Err(e) = controller.initialize() {
            error!(bot = %account.entry.nickname, error = %e, "failed to place bot");
            self.sink.forget(account.id);
            return None;
        }
        controller.begin_activity();
        info!(bot = %account.entry.nickname, "bot joined");
        Some(controller)
    }

    fn take_out(&self, controller: &BotController) {
        controller.handle_disconnect();
        self.sink.forget(controller.id());
    }

    // -----------------------------------------------------------------------
    // Population
    // -----------------------------------------------------------------------

    /// Grow or shrink the active set to `target` bots.
    ///
    /// Leaving bots are drawn at random from every active bot; joining bots
    /// are drawn from idle roster entries. Returns the new active count.
    pub fn populate(&self, target: usize) -> usize {
        let current = self.active_count();

        if target < current {
            let leaving: Vec<Arc<BotController>> = {
                let mut active = self.active();
                let mut rng = rand::rng();
                active.shuffle(&mut rng);
                active.split_off(target)
            };
            for controller in &leaving {
                self.take_out(controller);
            }
            info!(left = leaving.len(), target, "population reduced");
        } else if target > current {
            let wanted = target.saturating_sub(current);
            let joining: Vec<Account> = {
                let active = self.active();
                let idle = self.idle_accounts(&active);
                let mut rng = rand::rng();
                idle.choose_multiple(&mut rng, wanted)
                    .map(|a| (*a).clone())
                    .collect()
            };
            if joining.len() < wanted {
                warn!(
                    wanted,
                    available = joining.len(),
                    "not enough idle bots in the roster"
                );
            }
            let started: Vec<Arc<BotController>> =
                joining.iter().filter_map(|a| self.bring_out(a)).collect();
            info!(joined = started.len(), target, "population increased");
            self.active().extend(started);
        }

        let count = self.active_count();
        info!(active = count, "bot population");
        count
    }

    /// Swap one ambient bot for an idle one.
    ///
    /// Only happens when both the roster and the active set exceed
    /// `rotation_min_active`. Summoned bots never rotate out. Returns
    /// whether a swap happened.
    pub fn rotate_once(&self) -> bool {
        let threshold = self.population.rotation_min_active;
        let (joining, leaving) = {
            let mut active = self.active();
            if self.accounts.len() <= threshold || active.len() <= threshold {
                return false;
            }
            let mut rng = rand::rng();
            let Some(joining) = self.idle_accounts(&active).choose(&mut rng).map(|a| (*a).clone())
            else {
                info!("no idle bots to rotate in");
                return false;
            };
            let candidates: Vec<usize> = active
                .iter()
                .enumerate()
                .filter(|(_, c)| !c.bot().is_summoned())
                .map(|(i, _)| i)
                .collect();
            let Some(&index) = candidates.choose(&mut rng) else {
                info!("no ambient bots can leave");
                return false;
            };
            (joining, active.swap_remove(index))
        };

        info!(
            leaving = leaving.bot().nickname(),
            joining = %joining.entry.nickname,
            "rotating bots"
        );
        self.take_out(&leaving);
        if let Some(controller) = self.bring_out(&joining) {
            self.active().push(controller);
        }
        true
    }

    /// Rotate bots at random intervals until `cancel` fires.
    pub async fn run_rotation(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let wait = self.population.rotation_secs.pick_secs(&mut rand::rng());
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("rotation stopped");
                    return;
                }
                () = tokio::time::sleep(wait) => {
                    self.rotate_once();
                }
            }
        }
    }

    /// Take every bot out.
    pub fn shutdown(&self) {
        let all = std::mem::take(&mut *self.active());
        for controller in &all {
            self.take_out(controller);
        }
        info!(bots = all.len(), "all bots taken out");
    }

    // -----------------------------------------------------------------------
    // Moderator commands
    // -----------------------------------------------------------------------

    /// Bring the roster bot `nickname` next to `player` and keep it there.
    ///
    /// Returns whether the bot was summoned.
    pub fn summon(&self, player: AgentId, nickname: &str) -> bool {
        let Some(target) = self.mirror.occupant(player) else {
            warn!(player = %player, "summoning player is not in any room");
            return false;
        };
        let controller = match self.find_active(nickname) {
            Some(controller) => controller,
            None => {
                let Some(account) = self.account(nickname).cloned() else {
                    info!(player = %target.nickname, nickname, "no bot with that name");
                    return false;
                };
                let controller = self.controller_for(&account);
                self.active().push(Arc::clone(&controller));
                controller
            }
        };

        controller.summon_to(&target);
        controller.begin_activity();
        info!(
            player = %target.nickname,
            bot = controller.bot().nickname(),
            room = %target.room,
            "bot summoned"
        );
        true
    }

    /// Take a summoned bot out. Returns whether one was found.
    pub fn dismiss(&self, nickname: &str) -> bool {
        let removed = {
            let mut active = self.active();
            active
                .iter()
                .position(|c| {
                    c.bot().is_summoned() && c.bot().nickname().eq_ignore_ascii_case(nickname)
                })
                .map(|index| active.swap_remove(index))
        };
        match removed {
            Some(controller) => {
                self.take_out(&controller);
                info!(bot = controller.bot().nickname(), "bot dismissed");
                true
            }
            None => {
                info!(nickname, "no summoned bot with that name");
                false
            }
        }
    }

    /// Flip a runtime behavior toggle by its setting phrase.
    ///
    /// Returns the new state, or `None` for an unknown phrase.
    pub fn toggle_setting(&self, setting: &str) -> Option<bool> {
        let Some(feature) = Feature::from_setting(setting) else {
            let available: Vec<&str> = Feature::ALL.iter().map(|f| f.setting_name()).collect();
            info!(setting, available = ?available, "unknown setting");
            return None;
        };
        let enabled = self.behavior.flags.toggle(feature);
        info!(setting = feature.setting_name(), enabled, "setting toggled");
        Some(enabled)
    }

    // -----------------------------------------------------------------------
    // World events
    // -----------------------------------------------------------------------

    /// Update the room directory from an inbound event.
    pub fn observe(&self, event: &WorldEvent) {
        self.mirror.apply_world(event);
    }

    /// Observe and dispatch every event of `events` until it ends.
    ///
    /// Each event is dispatched on its own task so slow reactions (waddle
    /// delays, conversations) never hold up the directory. Dispatches may
    /// finish out of order; the directory is updated here, in stream order,
    /// and followers read positions from it.
    pub async fn serve(self: &Arc<Self>, mut events: impl Stream<Item = WorldEvent> + Unpin) {
        while let Some(event) = events.next().await {
            self.observe(&event);
            let manager = Arc::clone(self);
            tokio::spawn(async move { manager.dispatch(event).await });
        }
        info!("world event stream ended");
    }

    /// React to one inbound event. The directory must already reflect it.
    pub async fn dispatch(&self, event: WorldEvent) {
        match event {
            WorldEvent::PlayerJoinedRoom { player } => {
                for controller in self.active_bots() {
                    controller.on_player_joined_room(&player);
                }
            }
            WorldEvent::PlayerMoved { player, .. } => {
                self.player_moved(player).await;
            }
            WorldEvent::SnowballThrown { player, target } => {
                self.snowball(player, target).await;
            }
            WorldEvent::SafeMessage { player, message_id } => {
                match SafeMessage::from_id(message_id) {
                    Some(message) => self.safe_message(player, message).await,
                    None => debug!(message_id, "unknown safe message"),
                }
            }
            WorldEvent::WaddleJoined {
                player,
                waddle,
                seats,
            } => {
                self.waddle_joined(player, waddle, seats).await;
            }
            WorldEvent::ChatMessage { player, text } => {
                if let Some(exchange) = self.chat(player, &text)
                    && let Err(e) = exchange.await
                {
                    error!(error = %e, "conversation task failed");
                }
            }
            WorldEvent::SummonBot { player, nickname } => {
                self.summon(player, &nickname);
            }
            WorldEvent::DismissBot { nickname } => {
                self.dismiss(&nickname);
            }
            WorldEvent::SetPopulation { population } => {
                self.populate(population);
            }
            WorldEvent::ToggleSetting { setting } => {
                self.toggle_setting(&setting);
            }
            WorldEvent::PlayerLeft { .. } | WorldEvent::WaddleLeft { .. } => {}
        }
    }

    async fn player_moved(&self, player: AgentId) {
        let bots = self.active_bots();
        join_all(bots.iter().map(|c| c.on_player_moved(player))).await;
    }

    async fn snowball(&self, player: AgentId, target: Position) {
        let Some(thrower) = self.mirror.occupant(player) else {
            debug!(player = %player, "snowball from an unknown player");
            return;
        };
        let bots = self.active_bots();
        let hits = join_all(bots.iter().map(|c| c.handle_snowball(&thrower, target))).await;
        debug!(
            player = %thrower.nickname,
            hits = hits.into_iter().filter(|hit| *hit).count(),
            "snowball handled"
        );
    }

    async fn safe_message(&self, player: AgentId, message: SafeMessage) {
        let Some(sender) = self.mirror.occupant(player) else {
            debug!(player = %player, "safe message from an unknown player");
            return;
        };
        let bots = self.active_bots();
        let results = join_all(bots.iter().map(|c| c.handle_safe_message(&sender, message))).await;
        for (controller, result) in bots.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    bot = controller.bot().nickname(),
                    error = %e,
                    "safe message reaction failed"
                );
            }
        }
    }

    /// Send `seats - 1` random bots after a player into a waddle.
    ///
    /// Returns how many sat down.
    pub async fn waddle_joined(&self, player: AgentId, waddle: WaddleId, seats: u32) -> usize {
        let wanted = usize::try_from(seats.saturating_sub(1)).unwrap_or_default();
        let chosen: Vec<Arc<BotController>> = {
            let active = self.active();
            if active.len() < wanted {
                error!(
                    waddle = %waddle,
                    wanted,
                    active = active.len(),
                    "more bots are needed to fill the waddle"
                );
                return 0;
            }
            let mut rng = rand::rng();
            active.choose_multiple(&mut rng, wanted).cloned().collect()
        };
        let seated = join_all(chosen.iter().map(|c| c.enter_waddle(player, waddle))).await;
        seated.into_iter().filter(|sat| *sat).count()
    }

    /// Start a conversation answering `player`'s chat line.
    ///
    /// Summoned bots in the player's room that are not talking and have a
    /// persona are eligible; a random sample of them takes part. Returns the
    /// exchange task, or `None` when nothing was started.
    pub fn chat(&self, player: AgentId, text: &str) -> Option<JoinHandle<ExchangeOutcome>> {
        let prefix = self.population.command_prefix.as_str();
        if !prefix.is_empty() && text.trim_start().starts_with(prefix) {
            debug!(player = %player, "command line, not chat");
            return None;
        }
        let Some(speaker) = self.mirror.occupant(player) else {
            debug!(player = %player, "chat from an unknown player");
            return None;
        };

        let summoned: Vec<Arc<Bot>> = self
            .active()
            .iter()
            .filter(|c| c.bot().is_summoned())
            .map(|c| Arc::clone(c.bot()))
            .collect();
        let ctx = self.orchestrator.context();
        let eligible = eligible_participants(&summoned, &speaker, &ctx.personas);
        info!(
            player = %speaker.nickname,
            eligible = ?eligible.iter().map(|b| b.nickname()).collect::<Vec<_>>(),
            "eligible participants"
        );
        if eligible.is_empty() {
            return None;
        }

        let sample = {
            let mut rng = rand::rng();
            sample_participants(&eligible, ctx.config.sample_min, &mut rng)
        };
        info!(
            player = %speaker.nickname,
            sample = ?sample.iter().map(|b| b.nickname()).collect::<Vec<_>>(),
            "sampled participants"
        );

        let roster = ConversationRoster::enlist(sample);
        let opening = ConversationTurn::opening(text, speaker, true);
        let orchestrator = self.orchestrator.clone();
        Some(tokio::spawn(async move {
            let outcome = orchestrator.converse(opening, roster).await;
            info!(outcome = ?outcome, "conversation finished");
            outcome
        }))
    }
}

impl std::fmt::Debug for BotManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotManager")
            .field("accounts", &self.accounts.len())
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}
