//! Priority-tiered room spots and the scoped lease that binds a bot to one.
//!
//! Every spot is, at all times, either queued in the tier matching its
//! priority or held by exactly one live [`SpotLease`]. Leases return their
//! spot on [`SpotLease::release`] or, failing that, when dropped, so a
//! cancelled activity step can never leak a spot or leave a bot in borrowed
//! clothes.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use tundra_types::{Occupant, Outfit, RoomEventKind, RoomSpot};

use crate::bot::Bot;
use crate::ports::{RoomEvents, announce};

type Tiers = BTreeMap<u32, VecDeque<RoomSpot>>;

/// The spots of one room, grouped into priority tiers.
#[derive(Debug, Default)]
pub struct RoomSpotPool {
    tiers: Mutex<Tiers>,
    capacity: usize,
}

impl RoomSpotPool {
    /// Build a pool; each spot is queued in the tier named by its priority,
    /// preserving the given order within a tier.
    pub fn new(spots: impl IntoIterator<Item = RoomSpot>) -> Self {
        let mut tiers = Tiers::new();
        let mut capacity: usize = 0;
        for spot in spots {
            tiers.entry(spot.priority).or_default().push_back(spot);
            capacity = capacity.saturating_add(1);
        }
        Self {
            tiers: Mutex::new(tiers),
            capacity,
        }
    }

    /// A pool with no spots.
    pub fn empty() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tiers> {
        self.tiers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of spots not currently leased.
    pub fn available(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    /// Total number of spots in the room.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Spots queued in one tier, front first.
    pub fn tier(&self, priority: u32) -> Vec<RoomSpot> {
        self.lock()
            .get(&priority)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Lease the head of the highest-precedence non-empty tier to `bot`,
    /// snapshotting the bot's outfit.
    ///
    /// Returns `None` when every tier is empty.
    pub fn acquire(
        self: &Arc<Self>,
        bot: Arc<Bot>,
        events: Arc<dyn RoomEvents>,
    ) -> Option<SpotLease> {
        let spot = {
            let mut tiers = self.lock();
            tiers.values_mut().find_map(VecDeque::pop_front)?
        };
        let saved_outfit = bot.outfit();

        debug!(
            bot = bot.nickname(),
            priority = spot.priority,
            x = spot.position.x,
            y = spot.position.y,
            "spot leased"
        );

        Some(SpotLease {
            pool: Arc::clone(self),
            bot,
            events,
            spot: Some(spot),
            saved_outfit,
        })
    }

    fn give_back(&self, spot: RoomSpot) {
        self.lock().entry(spot.priority).or_default().push_back(spot);
    }
}

/// Exclusive claim on one spot for the duration of a visit.
pub struct SpotLease {
    pool: Arc<RoomSpotPool>,
    bot: Arc<Bot>,
    events: Arc<dyn RoomEvents>,
    spot: Option<RoomSpot>,
    saved_outfit: Outfit,
}

impl SpotLease {
    /// The leased spot, or `None` once released.
    pub const fn spot(&self) -> Option<&RoomSpot> {
        self.spot.as_ref()
    }

    /// Put on the spot's clothing override, if it has one.
    ///
    /// Returns `true` when the outfit changed.
    pub fn wear_clothes(&self) -> bool {
        let Some(clothes) = self.spot.as_ref().and_then(|s| s.clothes.as_ref()) else {
            return false;
        };
        let (changed, outfit) = self.bot.update(|state| {
            let before = state.outfit.clone();
            state.outfit.apply_override(clothes);
            (state.outfit != before, state.outfit.clone())
        });
        if changed {
            announce(
                self.events.as_ref(),
                &self.bot,
                RoomEventKind::OutfitChanged { outfit },
            );
        }
        changed
    }

    /// Restore the bot's outfit and return the spot to the tail of its tier.
    ///
    /// Calling this more than once is harmless.
    pub fn release(&mut self) {
        let Some(spot) = self.spot.take() else {
            return;
        };

        let saved = self.saved_outfit.clone();
        let changed = self.bot.update(|state| {
            let changed = state.outfit != saved;
            state.outfit = saved.clone();
            changed
        });
        if changed {
            announce(
                self.events.as_ref(),
                &self.bot,
                RoomEventKind::OutfitChanged { outfit: saved },
            );
        }

        debug!(
            bot = self.bot.nickname(),
            priority = spot.priority,
            "spot released"
        );
        self.pool.give_back(spot);
    }
}

impl Drop for SpotLease {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SpotLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotLease")
            .field("bot", &self.bot.id())
            .field("spot", &self.spot)
            .finish_non_exhaustive()
    }
}

/// Whether a human stands within `threshold` pixels of `spot`.
///
/// Bots are ignored, so bots may share a spot's surroundings with each other
/// but never pose on top of a player.
pub fn is_occupied(spot: &RoomSpot, occupants: &[Occupant], threshold: f64) -> bool {
    occupants
        .iter()
        .filter(|o| !o.is_bot)
        .any(|o| o.position.distance_to(spot.position) <= threshold)
}

#[cfg(test)]
mod tests {
    use tundra_types::{AgentId, ClothingSlot, Position, RoomId};

    use super::*;
    use crate::ports::EventLog;

    fn pool() -> Arc<RoomSpotPool> {
        Arc::new(RoomSpotPool::new([
            RoomSpot::new(10, 10, 24, 1),
            RoomSpot::new(20, 20, 24, 2),
            RoomSpot::new(30, 30, 24, 2),
        ]))
    }

    fn bot_in_room(outfit: Outfit) -> Arc<Bot> {
        let bot = Arc::new(Bot::new(AgentId::new(), "Aqua", outfit));
        bot.update(|s| s.room = Some(RoomId(410)));
        bot
    }

    #[test]
    fn acquires_in_tier_order_then_exhausts() {
        let pool = pool();
        let log: Arc<dyn RoomEvents> = Arc::new(EventLog::new());
        let bot = bot_in_room(Outfit::empty());

        let a = pool.acquire(Arc::clone(&bot), Arc::clone(&log));
        let b = pool.acquire(Arc::clone(&bot), Arc::clone(&log));
        let c = pool.acquire(Arc::clone(&bot), Arc::clone(&log));
        let d = pool.acquire(Arc::clone(&bot), Arc::clone(&log));

        let priorities: Vec<_> = [&a, &b, &c]
            .iter()
            .filter_map(|l| l.as_ref().and_then(SpotLease::spot).map(|s| s.priority))
            .collect();
        assert_eq!(priorities, vec![1, 2, 2]);
        assert_eq!(
            b.as_ref().and_then(SpotLease::spot).map(|s| s.position),
            Some(Position::new(20, 20))
        );
        assert!(d.is_none());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn release_returns_spot_to_tail_of_its_tier() {
        let pool = pool();
        let log: Arc<dyn RoomEvents> = Arc::new(EventLog::new());
        let bot = bot_in_room(Outfit::empty());

        // Drain tier 1 so the next lease comes from tier 2.
        let first = pool.acquire(Arc::clone(&bot), Arc::clone(&log));
        let mut second = pool.acquire(Arc::clone(&bot), Arc::clone(&log));
        assert_eq!(pool.tier(2).len(), 1);

        if let Some(lease) = second.as_mut() {
            lease.release();
            lease.release();
        }
        let tier: Vec<_> = pool.tier(2).iter().map(|s| s.position).collect();
        assert_eq!(tier, vec![Position::new(30, 30), Position::new(20, 20)]);

        drop(first);
        assert_eq!(pool.tier(1).len(), 1);
        assert_eq!(pool.available(), pool.capacity());
    }

    #[test]
    fn dropping_a_lease_releases_it() {
        let pool = pool();
        let log: Arc<dyn RoomEvents> = Arc::new(EventLog::new());
        {
            let _lease = pool.acquire(bot_in_room(Outfit::empty()), log);
            assert_eq!(pool.available(), 2);
        }
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn clothing_override_reverts_exactly() {
        let pool = Arc::new(RoomSpotPool::new([RoomSpot::new(350, 210, 26, 2)
            .wearing([(ClothingSlot::Hand, 5021), (ClothingSlot::Body, 4027)])]));
        let log = Arc::new(EventLog::new());
        let sink: Arc<dyn RoomEvents> = Arc::clone(&log) as Arc<dyn RoomEvents>;
        let original = Outfit::from_items([(ClothingSlot::Head, 10)]);
        let bot = bot_in_room(original.clone());

        let mut lease = pool.acquire(Arc::clone(&bot), sink);
        assert_eq!(bot.outfit(), original);
        assert!(lease.as_ref().is_some_and(SpotLease::wear_clothes));
        assert_eq!(bot.outfit().item(ClothingSlot::Hand), Some(5021));
        assert_eq!(bot.outfit().item(ClothingSlot::Head), None);

        if let Some(lease) = lease.as_mut() {
            lease.release();
        }
        assert_eq!(bot.outfit(), original);

        let changes = log
            .kinds_for(bot.id())
            .into_iter()
            .filter(|k| matches!(k, RoomEventKind::OutfitChanged { .. }))
            .count();
        assert_eq!(changes, 2);
    }

    #[test]
    fn occupancy_ignores_bots() {
        let spot = RoomSpot::new(100, 100, 24, 1);
        let mut near = Occupant {
            id: AgentId::new(),
            nickname: String::from("Bot"),
            room: RoomId(100),
            position: Position::new(105, 100),
            is_bot: true,
        };
        assert!(!is_occupied(&spot, std::slice::from_ref(&near), 10.0));

        near.is_bot = false;
        assert!(is_occupied(&spot, std::slice::from_ref(&near), 10.0));

        near.position = Position::new(120, 100);
        assert!(!is_occupied(&spot, &[near], 10.0));
    }
}
