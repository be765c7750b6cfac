//! In-memory replica of the host world's room membership.
//!
//! The mirror is fed from two directions: inbound [`WorldEvent`]s describe
//! players, and the bots' own outbound [`RoomEvent`]s describe bots. It
//! answers [`RoomDirectory`] queries without a round trip to the host.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tundra_types::{AgentId, Occupant, RoomEvent, RoomEventKind, RoomId, WaddleId, WorldEvent};

use crate::ports::RoomDirectory;

#[derive(Debug, Default)]
struct MirrorState {
    occupants: BTreeMap<AgentId, Occupant>,
    seats: BTreeMap<WaddleId, BTreeSet<AgentId>>,
}

/// Room directory kept current from observed events.
#[derive(Debug, Default)]
pub struct WorldMirror {
    state: RwLock<MirrorState>,
}

impl WorldMirror {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MirrorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MirrorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace an occupant.
    pub fn upsert(&self, occupant: Occupant) {
        self.write().occupants.insert(occupant.id, occupant);
    }

    /// Forget an entity and release any waddle seat it held.
    pub fn remove(&self, id: AgentId) {
        let mut state = self.write();
        state.occupants.remove(&id);
        for seated in state.seats.values_mut() {
            seated.remove(&id);
        }
    }

    /// Number of entities currently tracked.
    pub fn len(&self) -> usize {
        self.read().occupants.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.read().occupants.is_empty()
    }

    /// Apply an inbound world event.
    pub fn apply_world(&self, event: &WorldEvent) {
        match event {
            WorldEvent::PlayerJoinedRoom { player } => {
                let mut player = player.clone();
                player.is_bot = false;
                self.upsert(player);
            }
            WorldEvent::PlayerLeft { player } => self.remove(*player),
            WorldEvent::PlayerMoved { player, position } => {
                if let Some(occupant) = self.write().occupants.get_mut(player) {
                    occupant.position = *position;
                }
            }
            WorldEvent::WaddleJoined { player, waddle, .. } => {
                self.write().seats.entry(*waddle).or_default().insert(*player);
            }
            WorldEvent::WaddleLeft { player, waddle } => {
                if let Some(seated) = self.write().seats.get_mut(waddle) {
                    seated.remove(player);
                }
            }
            WorldEvent::SnowballThrown { .. }
            | WorldEvent::SafeMessage { .. }
            | WorldEvent::ChatMessage { .. }
            | WorldEvent::SummonBot { .. }
            | WorldEvent::DismissBot { .. }
            | WorldEvent::SetPopulation { .. }
            | WorldEvent::ToggleSetting { .. } => {}
        }
    }

    /// Apply an outbound bot event.
    ///
    /// `nickname` is used when the bot is not yet tracked.
    pub fn observe(&self, event: &RoomEvent, nickname: &str) {
        let mut state = self.write();
        match &event.kind {
            RoomEventKind::Joined { position } => {
                let entry = state.occupants.entry(event.agent).or_insert_with(|| Occupant {
                    id: event.agent,
                    nickname: nickname.to_owned(),
                    room: event.room,
                    position: *position,
                    is_bot: true,
                });
                entry.room = event.room;
                entry.position = *position;
            }
            RoomEventKind::Left => {
                if state
                    .occupants
                    .get(&event.agent)
                    .is_some_and(|o| o.room == event.room)
                {
                    state.occupants.remove(&event.agent);
                }
            }
            RoomEventKind::Moved { position } => {
                if let Some(occupant) = state.occupants.get_mut(&event.agent) {
                    occupant.position = *position;
                }
            }
            RoomEventKind::JoinedWaddle { waddle } => {
                state.seats.entry(*waddle).or_default().insert(event.agent);
            }
            RoomEventKind::Frame { .. }
            | RoomEventKind::Emote { .. }
            | RoomEventKind::Snowball { .. }
            | RoomEventKind::SafeMessage { .. }
            | RoomEventKind::Chat { .. }
            | RoomEventKind::OutfitChanged { .. } => {}
        }
    }
}

impl RoomDirectory for WorldMirror {
    fn occupants(&self, room: RoomId) -> Vec<Occupant> {
        self.read()
            .occupants
            .values()
            .filter(|o| o.room == room)
            .cloned()
            .collect()
    }

    fn occupant(&self, id: AgentId) -> Option<Occupant> {
        self.read().occupants.get(&id).cloned()
    }

    fn is_seated(&self, waddle: WaddleId, agent: AgentId) -> bool {
        self.read()
            .seats
            .get(&waddle)
            .is_some_and(|seated| seated.contains(&agent))
    }
}

#[cfg(test)]
mod tests {
    use tundra_types::Position;

    use super::*;

    fn player(room: u32, x: i32, y: i32) -> Occupant {
        Occupant {
            id: AgentId::new(),
            nickname: String::from("Rookie"),
            room: RoomId(room),
            position: Position::new(x, y),
            is_bot: false,
        }
    }

    #[test]
    fn tracks_players_through_world_events() {
        let mirror = WorldMirror::new();
        let rookie = player(100, 10, 10);
        let id = rookie.id;

        mirror.apply_world(&WorldEvent::PlayerJoinedRoom { player: rookie });
        mirror.apply_world(&WorldEvent::PlayerMoved {
            player: id,
            position: Position::new(50, 60),
        });

        assert_eq!(mirror.occupants(RoomId(100)).len(), 1);
        assert_eq!(
            mirror.occupant(id).map(|o| o.position),
            Some(Position::new(50, 60))
        );

        mirror.apply_world(&WorldEvent::PlayerLeft { player: id });
        assert!(mirror.is_empty());
    }

    #[test]
    fn tracks_bots_through_room_events() {
        let mirror = WorldMirror::new();
        let bot = AgentId::new();
        mirror.observe(
            &RoomEvent::new(
                RoomId(330),
                bot,
                RoomEventKind::Joined {
                    position: Position::new(1, 1),
                },
            ),
            "Cadence",
        );
        let tracked = mirror.occupant(bot);
        assert!(tracked.as_ref().is_some_and(|o| o.is_bot));
        assert_eq!(tracked.map(|o| o.nickname), Some(String::from("Cadence")));

        // Leaving a room the bot already moved out of is ignored.
        mirror.observe(&RoomEvent::new(RoomId(100), bot, RoomEventKind::Left), "Cadence");
        assert_eq!(mirror.len(), 1);
        mirror.observe(&RoomEvent::new(RoomId(330), bot, RoomEventKind::Left), "Cadence");
        assert!(mirror.is_empty());
    }

    #[test]
    fn waddle_seats() {
        let mirror = WorldMirror::new();
        let id = AgentId::new();
        let waddle = WaddleId(100);
        mirror.apply_world(&WorldEvent::WaddleJoined {
            player: id,
            waddle,
            seats: 4,
        });
        assert!(mirror.is_seated(waddle, id));
        mirror.apply_world(&WorldEvent::WaddleLeft { player: id, waddle });
        assert!(!mirror.is_seated(waddle, id));
    }
}
