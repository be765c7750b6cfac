//! Ports to the host world.
//!
//! The runtime never talks to the host's wire protocol directly. Behavior
//! and dialogue code emit [`RoomEvent`]s through a [`RoomEvents`] sink and
//! read room membership through a [`RoomDirectory`]. The runner binary wires
//! both to NATS; tests wire them to [`EventLog`] and
//! [`WorldMirror`](crate::mirror::WorldMirror).

use std::sync::{Mutex, PoisonError};

use tracing::debug;
use tundra_types::{AgentId, Occupant, RoomEvent, RoomEventKind, RoomId, WaddleId};

use crate::bot::Bot;

/// Outward, fire-and-forget notification sink.
pub trait RoomEvents: Send + Sync {
    /// Publish an event to every client in `event.room`.
    fn emit(&self, event: RoomEvent);
}

/// Read access to who stands where in the host world.
pub trait RoomDirectory: Send + Sync {
    /// Everyone currently in `room`, bots included.
    fn occupants(&self, room: RoomId) -> Vec<Occupant>;

    /// Look up a single entity anywhere in the world.
    fn occupant(&self, id: AgentId) -> Option<Occupant>;

    /// Whether `agent` currently holds a seat in `waddle`.
    fn is_seated(&self, waddle: WaddleId, agent: AgentId) -> bool;
}

/// Emit `kind` for `bot` into the room the bot stands in.
///
/// Returns `false` (and emits nothing) when the bot is not in a room.
pub fn announce(events: &dyn RoomEvents, bot: &Bot, kind: RoomEventKind) -> bool {
    match bot.room() {
        Some(room) => {
            events.emit(RoomEvent::new(room, bot.id(), kind));
            true
        }
        None => {
            debug!(
                bot = bot.nickname(),
                kind = kind.name(),
                "bot is not in a room, event dropped"
            );
            false
        }
    }
}

/// A [`RoomEvents`] sink that keeps every event in memory.
///
/// Used by rehearsals and tests to inspect what bots did.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<RoomEvent>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<RoomEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event payloads emitted for one agent, in order.
    pub fn kinds_for(&self, agent: AgentId) -> Vec<RoomEventKind> {
        self.events()
            .into_iter()
            .filter(|e| e.agent == agent)
            .map(|e| e.kind)
            .collect()
    }

    /// Chat lines emitted by any agent, in order.
    pub fn chat_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e.kind {
                RoomEventKind::Chat { text } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Remove and return every recorded event.
    pub fn drain(&self) -> Vec<RoomEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl RoomEvents for EventLog {
    fn emit(&self, event: RoomEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
