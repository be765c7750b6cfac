//! The room event sink every bot writes to.
//!
//! Each outward event updates the [`WorldMirror`] first, so the bots see
//! each other in the directory, and is then passed on to the outbound sink
//! (NATS in production, an [`EventLog`](tundra_world::EventLog) in tests).

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tundra_types::{AgentId, RoomEvent};
use tundra_world::{Bot, RoomEvents, WorldMirror};

/// Mirrors bot events locally before forwarding them.
pub struct MirroredEvents {
    mirror: Arc<WorldMirror>,
    nicknames: RwLock<BTreeMap<AgentId, String>>,
    outbound: Arc<dyn RoomEvents>,
}

impl MirroredEvents {
    /// Wrap `outbound`, keeping `mirror` current.
    pub fn new(mirror: Arc<WorldMirror>, outbound: Arc<dyn RoomEvents>) -> Self {
        Self {
            mirror,
            nicknames: RwLock::new(BTreeMap::new()),
            outbound,
        }
    }

    /// Remember `bot`'s nickname for the mirror.
    pub fn register(&self, bot: &Bot) {
        self.nicknames
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bot.id(), bot.nickname().to_owned());
    }

    /// Forget a bot that was taken out.
    pub fn forget(&self, id: AgentId) {
        self.nicknames
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        self.mirror.remove(id);
    }

    fn nickname(&self, id: AgentId) -> String {
        self.nicknames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

impl RoomEvents for MirroredEvents {
    fn emit(&self, event: RoomEvent) {
        self.mirror.observe(&event, &self.nickname(event.agent));
        self.outbound.emit(event);
    }
}

impl std::fmt::Debug for MirroredEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirroredEvents")
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}
