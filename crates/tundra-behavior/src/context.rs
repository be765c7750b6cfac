//! Long-lived state shared by every bot controller.

use std::sync::Arc;

use tundra_world::{RoomDirectory, RoomEvents, RoomLayouts};

use crate::config::BehaviorConfig;
use crate::flags::FeatureFlags;

/// Configuration, toggles, room layouts, and host-world ports.
///
/// Built once at startup and handed to every controller as
/// `Arc<BehaviorContext>`.
pub struct BehaviorContext {
    /// Behavior tuning.
    pub config: BehaviorConfig,
    /// Runtime feature toggles.
    pub flags: FeatureFlags,
    /// Walkable areas and spot pools.
    pub layouts: RoomLayouts,
    /// Outward event sink.
    pub events: Arc<dyn RoomEvents>,
    /// Who stands where.
    pub directory: Arc<dyn RoomDirectory>,
}

impl BehaviorContext {
    /// Assemble a context; toggles start from `config.features`.
    pub fn new(
        config: BehaviorConfig,
        layouts: RoomLayouts,
        events: Arc<dyn RoomEvents>,
        directory: Arc<dyn RoomDirectory>,
    ) -> Self {
        let flags = FeatureFlags::new(config.features);
        Self {
            config,
            flags,
            layouts,
            events,
            directory,
        }
    }
}

impl std::fmt::Debug for BehaviorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorContext")
            .field("config", &self.config)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
