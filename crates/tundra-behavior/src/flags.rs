//! Runtime feature toggles shared by every bot.
//!
//! Moderators flip these by name while the runtime is live; activity loops
//! read them at each step, so a change takes effect on the next step.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::FeatureDefaults;

/// A behavior that can be switched on and off at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Visiting scripted spots.
    SpotLocations,
    /// Striking random poses.
    RandomFrames,
    /// Walking around and changing rooms.
    RandomMovement,
    /// Greeting players who join a quiet room.
    Greeting,
}

impl Feature {
    /// Every toggleable feature.
    pub const ALL: [Self; 4] = [
        Self::SpotLocations,
        Self::RandomFrames,
        Self::RandomMovement,
        Self::Greeting,
    ];

    /// The phrase moderators use to name this feature.
    pub const fn setting_name(self) -> &'static str {
        match self {
            Self::SpotLocations => "random spots",
            Self::RandomFrames => "random frames",
            Self::RandomMovement => "random movements",
            Self::Greeting => "random greeting",
        }
    }

    /// Resolve a setting phrase, ignoring case and surrounding whitespace.
    pub fn from_setting(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.setting_name() == name)
    }
}

/// Live on/off state of each [`Feature`].
#[derive(Debug)]
pub struct FeatureFlags {
    spot_locations: AtomicBool,
    random_frames: AtomicBool,
    random_movement: AtomicBool,
    greeting: AtomicBool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::new(FeatureDefaults::default())
    }
}

impl FeatureFlags {
    /// Flags starting from the configured defaults.
    pub const fn new(defaults: FeatureDefaults) -> Self {
        Self {
            spot_locations: AtomicBool::new(defaults.spot_locations),
            random_frames: AtomicBool::new(defaults.random_frames),
            random_movement: AtomicBool::new(defaults.random_movement),
            greeting: AtomicBool::new(defaults.greeting),
        }
    }

    const fn slot(&self, feature: Feature) -> &AtomicBool {
        match feature {
            Feature::SpotLocations => &self.spot_locations,
            Feature::RandomFrames => &self.random_frames,
            Feature::RandomMovement => &self.random_movement,
            Feature::Greeting => &self.greeting,
        }
    }

    /// Whether `feature` is on.
    pub fn enabled(&self, feature: Feature) -> bool {
        self.slot(feature).load(Ordering::Relaxed)
    }

    /// Switch `feature` on or off.
    pub fn set(&self, feature: Feature, on: bool) {
        self.slot(feature).store(on, Ordering::Relaxed);
    }

    /// Flip `feature` and return its new state.
    pub fn toggle(&self, feature: Feature) -> bool {
        !self.slot(feature).fetch_xor(true, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_names_resolve() {
        assert_eq!(
            Feature::from_setting("  Random Spots "),
            Some(Feature::SpotLocations)
        );
        assert_eq!(Feature::from_setting("random greeting"), Some(Feature::Greeting));
        assert_eq!(Feature::from_setting("random dancing"), None);
    }

    #[test]
    fn toggle_flips_and_reports() {
        let flags = FeatureFlags::default();
        assert!(flags.enabled(Feature::RandomFrames));
        assert!(!flags.toggle(Feature::RandomFrames));
        assert!(!flags.enabled(Feature::RandomFrames));
        assert!(flags.toggle(Feature::RandomFrames));
    }
}
