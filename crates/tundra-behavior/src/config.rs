//! Typed configuration for bot behavior.
//!
//! Mirrors the `behavior` section of `tundra.yaml`. Every field has a
//! default, so an empty section (or no file at all) yields the stock
//! behavior.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use rand::distr::uniform::SampleUniform;
use serde::Deserialize;
use tundra_types::{RoomId, SafeMessage, WaddleId};

/// An inclusive range a value is drawn from uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Span<T> {
    /// Smallest value drawn.
    pub min: T,
    /// Largest value drawn.
    pub max: T,
}

impl<T> Span<T>
where
    T: SampleUniform + PartialOrd + Copy,
{
    /// A span covering `min..=max`.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Draw a value; a reversed span is read the other way round.
    pub fn pick(&self, rng: &mut impl Rng) -> T {
        if self.min <= self.max {
            rng.random_range(self.min..=self.max)
        } else {
            rng.random_range(self.max..=self.min)
        }
    }

    /// Whether `value` lies inside the span.
    pub fn contains(&self, value: T) -> bool {
        (self.min <= value && value <= self.max) || (self.max <= value && value <= self.min)
    }
}

impl Span<u64> {
    /// Draw a number of seconds.
    pub fn pick_secs(&self, rng: &mut impl Rng) -> Duration {
        Duration::from_secs(self.pick(rng))
    }
}

/// Behavior engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BehaviorConfig {
    /// Half-width of the box around a bot in which a snowball counts as a hit.
    #[serde(default = "default_snowball_margin")]
    pub snowball_margin: i32,

    /// Walking speed in pixels per second.
    #[serde(default = "default_movement_speed")]
    pub movement_speed: f64,

    /// Pause added to every spot walk before the pose is struck.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Players farther than this are ignored by safe-message reactions.
    #[serde(default = "default_interaction_distance")]
    pub interaction_distance: f64,

    /// A spot counts as taken when a player stands this close to it.
    #[serde(default = "default_spot_distance")]
    pub spot_distance: f64,

    /// Upper bound of the per-step chance to visit a spot.
    #[serde(default = "default_spot_max_probability")]
    pub spot_max_probability: f64,

    /// Poses a bot may strike at random.
    #[serde(default = "default_frames")]
    pub frames: Span<u8>,

    /// Activity steps per cycle before a bot considers changing rooms.
    #[serde(default = "default_cycle_steps")]
    pub cycle_steps: Span<u32>,

    /// Seconds to wait before a random pose, move, or room change.
    #[serde(default = "default_step_delay_secs")]
    pub step_delay_secs: Span<u64>,

    /// Seconds a bot lingers at a spot after striking its pose.
    #[serde(default = "default_spot_dwell_secs")]
    pub spot_dwell_secs: Span<u64>,

    /// How far behind a followed player the bot stops.
    #[serde(default = "default_follow_distance")]
    pub follow_distance: f64,

    /// Delay before a following bot catches up.
    #[serde(default = "default_follow_delay_ms")]
    pub follow_delay_ms: u64,

    /// Delay between saying goodbye and leaving the room.
    #[serde(default = "default_farewell_delay_ms")]
    pub farewell_delay_ms: u64,

    /// Delay before reacting to a snowball hit.
    #[serde(default = "default_snowball_reaction_delay_ms")]
    pub snowball_reaction_delay_ms: u64,

    /// Phrases a bot greets with.
    #[serde(default = "default_greetings")]
    pub greetings: Vec<SafeMessage>,

    /// Greetings are only sent into rooms with fewer occupants than this.
    #[serde(default = "default_greeting_max_occupants")]
    pub greeting_max_occupants: usize,

    /// Rooms ambient bots wander between.
    #[serde(default = "default_bot_rooms")]
    pub bot_rooms: Vec<RoomId>,

    /// Relative weight of each room; unlisted rooms weigh 1.
    #[serde(default)]
    pub room_weights: BTreeMap<RoomId, f64>,

    /// Waddles bots are willing to join.
    #[serde(default = "default_waddle_ids")]
    pub waddle_ids: Vec<WaddleId>,

    /// Seconds a bot waits before taking a waddle seat.
    #[serde(default = "default_waddle_join_delay_secs")]
    pub waddle_join_delay_secs: u64,

    /// Sulk when hit by a snowball.
    #[serde(default = "default_true")]
    pub enable_snowball_lament: bool,

    /// Throw a snowball back when hit.
    #[serde(default = "default_true")]
    pub enable_snowball_throwback: bool,

    /// React to "follow me" and "go away".
    #[serde(default = "default_true")]
    pub enable_follow_mode: bool,

    /// React to "where?" with a random move.
    #[serde(default = "default_true")]
    pub enable_random_movement_on_demand: bool,

    /// Initial state of the runtime feature toggles.
    #[serde(default)]
    pub features: FeatureDefaults,
}

/// Initial values of the runtime [`FeatureFlags`](crate::flags::FeatureFlags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FeatureDefaults {
    /// Visit scripted spots.
    #[serde(default = "default_true")]
    pub spot_locations: bool,
    /// Strike random poses.
    #[serde(default = "default_true")]
    pub random_frames: bool,
    /// Walk around and change rooms.
    #[serde(default = "default_true")]
    pub random_movement: bool,
    /// Greet players joining a quiet room.
    #[serde(default = "default_true")]
    pub greeting: bool,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            spot_locations: true,
            random_frames: true,
            random_movement: true,
            greeting: true,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            snowball_margin: default_snowball_margin(),
            movement_speed: default_movement_speed(),
            settle_delay_ms: default_settle_delay_ms(),
            interaction_distance: default_interaction_distance(),
            spot_distance: default_spot_distance(),
            spot_max_probability: default_spot_max_probability(),
            frames: default_frames(),
            cycle_steps: default_cycle_steps(),
            step_delay_secs: default_step_delay_secs(),
            spot_dwell_secs: default_spot_dwell_secs(),
            follow_distance: default_follow_distance(),
            follow_delay_ms: default_follow_delay_ms(),
            farewell_delay_ms: default_farewell_delay_ms(),
            snowball_reaction_delay_ms: default_snowball_reaction_delay_ms(),
            greetings: default_greetings(),
            greeting_max_occupants: default_greeting_max_occupants(),
            bot_rooms: default_bot_rooms(),
            room_weights: BTreeMap::new(),
            waddle_ids: default_waddle_ids(),
            waddle_join_delay_secs: default_waddle_join_delay_secs(),
            enable_snowball_lament: true,
            enable_snowball_throwback: true,
            enable_follow_mode: true,
            enable_random_movement_on_demand: true,
            features: FeatureDefaults::default(),
        }
    }
}

impl BehaviorConfig {
    /// Weight of a room when picking a destination.
    pub fn room_weight(&self, room: RoomId) -> f64 {
        self.room_weights.get(&room).copied().unwrap_or(1.0)
    }

    /// Time to walk `distance` pixels and settle.
    pub fn travel_time(&self, distance: f64) -> Duration {
        let walking = if self.movement_speed > 0.0 {
            Duration::try_from_secs_f64(distance / self.movement_speed).unwrap_or_default()
        } else {
            Duration::ZERO
        };
        walking.saturating_add(Duration::from_millis(self.settle_delay_ms))
    }
}

const fn default_snowball_margin() -> i32 {
    25
}

const fn default_movement_speed() -> f64 {
    75.0
}

const fn default_settle_delay_ms() -> u64 {
    2_000
}

const fn default_interaction_distance() -> f64 {
    100.0
}

const fn default_spot_distance() -> f64 {
    10.0
}

const fn default_spot_max_probability() -> f64 {
    0.75
}

const fn default_frames() -> Span<u8> {
    Span::new(18, 26)
}

const fn default_cycle_steps() -> Span<u32> {
    Span::new(10, 29)
}

const fn default_step_delay_secs() -> Span<u64> {
    Span::new(5, 15)
}

const fn default_spot_dwell_secs() -> Span<u64> {
    Span::new(30, 119)
}

const fn default_follow_distance() -> f64 {
    40.0
}

const fn default_follow_delay_ms() -> u64 {
    500
}

const fn default_farewell_delay_ms() -> u64 {
    2_000
}

const fn default_snowball_reaction_delay_ms() -> u64 {
    1_000
}

fn default_greetings() -> Vec<SafeMessage> {
    vec![SafeMessage::HiThere, SafeMessage::HowUDoing]
}

const fn default_greeting_max_occupants() -> usize {
    4
}

fn default_bot_rooms() -> Vec<RoomId> {
    [
        100, 110, 111, 120, 121, 130, 300, 310, 320, 330, 340, 200, 220, 230, 801, 802, 800, 400,
        410, 411, 809, 805, 810, 806, 808, 807,
    ]
    .into_iter()
    .map(RoomId)
    .collect()
}

fn default_waddle_ids() -> Vec<WaddleId> {
    (100..=103).map(WaddleId).collect()
}

const fn default_waddle_join_delay_secs() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}
