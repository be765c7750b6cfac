//! Behavior engine for tundra bots.
//!
//! Each bot gets a [`BotController`] that runs a cancellable activity loop
//! (spot visits, random poses, wandering, room changes) and reacts to what
//! players do around it (snowballs, safe-chat phrases, room joins, movement,
//! waddles).
//!
//! # Modules
//!
//! - [`actions`] -- Self-directed activity steps and room membership.
//! - [`config`] -- [`BehaviorConfig`] with stock defaults.
//! - [`context`] -- [`BehaviorContext`] shared by every controller.
//! - [`controller`] -- [`BotController`] lifecycle and the activity loop.
//! - [`error`] -- [`BehaviorError`].
//! - [`flags`] -- Runtime [`FeatureFlags`] toggled by name.
//! - [`reactions`] -- Reactions to player events.

pub mod actions;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod flags;
pub mod reactions;

pub use actions::BotActions;
pub use config::{BehaviorConfig, FeatureDefaults, Span};
pub use context::BehaviorContext;
pub use controller::{ActivityExit, BotController};
pub use error::BehaviorError;
pub use flags::{Feature, FeatureFlags};
pub use reactions::{SafeMessageReaction, SnowballReaction, is_snowballed, trailing_position};
