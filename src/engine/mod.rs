//! Authoritative arena engine.
//!
//! Layout:
//!   config   - match tuning, characters, ability specs (RON/JSON)
//!   commands - command intake and the replayable log
//!   arena    - `ArenaEngine`, the per-step simulation
//!   messages - read-only views for presentation
//!   plugin   - Bevy integration (fixed-rate ticking, event forwarding)

pub mod arena;
pub mod commands;
pub mod config;
pub mod messages;
pub mod plugin;

pub use arena::ArenaEngine;
pub use commands::{Command, CommandLog, LoggedCommand};
pub use config::{AbilitySpec, CastPolicy, CharacterSpec, MatchConfig, PickupScheduleConfig, TeamBases};
pub use messages::{AbilityView, CombatantView, CooldownView, MatchView, TokenView};
pub use plugin::{ArenaEvent, ArenaPlugin, ArenaSim};
