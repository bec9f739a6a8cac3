//! Arena Combat Core Library
//!
//! Deterministic, authoritative game logic for a two-team arena match:
//! - Combatant health/team model and death/respawn
//! - Cooldown gates and ability lifecycles (shots, melee, AoE, shapes, summons)
//! - Team-validated hit resolution with per-activation hit sets
//! - Lobby readiness and lobby-to-match handoff
//! - Match clock, points, pickups and flag capture
//! - Snapshot/diff presentation sync for observers
//! - Bevy plugin for hosting the engine at a fixed tick rate

pub mod abilities;
pub mod combat;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod gameflow;
pub mod lobby;
pub mod logging;
pub mod objectives;
pub mod replication;
pub mod types;

pub use engine::{ArenaEngine, Command, MatchConfig};
pub use error::{ArenaError, ArenaResult, ConfigError};
pub use types::{AbilityId, Character, CombatantId, ParticipantId, Team, TokenId};
