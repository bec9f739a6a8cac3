//! Combat primitives: health, cooldowns, respawn timing and hit geometry.
//!
//! Everything here is passive data driven by the engine's tick; nothing in
//! this module advances on its own.

pub mod cooldown;
pub mod geometry;
pub mod health;
pub mod hits;
pub mod respawn;

pub use cooldown::CooldownGate;
pub use geometry::HitShape;
pub use health::{Combatant, DamageOutcome, Health};
pub use hits::{find_targets, HitQuery, HitSet};
pub use respawn::RespawnTimer;
