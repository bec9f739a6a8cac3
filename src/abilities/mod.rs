//! Ability kinds and the per-cast lifecycle.
//!
//! Every cast creates one `AbilityInstance` that walks
//! `Idle → Aiming → Travelling → Active → Resolving → Despawned` and is then
//! discarded; the next cast is a new instance. Only the authoritative engine
//! calls the transition methods; views read `state()` and nothing else.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod cooldowns;
pub mod instance;

pub use cooldowns::CooldownBook;
pub use instance::{formation_complete, AbilityInstance, AimParams};

use crate::types::AbilityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Gun projectile
    Shot,
    Melee,
    /// Lobbed persistent damage circle
    AoeField,
    Triangle,
    Square,
    Pentagon,
    /// Homing minion
    Summon,
}

/// How a cast gets from request to confirmed placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Confirmed in the same request that created it
    Instant,
    /// Stays in `Aiming` until the caster confirms or cancels
    Held,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Triangle,
    Square,
    Pentagon,
}

impl ShapeKind {
    pub fn sides(&self) -> u32 {
        match self {
            ShapeKind::Triangle => 3,
            ShapeKind::Square => 4,
            ShapeKind::Pentagon => 5,
        }
    }
}

impl AbilityKind {
    pub fn all() -> [AbilityKind; 7] {
        [
            AbilityKind::Shot,
            AbilityKind::Melee,
            AbilityKind::AoeField,
            AbilityKind::Triangle,
            AbilityKind::Square,
            AbilityKind::Pentagon,
            AbilityKind::Summon,
        ]
    }

    pub fn shape(&self) -> Option<ShapeKind> {
        match self {
            AbilityKind::Triangle => Some(ShapeKind::Triangle),
            AbilityKind::Square => Some(ShapeKind::Square),
            AbilityKind::Pentagon => Some(ShapeKind::Pentagon),
            _ => None,
        }
    }

    pub fn placement(&self) -> Placement {
        match self {
            AbilityKind::AoeField
            | AbilityKind::Triangle
            | AbilityKind::Square
            | AbilityKind::Pentagon => Placement::Held,
            AbilityKind::Shot | AbilityKind::Melee | AbilityKind::Summon => Placement::Instant,
        }
    }

    /// Travels to its target point before activating
    pub fn is_lobbed(&self) -> bool {
        matches!(self, AbilityKind::AoeField)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AbilityKind::Shot => "shot",
            AbilityKind::Melee => "melee",
            AbilityKind::AoeField => "aoe_field",
            AbilityKind::Triangle => "triangle",
            AbilityKind::Square => "square",
            AbilityKind::Pentagon => "pentagon",
            AbilityKind::Summon => "summon",
        }
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbilityState {
    Idle,
    Aiming,
    Travelling,
    Active,
    Resolving,
    Despawned,
}

impl AbilityState {
    /// Position in the lifecycle; transitions must strictly increase it
    pub fn rank(&self) -> u8 {
        match self {
            AbilityState::Idle => 0,
            AbilityState::Aiming => 1,
            AbilityState::Travelling => 2,
            AbilityState::Active => 3,
            AbilityState::Resolving => 4,
            AbilityState::Despawned => 5,
        }
    }

    pub fn is_live(&self) -> bool {
        !matches!(self, AbilityState::Idle | AbilityState::Despawned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AbilityState::Idle => "idle",
            AbilityState::Aiming => "aiming",
            AbilityState::Travelling => "travelling",
            AbilityState::Active => "active",
            AbilityState::Resolving => "resolving",
            AbilityState::Despawned => "despawned",
        }
    }
}

/// Why a cast-related request changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CastRejection {
    CoolingDown { remaining: f32 },
    CasterDead,
    OutOfAmmo,
    Reloading,
    /// An instance of this kind is already waiting for placement
    AlreadyAiming,
    /// The cast policy forbids a second live instance
    ConcurrencyLimit,
    /// The instance is no longer in the state the request needs
    WrongState(AbilityState),
    MatchNotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CastOutcome {
    /// A new instance was created
    Started(AbilityId),
    /// An existing instance accepted aim/confirm/cancel
    Updated(AbilityId),
    Rejected(CastRejection),
}

impl CastOutcome {
    pub fn ability(&self) -> Option<AbilityId> {
        match self {
            CastOutcome::Started(id) | CastOutcome::Updated(id) => Some(*id),
            CastOutcome::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, CastOutcome::Rejected(_))
    }
}
