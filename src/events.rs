//! Simulation events handed to the host after each step.
//!
//! Events are presentation hints (popups, sounds, scene changes). Replicas
//! never derive authoritative state from them.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::abilities::{AbilityKind, AbilityState};
use crate::gameflow::{MatchOutcome, MatchPhase};
use crate::objectives::TokenKind;
use crate::types::{AbilityId, CombatantId, Team, TokenId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Tick on which the event happened
    pub tick: u64,
    pub kind: SimEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    Damaged {
        target: CombatantId,
        source: Option<AbilityId>,
        amount: f32,
        remaining: f32,
    },
    Died {
        combatant: CombatantId,
        killer_team: Option<Team>,
    },
    Respawned {
        combatant: CombatantId,
        life: u32,
        at: Vec2,
    },
    Healed {
        combatant: CombatantId,
        amount: f32,
    },
    AbilityTransition {
        ability: AbilityId,
        kind: AbilityKind,
        caster: CombatantId,
        from: AbilityState,
        to: AbilityState,
    },
    Hit {
        ability: AbilityId,
        target: CombatantId,
    },
    FormationCompleted {
        ability: AbilityId,
        team: Team,
    },
    PointsGained {
        combatant: CombatantId,
        amount: u32,
        total: u32,
    },
    TokenSpawned {
        token: TokenId,
        kind: TokenKind,
        at: Vec2,
    },
    PickupConsumed {
        token: TokenId,
        kind: TokenKind,
        by: CombatantId,
    },
    FlagTaken {
        flag_team: Team,
        by: CombatantId,
    },
    FlagDropped {
        flag_team: Team,
        by: CombatantId,
        at: Vec2,
    },
    FlagReturned {
        flag_team: Team,
        by: CombatantId,
    },
    Reloaded {
        combatant: CombatantId,
    },
    PhaseChanged {
        from: MatchPhase,
        to: MatchPhase,
    },
    MatchEnded(MatchOutcome),
}

impl SimEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            SimEventKind::Damaged { .. } => "damaged",
            SimEventKind::Died { .. } => "died",
            SimEventKind::Respawned { .. } => "respawned",
            SimEventKind::Healed { .. } => "healed",
            SimEventKind::AbilityTransition { .. } => "ability_transition",
            SimEventKind::Hit { .. } => "hit",
            SimEventKind::FormationCompleted { .. } => "formation_completed",
            SimEventKind::PointsGained { .. } => "points_gained",
            SimEventKind::TokenSpawned { .. } => "token_spawned",
            SimEventKind::PickupConsumed { .. } => "pickup_consumed",
            SimEventKind::FlagTaken { .. } => "flag_taken",
            SimEventKind::FlagDropped { .. } => "flag_dropped",
            SimEventKind::FlagReturned { .. } => "flag_returned",
            SimEventKind::Reloaded { .. } => "reloaded",
            SimEventKind::PhaseChanged { .. } => "phase_changed",
            SimEventKind::MatchEnded(_) => "match_ended",
        }
    }
}

/// Ordered buffer of events not yet handed to the host
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: Vec<SimEvent>,
}

impl EventQueue {
    pub fn push(&mut self, tick: u64, kind: SimEventKind) {
        self.pending.push(SimEvent { tick, kind });
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
