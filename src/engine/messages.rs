use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::abilities::{AbilityInstance, AbilityKind, AbilityState};
use crate::combat::Combatant;
use crate::gameflow::{MatchOutcome, MatchPhase};
use crate::objectives::{Token, TokenKind};
use crate::types::{AbilityId, Character, CombatantId, ParticipantId, Team, TokenId};

// =====================================================
// Read-only views handed to presentation layers
// =====================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantView {
    pub id: CombatantId,
    pub participant: Option<ParticipantId>,
    pub team: Team,
    pub character: Character,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    pub position: Vec2,
    pub life: u32,
    pub points: u32,
    pub ammo: u32,
    pub max_ammo: u32,
    pub reloading: bool,
    pub carrying: Option<TokenId>,
    pub respawn_remaining: f32,
}

impl CombatantView {
    pub fn capture(combatant: &Combatant, reloading: bool) -> Self {
        Self {
            id: combatant.id,
            participant: combatant.participant,
            team: combatant.team(),
            character: combatant.character,
            health: combatant.health().current(),
            max_health: combatant.health().max(),
            alive: combatant.is_alive(),
            position: combatant.position,
            life: combatant.life(),
            points: combatant.points,
            ammo: combatant.ammo,
            max_ammo: combatant.max_ammo,
            reloading,
            carrying: combatant.carrying,
            respawn_remaining: combatant.respawn_timer().remaining(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityView {
    pub id: AbilityId,
    pub kind: AbilityKind,
    pub caster: CombatantId,
    pub team: Team,
    pub state: AbilityState,
    pub position: Vec2,
    pub target: Vec2,
    pub direction: Vec2,
    /// Polygon corners for shapes (preview while aiming)
    pub corners: Vec<Vec2>,
    pub active_remaining: f32,
    pub hits: usize,
}

impl From<&AbilityInstance> for AbilityView {
    fn from(ability: &AbilityInstance) -> Self {
        Self {
            id: ability.id,
            kind: ability.kind,
            caster: ability.caster,
            team: ability.owner_team,
            state: ability.state(),
            position: ability.position(),
            target: ability.target(),
            direction: ability.direction(),
            corners: ability.corners(),
            active_remaining: ability.active_remaining(),
            hits: ability.hit_set().len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenView {
    pub id: TokenId,
    pub kind: TokenKind,
    pub position: Vec2,
    pub carrier: Option<CombatantId>,
}

impl From<&Token> for TokenView {
    fn from(token: &Token) -> Self {
        Self {
            id: token.id,
            kind: token.kind,
            position: token.position,
            carrier: token.carrier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub phase: MatchPhase,
    pub tick: u64,
    pub time_remaining: f32,
    pub outcome: Option<MatchOutcome>,
    pub connected: usize,
    pub ready: usize,
}

/// Cooldown readout for one (caster, kind) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownView {
    pub kind: AbilityKind,
    pub remaining: f32,
    /// Fill fraction for cooldown widgets
    pub progress: f32,
    pub ready: bool,
}
