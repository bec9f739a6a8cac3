//! Health/team model for combatants.
//!
//! Invariants: `0 <= health <= max_health` and `alive == (health > 0)`.
//! The death transition happens exactly once per life.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::respawn::RespawnTimer;
use crate::engine::config::CharacterSpec;
use crate::types::{Character, CombatantId, ParticipantId, Team, TokenId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    fn reset(&mut self) {
        self.current = self.max;
    }
}

/// Result of a damage application
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Non-positive amount or target already dead
    Ignored,
    Damaged { dealt: f32 },
    /// This hit ended the current life
    Killed { dealt: f32 },
}

impl DamageOutcome {
    pub fn dealt(&self) -> f32 {
        match self {
            DamageOutcome::Ignored => 0.0,
            DamageOutcome::Damaged { dealt } | DamageOutcome::Killed { dealt } => *dealt,
        }
    }

    pub fn is_kill(&self) -> bool {
        matches!(self, DamageOutcome::Killed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub team: Team,
    pub character: Character,
    /// Lobby participant this combatant was created from (bots have none)
    pub participant: Option<ParticipantId>,
    pub position: Vec2,
    pub spawn_point: Vec2,
    pub points: u32,
    pub ammo: u32,
    pub max_ammo: u32,
    /// Base damage of the character's weapon
    pub damage: f32,
    pub carrying: Option<TokenId>,
    health: Health,
    alive: bool,
    life: u32,
    last_damaged_by: Option<Team>,
    respawn: RespawnTimer,
}

impl Combatant {
    pub fn new(
        id: CombatantId,
        team: Team,
        character: Character,
        spec: &CharacterSpec,
        spawn_point: Vec2,
        respawn_delay: f32,
    ) -> Self {
        let health = Health::new(spec.max_health);
        let alive = health.current() > 0.0;
        Self {
            id,
            team,
            character,
            participant: None,
            position: spawn_point,
            spawn_point,
            points: 0,
            ammo: spec.max_ammo,
            max_ammo: spec.max_ammo,
            damage: spec.damage,
            carrying: None,
            health,
            alive,
            life: 0,
            last_damaged_by: None,
            respawn: RespawnTimer::new(respawn_delay),
        }
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    /// Life counter; 0 for the first life, +1 per respawn
    pub fn life(&self) -> u32 {
        self.life
    }

    pub fn last_damaged_by(&self) -> Option<Team> {
        self.last_damaged_by
    }

    pub fn respawn_timer(&self) -> &RespawnTimer {
        &self.respawn
    }

    /// Apply damage. No-op for non-positive (or NaN) amounts and for dead
    /// targets. Reaching zero kills exactly once and starts the respawn timer.
    pub fn apply_damage(&mut self, amount: f32, source_team: Team) -> DamageOutcome {
        if !(amount > 0.0) || !self.alive {
            return DamageOutcome::Ignored;
        }

        let dealt = amount.min(self.health.current);
        self.health.current = (self.health.current - dealt).max(0.0);
        self.last_damaged_by = Some(source_team);

        if self.health.current <= 0.0 {
            self.health.current = 0.0;
            self.alive = false;
            self.respawn.begin();
            debug!(target: "arena_core::combat", combatant = %self.id, by = %source_team, "combatant died");
            DamageOutcome::Killed { dealt }
        } else {
            trace!(target: "arena_core::combat", combatant = %self.id, dealt, remaining = self.health.current, "damage applied");
            DamageOutcome::Damaged { dealt }
        }
    }

    /// Heal, clamped to max health. Returns the amount actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !(amount > 0.0) || !self.alive {
            return 0.0;
        }
        let before = self.health.current;
        self.health.current = (before + amount).min(self.health.max);
        self.health.current - before
    }

    pub fn tick_respawn(&mut self, dt: f32) {
        if !self.alive {
            self.respawn.tick(dt);
        }
    }

    pub fn is_respawn_ready(&self) -> bool {
        !self.alive && self.respawn.is_respawn_ready()
    }

    /// Start a new life at `at`: full health, full ammo, same identity.
    pub fn respawn(&mut self, at: Vec2) {
        self.health.reset();
        self.alive = self.health.current > 0.0;
        self.position = at;
        self.ammo = self.max_ammo;
        self.life += 1;
        self.last_damaged_by = None;
        self.respawn.clear();
        debug!(target: "arena_core::combat", combatant = %self.id, life = self.life, "combatant respawned");
    }
}
