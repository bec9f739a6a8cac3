//! Objective tokens: consumable pickups and carryable team flags.
//!
//! A token has at most one carrier. Consumables vanish on contact; flags
//! persist and toggle between carried and dropped.

use bevy::math::Vec2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::engine::config::{PickupScheduleConfig, TeamBases};
use crate::gameflow::PeriodicTrigger;
use crate::types::{CombatantId, Team, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    HealthPickup { amount: u32 },
    PointsPickup { amount: u32 },
    Flag { team: Team },
}

impl TokenKind {
    pub fn is_consumable(&self) -> bool {
        !matches!(self, TokenKind::Flag { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::HealthPickup { .. } => "health",
            TokenKind::PointsPickup { .. } => "points",
            TokenKind::Flag { .. } => "flag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub kind: TokenKind,
    pub position: Vec2,
    carrier: Option<CombatantId>,
}

impl Token {
    pub fn carrier(&self) -> Option<CombatantId> {
        self.carrier
    }

    pub fn is_carried(&self) -> bool {
        self.carrier.is_some()
    }

    pub fn flag_team(&self) -> Option<Team> {
        match self.kind {
            TokenKind::Flag { team } => Some(team),
            _ => None,
        }
    }
}

/// All tokens on the map, keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenBoard {
    tokens: BTreeMap<TokenId, Token>,
    next_id: u32,
}

impl TokenBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: TokenKind, position: Vec2) -> TokenId {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        self.tokens.insert(
            id,
            Token {
                id,
                kind,
                position,
                carrier: None,
            },
        );
        debug!(target: "arena_core::objectives", token = %id, kind = kind.as_str(), x = position.x, y = position.y, "token spawned");
        id
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Remove a consumable. Flags are never consumed.
    pub fn consume(&mut self, id: TokenId) -> Option<Token> {
        match self.tokens.get(&id) {
            Some(token) if token.kind.is_consumable() => self.tokens.remove(&id),
            _ => None,
        }
    }

    /// Uncarried tokens within `radius` of `position`, in id order
    pub fn in_reach(&self, position: Vec2, radius: f32) -> Vec<TokenId> {
        self.tokens
            .values()
            .filter(|t| !t.is_carried())
            .filter(|t| t.position.distance(position) <= radius)
            .map(|t| t.id)
            .collect()
    }

    /// Attach a flag to `carrier`. False if already carried or not a flag.
    pub fn pick_up(&mut self, id: TokenId, carrier: CombatantId) -> bool {
        match self.tokens.get_mut(&id) {
            Some(token) if token.flag_team().is_some() && token.carrier.is_none() => {
                token.carrier = Some(carrier);
                true
            }
            _ => false,
        }
    }

    /// Detach from its carrier at `position`. False if it wasn't carried.
    pub fn drop_at(&mut self, id: TokenId, position: Vec2) -> bool {
        match self.tokens.get_mut(&id) {
            Some(token) if token.carrier.is_some() => {
                token.carrier = None;
                token.position = position;
                true
            }
            _ => false,
        }
    }

    /// Put an uncarried token back at `home`. False if carried or already there.
    pub fn return_to(&mut self, id: TokenId, home: Vec2) -> bool {
        match self.tokens.get_mut(&id) {
            Some(token) if token.carrier.is_none() && token.position.distance(home) > f32::EPSILON => {
                token.position = home;
                true
            }
            _ => false,
        }
    }

    /// Carried tokens move with their carrier
    pub fn follow_carrier(&mut self, id: TokenId, position: Vec2) {
        if let Some(token) = self.tokens.get_mut(&id) {
            if token.carrier.is_some() {
                token.position = position;
            }
        }
    }

    pub fn flag_of(&self, team: Team) -> Option<&Token> {
        self.tokens.values().find(|t| t.flag_team() == Some(team))
    }

    /// Team whose enemy flag sits within `capture_distance` of its own base.
    /// Team one is checked first when both qualify on the same step.
    pub fn captured_by(&self, bases: &TeamBases, capture_distance: f32) -> Option<Team> {
        Team::both().into_iter().find(|team| {
            self.flag_of(team.opponent())
                .is_some_and(|flag| flag.position.distance(bases.base(*team)) <= capture_distance)
        })
    }
}

/// Seeded periodic pickup spawner
#[derive(Debug, Clone)]
pub struct PickupSchedule {
    config: PickupScheduleConfig,
    trigger: PeriodicTrigger,
    rng: Xoshiro256PlusPlus,
}

impl PickupSchedule {
    /// `None` if the interval is unusable
    pub fn new(config: PickupScheduleConfig, seed: u64) -> Option<Self> {
        let trigger = PeriodicTrigger::new(config.interval_secs).ok()?;
        Some(Self {
            config,
            trigger,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        })
    }

    /// Pickups due this step: kind and spawn point for each
    pub fn tick(&mut self, dt: f32) -> Vec<(TokenKind, Vec2)> {
        let due = self.trigger.tick(dt);
        if self.config.spawn_points.is_empty() {
            return Vec::new();
        }
        (0..due)
            .map(|_| {
                let index = self.rng.gen_range(0..self.config.spawn_points.len());
                let health = self.rng.gen_bool(self.config.health_chance.clamp(0.0, 1.0));
                let kind = if health {
                    TokenKind::HealthPickup {
                        amount: self.config.health_value,
                    }
                } else {
                    TokenKind::PointsPickup {
                        amount: self.config.points_value,
                    }
                };
                (kind, self.config.spawn_points[index])
            })
            .collect()
    }
}
