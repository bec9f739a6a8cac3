//! One cast of one ability: state, placement and per-activation hit memory.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{AbilityKind, AbilityState, Placement};
use crate::combat::geometry::{placement_rotation_deg, regular_polygon};
use crate::combat::{HitSet, HitShape};
use crate::engine::config::AbilitySpec;
use crate::types::{AbilityId, CombatantId, Team};

/// Aim input from the caster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimParams {
    pub direction: Vec2,
    /// Placement point for held abilities; defaults to max range along `direction`
    pub target: Option<Vec2>,
}

impl AimParams {
    pub fn toward(direction: Vec2) -> Self {
        Self {
            direction,
            target: None,
        }
    }

    pub fn at(target: Vec2) -> Self {
        Self {
            direction: Vec2::ZERO,
            target: Some(target),
        }
    }
}

impl Default for AimParams {
    fn default() -> Self {
        Self::toward(Vec2::Y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityInstance {
    pub id: AbilityId,
    pub kind: AbilityKind,
    pub caster: CombatantId,
    pub owner_team: Team,
    pub damage: f32,
    state: AbilityState,
    origin: Vec2,
    direction: Vec2,
    target: Vec2,
    position: Vec2,
    prev_position: Vec2,
    travel_elapsed: f32,
    travel_duration: f32,
    active_remaining: f32,
    hit_set: HitSet,
    activations: u32,
    formation_reported: bool,
    spec: AbilitySpec,
}

impl AbilityInstance {
    pub fn new(
        id: AbilityId,
        kind: AbilityKind,
        caster: CombatantId,
        owner_team: Team,
        origin: Vec2,
        damage: f32,
        spec: AbilitySpec,
    ) -> Self {
        Self {
            id,
            kind,
            caster,
            owner_team,
            damage,
            state: AbilityState::Idle,
            origin,
            direction: Vec2::Y,
            target: origin,
            position: origin,
            prev_position: origin,
            travel_elapsed: 0.0,
            travel_duration: 0.0,
            active_remaining: 0.0,
            hit_set: HitSet::new(),
            activations: 0,
            formation_reported: false,
            spec,
        }
    }

    pub fn state(&self) -> AbilityState {
        self.state
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn hit_set(&self) -> &HitSet {
        &self.hit_set
    }

    pub fn activations(&self) -> u32 {
        self.activations
    }

    pub fn active_remaining(&self) -> f32 {
        self.active_remaining
    }

    pub fn spec(&self) -> &AbilitySpec {
        &self.spec
    }

    fn transition(&mut self, to: AbilityState) -> bool {
        if to.rank() <= self.state.rank() {
            return false;
        }
        debug!(
            target: "arena_core::abilities",
            ability = %self.id,
            kind = %self.kind,
            from = self.state.as_str(),
            to = to.as_str(),
            "ability transition"
        );
        self.state = to;
        true
    }

    /// Idle → Aiming
    pub fn begin_aiming(&mut self, aim: AimParams) -> bool {
        if self.state != AbilityState::Idle {
            return false;
        }
        self.apply_aim(aim);
        self.transition(AbilityState::Aiming)
    }

    /// Update placement while still aiming. Ignored in any other state.
    pub fn aim(&mut self, aim: AimParams) -> bool {
        if self.state != AbilityState::Aiming {
            return false;
        }
        self.apply_aim(aim);
        true
    }

    fn apply_aim(&mut self, aim: AimParams) {
        if let Some(dir) = aim.direction.try_normalize() {
            self.direction = dir;
        }
        let wanted = match aim.target {
            Some(point) => {
                if let Some(dir) = (point - self.origin).try_normalize() {
                    if aim.direction.try_normalize().is_none() {
                        self.direction = dir;
                    }
                }
                point
            }
            None => self.origin + self.direction * self.spec.range,
        };
        self.target = match self.kind.placement() {
            Placement::Held if self.spec.range > 0.0 => {
                self.origin + (wanted - self.origin).clamp_length_max(self.spec.range)
            }
            _ => wanted,
        };
    }

    /// Aiming → Travelling. Freezes the placement.
    pub fn confirm(&mut self) -> bool {
        if self.state != AbilityState::Aiming {
            return false;
        }
        self.position = self.origin;
        self.prev_position = self.origin;
        self.travel_elapsed = 0.0;
        self.travel_duration = if self.kind.is_lobbed() && self.spec.travel_speed > 0.0 {
            self.origin.distance(self.target) / self.spec.travel_speed
        } else {
            self.spec.windup_secs
        };
        self.transition(AbilityState::Travelling)
    }

    /// Aiming → Despawned without ever activating
    pub fn cancel(&mut self) -> bool {
        if self.state != AbilityState::Aiming {
            return false;
        }
        self.transition(AbilityState::Despawned)
    }

    /// Force removal (caster left the match)
    pub fn discard(&mut self) {
        self.transition(AbilityState::Despawned);
    }

    /// Melee swings stay attached to the caster
    pub fn follow_caster(&mut self, caster_position: Vec2) {
        if self.kind == AbilityKind::Melee {
            self.origin = caster_position;
        }
    }

    /// Advance travel/movement by `dt`. `homing` is the point a minion steers
    /// towards this step. Returns true when the instance activated.
    pub fn advance(&mut self, dt: f32, homing: Option<Vec2>) -> bool {
        if !(dt > 0.0) {
            return false;
        }
        match self.state {
            AbilityState::Resolving => {
                self.transition(AbilityState::Despawned);
                false
            }
            AbilityState::Travelling => {
                self.travel_elapsed += dt;
                if self.travel_elapsed + f32::EPSILON < self.travel_duration {
                    if self.kind.is_lobbed() && self.travel_duration > 0.0 {
                        let t = self.travel_elapsed / self.travel_duration;
                        self.position = self.origin.lerp(self.target, t);
                    }
                    return false;
                }
                let leftover = (self.travel_elapsed - self.travel_duration).max(0.0);
                self.activate();
                if leftover > 0.0 {
                    self.step_active(leftover, homing);
                }
                true
            }
            AbilityState::Active => {
                self.step_active(dt, homing);
                false
            }
            _ => false,
        }
    }

    fn activate(&mut self) {
        self.position = match self.kind {
            AbilityKind::AoeField
            | AbilityKind::Triangle
            | AbilityKind::Square
            | AbilityKind::Pentagon => self.target,
            _ => self.origin,
        };
        self.prev_position = self.position;
        self.active_remaining = self.spec.active_secs;
        self.hit_set.clear_for_new_activation();
        self.formation_reported = false;
        self.activations += 1;
        self.transition(AbilityState::Active);
    }

    fn step_active(&mut self, dt: f32, homing: Option<Vec2>) {
        self.prev_position = self.position;
        match self.kind {
            AbilityKind::Shot => {
                self.position += self.direction * self.spec.speed * dt;
            }
            AbilityKind::Summon => {
                if let Some(goal) = homing {
                    if let Some(dir) = (goal - self.position).try_normalize() {
                        self.direction = dir;
                        let step = (self.spec.speed * dt).min(self.position.distance(goal));
                        self.position += dir * step;
                    }
                }
            }
            _ => {}
        }
        self.active_remaining = (self.active_remaining - dt).max(0.0);
        trace!(target: "arena_core::abilities", ability = %self.id, remaining = self.active_remaining, "active step");
    }

    /// Geometry that can hit this step; only `Active` instances have one.
    pub fn hit_shape(&self) -> Option<HitShape> {
        if self.state != AbilityState::Active {
            return None;
        }
        Some(self.shape_at_current_placement())
    }

    /// Geometry shown to the caster while placing
    pub fn preview_shape(&self) -> Option<HitShape> {
        match self.state {
            AbilityState::Aiming | AbilityState::Travelling if self.kind.placement() == Placement::Held => {
                Some(self.shape_at_target())
            }
            _ => None,
        }
    }

    fn shape_at_target(&self) -> HitShape {
        match self.kind.shape() {
            Some(_) => HitShape::Polygon {
                vertices: self.corners(),
            },
            None => HitShape::Circle {
                center: self.target,
                radius: self.spec.radius,
            },
        }
    }

    fn shape_at_current_placement(&self) -> HitShape {
        match self.kind {
            AbilityKind::Shot => HitShape::Segment {
                start: self.prev_position,
                end: self.position,
                half_thickness: self.spec.radius,
            },
            AbilityKind::Melee => HitShape::Circle {
                center: self.origin + self.direction * self.spec.range,
                radius: self.spec.radius,
            },
            AbilityKind::Summon => HitShape::Circle {
                center: self.position,
                radius: self.spec.radius,
            },
            AbilityKind::AoeField
            | AbilityKind::Triangle
            | AbilityKind::Square
            | AbilityKind::Pentagon => self.shape_at_target(),
        }
    }

    /// Polygon corners for shape abilities, empty for everything else
    pub fn corners(&self) -> Vec<Vec2> {
        match self.kind.shape() {
            Some(shape) => {
                let rotation = placement_rotation_deg(self.direction, self.spec.rotation_offset_deg);
                regular_polygon(self.target, self.spec.radius, rotation, shape.sides())
            }
            None => Vec::new(),
        }
    }

    /// Record a hit for this activation. False if already hit.
    pub fn record_hit(&mut self, target: CombatantId) -> bool {
        self.hit_set.record(target)
    }

    pub fn hits_exhausted(&self) -> bool {
        self.spec
            .max_hits
            .is_some_and(|cap| self.hit_set.len() >= cap)
    }

    /// Active → Resolving once the window closed or the hit cap is spent
    pub fn finish_if_spent(&mut self) -> bool {
        if self.state != AbilityState::Active {
            return false;
        }
        if self.active_remaining <= 0.0 || self.hits_exhausted() {
            return self.transition(AbilityState::Resolving);
        }
        false
    }

    /// True the first time a formation is reported in this activation
    pub fn mark_formation(&mut self) -> bool {
        if self.state != AbilityState::Active || self.formation_reported {
            return false;
        }
        self.formation_reported = true;
        true
    }
}

/// Every corner has at least one of `allies` within `corner_radius`.
pub fn formation_complete(corners: &[Vec2], allies: &[Vec2], corner_radius: f32) -> bool {
    !corners.is_empty()
        && corners
            .iter()
            .all(|corner| allies.iter().any(|ally| ally.distance(*corner) <= corner_radius))
}
