//! Team-filtered hit resolution with per-activation repeat suppression.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::geometry::HitShape;
use super::health::Combatant;
use crate::types::{CombatantId, Team};

/// Combatants already damaged during the current activation window.
///
/// Cleared only when a new activation begins, never per step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitSet {
    ids: BTreeSet<CombatantId>,
}

impl HitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: CombatantId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns false if `id` was already recorded
    pub fn record(&mut self, id: CombatantId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CombatantId> + '_ {
        self.ids.iter().copied()
    }

    pub(crate) fn clear_for_new_activation(&mut self) {
        self.ids.clear();
    }
}

/// What one ability geometry is allowed to hit this step
#[derive(Debug, Clone, Copy)]
pub struct HitQuery<'a> {
    pub shape: &'a HitShape,
    pub owner_team: Team,
    /// Uniform widening applied to the shape (combatant body size)
    pub pad: f32,
    /// Total hits allowed over the whole activation, `None` = unlimited
    pub max_hits: Option<usize>,
}

/// Alive enemy combatants inside the geometry and not yet in `hit_set`.
///
/// With a hit cap, the closest candidates to the shape's leading point win
/// (ties by id) so a projectile strikes the first body on its path.
pub fn find_targets<'a>(
    query: HitQuery<'_>,
    hit_set: &HitSet,
    combatants: impl IntoIterator<Item = &'a Combatant>,
) -> Vec<CombatantId> {
    let budget = match query.max_hits {
        Some(cap) => cap.saturating_sub(hit_set.len()),
        None => usize::MAX,
    };
    if budget == 0 {
        return Vec::new();
    }

    let lead = leading_point(query.shape);
    let mut candidates: Vec<(f32, CombatantId)> = combatants
        .into_iter()
        .filter(|c| c.is_alive())
        .filter(|c| c.team() != query.owner_team)
        .filter(|c| !hit_set.contains(c.id))
        .filter(|c| query.shape.contains_padded(c.position, query.pad))
        .map(|c| (c.position.distance_squared(lead), c.id))
        .collect();

    if query.max_hits.is_some() {
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    }

    candidates
        .into_iter()
        .take(budget)
        .map(|(_, id)| id)
        .collect()
}

fn leading_point(shape: &HitShape) -> bevy::math::Vec2 {
    match shape {
        HitShape::Segment { start, .. } => *start,
        other => other.center(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::CharacterSpec;
    use crate::types::Character;
    use bevy::math::Vec2;

    fn combatant(id: u64, team: Team, pos: Vec2) -> Combatant {
        Combatant::new(
            CombatantId(id),
            team,
            Character::Knight,
            &CharacterSpec::knight(),
            pos,
            10.0,
        )
    }

    fn circle() -> HitShape {
        HitShape::Circle {
            center: Vec2::ZERO,
            radius: 2.0,
        }
    }

    #[test]
    fn test_no_friendly_fire() {
        let roster = vec![
            combatant(1, Team::One, Vec2::new(0.5, 0.0)),
            combatant(2, Team::Two, Vec2::new(-0.5, 0.0)),
        ];
        let shape = circle();
        let query = HitQuery {
            shape: &shape,
            owner_team: Team::One,
            pad: 0.0,
            max_hits: None,
        };
        let hits = find_targets(query, &HitSet::new(), &roster);
        assert_eq!(hits, vec![CombatantId(2)]);
    }

    #[test]
    fn test_dead_and_already_hit_are_skipped() {
        let mut roster = vec![
            combatant(2, Team::Two, Vec2::new(0.0, 1.0)),
            combatant(3, Team::Two, Vec2::new(0.0, -1.0)),
            combatant(4, Team::Two, Vec2::new(1.0, 0.0)),
        ];
        roster[0].apply_damage(1000.0, Team::One);
        let mut hit_set = HitSet::new();
        hit_set.record(CombatantId(3));

        let shape = circle();
        let query = HitQuery {
            shape: &shape,
            owner_team: Team::One,
            pad: 0.0,
            max_hits: None,
        };
        assert_eq!(find_targets(query, &hit_set, &roster), vec![CombatantId(4)]);
    }

    #[test]
    fn test_hit_cap_prefers_first_on_path() {
        let roster = vec![
            combatant(5, Team::Two, Vec2::new(8.0, 0.0)),
            combatant(6, Team::Two, Vec2::new(3.0, 0.1)),
        ];
        let shape = HitShape::Segment {
            start: Vec2::ZERO,
            end: Vec2::new(10.0, 0.0),
            half_thickness: 0.25,
        };
        let query = HitQuery {
            shape: &shape,
            owner_team: Team::One,
            pad: 0.0,
            max_hits: Some(1),
        };
        assert_eq!(
            find_targets(query, &HitSet::new(), &roster),
            vec![CombatantId(6)]
        );

        let mut spent = HitSet::new();
        spent.record(CombatantId(6));
        assert!(find_targets(query, &spent, &roster).is_empty());
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut set = HitSet::new();
        assert!(set.record(CombatantId(1)));
        assert!(!set.record(CombatantId(1)));
        assert_eq!(set.len(), 1);
        set.clear_for_new_activation();
        assert!(set.is_empty());
    }
}
