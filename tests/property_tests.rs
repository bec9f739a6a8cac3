//! Property-based tests using proptest
//!
//! Invariants that must hold for ALL inputs:
//! - Damage: exact reduction, clamped at zero, death fires once
//! - Heal: never above max, no-op on the dead
//! - Cooldown: any split of the duration makes the gate ready, never negative
//! - Match clock: fires exactly once however the duration is sliced
//! - Polygon winding flips with vertex order
//! - Engine: identical command sequences give identical digests

use arena_core::abilities::{AbilityKind, AimParams};
use arena_core::combat::geometry::{is_clockwise, regular_polygon};
use arena_core::combat::{Combatant, CooldownGate, DamageOutcome};
use arena_core::engine::{ArenaEngine, CharacterSpec, Command, MatchConfig};
use arena_core::gameflow::MatchClock;
use arena_core::replication::Snapshot;
use arena_core::types::{Character, CombatantId, ParticipantId, Team};
use bevy::math::Vec2;
use proptest::prelude::*;

fn knight() -> Combatant {
    Combatant::new(
        CombatantId(1),
        Team::One,
        Character::Knight,
        &CharacterSpec::knight(),
        Vec2::ZERO,
        5.0,
    )
}

// ============================================================
// Health Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_damage_reduces_exactly(amount in 0.01f32..149.0) {
        let mut c = knight();
        let before = c.health().current();
        let outcome = c.apply_damage(amount, Team::Two);
        prop_assert_eq!(outcome, DamageOutcome::Damaged { dealt: amount });
        prop_assert!((c.health().current() - (before - amount)).abs() < 1e-3);
        prop_assert!(c.is_alive());
    }

    #[test]
    fn prop_death_is_idempotent(hits in prop::collection::vec(1.0f32..400.0, 1..20)) {
        let mut c = knight();
        let mut kills = 0;
        for amount in hits {
            if c.apply_damage(amount, Team::Two).is_kill() {
                kills += 1;
            }
            prop_assert!(c.health().current() >= 0.0);
        }
        prop_assert!(kills <= 1);
        prop_assert_eq!(kills == 1, !c.is_alive());
        if !c.is_alive() {
            prop_assert_eq!(c.health().current(), 0.0);
            prop_assert_eq!(c.apply_damage(10.0, Team::Two), DamageOutcome::Ignored);
        }
    }

    #[test]
    fn prop_heal_never_exceeds_max(damage in 0.0f32..149.0, heal in 0.0f32..1000.0) {
        let mut c = knight();
        c.apply_damage(damage, Team::Two);
        c.heal(heal);
        prop_assert!(c.health().current() <= c.health().max());
    }

    #[test]
    fn prop_heal_noop_on_dead(heal in 0.0f32..1000.0) {
        let mut c = knight();
        c.apply_damage(1000.0, Team::Two);
        prop_assert_eq!(c.heal(heal), 0.0);
        prop_assert_eq!(c.health().current(), 0.0);
        prop_assert!(!c.is_alive());
    }
}

// ============================================================
// Timer Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_cooldown_ready_after_duration(duration in 0.1f32..30.0, extra in 0.0f32..10.0) {
        let mut gate = CooldownGate::new();
        gate.start(duration).unwrap();
        prop_assert!(!gate.is_ready());
        gate.tick(duration + extra);
        prop_assert!(gate.is_ready());
        prop_assert!(gate.remaining() >= 0.0);
    }

    #[test]
    fn prop_cooldown_never_negative(steps in prop::collection::vec(0.0f32..2.0, 1..50)) {
        let mut gate = CooldownGate::new();
        gate.start(5.0).unwrap();
        for dt in steps {
            gate.tick(dt);
            prop_assert!(gate.remaining() >= 0.0);
            prop_assert!(gate.remaining() <= 5.0);
        }
    }

    #[test]
    fn prop_clock_fires_once(rate in 10u32..=240, duration in 1.0f32..60.0) {
        let mut clock = MatchClock::new(duration).unwrap();
        let dt = 1.0 / rate as f32;
        let steps = (duration * rate as f32).ceil() as u32 + rate;
        let mut fired = 0;
        for _ in 0..steps {
            if clock.tick(dt) {
                fired += 1;
            }
        }
        prop_assert_eq!(fired, 1);
        prop_assert!(clock.has_ended());
        prop_assert_eq!(clock.remaining(), 0.0);
    }
}

// ============================================================
// Geometry Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_winding_flips_on_reverse(
        sides in 3u32..=8,
        radius in 0.5f32..50.0,
        rotation in 0.0f32..360.0,
        cx in -100.0f32..100.0,
        cy in -100.0f32..100.0,
    ) {
        let mut vertices = regular_polygon(Vec2::new(cx, cy), radius, rotation, sides);
        prop_assert!(!is_clockwise(&vertices));
        vertices.reverse();
        prop_assert!(is_clockwise(&vertices));
    }
}

// ============================================================
// Determinism
// ============================================================

fn scripted_run(moves: &[(f32, f32)], shoot_every: usize) -> u64 {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    for (id, team, character) in [(1, 1, "Knight"), (2, 2, "Wizard")] {
        let participant = ParticipantId(id);
        engine.submit(Command::Connect {
            participant,
            name: "p".into(),
        });
        engine.submit(Command::SelectTeam { participant, team });
        engine.submit(Command::SelectCharacter {
            participant,
            character: character.into(),
        });
        engine.submit(Command::Ready { participant });
    }
    engine.submit(Command::StartMatch);
    engine.tick(1.0 / 60.0);

    for (i, (x, y)) in moves.iter().enumerate() {
        engine.submit(Command::Move {
            combatant: CombatantId(2),
            position: Vec2::new(*x, *y),
        });
        if i % shoot_every == 0 {
            engine.submit(Command::Cast {
                caster: CombatantId(1),
                kind: AbilityKind::Shot,
                aim: AimParams::toward(Vec2::new(*x + 40.0, *y)),
            });
        }
        engine.tick(1.0 / 60.0);
    }
    Snapshot::capture(&engine).digest()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_same_commands_same_digest(
        moves in prop::collection::vec((-45.0f32..45.0, -20.0f32..20.0), 1..120),
        shoot_every in 1usize..20,
    ) {
        prop_assert_eq!(scripted_run(&moves, shoot_every), scripted_run(&moves, shoot_every));
    }
}
