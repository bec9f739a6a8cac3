//! Edge case & boundary tests
//!
//! - Commands in the wrong phase or against unknown ids
//! - Invalid selections leave no partial state
//! - Zero / negative / non-finite steps, and single steps longer than the match
//! - Stale cast commands (aim/confirm/cancel on finished instances)
//! - Dead casters, empty ammo, disconnects mid-match

use arena_core::abilities::{AbilityKind, AimParams, CastOutcome, CastRejection};
use arena_core::combat::geometry::{is_clockwise, signed_area_sum};
use arena_core::engine::{ArenaEngine, Command, MatchConfig};
use arena_core::error::ArenaError;
use arena_core::events::SimEventKind;
use arena_core::gameflow::MatchPhase;
use arena_core::lobby::SelectionOutcome;
use arena_core::types::{AbilityId, Character, CombatantId, ParticipantId, Team};
use bevy::math::Vec2;

const DT: f32 = 1.0 / 60.0;

// ============================================================
// Helpers
// ============================================================

fn join(engine: &mut ArenaEngine, id: u64, team: u8, character: &str) {
    let pid = ParticipantId(id);
    engine.connect_participant(pid, "p").unwrap();
    engine.request_team_select(pid, team).unwrap();
    engine.request_character_select(pid, character).unwrap();
    engine.request_ready(pid).unwrap();
}

fn duel() -> ArenaEngine {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    join(&mut engine, 1, 1, "Knight");
    join(&mut engine, 2, 2, "Wizard");
    engine.start_match().unwrap();
    engine
}

// ============================================================
// 1. Lobby validation
// ============================================================

#[test]
fn test_invalid_team_leaves_lobby_untouched() {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    engine.connect_participant(ParticipantId(1), "a").unwrap();
    for bad in [0u8, 3, 255] {
        assert_eq!(
            engine.request_team_select(ParticipantId(1), bad),
            Err(ArenaError::InvalidTeam(bad))
        );
    }
    let participant = engine.lobby().participant(ParticipantId(1)).unwrap();
    assert_eq!(participant.team, None);
}

#[test]
fn test_unknown_character_name() {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    engine.connect_participant(ParticipantId(1), "a").unwrap();
    assert!(matches!(
        engine.request_character_select(ParticipantId(1), "Necromancer"),
        Err(ArenaError::InvalidCharacter(_))
    ));
    assert_eq!(
        engine.request_ready(ParticipantId(1)),
        Err(ArenaError::IncompleteSelection(ParticipantId(1)))
    );
}

#[test]
fn test_selection_after_ready_is_ignored() {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    join(&mut engine, 1, 1, "Knight");
    assert_eq!(
        engine.request_team_select(ParticipantId(1), 2),
        Ok(SelectionOutcome::Ignored)
    );
    assert_eq!(
        engine.lobby().participant(ParticipantId(1)).unwrap().team,
        Some(Team::One)
    );
    assert_eq!(
        engine.request_ready(ParticipantId(1)),
        Ok(SelectionOutcome::Ignored)
    );
}

#[test]
fn test_readiness_after_leave_and_join() {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    assert!(!engine.all_ready());
    join(&mut engine, 1, 1, "Knight");
    join(&mut engine, 2, 2, "Wizard");
    assert!(engine.all_ready());

    engine.disconnect_participant(ParticipantId(2));
    engine.connect_participant(ParticipantId(3), "new").unwrap();
    assert!(!engine.all_ready());
}

#[test]
fn test_lobby_commands_after_start() {
    let mut engine = duel();
    assert_eq!(
        engine.connect_participant(ParticipantId(9), "late"),
        Err(ArenaError::WrongPhase("in_match"))
    );
    assert!(engine.start_match().is_err());
    assert!(engine.request_unready(ParticipantId(1)).is_err());
}

// ============================================================
// 2. Unknown ids and stale commands
// ============================================================

#[test]
fn test_unknown_ids() {
    let mut engine = duel();
    assert_eq!(
        engine.request_cast(CombatantId(77), AbilityKind::Shot, AimParams::default()),
        Err(ArenaError::UnknownCombatant(CombatantId(77)))
    );
    assert_eq!(
        engine.request_confirm(AbilityId(77)),
        Err(ArenaError::UnknownAbility(AbilityId(77)))
    );
    assert!(engine
        .update_position(CombatantId(77), Vec2::ZERO)
        .is_err());
    assert!(engine.combatant_view(CombatantId(77)).is_none());
    assert!(engine.cooldown_views(CombatantId(77)).is_empty());
}

#[test]
fn test_double_confirm_is_stale() {
    let mut engine = duel();
    let id = engine
        .request_cast(
            CombatantId(1),
            AbilityKind::Square,
            AimParams::at(Vec2::new(-30.0, 0.0)),
        )
        .unwrap()
        .ability()
        .unwrap();
    assert!(!engine.request_confirm(id).unwrap().is_rejected());
    assert!(matches!(
        engine.request_confirm(id).unwrap(),
        CastOutcome::Rejected(CastRejection::WrongState(_))
    ));
    assert!(engine.request_cancel(id).unwrap().is_rejected());
    assert!(engine
        .request_aim(id, AimParams::at(Vec2::new(-35.0, 5.0)))
        .unwrap()
        .is_rejected());
}

#[test]
fn test_cast_before_match() {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    assert!(engine
        .request_cast(CombatantId(1), AbilityKind::Shot, AimParams::default())
        .is_err());
    assert!(engine.spawn_bot(Team::One, Character::Knight).is_err());
}

// ============================================================
// 3. Dead casters and ammo
// ============================================================

#[test]
fn test_dead_caster_cannot_cast_or_move() {
    let mut engine = duel();
    engine.update_position(CombatantId(1), Vec2::ZERO).unwrap();
    engine.update_position(CombatantId(2), Vec2::new(0.7, 0.0)).unwrap();
    for _ in 0..600 {
        engine
            .request_cast(CombatantId(1), AbilityKind::Melee, AimParams::toward(Vec2::X))
            .unwrap();
        engine.tick(DT);
        if !engine.combatant_view(CombatantId(2)).unwrap().alive {
            break;
        }
    }
    assert_eq!(
        engine
            .request_cast(CombatantId(2), AbilityKind::Shot, AimParams::default())
            .unwrap(),
        CastOutcome::Rejected(CastRejection::CasterDead)
    );
    engine.update_position(CombatantId(2), Vec2::new(5.0, 5.0)).unwrap();
    assert_eq!(
        engine.combatant_view(CombatantId(2)).unwrap().position,
        Vec2::new(0.7, 0.0)
    );
    assert_eq!(
        engine.request_reload(CombatantId(2)),
        Ok(SelectionOutcome::Ignored)
    );
}

#[test]
fn test_full_magazine_reload_ignored() {
    let mut engine = duel();
    assert_eq!(
        engine.request_reload(CombatantId(1)),
        Ok(SelectionOutcome::Ignored)
    );
}

#[test]
fn test_ammo_runs_out() {
    let mut engine = duel();
    let mut fired = 0;
    for _ in 0..(60 * 10) {
        let outcome = engine
            .request_cast(CombatantId(1), AbilityKind::Shot, AimParams::toward(Vec2::Y))
            .unwrap();
        match outcome {
            CastOutcome::Started(_) => fired += 1,
            CastOutcome::Rejected(CastRejection::OutOfAmmo) => break,
            _ => {}
        }
        engine.tick(DT);
    }
    assert_eq!(fired, 6);
    assert_eq!(engine.combatant_view(CombatantId(1)).unwrap().ammo, 0);
}

// ============================================================
// 4. Steps and queue
// ============================================================

#[test]
fn test_invalid_steps_are_ignored() {
    let mut engine = duel();
    let before = engine.match_time_remaining();
    engine.tick(0.0);
    engine.tick(-1.0);
    engine.tick(f32::NAN);
    engine.tick(f32::INFINITY);
    assert_eq!(engine.tick_count(), 0);
    assert_eq!(engine.match_time_remaining(), before);
}

#[test]
fn test_single_huge_step_is_bounded() {
    let mut engine = duel();
    engine.drain_events();
    engine.tick(1.0e7);
    assert_eq!(engine.phase(), MatchPhase::PostMatch);
    assert_eq!(engine.match_time_remaining(), 0.0);

    // 480 s of 10 s top-ups, two combatants
    let events = engine.drain_events();
    let topups = events
        .iter()
        .filter(|e| matches!(e.kind, SimEventKind::PointsGained { .. }))
        .count();
    assert_eq!(topups, 96);
    assert!(events.len() < 200);
    assert_eq!(engine.combatant_view(CombatantId(1)).unwrap().points, 240);

    engine.tick(1.0e7);
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_rejected_command_does_not_stop_queue() {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    engine.submit(Command::SelectTeam {
        participant: ParticipantId(5),
        team: 1,
    });
    engine.submit(Command::Connect {
        participant: ParticipantId(5),
        name: "late".into(),
    });
    engine.tick(DT);
    assert_eq!(engine.lobby().connected_count(), 1);
    assert_eq!(engine.command_log().len(), 2);
    assert_eq!(engine.phase(), MatchPhase::PreMatch);
}

#[test]
fn test_disconnect_discards_aiming_instances() {
    let mut engine = duel();
    engine
        .request_cast(
            CombatantId(2),
            AbilityKind::Triangle,
            AimParams::at(Vec2::new(35.0, 5.0)),
        )
        .unwrap();
    assert_eq!(engine.ability_views().len(), 1);
    engine.disconnect_participant(ParticipantId(2));
    assert!(engine.ability_views().is_empty());
    assert!(engine.combatant_view(CombatantId(2)).is_none());
}

// ============================================================
// 5. Geometry boundary
// ============================================================

#[test]
fn test_winding_of_unit_square() {
    let ccw = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    assert!(signed_area_sum(&ccw) > 0.0);
    assert!(!is_clockwise(&ccw));
    let mut cw = ccw;
    cw.reverse();
    assert!(signed_area_sum(&cw) < 0.0);
    assert!(is_clockwise(&cw));
}
