//! End-to-end match flow through the public engine API
//!
//! - Lobby → match handoff
//! - Hit resolution once per activation
//! - Cooldown-gated casting
//! - Respawn as a new life
//! - Clock expiry and flag capture endings
//! - Command log replay reproduces the same state digest

use arena_core::abilities::{AbilityKind, AbilityState, AimParams, CastOutcome, CastRejection};
use arena_core::engine::{ArenaEngine, Command, MatchConfig};
use arena_core::events::SimEventKind;
use arena_core::gameflow::{EndReason, MatchPhase};
use arena_core::replication::Snapshot;
use arena_core::types::{CombatantId, ParticipantId, Team};
use bevy::math::Vec2;

const DT: f32 = 1.0 / 60.0;

// ============================================================
// Helpers
// ============================================================

fn join(engine: &mut ArenaEngine, id: u64, team: u8, character: &str) {
    let pid = ParticipantId(id);
    engine.connect_participant(pid, format!("player{id}")).unwrap();
    engine.request_team_select(pid, team).unwrap();
    engine.request_character_select(pid, character).unwrap();
    engine.request_ready(pid).unwrap();
}

fn duel_with(config: MatchConfig) -> ArenaEngine {
    let mut engine = ArenaEngine::new(config).unwrap();
    join(&mut engine, 1, 1, "Knight");
    join(&mut engine, 2, 2, "Wizard");
    engine.start_match().unwrap();
    engine.drain_events();
    engine
}

fn duel() -> ArenaEngine {
    duel_with(MatchConfig::default())
}

fn health(engine: &ArenaEngine, id: u64) -> f32 {
    engine.combatant_view(CombatantId(id)).unwrap().health
}

// ============================================================
// Lobby handoff
// ============================================================

#[test]
fn test_lobby_handoff_creates_combatants() {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    join(&mut engine, 1, 1, "Knight");
    engine
        .connect_participant(ParticipantId(2), "late")
        .unwrap();
    assert!(!engine.all_ready());
    assert!(engine.start_match().is_err());

    engine.request_team_select(ParticipantId(2), 2).unwrap();
    engine.request_character_select(ParticipantId(2), "wizard").unwrap();
    engine.request_ready(ParticipantId(2)).unwrap();
    assert!(engine.all_ready());

    engine.start_match().unwrap();
    assert_eq!(engine.phase(), MatchPhase::InMatch);
    let views = engine.combatant_views();
    assert_eq!(views.len(), 2);
    assert_eq!(views[1].team, Team::Two);
    assert_eq!(views[1].max_health, 100.0);
    assert_eq!(engine.match_view().connected, 0);
}

// ============================================================
// Hit resolution
// ============================================================

#[test]
fn test_area_hits_once_per_activation() {
    let mut engine = duel();
    engine
        .update_position(CombatantId(2), Vec2::new(-30.0, 0.0))
        .unwrap();

    let id = engine
        .request_cast(
            CombatantId(1),
            AbilityKind::Square,
            AimParams::at(Vec2::new(-30.0, 0.0)),
        )
        .unwrap()
        .ability()
        .unwrap();
    assert_eq!(engine.request_confirm(id).unwrap(), CastOutcome::Updated(id));

    for _ in 0..10 {
        engine.tick(DT);
    }
    assert_eq!(health(&engine, 2), 85.0);

    // leave and re-enter during the same activation
    engine
        .update_position(CombatantId(2), Vec2::new(-30.0, 30.0))
        .unwrap();
    engine.tick(DT);
    engine
        .update_position(CombatantId(2), Vec2::new(-30.0, 0.0))
        .unwrap();
    for _ in 0..10 {
        engine.tick(DT);
    }
    assert_eq!(health(&engine, 2), 85.0);
    assert_eq!(engine.ability_view(id).unwrap().hits, 1);
}

#[test]
fn test_no_friendly_fire() {
    let mut engine = duel();
    let ally = engine
        .spawn_bot(Team::One, arena_core::types::Character::Wizard)
        .unwrap();
    engine.update_position(ally, Vec2::new(-30.0, 0.0)).unwrap();
    let id = engine
        .request_cast(
            CombatantId(1),
            AbilityKind::Square,
            AimParams::at(Vec2::new(-30.0, 0.0)),
        )
        .unwrap()
        .ability()
        .unwrap();
    engine.request_confirm(id).unwrap();
    for _ in 0..5 {
        engine.tick(DT);
    }
    assert_eq!(engine.combatant_view(ally).unwrap().health, 100.0);
}

#[test]
fn test_melee_kill_emits_single_death() {
    let mut engine = duel();
    engine.update_position(CombatantId(1), Vec2::ZERO).unwrap();
    engine
        .update_position(CombatantId(2), Vec2::new(0.7, 0.0))
        .unwrap();

    let mut deaths = 0;
    for _ in 0..600 {
        let outcome = engine
            .request_cast(CombatantId(1), AbilityKind::Melee, AimParams::toward(Vec2::X))
            .unwrap();
        assert!(!matches!(outcome, CastOutcome::Rejected(CastRejection::AlreadyAiming)));
        engine.tick(DT);
        deaths += engine
            .drain_events()
            .iter()
            .filter(|e| matches!(e.kind, SimEventKind::Died { .. }))
            .count();
        if !engine.combatant_view(CombatantId(2)).unwrap().alive {
            break;
        }
    }
    // 100 health, 20 per swing
    assert_eq!(deaths, 1);
    assert_eq!(health(&engine, 2), 0.0);
}

// ============================================================
// Cooldowns and casting
// ============================================================

#[test]
fn test_cast_on_cooldown_creates_nothing() {
    let mut engine = duel();
    let first = engine
        .request_cast(CombatantId(2), AbilityKind::Summon, AimParams::default())
        .unwrap();
    assert!(matches!(first, CastOutcome::Started(_)));
    let live = engine.ability_views().len();

    let second = engine
        .request_cast(CombatantId(2), AbilityKind::Summon, AimParams::default())
        .unwrap();
    assert!(matches!(
        second,
        CastOutcome::Rejected(CastRejection::CoolingDown { .. })
    ));
    assert_eq!(engine.ability_views().len(), live);
    assert!(engine
        .ability_views()
        .iter()
        .all(|a| a.state != AbilityState::Aiming));
}

#[test]
fn test_transitions_only_move_forward() {
    let mut engine = duel();
    engine
        .request_cast(
            CombatantId(2),
            AbilityKind::AoeField,
            AimParams::at(Vec2::new(30.0, 0.0)),
        )
        .unwrap();
    let id = engine.ability_views()[0].id;
    engine.request_confirm(id).unwrap();
    for _ in 0..400 {
        engine.tick(DT);
    }
    let ranks: Vec<(u8, u8)> = engine
        .drain_events()
        .iter()
        .filter_map(|e| match e.kind {
            SimEventKind::AbilityTransition { from, to, .. } => Some((from.rank(), to.rank())),
            _ => None,
        })
        .collect();
    assert!(!ranks.is_empty());
    assert!(ranks.iter().all(|(from, to)| to > from));
    assert!(engine.ability_view(id).is_none());
}

#[test]
fn test_concurrency_policy_limits_live_instances() {
    let mut config = MatchConfig::default();
    config.cast_policy.allow_concurrent = false;
    let mut engine = duel_with(config);
    engine
        .request_cast(CombatantId(2), AbilityKind::Summon, AimParams::default())
        .unwrap();
    let second = engine
        .request_cast(CombatantId(2), AbilityKind::Shot, AimParams::default())
        .unwrap();
    assert_eq!(second, CastOutcome::Rejected(CastRejection::ConcurrencyLimit));
}

// ============================================================
// Respawn
// ============================================================

#[test]
fn test_respawn_starts_new_life_at_base() {
    let mut config = MatchConfig::default();
    config.respawn_delay_secs = 1.0;
    let mut engine = duel_with(config);
    engine.update_position(CombatantId(1), Vec2::ZERO).unwrap();
    engine
        .update_position(CombatantId(2), Vec2::new(0.7, 0.0))
        .unwrap();

    for _ in 0..600 {
        engine
            .request_cast(CombatantId(1), AbilityKind::Melee, AimParams::toward(Vec2::X))
            .unwrap();
        engine.tick(DT);
        if !engine.combatant_view(CombatantId(2)).unwrap().alive {
            break;
        }
    }
    assert!(!engine.combatant_view(CombatantId(2)).unwrap().alive);

    for _ in 0..70 {
        engine.tick(DT);
    }
    let view = engine.combatant_view(CombatantId(2)).unwrap();
    assert!(view.alive);
    assert_eq!(view.life, 1);
    assert_eq!(view.health, view.max_health);
    assert_eq!(view.position, engine.config().team_bases.two);
}

// ============================================================
// Match endings
// ============================================================

#[test]
fn test_clock_expiry_has_no_winner() {
    let mut config = MatchConfig::default();
    config.match_duration_secs = 1.0;
    let mut engine = duel_with(config);
    for _ in 0..120 {
        engine.tick(DT);
    }
    let outcome = engine.outcome().unwrap();
    assert_eq!(outcome.winner, None);
    assert_eq!(outcome.reason, EndReason::TimeExpired);
    let ended = engine
        .drain_events()
        .iter()
        .filter(|e| matches!(e.kind, SimEventKind::MatchEnded(_)))
        .count();
    assert_eq!(ended, 1);
}

#[test]
fn test_flag_run_wins_match() {
    let mut engine = duel();
    let flag = engine.tokens().flag_of(Team::One).unwrap().position;
    engine.update_position(CombatantId(2), flag).unwrap();
    engine.tick(DT);
    assert!(engine.combatant_view(CombatantId(2)).unwrap().carrying.is_some());

    let base = engine.config().team_bases.two;
    engine.update_position(CombatantId(2), base).unwrap();
    engine.tick(DT);
    let outcome = engine.outcome().unwrap();
    assert_eq!(outcome.winner, Some(Team::Two));
    assert_eq!(outcome.reason, EndReason::FlagCaptured);

    // no more simulation after the match is decided
    let tick_before = engine.tick_count();
    let health_before = health(&engine, 1);
    engine.tick(DT);
    assert_eq!(engine.tick_count(), tick_before + 1);
    assert_eq!(health(&engine, 1), health_before);
    assert_eq!(engine.phase(), MatchPhase::PostMatch);
}

#[test]
fn test_points_topup() {
    let mut engine = duel();
    for _ in 0..(10 * 60 + 1) {
        engine.tick(DT);
    }
    assert_eq!(engine.combatant_view(CombatantId(1)).unwrap().points, 5);
    assert_eq!(engine.team_points(Team::Two), 5);
}

// ============================================================
// Determinism
// ============================================================

#[test]
fn test_command_log_replay_matches_digest() {
    let mut engine = ArenaEngine::new(MatchConfig::default()).unwrap();
    for (id, team, character) in [(1, 1, "Knight"), (2, 2, "Wizard")] {
        let participant = ParticipantId(id);
        engine.submit(Command::Connect {
            participant,
            name: format!("p{id}"),
        });
        engine.submit(Command::SelectTeam { participant, team });
        engine.submit(Command::SelectCharacter {
            participant,
            character: character.into(),
        });
        engine.submit(Command::Ready { participant });
    }
    engine.submit(Command::StartMatch);
    engine.tick(DT);

    for step in 0..240u32 {
        let x = -40.0 + step as f32 * 0.2;
        engine.submit(Command::Move {
            combatant: CombatantId(1),
            position: Vec2::new(x, 0.0),
        });
        if step % 30 == 0 {
            engine.submit(Command::Cast {
                caster: CombatantId(1),
                kind: AbilityKind::Shot,
                aim: AimParams::toward(Vec2::X),
            });
            engine.submit(Command::Cast {
                caster: CombatantId(2),
                kind: AbilityKind::Summon,
                aim: AimParams::default(),
            });
        }
        engine.tick(DT);
    }
    let digest = Snapshot::capture(&engine).digest();

    let log = arena_core::engine::CommandLog::from_json(&engine.command_log().to_json()).unwrap();
    let mut replica = ArenaEngine::new(MatchConfig::default()).unwrap();
    log.replay_into(&mut replica, engine.tick_count(), DT);
    assert_eq!(replica.tick_count(), engine.tick_count());
    assert_eq!(Snapshot::capture(&replica).digest(), digest);
}
