//! Headless match harness.
//!
//! Fills the lobby with scripted participants, drives a deterministic match
//! for a fixed number of ticks through the command queue, mirrors it with an
//! observer, replays the command log into a fresh engine and prints a JSON
//! summary.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use arena_core::abilities::{AbilityKind, AbilityState, AimParams};
use arena_core::engine::{ArenaEngine, Command, CombatantView, MatchConfig};
use arena_core::events::{SimEvent, SimEventKind};
use arena_core::gameflow::MatchOutcome;
use arena_core::logging::{init_tracing, LogLevel, TracingConfig};
use arena_core::replication::{ObserverMirror, PresentationSync, Snapshot, ViewChange};
use arena_core::types::{Character, ParticipantId, Team};

/// Scripted arena match runner
#[derive(Parser, Debug)]
#[command(name = "arena-harness")]
#[command(about = "Run a deterministic scripted arena match")]
#[command(version)]
struct Args {
    /// Match config (.ron or .json); built-in defaults otherwise
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Simulation steps to run
    #[arg(long, default_value = "3600")]
    ticks: u64,

    /// Participants per team
    #[arg(long, default_value = "2")]
    per_team: u64,

    /// Override the config seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the command log here as JSON
    #[arg(long, value_name = "OUTPUT_PATH")]
    log_output: Option<PathBuf>,

    /// Base log level; `RUST_LOG` wins when set
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Default)]
struct ChangeCounter {
    changes: usize,
    removals: usize,
    events: usize,
}

impl PresentationSync for ChangeCounter {
    fn on_change(&mut self, change: &ViewChange) {
        self.changes += 1;
        if matches!(
            change,
            ViewChange::CombatantRemoved(_) | ViewChange::AbilityRemoved(_) | ViewChange::TokenRemoved(_)
        ) {
            self.removals += 1;
        }
    }

    fn on_events(&mut self, events: &[SimEvent]) {
        self.events += events.len();
    }
}

#[derive(Serialize)]
struct Summary {
    ticks: u64,
    phase: String,
    outcome: Option<MatchOutcome>,
    team_one_points: u32,
    team_two_points: u32,
    kills: usize,
    casts: usize,
    commands: usize,
    command_hash: u64,
    digest: u64,
    observer_digest: Option<u64>,
    replay_digest: u64,
    observer_changes: usize,
    observer_removals: usize,
    observer_events: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(
        &TracingConfig::new(args.log_level)
            .with_target("arena_core::engine", LogLevel::Debug)
            .with_target("arena_core::replication", LogLevel::Debug),
    );

    let mut config = match &args.config {
        Some(path) => MatchConfig::load(path)
            .with_context(|| format!("loading match config {}", path.display()))?,
        None => MatchConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.per_team == 0 || args.per_team as usize > config.team_capacity {
        bail!(
            "per-team count {} outside 1..={}",
            args.per_team,
            config.team_capacity
        );
    }
    let dt = config.fixed_dt();

    let mut engine = ArenaEngine::new(config.clone()).context("building engine")?;
    fill_lobby(&mut engine, args.per_team);
    engine.submit(Command::StartMatch);

    let mut mirror = ObserverMirror::new(ChangeCounter::default());
    let mut kills = 0;
    let mut casts = 0;
    for _ in 0..args.ticks {
        casts += script_step(&mut engine, dt);
        engine.tick(dt);

        let events = engine.drain_events();
        kills += events
            .iter()
            .filter(|e| matches!(e.kind, SimEventKind::Died { .. }))
            .count();
        mirror.forward_events(&events);
        mirror.apply(Snapshot::capture(&engine));
    }

    let digest = Snapshot::capture(&engine).digest();
    let log = engine.command_log().clone();

    let mut replica = ArenaEngine::new(config).context("building replay engine")?;
    log.replay_into(&mut replica, args.ticks, dt);
    let replay_digest = Snapshot::capture(&replica).digest();
    if replay_digest != digest {
        bail!("replay diverged: {digest:#x} != {replay_digest:#x}");
    }

    if let Some(path) = &args.log_output {
        std::fs::write(path, log.to_json())
            .with_context(|| format!("writing command log {}", path.display()))?;
        info!(target: "arena_core::engine", path = %path.display(), "command log written");
    }

    let observer_digest = mirror.digest();
    let counter = mirror.into_sink();
    let summary = Summary {
        ticks: engine.tick_count(),
        phase: engine.phase().to_string(),
        outcome: engine.outcome(),
        team_one_points: engine.team_points(Team::One),
        team_two_points: engine.team_points(Team::Two),
        kills,
        casts,
        commands: log.len(),
        command_hash: log.hash(),
        digest,
        observer_digest,
        replay_digest,
        observer_changes: counter.changes,
        observer_removals: counter.removals,
        observer_events: counter.events,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn fill_lobby(engine: &mut ArenaEngine, per_team: u64) {
    for team in Team::both() {
        for slot in 0..per_team {
            let participant = ParticipantId(u64::from(team.id()) * 100 + slot);
            let character = if slot % 2 == 0 {
                Character::Knight
            } else {
                Character::Wizard
            };
            engine.submit(Command::Connect {
                participant,
                name: format!("{team}-{slot}"),
            });
            engine.submit(Command::SelectTeam {
                participant,
                team: team.id(),
            });
            engine.submit(Command::SelectCharacter {
                participant,
                character: character.to_string(),
            });
            engine.submit(Command::Ready { participant });
        }
    }
}

/// Queue this step's scripted inputs. Returns the number of casts issued.
///
/// Everyone walks to the enemy flag (or home with it), shoots the nearest
/// enemy in range, reloads when empty and wizards lob fields at clusters.
fn script_step(engine: &mut ArenaEngine, dt: f32) -> usize {
    let views = engine.combatant_views();
    let config = engine.config().clone();
    let mut casts = 0;

    for me in views.iter().filter(|v| v.alive) {
        let speed = config.character(me.character).map_or(0.0, |c| c.speed);
        let goal = if me.carrying.is_some() {
            config.team_bases.base(me.team)
        } else {
            engine
                .tokens()
                .flag_of(me.team.opponent())
                .map_or(config.team_bases.centre(), |flag| flag.position)
        };
        let step = (goal - me.position).clamp_length_max(speed * dt);
        engine.submit(Command::Move {
            combatant: me.id,
            position: me.position + step,
        });

        let Some(enemy) = nearest_enemy(me, &views) else {
            continue;
        };
        let to_enemy = enemy.position - me.position;
        let ready_kinds: Vec<AbilityKind> = engine
            .cooldown_views(me.id)
            .into_iter()
            .filter(|cd| cd.ready)
            .map(|cd| cd.kind)
            .collect();
        let ready = |kind: AbilityKind| ready_kinds.contains(&kind);

        if me.ammo == 0 {
            if !me.reloading {
                engine.submit(Command::Reload { caster: me.id });
            }
        } else if to_enemy.length() < 20.0 && ready(AbilityKind::Shot) {
            engine.submit(Command::Cast {
                caster: me.id,
                kind: AbilityKind::Shot,
                aim: AimParams::toward(to_enemy),
            });
            casts += 1;
        }

        if me.character == Character::Wizard && to_enemy.length() < 12.0 && ready(AbilityKind::AoeField) {
            engine.submit(Command::Cast {
                caster: me.id,
                kind: AbilityKind::AoeField,
                aim: AimParams::at(enemy.position),
            });
            casts += 1;
        }
        if me.character == Character::Knight && to_enemy.length() < 1.5 && ready(AbilityKind::Melee) {
            engine.submit(Command::Cast {
                caster: me.id,
                kind: AbilityKind::Melee,
                aim: AimParams::toward(to_enemy),
            });
            casts += 1;
        }
    }

    // held casts from the previous step get confirmed as placed
    let aiming: Vec<_> = engine
        .ability_views()
        .into_iter()
        .filter(|a| a.state == AbilityState::Aiming)
        .map(|a| a.id)
        .collect();
    for ability in aiming {
        engine.submit(Command::Confirm { ability });
    }
    casts
}

fn nearest_enemy<'a>(me: &CombatantView, views: &'a [CombatantView]) -> Option<&'a CombatantView> {
    views
        .iter()
        .filter(|v| v.alive && v.team != me.team)
        .min_by(|a, b| {
            a.position
                .distance_squared(me.position)
                .total_cmp(&b.position.distance_squared(me.position))
                .then(a.id.cmp(&b.id))
        })
}
