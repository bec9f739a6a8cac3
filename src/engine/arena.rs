//! The authoritative arena simulation.
//!
//! One `ArenaEngine` owns the lobby, the combatant roster, every ability
//! instance, objective tokens and the match clock. Hosts feed it commands
//! and call `tick(dt)` at a fixed rate; observers only read views.
//!
//! Per-step order:
//! 1. queued commands
//! 2. cooldowns and reloads
//! 3. ability travel/movement
//! 4. hit resolution
//! 5. objectives (pickups, flags, capture)
//! 6. respawns, points top-up, scheduled pickups
//! 7. match clock

use bevy::math::Vec2;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

use super::commands::{Command, CommandLog};
use super::config::MatchConfig;
use super::messages::{AbilityView, CombatantView, CooldownView, MatchView, TokenView};
use crate::abilities::{
    formation_complete, AbilityInstance, AbilityKind, AbilityState, AimParams, CastOutcome,
    CastRejection, CooldownBook, Placement,
};
use crate::combat::{find_targets, Combatant, CooldownGate, DamageOutcome, HitQuery};
use crate::error::{ArenaError, ArenaResult, ConfigError};
use crate::events::{EventQueue, SimEvent, SimEventKind};
use crate::gameflow::{EndReason, MatchClock, MatchOutcome, MatchPhase, PeriodicTrigger};
use crate::lobby::{Lobby, SelectionOutcome};
use crate::objectives::{PickupSchedule, TokenBoard, TokenKind};
use crate::types::{AbilityId, Character, CombatantId, ParticipantId, Team};

/// Bot ids start here so they never collide with transport-assigned ids
const BOT_ID_BASE: u64 = 1 << 32;

pub struct ArenaEngine {
    config: MatchConfig,
    phase: MatchPhase,
    tick: u64,
    lobby: Lobby,
    combatants: BTreeMap<CombatantId, Combatant>,
    abilities: BTreeMap<AbilityId, AbilityInstance>,
    cooldowns: CooldownBook,
    reloads: BTreeMap<CombatantId, CooldownGate>,
    tokens: TokenBoard,
    clock: MatchClock,
    topup: PeriodicTrigger,
    pickup_schedule: Option<PickupSchedule>,
    outcome: Option<MatchOutcome>,
    events: EventQueue,
    queue: VecDeque<Command>,
    log: CommandLog,
    next_ability: u64,
    next_bot: u64,
}

impl ArenaEngine {
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock = MatchClock::new(config.match_duration_secs)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let topup = PeriodicTrigger::new(config.points_topup_interval_secs)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let pickup_schedule = config
            .pickup_schedule
            .clone()
            .and_then(|schedule| PickupSchedule::new(schedule, config.seed));
        info!(
            target: "arena_core::engine",
            duration = config.match_duration_secs,
            seed = config.seed,
            "arena engine created"
        );
        Ok(Self {
            lobby: Lobby::new(config.team_capacity),
            config,
            phase: MatchPhase::PreMatch,
            tick: 0,
            combatants: BTreeMap::new(),
            abilities: BTreeMap::new(),
            cooldowns: CooldownBook::new(),
            reloads: BTreeMap::new(),
            tokens: TokenBoard::new(),
            clock,
            topup,
            pickup_schedule,
            outcome: None,
            events: EventQueue::default(),
            queue: VecDeque::new(),
            log: CommandLog::new(),
            next_ability: 1,
            next_bot: BOT_ID_BASE,
        })
    }

    // =====================================================
    // Step
    // =====================================================

    /// Run one simulation step.
    pub fn tick(&mut self, dt: f32) {
        if !(dt > 0.0) || !dt.is_finite() {
            warn!(target: "arena_core::engine", dt, "ignoring invalid step");
            return;
        }
        self.apply_queued();

        if self.phase == MatchPhase::InMatch {
            // match timers never run past the end of the match
            let match_dt = dt.min(self.clock.remaining());
            self.advance_cooldowns(dt);
            self.advance_abilities(dt);
            self.resolve_hits();
            self.update_objectives();
            self.advance_respawns(dt);
            self.advance_points(match_dt);
            self.advance_pickup_schedule(match_dt);
            self.advance_match_clock(dt);
        }
        self.tick += 1;
    }

    pub fn advance_cooldowns(&mut self, dt: f32) {
        self.cooldowns.tick_all(dt);

        let mut finished = Vec::new();
        for (id, gate) in self.reloads.iter_mut() {
            gate.tick(dt);
            if gate.is_ready() {
                finished.push(*id);
            }
        }
        for id in finished {
            self.reloads.remove(&id);
            if let Some(combatant) = self.combatants.get_mut(&id) {
                combatant.ammo = combatant.max_ammo;
                debug!(target: "arena_core::engine", combatant = %id, "reload finished");
                self.events.push(self.tick, SimEventKind::Reloaded { combatant: id });
            }
        }
    }

    pub fn advance_abilities(&mut self, dt: f32) {
        let ids: Vec<AbilityId> = self.abilities.keys().copied().collect();
        for id in ids {
            let homing = match self.abilities.get(&id) {
                Some(ability) if ability.kind == AbilityKind::Summon => {
                    self.nearest_enemy(ability.position(), ability.owner_team)
                }
                _ => None,
            };
            let caster_position = self
                .abilities
                .get(&id)
                .and_then(|a| self.combatants.get(&a.caster))
                .filter(|c| c.is_alive())
                .map(|c| c.position);

            let Some(ability) = self.abilities.get_mut(&id) else {
                continue;
            };
            if let Some(position) = caster_position {
                ability.follow_caster(position);
            }
            let before = ability.state();
            ability.advance(dt, homing);
            let after = ability.state();
            if before != after {
                push_transition(&mut self.events, self.tick, ability, before);
            }
        }
        self.abilities
            .retain(|_, ability| ability.state() != AbilityState::Despawned);
    }

    /// Apply hits for every active ability. Damage is applied one target at
    /// a time so each death transition happens exactly once.
    pub fn resolve_hits(&mut self) {
        let ids: Vec<AbilityId> = self.abilities.keys().copied().collect();
        for id in ids {
            let Some(ability) = self.abilities.get_mut(&id) else {
                continue;
            };
            let Some(shape) = ability.hit_shape() else {
                continue;
            };
            let query = HitQuery {
                shape: &shape,
                owner_team: ability.owner_team,
                pad: self.config.hit_padding,
                max_hits: ability.spec().max_hits,
            };
            let targets = find_targets(query, ability.hit_set(), self.combatants.values());

            let mut deaths = Vec::new();
            for target in targets {
                if !ability.record_hit(target) {
                    continue;
                }
                let Some(victim) = self.combatants.get_mut(&target) else {
                    continue;
                };
                let outcome = victim.apply_damage(ability.damage, ability.owner_team);
                debug!(
                    target: "arena_core::combat",
                    ability = %id,
                    target = %target,
                    dealt = outcome.dealt(),
                    "hit"
                );
                self.events.push(self.tick, SimEventKind::Hit { ability: id, target });
                if outcome != DamageOutcome::Ignored {
                    self.events.push(
                        self.tick,
                        SimEventKind::Damaged {
                            target,
                            source: Some(id),
                            amount: outcome.dealt(),
                            remaining: victim.health().current(),
                        },
                    );
                }
                if outcome.is_kill() {
                    deaths.push((target, ability.owner_team));
                }
            }

            if ability.kind.shape().is_some() {
                let allies: Vec<Vec2> = self
                    .combatants
                    .values()
                    .filter(|c| c.is_alive() && c.team() == ability.owner_team)
                    .map(|c| c.position)
                    .collect();
                if formation_complete(&ability.corners(), &allies, ability.spec().corner_radius)
                    && ability.mark_formation()
                {
                    info!(target: "arena_core::abilities", ability = %id, team = %ability.owner_team, "formation completed");
                    self.events.push(
                        self.tick,
                        SimEventKind::FormationCompleted {
                            ability: id,
                            team: ability.owner_team,
                        },
                    );
                }
            }

            let before = ability.state();
            if ability.finish_if_spent() {
                push_transition(&mut self.events, self.tick, ability, before);
            }

            for (victim, killer_team) in deaths {
                self.on_death(victim, Some(killer_team));
            }
        }
    }

    fn update_objectives(&mut self) {
        for combatant in self.combatants.values() {
            if let Some(token) = combatant.carrying {
                self.tokens.follow_carrier(token, combatant.position);
            }
        }

        let ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        for id in ids {
            let Some(combatant) = self.combatants.get(&id) else {
                continue;
            };
            if !combatant.is_alive() {
                continue;
            }
            let reach = self
                .tokens
                .in_reach(combatant.position, self.config.pickup_radius);
            for token_id in reach {
                let Some(kind) = self.tokens.get(token_id).map(|t| t.kind) else {
                    continue;
                };
                match kind {
                    TokenKind::HealthPickup { amount } => {
                        self.tokens.consume(token_id);
                        let healed = self
                            .combatants
                            .get_mut(&id)
                            .map_or(0.0, |c| c.heal(amount as f32));
                        self.events.push(
                            self.tick,
                            SimEventKind::PickupConsumed { token: token_id, kind, by: id },
                        );
                        if healed > 0.0 {
                            self.events.push(
                                self.tick,
                                SimEventKind::Healed { combatant: id, amount: healed },
                            );
                        }
                    }
                    TokenKind::PointsPickup { amount } => {
                        self.tokens.consume(token_id);
                        if let Some(c) = self.combatants.get_mut(&id) {
                            c.points += amount;
                        }
                        self.events.push(
                            self.tick,
                            SimEventKind::PickupConsumed { token: token_id, kind, by: id },
                        );
                    }
                    TokenKind::Flag { team } => {
                        let Some(c) = self.combatants.get_mut(&id) else {
                            continue;
                        };
                        if team == c.team() {
                            let home = self
                                .config
                                .team_bases
                                .flag_home(team, self.config.flag_base_offset);
                            if self.tokens.return_to(token_id, home) {
                                info!(target: "arena_core::engine", combatant = %id, flag = %team, "flag returned");
                                self.events.push(
                                    self.tick,
                                    SimEventKind::FlagReturned { flag_team: team, by: id },
                                );
                            }
                            continue;
                        }
                        if c.carrying.is_some() || !self.tokens.pick_up(token_id, id) {
                            continue;
                        }
                        c.carrying = Some(token_id);
                        info!(target: "arena_core::engine", combatant = %id, flag = %team, "flag taken");
                        self.events
                            .push(self.tick, SimEventKind::FlagTaken { flag_team: team, by: id });
                    }
                }
            }
        }

        if let Some(winner) = self
            .tokens
            .captured_by(&self.config.team_bases, self.config.flag_capture_distance)
        {
            self.end_match(MatchOutcome {
                winner: Some(winner),
                reason: EndReason::FlagCaptured,
            });
        }
    }

    fn advance_respawns(&mut self, dt: f32) {
        let auto = self.config.auto_respawn;
        let ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        for id in ids {
            if let Some(combatant) = self.combatants.get_mut(&id) {
                combatant.tick_respawn(dt);
            }
            if auto && self.phase == MatchPhase::InMatch {
                self.respawn_if_ready(id);
            }
        }
    }

    fn advance_points(&mut self, dt: f32) {
        let fired = self.topup.tick(dt);
        let amount = self.config.points_topup_amount;
        for _ in 0..fired {
            for combatant in self.combatants.values_mut() {
                combatant.points = combatant.points.saturating_add(amount);
                self.events.push(
                    self.tick,
                    SimEventKind::PointsGained {
                        combatant: combatant.id,
                        amount,
                        total: combatant.points,
                    },
                );
            }
        }
    }

    fn advance_pickup_schedule(&mut self, dt: f32) {
        let Some(schedule) = self.pickup_schedule.as_mut() else {
            return;
        };
        for (kind, at) in schedule.tick(dt) {
            let token = self.tokens.spawn(kind, at);
            self.events
                .push(self.tick, SimEventKind::TokenSpawned { token, kind, at });
        }
    }

    /// Returns true on the step the clock ends the match.
    pub fn advance_match_clock(&mut self, dt: f32) -> bool {
        if self.phase != MatchPhase::InMatch {
            return false;
        }
        if self.clock.tick(dt) {
            self.end_match(MatchOutcome {
                winner: None,
                reason: EndReason::TimeExpired,
            });
            return true;
        }
        false
    }

    fn end_match(&mut self, outcome: MatchOutcome) {
        if self.phase != MatchPhase::InMatch {
            return;
        }
        self.clock.halt();
        self.outcome = Some(outcome);
        info!(
            target: "arena_core::engine",
            winner = ?outcome.winner,
            reason = ?outcome.reason,
            tick = self.tick,
            "match ended"
        );
        self.events.push(self.tick, SimEventKind::MatchEnded(outcome));
        self.set_phase(MatchPhase::PostMatch);
    }

    fn set_phase(&mut self, to: MatchPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        info!(target: "arena_core::engine", %from, %to, "phase changed");
        self.events.push(self.tick, SimEventKind::PhaseChanged { from, to });
    }

    fn on_death(&mut self, id: CombatantId, killer_team: Option<Team>) {
        self.events.push(
            self.tick,
            SimEventKind::Died {
                combatant: id,
                killer_team,
            },
        );
        self.reloads.remove(&id);
        self.drop_carried(id);
    }

    fn drop_carried(&mut self, id: CombatantId) -> bool {
        let Some(combatant) = self.combatants.get_mut(&id) else {
            return false;
        };
        let Some(token) = combatant.carrying.take() else {
            return false;
        };
        let at = combatant.position;
        if !self.tokens.drop_at(token, at) {
            return false;
        }
        if let Some(flag_team) = self.tokens.get(token).and_then(|t| t.flag_team()) {
            info!(target: "arena_core::engine", combatant = %id, flag = %flag_team, "flag dropped");
            self.events.push(
                self.tick,
                SimEventKind::FlagDropped {
                    flag_team,
                    by: id,
                    at,
                },
            );
        }
        true
    }

    fn nearest_enemy(&self, from: Vec2, team: Team) -> Option<Vec2> {
        self.combatants
            .values()
            .filter(|c| c.is_alive() && c.team() != team)
            .map(|c| (c.position.distance_squared(from), c.id, c.position))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, _, position)| position)
    }

    /// Start a new life for `id` if its respawn timer has elapsed.
    pub fn respawn_if_ready(&mut self, id: CombatantId) -> bool {
        let Some(combatant) = self.combatants.get_mut(&id) else {
            return false;
        };
        if !combatant.is_respawn_ready() {
            return false;
        }
        let at = self.config.team_bases.base(combatant.team());
        combatant.respawn(at);
        let life = combatant.life();
        self.events.push(
            self.tick,
            SimEventKind::Respawned {
                combatant: id,
                life,
                at,
            },
        );
        true
    }

    // =====================================================
    // Commands
    // =====================================================

    /// Queue a command for the start of the next step
    pub fn submit(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    fn apply_queued(&mut self) {
        while let Some(command) = self.queue.pop_front() {
            let name = command.name();
            if let Err(e) = self.apply_command(command) {
                debug!(target: "arena_core::engine", command = name, error = %e, "command rejected");
            }
        }
    }

    /// Apply one command now and record it in the command log.
    pub fn apply_command(&mut self, command: Command) -> ArenaResult<()> {
        self.log.record(self.tick, command.clone());
        match command {
            Command::Connect { participant, name } => {
                self.connect_participant(participant, name).map(|_| ())
            }
            Command::Disconnect { participant } => {
                self.disconnect_participant(participant);
                Ok(())
            }
            Command::SelectTeam { participant, team } => {
                self.request_team_select(participant, team).map(|_| ())
            }
            Command::SelectCharacter {
                participant,
                character,
            } => self
                .request_character_select(participant, &character)
                .map(|_| ()),
            Command::Ready { participant } => self.request_ready(participant).map(|_| ()),
            Command::Unready { participant } => self.request_unready(participant).map(|_| ()),
            Command::StartMatch => self.start_match(),
            Command::SpawnBot { team, character } => self.spawn_bot(team, character).map(|_| ()),
            Command::Move {
                combatant,
                position,
            } => self.update_position(combatant, position),
            Command::Cast { caster, kind, aim } => self.request_cast(caster, kind, aim).map(|_| ()),
            Command::Aim { ability, aim } => self.request_aim(ability, aim).map(|_| ()),
            Command::Confirm { ability } => self.request_confirm(ability).map(|_| ()),
            Command::Cancel { ability } => self.request_cancel(ability).map(|_| ()),
            Command::Reload { caster } => self.request_reload(caster).map(|_| ()),
            Command::DropFlag { combatant } => self.request_drop(combatant).map(|_| ()),
        }
    }

    pub fn connect_participant(
        &mut self,
        id: ParticipantId,
        name: impl Into<String>,
    ) -> ArenaResult<SelectionOutcome> {
        self.require_phase(MatchPhase::PreMatch)?;
        Ok(if self.lobby.connect(id, name) {
            SelectionOutcome::Applied
        } else {
            SelectionOutcome::Ignored
        })
    }

    /// Participant left. In the match this removes their combatant, drops
    /// any carried flag and discards their pending placements.
    pub fn disconnect_participant(&mut self, id: ParticipantId) {
        self.lobby.remove(id);
        let combatant = self
            .combatants
            .values()
            .find(|c| c.participant == Some(id))
            .map(|c| c.id);
        if let Some(combatant) = combatant {
            self.remove_combatant(combatant);
        }
    }

    /// Drop a live instance that never left Aiming
    fn discard_ability(&mut self, id: AbilityId) {
        if let Some(mut ability) = self.abilities.remove(&id) {
            let before = ability.state();
            ability.discard();
            push_transition(&mut self.events, self.tick, &ability, before);
        }
    }

    fn remove_combatant(&mut self, id: CombatantId) {
        self.drop_carried(id);
        for ability in self.abilities.values_mut() {
            if ability.caster == id && ability.state() == AbilityState::Aiming {
                let before = ability.state();
                ability.discard();
                push_transition(&mut self.events, self.tick, ability, before);
            }
        }
        self.abilities
            .retain(|_, ability| ability.state() != AbilityState::Despawned);
        self.cooldowns.forget_caster(id);
        self.reloads.remove(&id);
        self.combatants.remove(&id);
        info!(target: "arena_core::engine", combatant = %id, "combatant removed");
    }

    pub fn request_team_select(&mut self, id: ParticipantId, team: u8) -> ArenaResult<SelectionOutcome> {
        self.require_phase(MatchPhase::PreMatch)?;
        self.lobby.select_team(id, team)
    }

    pub fn request_character_select(
        &mut self,
        id: ParticipantId,
        character: &str,
    ) -> ArenaResult<SelectionOutcome> {
        self.require_phase(MatchPhase::PreMatch)?;
        self.lobby.select_character(id, character)
    }

    pub fn request_ready(&mut self, id: ParticipantId) -> ArenaResult<SelectionOutcome> {
        self.require_phase(MatchPhase::PreMatch)?;
        self.lobby.set_ready(id)
    }

    pub fn request_unready(&mut self, id: ParticipantId) -> ArenaResult<SelectionOutcome> {
        self.require_phase(MatchPhase::PreMatch)?;
        self.lobby.set_unready(id)
    }

    /// Convert the ready lobby into combatants and start the clock.
    pub fn start_match(&mut self) -> ArenaResult<()> {
        self.require_phase(MatchPhase::PreMatch)?;
        let entries = self.lobby.match_entries()?;
        for entry in &entries {
            if self.config.character(entry.character).is_none() {
                return Err(ArenaError::InvalidCharacter(entry.character.to_string()));
            }
        }

        for entry in entries {
            let id = CombatantId::from(entry.participant);
            let mut combatant = self.build_combatant(id, entry.team, entry.character)?;
            combatant.participant = Some(entry.participant);
            self.combatants.insert(id, combatant);
        }
        self.lobby.clear();

        for team in Team::both() {
            let at = self
                .config
                .team_bases
                .flag_home(team, self.config.flag_base_offset);
            let kind = TokenKind::Flag { team };
            let token = self.tokens.spawn(kind, at);
            self.events
                .push(self.tick, SimEventKind::TokenSpawned { token, kind, at });
        }
        if self.config.initial_health_pickup > 0 {
            let kind = TokenKind::HealthPickup {
                amount: self.config.initial_health_pickup,
            };
            let at = self.config.team_bases.centre();
            let token = self.tokens.spawn(kind, at);
            self.events
                .push(self.tick, SimEventKind::TokenSpawned { token, kind, at });
        }

        info!(
            target: "arena_core::engine",
            combatants = self.combatants.len(),
            "match started"
        );
        self.set_phase(MatchPhase::InMatch);
        Ok(())
    }

    fn build_combatant(
        &self,
        id: CombatantId,
        team: Team,
        character: Character,
    ) -> ArenaResult<Combatant> {
        let spec = self
            .config
            .character(character)
            .ok_or_else(|| ArenaError::InvalidCharacter(character.to_string()))?;
        Ok(Combatant::new(
            id,
            team,
            character,
            spec,
            self.config.team_bases.base(team),
            self.config.respawn_delay_secs,
        ))
    }

    /// Add a combatant with no lobby participant behind it
    pub fn spawn_bot(&mut self, team: Team, character: Character) -> ArenaResult<CombatantId> {
        self.require_phase(MatchPhase::InMatch)?;
        while self.combatants.contains_key(&CombatantId(self.next_bot)) {
            self.next_bot += 1;
        }
        let id = CombatantId(self.next_bot);
        self.next_bot += 1;
        let combatant = self.build_combatant(id, team, character)?;
        self.combatants.insert(id, combatant);
        info!(target: "arena_core::engine", combatant = %id, %team, %character, "bot spawned");
        Ok(id)
    }

    /// Position pushed by the host's movement/physics. Dead combatants stay put.
    pub fn update_position(&mut self, id: CombatantId, position: Vec2) -> ArenaResult<()> {
        let combatant = self
            .combatants
            .get_mut(&id)
            .ok_or(ArenaError::UnknownCombatant(id))?;
        if combatant.is_alive() && position.is_finite() {
            combatant.position = position;
        }
        Ok(())
    }

    pub fn request_cast(
        &mut self,
        caster: CombatantId,
        kind: AbilityKind,
        aim: AimParams,
    ) -> ArenaResult<CastOutcome> {
        let combatant = self
            .combatants
            .get(&caster)
            .ok_or(ArenaError::UnknownCombatant(caster))?;
        let unavailable = || ArenaError::AbilityUnavailable {
            caster,
            kind: kind.to_string(),
        };
        let loadout = self
            .config
            .character(combatant.character)
            .ok_or_else(unavailable)?;
        if !loadout.abilities.contains(&kind) {
            return Err(unavailable());
        }
        let spec = self.config.ability(kind).ok_or_else(unavailable)?.clone();

        let rejection = if self.phase != MatchPhase::InMatch {
            Some(CastRejection::MatchNotRunning)
        } else if !combatant.is_alive() {
            Some(CastRejection::CasterDead)
        } else if !self.cooldowns.is_ready(caster, kind) {
            Some(CastRejection::CoolingDown {
                remaining: self.cooldowns.remaining(caster, kind),
            })
        } else if spec.uses_ammo && self.reloads.contains_key(&caster) {
            Some(CastRejection::Reloading)
        } else if spec.uses_ammo && combatant.ammo == 0 {
            Some(CastRejection::OutOfAmmo)
        } else if self
            .abilities
            .values()
            .any(|a| a.caster == caster && a.kind == kind && a.state() == AbilityState::Aiming)
        {
            Some(CastRejection::AlreadyAiming)
        } else if !self.config.cast_policy.allow_concurrent
            && self
                .abilities
                .values()
                .any(|a| a.caster == caster && a.state().is_live())
        {
            Some(CastRejection::ConcurrencyLimit)
        } else {
            None
        };
        if let Some(reason) = rejection {
            debug!(target: "arena_core::abilities", %caster, %kind, ?reason, "cast rejected");
            return Ok(CastOutcome::Rejected(reason));
        }

        let id = AbilityId(self.next_ability);
        self.next_ability += 1;
        let damage = spec.damage.unwrap_or(combatant.damage);
        let mut ability = AbilityInstance::new(
            id,
            kind,
            caster,
            combatant.team(),
            combatant.position,
            damage,
            spec,
        );
        ability.begin_aiming(aim);
        push_transition(&mut self.events, self.tick, &ability, AbilityState::Idle);
        self.abilities.insert(id, ability);

        if kind.placement() == Placement::Instant {
            if let CastOutcome::Rejected(reason) = self.request_confirm(id)? {
                debug!(target: "arena_core::abilities", ability = %id, ?reason, "instant confirm failed");
                self.discard_ability(id);
                return Ok(CastOutcome::Rejected(reason));
            }
        }
        Ok(CastOutcome::Started(id))
    }

    /// Move the placement of an aiming ability
    pub fn request_aim(&mut self, id: AbilityId, aim: AimParams) -> ArenaResult<CastOutcome> {
        let ability = self
            .abilities
            .get_mut(&id)
            .ok_or(ArenaError::UnknownAbility(id))?;
        if ability.aim(aim) {
            Ok(CastOutcome::Updated(id))
        } else {
            Ok(CastOutcome::Rejected(CastRejection::WrongState(ability.state())))
        }
    }

    /// Lock in the placement: Aiming → Travelling, cooldown starts, ammo spent.
    pub fn request_confirm(&mut self, id: AbilityId) -> ArenaResult<CastOutcome> {
        let ability = self
            .abilities
            .get(&id)
            .ok_or(ArenaError::UnknownAbility(id))?;
        if ability.state() != AbilityState::Aiming {
            return Ok(CastOutcome::Rejected(CastRejection::WrongState(ability.state())));
        }
        let (caster, kind) = (ability.caster, ability.kind);
        let uses_ammo = ability.spec().uses_ammo;
        let Some(combatant) = self.combatants.get(&caster) else {
            return Err(ArenaError::UnknownCombatant(caster));
        };
        if !combatant.is_alive() {
            return Ok(CastOutcome::Rejected(CastRejection::CasterDead));
        }
        if uses_ammo && combatant.ammo == 0 {
            return Ok(CastOutcome::Rejected(CastRejection::OutOfAmmo));
        }
        let fire_rate = self
            .config
            .character(combatant.character)
            .map_or(0.0, |spec| spec.fire_rate);
        let cooldown = ability.spec().cooldown_for(fire_rate);

        let Some(ability) = self.abilities.get_mut(&id) else {
            return Err(ArenaError::UnknownAbility(id));
        };
        ability.confirm();
        push_transition(&mut self.events, self.tick, ability, AbilityState::Aiming);

        if let Err(e) = self.cooldowns.start(caster, kind, cooldown) {
            warn!(target: "arena_core::abilities", %caster, %kind, error = %e, "no cooldown applied");
        }
        if uses_ammo {
            if let Some(c) = self.combatants.get_mut(&caster) {
                c.ammo = c.ammo.saturating_sub(1);
            }
        }
        Ok(CastOutcome::Updated(id))
    }

    /// Abandon an aiming ability. No cooldown is spent.
    pub fn request_cancel(&mut self, id: AbilityId) -> ArenaResult<CastOutcome> {
        let ability = self
            .abilities
            .get_mut(&id)
            .ok_or(ArenaError::UnknownAbility(id))?;
        if !ability.cancel() {
            return Ok(CastOutcome::Rejected(CastRejection::WrongState(ability.state())));
        }
        push_transition(&mut self.events, self.tick, ability, AbilityState::Aiming);
        self.abilities.remove(&id);
        Ok(CastOutcome::Updated(id))
    }

    pub fn request_reload(&mut self, caster: CombatantId) -> ArenaResult<SelectionOutcome> {
        let combatant = self
            .combatants
            .get(&caster)
            .ok_or(ArenaError::UnknownCombatant(caster))?;
        if self.phase != MatchPhase::InMatch
            || !combatant.is_alive()
            || combatant.ammo >= combatant.max_ammo
            || self.reloads.contains_key(&caster)
        {
            return Ok(SelectionOutcome::Ignored);
        }
        let mut gate = CooldownGate::new();
        gate.start(self.config.reload_secs)?;
        self.reloads.insert(caster, gate);
        debug!(target: "arena_core::engine", combatant = %caster, "reload started");
        Ok(SelectionOutcome::Applied)
    }

    pub fn request_drop(&mut self, combatant: CombatantId) -> ArenaResult<SelectionOutcome> {
        if !self.combatants.contains_key(&combatant) {
            return Err(ArenaError::UnknownCombatant(combatant));
        }
        Ok(if self.drop_carried(combatant) {
            SelectionOutcome::Applied
        } else {
            SelectionOutcome::Ignored
        })
    }

    fn require_phase(&self, phase: MatchPhase) -> ArenaResult<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(ArenaError::WrongPhase(self.phase.as_str()))
        }
    }

    // =====================================================
    // Queries
    // =====================================================

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Completed steps
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn all_ready(&self) -> bool {
        self.lobby.all_ready()
    }

    pub fn match_time_remaining(&self) -> f32 {
        self.clock.remaining()
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    pub fn abilities(&self) -> impl Iterator<Item = &AbilityInstance> {
        self.abilities.values()
    }

    pub fn tokens(&self) -> &TokenBoard {
        &self.tokens
    }

    pub fn combatant_view(&self, id: CombatantId) -> Option<CombatantView> {
        self.combatants
            .get(&id)
            .map(|c| CombatantView::capture(c, self.reloads.contains_key(&id)))
    }

    pub fn combatant_views(&self) -> Vec<CombatantView> {
        self.combatants
            .values()
            .map(|c| CombatantView::capture(c, self.reloads.contains_key(&c.id)))
            .collect()
    }

    pub fn ability_view(&self, id: AbilityId) -> Option<AbilityView> {
        self.abilities.get(&id).map(AbilityView::from)
    }

    pub fn ability_views(&self) -> Vec<AbilityView> {
        self.abilities.values().map(AbilityView::from).collect()
    }

    pub fn token_views(&self) -> Vec<TokenView> {
        self.tokens.iter().map(TokenView::from).collect()
    }

    pub fn match_view(&self) -> MatchView {
        MatchView {
            phase: self.phase,
            tick: self.tick,
            time_remaining: self.clock.remaining(),
            outcome: self.outcome,
            connected: self.lobby.connected_count(),
            ready: self.lobby.ready_count(),
        }
    }

    /// Cooldown state of every ability in the caster's loadout
    pub fn cooldown_views(&self, caster: CombatantId) -> Vec<CooldownView> {
        let Some(combatant) = self.combatants.get(&caster) else {
            return Vec::new();
        };
        self.config
            .character(combatant.character)
            .map(|spec| {
                spec.abilities
                    .iter()
                    .map(|kind| CooldownView {
                        kind: *kind,
                        remaining: self.cooldowns.remaining(caster, *kind),
                        progress: self.cooldowns.progress(caster, *kind),
                        ready: self.cooldowns.is_ready(caster, *kind),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Team score: total points of its combatants
    pub fn team_points(&self, team: Team) -> u32 {
        self.combatants
            .values()
            .filter(|c| c.team() == team)
            .map(|c| c.points)
            .sum()
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    pub fn command_log(&self) -> &CommandLog {
        &self.log
    }
}

fn push_transition(events: &mut EventQueue, tick: u64, ability: &AbilityInstance, from: AbilityState) {
    events.push(
        tick,
        SimEventKind::AbilityTransition {
            ability: ability.id,
            kind: ability.kind,
            caster: ability.caster,
            from,
            to: ability.state(),
        },
    );
}
