//! Command intake and the replayable command log.
//!
//! Hosts submit `Command`s; the engine drains them at the start of the next
//! step in submission order. Every drained command is recorded with the step
//! it ran on, so a log fed into a fresh engine rebuilds the same state.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use super::arena::ArenaEngine;
use crate::abilities::{AbilityKind, AimParams};
use crate::types::{AbilityId, Character, CombatantId, ParticipantId, Team};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Connect {
        participant: ParticipantId,
        name: String,
    },
    Disconnect {
        participant: ParticipantId,
    },
    SelectTeam {
        participant: ParticipantId,
        team: u8,
    },
    SelectCharacter {
        participant: ParticipantId,
        character: String,
    },
    Ready {
        participant: ParticipantId,
    },
    Unready {
        participant: ParticipantId,
    },
    StartMatch,
    SpawnBot {
        team: Team,
        character: Character,
    },
    Move {
        combatant: CombatantId,
        position: Vec2,
    },
    Cast {
        caster: CombatantId,
        kind: AbilityKind,
        aim: AimParams,
    },
    Aim {
        ability: AbilityId,
        aim: AimParams,
    },
    Confirm {
        ability: AbilityId,
    },
    Cancel {
        ability: AbilityId,
    },
    Reload {
        caster: CombatantId,
    },
    DropFlag {
        combatant: CombatantId,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Connect { .. } => "connect",
            Command::Disconnect { .. } => "disconnect",
            Command::SelectTeam { .. } => "select_team",
            Command::SelectCharacter { .. } => "select_character",
            Command::Ready { .. } => "ready",
            Command::Unready { .. } => "unready",
            Command::StartMatch => "start_match",
            Command::SpawnBot { .. } => "spawn_bot",
            Command::Move { .. } => "move",
            Command::Cast { .. } => "cast",
            Command::Aim { .. } => "aim",
            Command::Confirm { .. } => "confirm",
            Command::Cancel { .. } => "cancel",
            Command::Reload { .. } => "reload",
            Command::DropFlag { .. } => "drop_flag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedCommand {
    /// Step the command was applied on
    pub tick: u64,
    pub command: Command,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandLog {
    entries: Vec<LoggedCommand>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tick: u64, command: Command) {
        self.entries.push(LoggedCommand { tick, command });
    }

    pub fn entries(&self) -> &[LoggedCommand] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Integrity hash over the serialized entries
    pub fn hash(&self) -> u64 {
        let mut hasher = Sha3_256::new();
        for entry in &self.entries {
            hasher.update(entry.tick.to_le_bytes());
            hasher.update(serde_json::to_vec(&entry.command).unwrap_or_default());
        }
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[0..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    /// Feed the log into `engine`, stepping it `ticks` times with `dt`.
    /// Commands are submitted right before the step they were recorded on.
    pub fn replay_into(&self, engine: &mut ArenaEngine, ticks: u64, dt: f32) {
        let mut pending = self.entries.iter().peekable();
        for _ in 0..ticks {
            let step = engine.tick_count();
            while let Some(entry) = pending.next_if(|e| e.tick <= step) {
                engine.submit(entry.command.clone());
            }
            engine.tick(dt);
        }
    }
}
