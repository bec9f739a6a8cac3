//! Error types for command validation and config loading.
//!
//! Validation failures never leave partial state behind: every command
//! checks its inputs before touching the simulation.

use std::path::PathBuf;

use crate::types::{AbilityId, CombatantId, ParticipantId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArenaError {
    #[error("Invalid duration: {0} (must be > 0)")]
    InvalidDuration(f32),

    #[error("Invalid team: {0} (expected 1 or 2)")]
    InvalidTeam(u8),

    #[error("Invalid character: {0:?}")]
    InvalidCharacter(String),

    #[error("Participant {0} has not selected both team and character")]
    IncompleteSelection(ParticipantId),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    #[error("Unknown combatant: {0}")]
    UnknownCombatant(CombatantId),

    #[error("Unknown ability instance: {0}")]
    UnknownAbility(AbilityId),

    #[error("Ability {kind} is not in the loadout of combatant {caster}")]
    AbilityUnavailable { caster: CombatantId, kind: String },

    #[error("Team {team} is full ({capacity} slots)")]
    TeamFull { team: u8, capacity: usize },

    #[error("Not every connected participant is ready")]
    NotAllReady,

    #[error("Command not valid in phase {0}")]
    WrongPhase(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ArenaResult<T> = Result<T, ArenaError>;
