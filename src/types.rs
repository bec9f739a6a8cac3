//! Identity and enum types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ArenaError;

/// Stable identity of an in-match combatant. Survives respawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub u64);

/// Identity of a connected lobby participant (assigned by the transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

/// Identity of one ability instance (one cast).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbilityId(pub u64);

/// Identity of a pickup or flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A participant keeps their numeric identity when entering the match.
impl From<ParticipantId> for CombatantId {
    fn from(id: ParticipantId) -> Self {
        CombatantId(id.0)
    }
}

/// One of the two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    One,
    Two,
}

impl Team {
    pub fn id(&self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }

    pub fn opponent(&self) -> Team {
        match self {
            Team::One => Team::Two,
            Team::Two => Team::One,
        }
    }

    pub fn both() -> [Team; 2] {
        [Team::One, Team::Two]
    }
}

impl TryFrom<u8> for Team {
    type Error = ArenaError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Team::One),
            2 => Ok(Team::Two),
            other => Err(ArenaError::InvalidTeam(other)),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", self.id())
    }
}

/// Playable characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Character {
    Knight,
    Wizard,
}

impl Character {
    pub fn all() -> [Character; 2] {
        [Character::Knight, Character::Wizard]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Character::Knight => "Knight",
            Character::Wizard => "Wizard",
        }
    }
}

impl FromStr for Character {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "knight" => Ok(Character::Knight),
            "wizard" => Ok(Character::Wizard),
            _ => Err(ArenaError::InvalidCharacter(s.to_string())),
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
