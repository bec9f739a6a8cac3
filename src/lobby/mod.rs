//! Pre-match lobby: team/character selection and the aggregate ready gate.
//!
//! A participant's selection locks when they ready up and unlocks on
//! `set_unready`. Selections sent while locked are stale input, not errors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{ArenaError, ArenaResult};
use crate::types::{Character, ParticipantId, Team};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub team: Option<Team>,
    pub character: Option<Character>,
    pub ready: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            team: None,
            character: None,
            ready: false,
        }
    }

    pub fn has_full_selection(&self) -> bool {
        self.team.is_some() && self.character.is_some()
    }
}

/// Result of a lobby command that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionOutcome {
    Applied,
    /// Dropped as stale (locked selection, repeated ready, ...)
    Ignored,
}

/// What a ready participant brings into the match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub participant: ParticipantId,
    pub display_name: String,
    pub team: Team,
    pub character: Character,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lobby {
    participants: BTreeMap<ParticipantId, Participant>,
    team_capacity: usize,
}

impl Lobby {
    pub fn new(team_capacity: usize) -> Self {
        Self {
            participants: BTreeMap::new(),
            team_capacity,
        }
    }

    /// Returns false if the participant was already connected
    pub fn connect(&mut self, id: ParticipantId, display_name: impl Into<String>) -> bool {
        if self.participants.contains_key(&id) {
            return false;
        }
        let participant = Participant::new(id, display_name);
        info!(target: "arena_core::lobby", participant = %id, name = %participant.display_name, "participant connected");
        self.participants.insert(id, participant);
        true
    }

    /// Drop a participant and their team slot. Absent ids are a no-op.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        let removed = self.participants.remove(&id);
        if removed.is_some() {
            info!(target: "arena_core::lobby", participant = %id, "participant removed");
        }
        removed
    }

    pub fn select_team(&mut self, id: ParticipantId, team: u8) -> ArenaResult<SelectionOutcome> {
        let team = Team::try_from(team)?;
        let capacity = self.team_capacity;
        let taken = self
            .participants
            .values()
            .filter(|p| p.id != id && p.team == Some(team))
            .count();
        let participant = self.get_mut(id)?;
        if participant.ready {
            debug!(target: "arena_core::lobby", participant = %id, "team selection ignored while ready");
            return Ok(SelectionOutcome::Ignored);
        }
        if participant.team == Some(team) {
            return Ok(SelectionOutcome::Applied);
        }
        if taken >= capacity {
            return Err(ArenaError::TeamFull {
                team: team.id(),
                capacity,
            });
        }
        participant.team = Some(team);
        debug!(target: "arena_core::lobby", participant = %id, %team, "team selected");
        Ok(SelectionOutcome::Applied)
    }

    /// Select by name, e.g. from a UI button label
    pub fn select_character(&mut self, id: ParticipantId, name: &str) -> ArenaResult<SelectionOutcome> {
        let character: Character = name.parse()?;
        self.select_character_kind(id, character)
    }

    pub fn select_character_kind(
        &mut self,
        id: ParticipantId,
        character: Character,
    ) -> ArenaResult<SelectionOutcome> {
        let participant = self.get_mut(id)?;
        if participant.ready {
            debug!(target: "arena_core::lobby", participant = %id, "character selection ignored while ready");
            return Ok(SelectionOutcome::Ignored);
        }
        participant.character = Some(character);
        debug!(target: "arena_core::lobby", participant = %id, %character, "character selected");
        Ok(SelectionOutcome::Applied)
    }

    pub fn set_ready(&mut self, id: ParticipantId) -> ArenaResult<SelectionOutcome> {
        let participant = self.get_mut(id)?;
        if !participant.has_full_selection() {
            return Err(ArenaError::IncompleteSelection(id));
        }
        if participant.ready {
            return Ok(SelectionOutcome::Ignored);
        }
        participant.ready = true;
        info!(
            target: "arena_core::lobby",
            participant = %id,
            ready = self.ready_count(),
            connected = self.connected_count(),
            "participant ready"
        );
        Ok(SelectionOutcome::Applied)
    }

    pub fn set_unready(&mut self, id: ParticipantId) -> ArenaResult<SelectionOutcome> {
        let participant = self.get_mut(id)?;
        if !participant.ready {
            return Ok(SelectionOutcome::Ignored);
        }
        participant.ready = false;
        debug!(target: "arena_core::lobby", participant = %id, "participant unready");
        Ok(SelectionOutcome::Applied)
    }

    /// Every connected participant is ready. An empty lobby is never ready.
    pub fn all_ready(&self) -> bool {
        !self.participants.is_empty() && self.ready_count() == self.connected_count()
    }

    pub fn ready_count(&self) -> usize {
        self.participants.values().filter(|p| p.ready).count()
    }

    pub fn connected_count(&self) -> usize {
        self.participants.len()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Participants who have picked `team`, in id order
    pub fn roster(&self, team: Team) -> Vec<ParticipantId> {
        self.participants
            .values()
            .filter(|p| p.team == Some(team))
            .map(|p| p.id)
            .collect()
    }

    /// Hand the lobby over to the match. Fails unless everyone is ready.
    pub fn match_entries(&self) -> ArenaResult<Vec<MatchEntry>> {
        if !self.all_ready() {
            return Err(ArenaError::NotAllReady);
        }
        self.participants
            .values()
            .map(|p| match (p.team, p.character) {
                (Some(team), Some(character)) => Ok(MatchEntry {
                    participant: p.id,
                    display_name: p.display_name.clone(),
                    team,
                    character,
                }),
                _ => Err(ArenaError::IncompleteSelection(p.id)),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    fn get_mut(&mut self, id: ParticipantId) -> ArenaResult<&mut Participant> {
        self.participants
            .get_mut(&id)
            .ok_or(ArenaError::UnknownParticipant(id))
    }
}
