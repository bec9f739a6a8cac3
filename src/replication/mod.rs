//! Snapshot + diff presentation sync.
//!
//! The authority captures a `Snapshot` of every view after a step. Observers
//! never run the simulation: an `ObserverMirror` keeps the latest snapshot it
//! received, diffs each new one against it and hands the resulting
//! `ViewChange`s to a `PresentationSync` sink (sprites, UI, audio).
//!
//! Two replicas agree when their `digest()`s match.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::engine::arena::ArenaEngine;
use crate::engine::messages::{AbilityView, CombatantView, MatchView, TokenView};
use crate::events::SimEvent;
use crate::types::{AbilityId, CombatantId, TokenId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub match_view: MatchView,
    pub combatants: Vec<CombatantView>,
    pub abilities: Vec<AbilityView>,
    pub tokens: Vec<TokenView>,
}

/// One presentation-relevant difference between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewChange {
    Match(MatchView),
    CombatantAdded(CombatantView),
    CombatantChanged(CombatantView),
    CombatantRemoved(CombatantId),
    AbilityAdded(AbilityView),
    AbilityChanged(AbilityView),
    AbilityRemoved(AbilityId),
    TokenAdded(TokenView),
    TokenChanged(TokenView),
    TokenRemoved(TokenId),
}

impl Snapshot {
    pub fn capture(engine: &ArenaEngine) -> Self {
        Self {
            tick: engine.tick_count(),
            match_view: engine.match_view(),
            combatants: engine.combatant_views(),
            abilities: engine.ability_views(),
            tokens: engine.token_views(),
        }
    }

    /// Changes that turn `prev` into `self`
    pub fn diff(&self, prev: &Snapshot) -> Vec<ViewChange> {
        let mut changes = Vec::new();
        if !same_match_state(&prev.match_view, &self.match_view) {
            changes.push(ViewChange::Match(self.match_view.clone()));
        }
        diff_by_id(
            &prev.combatants,
            &self.combatants,
            |v: &CombatantView| v.id,
            &mut changes,
            ViewChange::CombatantAdded,
            ViewChange::CombatantChanged,
            ViewChange::CombatantRemoved,
        );
        diff_by_id(
            &prev.abilities,
            &self.abilities,
            |v: &AbilityView| v.id,
            &mut changes,
            ViewChange::AbilityAdded,
            ViewChange::AbilityChanged,
            ViewChange::AbilityRemoved,
        );
        diff_by_id(
            &prev.tokens,
            &self.tokens,
            |v: &TokenView| v.id,
            &mut changes,
            ViewChange::TokenAdded,
            ViewChange::TokenChanged,
            ViewChange::TokenRemoved,
        );
        changes
    }

    /// Everything in the snapshot as additions (first sync of an observer)
    pub fn full(&self) -> Vec<ViewChange> {
        let mut changes = vec![ViewChange::Match(self.match_view.clone())];
        changes.extend(self.combatants.iter().cloned().map(ViewChange::CombatantAdded));
        changes.extend(self.abilities.iter().cloned().map(ViewChange::AbilityAdded));
        changes.extend(self.tokens.iter().cloned().map(ViewChange::TokenAdded));
        changes
    }

    /// SHA3-256 over the serialized snapshot, truncated to u64
    pub fn digest(&self) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(serde_json::to_vec(self).unwrap_or_default());
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
}

// The tick counter alone is not a presentation change
fn same_match_state(a: &MatchView, b: &MatchView) -> bool {
    a.phase == b.phase
        && a.time_remaining == b.time_remaining
        && a.outcome == b.outcome
        && a.connected == b.connected
        && a.ready == b.ready
}

fn diff_by_id<T, K>(
    prev: &[T],
    next: &[T],
    key: impl Fn(&T) -> K,
    out: &mut Vec<ViewChange>,
    added: impl Fn(T) -> ViewChange,
    changed: impl Fn(T) -> ViewChange,
    removed: impl Fn(K) -> ViewChange,
) where
    T: Clone + PartialEq,
    K: Ord + Copy,
{
    let before: BTreeMap<K, &T> = prev.iter().map(|v| (key(v), v)).collect();
    let after: BTreeMap<K, &T> = next.iter().map(|v| (key(v), v)).collect();

    for (id, view) in &after {
        match before.get(id) {
            None => out.push(added((*view).clone())),
            Some(old) if old != view => out.push(changed((*view).clone())),
            Some(_) => {}
        }
    }
    for id in before.keys() {
        if !after.contains_key(id) {
            out.push(removed(*id));
        }
    }
}

/// Receives derived changes on an observer. Implementations only drive
/// presentation; they have no handle to authority state.
pub trait PresentationSync {
    fn on_change(&mut self, change: &ViewChange);

    /// Transient effects (hit flashes, sounds) forwarded alongside snapshots
    fn on_events(&mut self, _events: &[SimEvent]) {}
}

/// Observer-side copy of the latest authority snapshot
pub struct ObserverMirror<S: PresentationSync> {
    latest: Option<Snapshot>,
    sink: S,
}

impl<S: PresentationSync> ObserverMirror<S> {
    pub fn new(sink: S) -> Self {
        Self { latest: None, sink }
    }

    /// Apply a received snapshot. Snapshots not newer than the current one
    /// are dropped. Returns the number of changes forwarded.
    pub fn apply(&mut self, snapshot: Snapshot) -> usize {
        let changes = match &self.latest {
            Some(current) if snapshot.tick <= current.tick => {
                debug!(
                    target: "arena_core::replication",
                    received = snapshot.tick,
                    current = current.tick,
                    "stale snapshot dropped"
                );
                return 0;
            }
            Some(current) => snapshot.diff(current),
            None => snapshot.full(),
        };
        for change in &changes {
            self.sink.on_change(change);
        }
        trace!(target: "arena_core::replication", tick = snapshot.tick, changes = changes.len(), "snapshot applied");
        self.latest = Some(snapshot);
        changes.len()
    }

    pub fn forward_events(&mut self, events: &[SimEvent]) {
        if !events.is_empty() {
            self.sink.on_events(events);
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    pub fn digest(&self) -> Option<u64> {
        self.latest.as_ref().map(Snapshot::digest)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

// =====================================================
// Tests
// =====================================================
