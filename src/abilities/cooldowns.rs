//! Per-(caster, kind) cooldown gates.

use std::collections::BTreeMap;

use super::AbilityKind;
use crate::combat::CooldownGate;
use crate::error::ArenaResult;
use crate::types::CombatantId;

#[derive(Debug, Clone, Default)]
pub struct CooldownBook {
    gates: BTreeMap<(CombatantId, AbilityKind), CooldownGate>,
}

impl CooldownBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Casters never seen before are ready
    pub fn is_ready(&self, caster: CombatantId, kind: AbilityKind) -> bool {
        self.gates
            .get(&(caster, kind))
            .map_or(true, CooldownGate::is_ready)
    }

    pub fn remaining(&self, caster: CombatantId, kind: AbilityKind) -> f32 {
        self.gates
            .get(&(caster, kind))
            .map_or(0.0, CooldownGate::remaining)
    }

    /// 1.0 when the gate is ready or was never started
    pub fn progress(&self, caster: CombatantId, kind: AbilityKind) -> f32 {
        self.gates
            .get(&(caster, kind))
            .map_or(1.0, CooldownGate::progress)
    }

    pub fn start(&mut self, caster: CombatantId, kind: AbilityKind, duration: f32) -> ArenaResult<()> {
        self.gates.entry((caster, kind)).or_default().start(duration)
    }

    pub fn tick_all(&mut self, dt: f32) {
        for gate in self.gates.values_mut() {
            gate.tick(dt);
        }
    }

    pub fn forget_caster(&mut self, caster: CombatantId) {
        self.gates.retain(|(id, _), _| *id != caster);
    }
}
