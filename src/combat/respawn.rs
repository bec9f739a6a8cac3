//! Death-to-respawn delay, built on the cooldown gate.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cooldown::CooldownGate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespawnTimer {
    gate: CooldownGate,
    delay: f32,
    pending: bool,
}

impl RespawnTimer {
    pub fn new(delay: f32) -> Self {
        Self {
            gate: CooldownGate::new(),
            delay,
            pending: false,
        }
    }

    /// Start counting from a death. A delay the gate refuses means
    /// "respawn on the next check".
    pub fn begin(&mut self) {
        if let Err(e) = self.gate.start(self.delay) {
            warn!(target: "arena_core::combat", error = %e, "respawn delay rejected, respawning immediately");
        }
        self.pending = true;
    }

    pub fn tick(&mut self, dt: f32) {
        if self.pending {
            self.gate.tick(dt);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_respawn_ready(&self) -> bool {
        self.pending && self.gate.is_ready()
    }

    pub fn remaining(&self) -> f32 {
        if self.pending {
            self.gate.remaining()
        } else {
            0.0
        }
    }

    pub fn clear(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_until_begun() {
        let timer = RespawnTimer::new(10.0);
        assert!(!timer.is_respawn_ready());
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_ready_after_delay() {
        let mut timer = RespawnTimer::new(10.0);
        timer.begin();
        timer.tick(9.0);
        assert!(!timer.is_respawn_ready());
        assert!((timer.remaining() - 1.0).abs() < 1e-5);
        timer.tick(1.0);
        assert!(timer.is_respawn_ready());
        timer.clear();
        assert!(!timer.is_respawn_ready());
    }

    #[test]
    fn test_zero_delay_is_immediate() {
        let mut timer = RespawnTimer::new(0.0);
        timer.begin();
        assert!(timer.is_respawn_ready());
    }
}
