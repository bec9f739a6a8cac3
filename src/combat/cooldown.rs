//! Countdown timer gating a repeatable action.
//!
//! One contract for ability cooldowns, respawn delays and periodic
//! match timers; only the durations differ.

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, ArenaResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownGate {
    remaining: f32,
    duration: f32,
}

impl CooldownGate {
    /// A gate that is ready immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the remaining time to `duration`. Rejects non-positive or
    /// non-finite durations without touching the current countdown.
    pub fn start(&mut self, duration: f32) -> ArenaResult<()> {
        if !(duration > 0.0) || !duration.is_finite() {
            return Err(ArenaError::InvalidDuration(duration));
        }
        self.duration = duration;
        self.remaining = duration;
        Ok(())
    }

    /// Count down by `dt`, clamped at zero. Negative or NaN steps are ignored.
    pub fn tick(&mut self, dt: f32) {
        if !(dt > 0.0) || self.remaining <= 0.0 {
            return;
        }
        self.remaining = (self.remaining - dt).max(0.0);
    }

    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Fraction elapsed of the current countdown: 0.0 just started, 1.0 ready
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        1.0 - (self.remaining / self.duration).clamp(0.0, 1.0)
    }
}
