//! Match phases, the match clock and periodic match timers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::CLOCK_EPSILON;
use crate::error::{ArenaError, ArenaResult};
use crate::types::Team;

/// Scene-level phase, driven by the engine and reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchPhase {
    #[default]
    PreMatch,
    InMatch,
    PostMatch,
}

impl MatchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPhase::PreMatch => "pre_match",
            MatchPhase::InMatch => "in_match",
            MatchPhase::PostMatch => "post_match",
        }
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    TimeExpired,
    FlagCaptured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// `None` when time ran out
    pub winner: Option<Team>,
    pub reason: EndReason,
}

/// Elapsed-time accumulator that fires match end exactly once.
///
/// Time is accumulated in f64 so many small fixed steps still land on the
/// duration instead of drifting past it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchClock {
    elapsed: f64,
    max_duration: f64,
    ended: bool,
}

impl MatchClock {
    pub fn new(max_duration: f32) -> ArenaResult<Self> {
        if !(max_duration > 0.0) || !max_duration.is_finite() {
            return Err(ArenaError::InvalidDuration(max_duration));
        }
        Ok(Self {
            elapsed: 0.0,
            max_duration: max_duration as f64,
            ended: false,
        })
    }

    /// Advance by `dt`. Returns true on the single tick that ends the match.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.ended || !(dt > 0.0) {
            return false;
        }
        self.elapsed = (self.elapsed + dt as f64).min(self.max_duration);
        if self.elapsed + CLOCK_EPSILON >= self.max_duration {
            self.elapsed = self.max_duration;
            self.ended = true;
            return true;
        }
        false
    }

    /// Stop the clock without firing (match decided some other way)
    pub fn halt(&mut self) {
        self.ended = true;
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    pub fn remaining(&self) -> f32 {
        (self.max_duration - self.elapsed).max(0.0) as f32
    }
}

/// Fires once per `interval` of accumulated time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicTrigger {
    interval: f64,
    accumulated: f64,
}

impl PeriodicTrigger {
    pub fn new(interval: f32) -> ArenaResult<Self> {
        if !(interval > 0.0) || !interval.is_finite() {
            return Err(ArenaError::InvalidDuration(interval));
        }
        Ok(Self {
            interval: interval as f64,
            accumulated: 0.0,
        })
    }

    /// Number of times the trigger fired during this step
    pub fn tick(&mut self, dt: f32) -> u32 {
        if !(dt > 0.0) {
            return 0;
        }
        self.accumulated += dt as f64;
        let due = ((self.accumulated + CLOCK_EPSILON) / self.interval).floor();
        if due < 1.0 {
            return 0;
        }
        self.accumulated = (self.accumulated - due * self.interval).clamp(0.0, self.interval);
        if self.accumulated + CLOCK_EPSILON >= self.interval {
            self.accumulated = 0.0;
        }
        due.min(u32::MAX as f64) as u32
    }
}
