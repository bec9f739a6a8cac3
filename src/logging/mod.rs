//! Tracing setup for hosts of the arena core.
//!
//! The core only emits `tracing` events under `arena_core::*` targets. This
//! module gives hosts one call to install a `fmt` subscriber with sensible
//! per-target levels. `RUST_LOG`, when set, replaces the configured filter.

use bevy::prelude::*;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs `TracingConfig::default()` when added to an `App`.
pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing(&TracingConfig::default());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TracingConfig {
    /// Level for everything without an override
    pub level: LogLevel,
    pub overrides: BTreeMap<String, LogLevel>,
    pub ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new(LogLevel::Info)
            .with_target("arena_core::combat", LogLevel::Debug)
            .with_target("arena_core::abilities", LogLevel::Debug)
    }
}

impl TracingConfig {
    /// No overrides, just one level everywhere
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            overrides: BTreeMap::new(),
            ansi: true,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>, level: LogLevel) -> Self {
        self.overrides.insert(target.into(), level);
        self
    }

    /// Overrides are capped at the base level so `--log-level warn`
    /// silences the debug-heavy modules too.
    pub fn directives(&self) -> String {
        let base = LevelFilter::from(self.level);
        std::iter::once(base.to_string().to_lowercase())
            .chain(self.overrides.iter().map(|(target, level)| {
                let capped = LevelFilter::from(*level).min(base);
                format!("{target}={}", capped.to_string().to_lowercase())
            }))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from(self.level).into())
                .parse_lossy(self.directives())
        })
    }
}

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install the global subscriber once per process.
///
/// Returns false when another subscriber (bevy's `LogPlugin`, a test
/// harness) already owned the global slot on the first call.
pub fn init_tracing(config: &TracingConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(config.env_filter())
            .with_ansi(config.ansi)
            .compact()
            .try_init()
            .is_ok()
    })
}
