use bevy::prelude::*;
use std::sync::{Arc, RwLock};
use tracing::{error, warn};

use crate::engine::arena::ArenaEngine;
use crate::engine::config::MatchConfig;
use crate::error::ConfigError;
use crate::events::SimEvent;

/// Hosts an `ArenaEngine` in a Bevy app: one engine step per `FixedUpdate`
/// at the configured tick rate, simulation events re-sent as `ArenaEvent`.
pub struct ArenaPlugin {
    config: MatchConfig,
}

impl ArenaPlugin {
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Plugin for ArenaPlugin {
    fn build(&self, app: &mut App) {
        let engine = match ArenaEngine::new(self.config.clone()) {
            Ok(engine) => engine,
            Err(e) => {
                error!(target: "arena_core::engine", error = %e, "arena plugin not installed");
                return;
            }
        };

        app.insert_resource(ArenaSim(Arc::new(RwLock::new(engine))))
            .insert_resource(Time::<Fixed>::from_hz(f64::from(self.config.tick_rate)))
            .add_event::<ArenaEvent>()
            .add_systems(FixedUpdate, arena_tick_system);
    }
}

#[derive(Resource)]
pub struct ArenaSim(pub Arc<RwLock<ArenaEngine>>);

#[derive(Event, Debug, Clone)]
pub struct ArenaEvent(pub SimEvent);

fn arena_tick_system(
    time: Res<Time<Fixed>>,
    sim: Res<ArenaSim>,
    mut events: EventWriter<ArenaEvent>,
) {
    let Ok(mut engine) = sim.0.write() else {
        warn!(target: "arena_core::engine", "engine lock poisoned, step skipped");
        return;
    };
    engine.tick(time.timestep().as_secs_f32());
    for event in engine.drain_events() {
        events.send(ArenaEvent(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::commands::Command;
    use crate::events::SimEventKind;
    use crate::gameflow::MatchPhase;
    use crate::logging::LoggingPlugin;
    use crate::types::ParticipantId;

    fn app_with_plugin() -> App {
        let mut app = App::new();
        app.add_plugins((
            LoggingPlugin,
            ArenaPlugin::new(MatchConfig::default()).unwrap(),
        ));
        app
    }

    #[test]
    fn test_plugin_rejects_bad_config() {
        let mut config = MatchConfig::default();
        config.tick_rate = 0;
        assert!(ArenaPlugin::new(config).is_err());
    }

    #[test]
    fn test_fixed_step_ticks_engine() {
        let mut app = app_with_plugin();
        for _ in 0..6 {
            app.world_mut().run_schedule(FixedUpdate);
        }
        let sim = app.world().resource::<ArenaSim>();
        assert_eq!(sim.0.read().unwrap().tick_count(), 6);
    }

    #[test]
    fn test_plugin_forwards_events() {
        let mut app = app_with_plugin();
        {
            let sim = app.world().resource::<ArenaSim>();
            let mut engine = sim.0.write().unwrap();
            let pid = ParticipantId(1);
            engine.submit(Command::Connect {
                participant: pid,
                name: "solo".into(),
            });
            engine.submit(Command::SelectTeam {
                participant: pid,
                team: 1,
            });
            engine.submit(Command::SelectCharacter {
                participant: pid,
                character: "Knight".into(),
            });
            engine.submit(Command::Ready { participant: pid });
            engine.submit(Command::StartMatch);
        }
        app.world_mut().run_schedule(FixedUpdate);

        let events = app.world().resource::<Events<ArenaEvent>>();
        let started = events
            .iter_current_update_events()
            .filter(|e| {
                matches!(
                    e.0.kind,
                    SimEventKind::PhaseChanged {
                        to: MatchPhase::InMatch,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(started, 1);
    }
}
