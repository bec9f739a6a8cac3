//! Match tuning as data.
//!
//! Every gameplay number lives in `MatchConfig`. Defaults are seeded from
//! `constants.rs`; a RON or JSON file can override any subset of fields.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::abilities::AbilityKind;
use crate::constants::*;
use crate::error::ConfigError;
use crate::types::{Character, Team};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub match_duration_secs: f32,
    pub respawn_delay_secs: f32,
    /// Respawn dead combatants at their base as soon as the timer allows
    pub auto_respawn: bool,
    pub reload_secs: f32,
    pub points_topup_amount: u32,
    pub points_topup_interval_secs: f32,
    pub flag_capture_distance: f32,
    pub flag_base_offset: f32,
    pub pickup_radius: f32,
    pub initial_health_pickup: u32,
    pub team_capacity: usize,
    pub team_bases: TeamBases,
    /// Widening applied to every hit shape (combatant body radius)
    pub hit_padding: f32,
    /// Fixed simulation rate used by the bevy host
    pub tick_rate: u32,
    pub seed: u64,
    pub cast_policy: CastPolicy,
    pub pickup_schedule: Option<PickupScheduleConfig>,
    pub characters: BTreeMap<Character, CharacterSpec>,
    pub abilities: BTreeMap<AbilityKind, AbilitySpec>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_duration_secs: MATCH_DURATION_SECS,
            respawn_delay_secs: RESPAWN_DELAY_SECS,
            auto_respawn: true,
            reload_secs: RELOAD_SECS,
            points_topup_amount: POINTS_TOPUP_AMOUNT,
            points_topup_interval_secs: POINTS_TOPUP_INTERVAL_SECS,
            flag_capture_distance: FLAG_CAPTURE_DISTANCE,
            flag_base_offset: FLAG_BASE_OFFSET,
            pickup_radius: PICKUP_RADIUS,
            initial_health_pickup: INITIAL_HEALTH_PICKUP,
            team_capacity: TEAM_CAPACITY,
            team_bases: TeamBases::default(),
            hit_padding: 0.0,
            tick_rate: 60,
            seed: 42,
            cast_policy: CastPolicy::default(),
            pickup_schedule: None,
            characters: Character::all()
                .into_iter()
                .map(|c| (c, CharacterSpec::default_for(c)))
                .collect(),
            abilities: AbilityKind::all()
                .into_iter()
                .map(|k| (k, AbilitySpec::default_for(k)))
                .collect(),
        }
    }
}

impl MatchConfig {
    /// Load and validate a config file; `.ron` and `.json` are accepted.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let config = match ext.as_deref() {
            Some("ron") => Self::from_ron_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unsupported config extension {:?} for {}",
                    other,
                    path.display()
                )))
            }
        };
        info!(target: "arena_core::engine", path = %path.display(), "match config loaded");
        Ok(config)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("match_duration_secs", self.match_duration_secs)?;
        positive("respawn_delay_secs", self.respawn_delay_secs)?;
        positive("reload_secs", self.reload_secs)?;
        positive("points_topup_interval_secs", self.points_topup_interval_secs)?;
        non_negative("flag_capture_distance", self.flag_capture_distance)?;
        non_negative("pickup_radius", self.pickup_radius)?;
        non_negative("hit_padding", self.hit_padding)?;
        if self.team_capacity == 0 {
            return Err(ConfigError::Invalid("team_capacity must be at least 1".into()));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be at least 1".into()));
        }

        for character in Character::all() {
            let spec = self.characters.get(&character).ok_or_else(|| {
                ConfigError::Invalid(format!("missing character spec for {}", character))
            })?;
            positive(&format!("{}.max_health", character), spec.max_health)?;
            for kind in &spec.abilities {
                let ability = self.abilities.get(kind).ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "{} uses {:?} but no ability spec is configured",
                        character, kind
                    ))
                })?;
                if ability.cooldown_secs.is_none() {
                    positive(&format!("{}.fire_rate", character), spec.fire_rate)?;
                }
            }
        }

        for (kind, spec) in &self.abilities {
            if let Some(cooldown) = spec.cooldown_secs {
                positive(&format!("{:?}.cooldown_secs", kind), cooldown)?;
            }
            positive(&format!("{:?}.active_secs", kind), spec.active_secs)?;
            non_negative(&format!("{:?}.windup_secs", kind), spec.windup_secs)?;
            non_negative(&format!("{:?}.radius", kind), spec.radius)?;
            if kind.is_lobbed() {
                positive(&format!("{:?}.travel_speed", kind), spec.travel_speed)?;
            }
        }

        if let Some(schedule) = &self.pickup_schedule {
            positive("pickup_schedule.interval_secs", schedule.interval_secs)?;
            if schedule.spawn_points.is_empty() {
                warn!(target: "arena_core::engine", "pickup schedule has no spawn points; no pickups will spawn");
            }
        }
        Ok(())
    }

    pub fn character(&self, character: Character) -> Option<&CharacterSpec> {
        self.characters.get(&character)
    }

    pub fn ability(&self, kind: AbilityKind) -> Option<&AbilitySpec> {
        self.abilities.get(&kind)
    }

    /// Seconds per fixed simulation step
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be > 0 (got {})", field, value)))
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be >= 0 (got {})", field, value)))
    }
}

/// Spawn point of each team. Flags are placed between base and map centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamBases {
    pub one: Vec2,
    pub two: Vec2,
}

impl Default for TeamBases {
    fn default() -> Self {
        Self {
            one: Vec2::new(-40.0, 0.0),
            two: Vec2::new(40.0, 0.0),
        }
    }
}

impl TeamBases {
    pub fn base(&self, team: Team) -> Vec2 {
        match team {
            Team::One => self.one,
            Team::Two => self.two,
        }
    }

    pub fn centre(&self) -> Vec2 {
        (self.one + self.two) * 0.5
    }

    /// Home position of `team`'s flag: `offset` units from the base towards the centre
    pub fn flag_home(&self, team: Team, offset: f32) -> Vec2 {
        let base = self.base(team);
        base + (self.centre() - base).normalize_or_zero() * offset
    }
}

/// Whether one caster may run several ability instances at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastPolicy {
    pub allow_concurrent: bool,
}

impl Default for CastPolicy {
    fn default() -> Self {
        Self {
            allow_concurrent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupScheduleConfig {
    pub interval_secs: f32,
    pub spawn_points: Vec<Vec2>,
    pub health_value: u32,
    pub points_value: u32,
    /// Chance that a scheduled spawn is a health pickup (else points)
    pub health_chance: f64,
}

impl Default for PickupScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30.0,
            spawn_points: vec![Vec2::new(0.0, 10.0), Vec2::new(0.0, -10.0)],
            health_value: INITIAL_HEALTH_PICKUP,
            points_value: 10,
            health_chance: 0.5,
        }
    }
}

/// Per-character stats and loadout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub max_health: f32,
    pub speed: f32,
    /// Weapon damage; abilities without their own damage use this
    pub damage: f32,
    pub max_ammo: u32,
    /// Shots per second
    pub fire_rate: f32,
    pub abilities: Vec<AbilityKind>,
}

impl CharacterSpec {
    pub fn default_for(character: Character) -> Self {
        match character {
            Character::Knight => Self::knight(),
            Character::Wizard => Self::wizard(),
        }
    }

    pub fn knight() -> Self {
        Self {
            max_health: 150.0,
            speed: 5.0,
            damage: 20.0,
            max_ammo: 6,
            fire_rate: 2.0,
            abilities: vec![AbilityKind::Shot, AbilityKind::Melee, AbilityKind::Square],
        }
    }

    pub fn wizard() -> Self {
        Self {
            max_health: 100.0,
            speed: 6.0,
            damage: 12.0,
            max_ammo: 10,
            fire_rate: 3.0,
            abilities: vec![
                AbilityKind::Shot,
                AbilityKind::AoeField,
                AbilityKind::Summon,
                AbilityKind::Triangle,
                AbilityKind::Pentagon,
            ],
        }
    }
}

/// Tuning for one ability kind. Fields a kind doesn't use stay at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilitySpec {
    /// `None` = derived from the caster's fire rate
    pub cooldown_secs: Option<f32>,
    /// `None` = the caster's weapon damage
    pub damage: Option<f32>,
    /// Travelling time for instant kinds (melee windup)
    pub windup_secs: f32,
    /// Travelling speed for lobbed kinds
    pub travel_speed: f32,
    /// Length of the activation window
    pub active_secs: f32,
    /// Movement speed while active (projectiles, minions)
    pub speed: f32,
    /// Max placement distance, or reach in front of the caster
    pub range: f32,
    /// Circle radius, polygon circumradius or segment half-thickness
    pub radius: f32,
    pub max_hits: Option<usize>,
    pub uses_ammo: bool,
    pub rotation_offset_deg: f32,
    /// Formation check radius around each polygon corner
    pub corner_radius: f32,
}

impl AbilitySpec {
    pub fn default_for(kind: AbilityKind) -> Self {
        match kind {
            AbilityKind::Shot => Self {
                active_secs: SHOT_LIFETIME_SECS,
                speed: SHOT_SPEED,
                radius: SHOT_HALF_THICKNESS,
                max_hits: Some(1),
                uses_ammo: true,
                ..Self::default()
            },
            AbilityKind::Melee => Self {
                cooldown_secs: Some(0.8),
                windup_secs: MELEE_WINDUP_SECS,
                active_secs: MELEE_ACTIVE_SECS,
                range: MELEE_REACH,
                radius: MELEE_RADIUS,
                ..Self::default()
            },
            AbilityKind::AoeField => Self {
                cooldown_secs: Some(8.0),
                damage: Some(25.0),
                travel_speed: AOE_TRAVEL_SPEED,
                active_secs: AOE_DURATION_SECS,
                range: AOE_RANGE,
                radius: AOE_RADIUS,
                ..Self::default()
            },
            AbilityKind::Triangle | AbilityKind::Square | AbilityKind::Pentagon => Self {
                cooldown_secs: Some(SHAPE_COOLDOWN_SECS),
                damage: Some(15.0),
                active_secs: SHAPE_ACTIVE_SECS,
                range: AOE_RANGE,
                radius: match kind {
                    AbilityKind::Triangle => TRIANGLE_RADIUS,
                    AbilityKind::Square => SQUARE_RADIUS,
                    _ => PENTAGON_RADIUS,
                },
                rotation_offset_deg: if kind == AbilityKind::Square {
                    SQUARE_ROTATION_OFFSET_DEG
                } else {
                    0.0
                },
                corner_radius: CORNER_RADIUS,
                ..Self::default()
            },
            AbilityKind::Summon => Self {
                cooldown_secs: Some(12.0),
                damage: Some(SUMMON_DAMAGE),
                active_secs: SUMMON_LIFETIME_SECS,
                speed: SUMMON_SPEED,
                radius: SUMMON_RADIUS,
                max_hits: Some(1),
                ..Self::default()
            },
        }
    }

    /// Cooldown for a caster with `fire_rate` shots per second
    pub fn cooldown_for(&self, fire_rate: f32) -> f32 {
        match self.cooldown_secs {
            Some(secs) => secs,
            None if fire_rate > 0.0 => 1.0 / fire_rate,
            None => 0.0,
        }
    }
}
