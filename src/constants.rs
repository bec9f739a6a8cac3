//! Centralized tuning defaults for the arena core.
//!
//! These only seed `MatchConfig::default()`. Gameplay code reads the
//! config, never these constants directly, so a match can be retuned
//! from a RON/JSON file without a rebuild.

// =====================================================
// Match flow
// =====================================================

/// Match length in seconds (8 minutes)
pub const MATCH_DURATION_SECS: f32 = 480.0;

/// Tolerance when comparing the accumulated clock against the match length
pub const CLOCK_EPSILON: f64 = 1e-6;

/// Delay between death and respawn eligibility
pub const RESPAWN_DELAY_SECS: f32 = 10.0;

/// Max participants per team in the lobby
pub const TEAM_CAPACITY: usize = 6;

/// Points granted to every combatant on each top-up
pub const POINTS_TOPUP_AMOUNT: u32 = 5;

/// Seconds between points top-ups
pub const POINTS_TOPUP_INTERVAL_SECS: f32 = 10.0;

// =====================================================
// Objectives
// =====================================================

/// A flag this close to the enemy base counts as captured
pub const FLAG_CAPTURE_DISTANCE: f32 = 8.0;

/// Flags sit this far from their team base (towards the map centre)
pub const FLAG_BASE_OFFSET: f32 = 5.0;

/// Contact radius for pickups and flags
pub const PICKUP_RADIUS: f32 = 1.0;

/// Heal amount of the health pickup placed at match start
pub const INITIAL_HEALTH_PICKUP: u32 = 20;

// =====================================================
// Weapons
// =====================================================

/// Seconds spent reloading; no shots can be fired meanwhile
pub const RELOAD_SECS: f32 = 1.0;

/// Projectile speed in units per second
pub const SHOT_SPEED: f32 = 40.0;

/// Projectile lifetime in seconds
pub const SHOT_LIFETIME_SECS: f32 = 20.0;

/// Half-width of the swept projectile segment
pub const SHOT_HALF_THICKNESS: f32 = 0.25;

// =====================================================
// Abilities
// =====================================================

/// Melee hit circle radius
pub const MELEE_RADIUS: f32 = 0.75;

/// Distance from caster to the melee hit circle centre
pub const MELEE_REACH: f32 = 0.7;

/// Melee windup before the hit window opens
pub const MELEE_WINDUP_SECS: f32 = 0.15;

/// Melee hit window
pub const MELEE_ACTIVE_SECS: f32 = 0.1;

pub const AOE_RADIUS: f32 = 3.0;
pub const AOE_RANGE: f32 = 15.0;
pub const AOE_TRAVEL_SPEED: f32 = 20.0;
pub const AOE_DURATION_SECS: f32 = 3.0;

pub const TRIANGLE_RADIUS: f32 = 4.5;
pub const SQUARE_RADIUS: f32 = 4.0;
pub const PENTAGON_RADIUS: f32 = 3.5;

/// Squares are placed rotated so an edge faces the caster
pub const SQUARE_ROTATION_OFFSET_DEG: f32 = 45.0;

pub const SHAPE_ACTIVE_SECS: f32 = 6.0;
pub const SHAPE_COOLDOWN_SECS: f32 = 7.0;

/// Radius around each shape corner an ally must stand in
pub const CORNER_RADIUS: f32 = 1.0;

pub const SUMMON_SPEED: f32 = 5.0;
pub const SUMMON_LIFETIME_SECS: f32 = 10.0;
pub const SUMMON_DAMAGE: f32 = 10.0;
pub const SUMMON_RADIUS: f32 = 0.5;
