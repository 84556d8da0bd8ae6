//! Starlance - a bullet-hell combat core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, combat state)
//! - `game_loop`: Fixed-timestep accumulator driving the simulation
//! - `settings`: Quality presets and particle budgets
//!
//! Rendering, audio and input capture live in the host; the core only
//! consumes per-tick input snapshots and emits events and render snapshots.

pub mod game_loop;
pub mod settings;
pub mod sim;

pub use game_loop::GameLoop;
pub use settings::{QualityPreset, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum fixed steps drained per frame callback
    pub const MAX_STEPS_PER_FRAME: u32 = 5;

    /// Play-field dimensions (world units, y grows downward)
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;
    /// Projectiles despawn once this far outside the field
    pub const DESPAWN_MARGIN: f32 = 48.0;

    /// Collision grid cell size, tuned to typical entity radius
    pub const GRID_CELL_SIZE: f32 = 100.0;
    /// Hitbox radius used when an entity has no explicit one
    pub const DEFAULT_HIT_RADIUS: f32 = 16.0;

    /// Damage multiplier applied to a projectile per pierced target
    pub const PIERCE_DAMAGE_DECAY: f32 = 0.8;
    /// Damage dealt to an enemy when the player rams it
    pub const RAM_DAMAGE: f32 = 10.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 10.0;
    pub const PLAYER_SPEED: f32 = 260.0;
    /// Post-hit invincibility window (seconds)
    pub const PLAYER_HIT_INVULN: f32 = 1.5;

    /// Boss choreography timings (seconds)
    pub const BOSS_ENTRANCE_SECS: f32 = 2.0;
    pub const BOSS_TRANSITION_INVULN_SECS: f32 = 1.5;
    pub const BOSS_PHASE_COMMIT_SECS: f32 = 0.5;
    pub const BOSS_ATTACK_MIN_COOLDOWN: f32 = 0.5;
}

/// Normalize an angle to (-π, π]
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    while angle > PI {
        angle -= TAU;
    }
    while angle <= -PI {
        angle += TAU;
    }
    angle
}

/// Unit vector for a heading angle
#[inline]
pub fn heading_to_vec(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Heading angle of a vector (radians)
#[inline]
pub fn vec_to_heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}
