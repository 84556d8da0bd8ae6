//! Outward event signals
//!
//! The core never calls into a renderer or audio mixer. Everything the
//! presentation layer needs to react to is pushed onto the per-tick event
//! buffer and drained by the host after each tick. Fire-and-forget: no event
//! carries a reply channel.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::PowerUpKind;

/// Style hint for a particle burst request. The particle layer decides what
/// these actually look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleStyle {
    Explosion,
    Spark,
    HitFlash,
    Debris,
}

/// Discrete signals emitted during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    EnemyDestroyed {
        pos: Vec2,
        score: u32,
        experience: u32,
    },
    PlayerHit {
        damage: f32,
    },
    PlayerDestroyed,
    PowerUpCollected {
        kind: PowerUpKind,
    },
    PowerUpDropped {
        pos: Vec2,
        kind: PowerUpKind,
    },
    BombDetonated,
    BossSpawned {
        name: String,
    },
    BossPhaseChanged {
        phase: usize,
        name: String,
    },
    BossDefeated {
        pos: Vec2,
        score: u32,
    },
    ScreenShake {
        intensity: f32,
    },
    ParticleBurst {
        pos: Vec2,
        style: ParticleStyle,
        count: u32,
    },
    ScoreDelta {
        amount: u32,
    },
}
