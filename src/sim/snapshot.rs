//! Read-only render snapshots
//!
//! The presentation layer never reaches into the simulation; once per frame
//! it captures a snapshot carrying everything it draws. Positions are
//! extrapolated by the leftover accumulator fraction so motion stays smooth
//! between fixed steps.

use glam::Vec2;
use serde::Serialize;

use super::projectile::{OwnerSide, ProjectileKind, TrailPoint};
use super::state::CombatState;
use crate::consts::SIM_DT;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub pos: Vec2,
    pub radius: f32,
    pub health_ratio: f32,
    pub shield: f32,
    pub invincible: bool,
    pub weapon_level: u8,
    pub bombs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileView {
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: ProjectileKind,
    pub owner: OwnerSide,
    pub radius: f32,
    pub trail: Vec<TrailPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyView {
    pub pos: Vec2,
    pub radius: f32,
    pub health_ratio: f32,
    pub kind: String,
    pub tier: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeakPointView {
    pub pos: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BossView {
    pub pos: Vec2,
    pub radius: f32,
    pub health_ratio: f32,
    pub health_bars: u32,
    pub phase: usize,
    pub phase_name: String,
    pub invulnerable: bool,
    /// Only currently-exposed weak points are drawn (and hittable)
    pub weak_points: Vec<WeakPointView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticleView {
    pub pos: Vec2,
    pub size: f32,
    pub style: u8,
    pub life: f32,
}

/// Per-frame view of the combat state.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub tick: u64,
    /// Leftover accumulator fraction used for extrapolation
    pub alpha: f32,
    pub player: PlayerView,
    pub projectiles: Vec<ProjectileView>,
    pub enemies: Vec<EnemyView>,
    pub boss: Option<BossView>,
    pub particles: Vec<ParticleView>,
    pub score: u64,
    pub experience: u64,
}

impl RenderSnapshot {
    /// Capture the current state, extrapolating positions by `alpha` of one
    /// fixed step.
    pub fn capture(state: &CombatState, alpha: f32) -> Self {
        let lead = alpha * SIM_DT;
        Self {
            tick: state.tick,
            alpha,
            player: PlayerView {
                pos: state.player.pos + state.player.vel * lead,
                radius: state.player.radius,
                health_ratio: (state.player.health / state.player.max_health).clamp(0.0, 1.0),
                shield: state.player.shield,
                invincible: state.player.is_invincible(),
                weapon_level: state.player.weapon_level,
                bombs: state.player.bombs,
            },
            projectiles: state
                .projectiles
                .iter()
                .map(|(_, p)| ProjectileView {
                    pos: p.pos + p.vel * lead,
                    vel: p.vel,
                    kind: p.kind,
                    owner: p.owner,
                    radius: p.radius,
                    trail: p.trail.clone(),
                })
                .collect(),
            enemies: state
                .enemies
                .iter()
                .filter(|e| !e.is_dead())
                .map(|e| EnemyView {
                    pos: e.pos + e.vel * lead,
                    radius: e.radius,
                    health_ratio: e.health_ratio(),
                    kind: e.kind.clone(),
                    tier: e.tier,
                })
                .collect(),
            boss: state.boss.as_ref().filter(|b| !b.is_dead()).map(|b| BossView {
                pos: b.pos + b.vel * lead,
                radius: b.radius,
                health_ratio: b.health_ratio(),
                health_bars: b.health_bars(),
                phase: b.phase_index,
                phase_name: b.current_phase().name.clone(),
                invulnerable: b.invulnerable(),
                weak_points: b
                    .weak_points
                    .iter()
                    .filter(|wp| wp.exposed(b.elapsed))
                    .map(|wp| WeakPointView {
                        pos: b.pos + wp.offset,
                        radius: wp.radius,
                    })
                    .collect(),
            }),
            particles: state
                .particles
                .iter()
                .map(|(_, p)| ParticleView {
                    pos: p.pos,
                    size: p.size,
                    style: p.style,
                    life: p.life,
                })
                .collect(),
            score: state.score,
            experience: state.experience,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::enemy::{Formation, WaveDescriptor};

    #[test]
    fn test_capture_extrapolates_by_alpha() {
        let mut state = CombatState::new(3);
        state.player.vel = Vec2::new(100.0, 0.0);
        let snap = RenderSnapshot::capture(&state, 0.5);
        let expected = state.player.pos + Vec2::new(100.0 * 0.5 * SIM_DT, 0.0);
        assert!((snap.player.pos - expected).length() < 0.001);
    }

    #[test]
    fn test_dead_enemies_not_captured() {
        let mut state = CombatState::new(3);
        state.spawn_wave(&WaveDescriptor {
            enemies: vec!["scout".into(), "scout".into()],
            formation: Formation::Line,
            difficulty: 1.0,
            spawn_interval: 0.0,
        });
        state.enemies[0].take_damage(1000.0);
        let snap = RenderSnapshot::capture(&state, 0.0);
        assert_eq!(snap.enemies.len(), 1);
    }

    #[test]
    fn test_only_exposed_weak_points_captured() {
        use crate::sim::boss::BossDescriptor;
        let mut state = CombatState::new(3);
        state.spawn_boss(&BossDescriptor {
            template: "dreadnought".into(),
        });
        let boss = state.boss.as_mut().unwrap();
        boss.elapsed = 0.5; // first point exposed (5s cycle), second too (7s cycle)
        let snap = RenderSnapshot::capture(&state, 0.0);
        assert_eq!(snap.boss.as_ref().unwrap().weak_points.len(), 2);

        let boss = state.boss.as_mut().unwrap();
        boss.elapsed = 2.5; // both outside their 2s exposure windows
        let snap = RenderSnapshot::capture(&state, 0.0);
        assert!(snap.boss.as_ref().unwrap().weak_points.is_empty());
    }
}
