//! Projectile storage and kinematics
//!
//! All in-flight shots - player and enemy - live in one slot pool. Kinematics
//! cover straight, accelerated and homing motion; beams are the odd one out
//! and carry rectangular extents for hit testing instead of a radius.
//!
//! Homing never owns its target: a projectile stores the last known target id
//! and revalidates it against the live candidate list every tick, re-acquiring
//! the nearest live candidate when the stored one is gone.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pool::Pool;
use crate::consts::{DESPAWN_MARGIN, FIELD_HEIGHT, FIELD_WIDTH, PIERCE_DAMAGE_DECAY};
use crate::{normalize_angle, vec_to_heading};

/// Which side a projectile damages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OwnerSide {
    #[default]
    Player,
    Enemy,
}

/// Render hint for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectileKind {
    #[default]
    Bullet,
    Missile,
    Orb,
    Beam,
}

/// Trail point for projectile rendering
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrailPoint {
    pub pos: Vec2,
    pub speed: f32,
}

/// Maximum number of trail points to store
pub const TRAIL_LENGTH: usize = 20;

/// Rectangular hit extents for beam projectiles, anchored at the emission
/// point and extending along the beam's vertical travel direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BeamExtents {
    pub width: f32,
    pub height: f32,
}

/// Homing steering state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Homing {
    /// Maximum turn per second (radians)
    pub turn_rate: f32,
    /// Last known target, revalidated each tick
    pub target_id: Option<u32>,
}

/// A live target a homing projectile may steer toward.
#[derive(Debug, Clone, Copy)]
pub struct HomingTarget {
    pub id: u32,
    pub pos: Vec2,
    pub dead: bool,
}

/// A pooled projectile record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub accel: Option<Vec2>,
    pub damage: f32,
    /// Extra targets this shot may damage after its first hit
    pub penetration: u32,
    pub penetration_used: u32,
    pub radius: f32,
    pub lifetime: f32,
    pub max_lifetime: f32,
    pub owner: OwnerSide,
    pub kind: ProjectileKind,
    pub homing: Option<Homing>,
    pub beam: Option<BeamExtents>,
    /// Splash radius; a deactivating hit signals area damage
    pub explosion_radius: Option<f32>,
    /// Trail history for rendering (newest first)
    #[serde(skip)]
    pub trail: Vec<TrailPoint>,
}

impl Projectile {
    /// Record current position to trail (call each tick while active)
    pub fn record_trail(&mut self) {
        let speed = self.vel.length();
        self.trail.insert(0, TrailPoint { pos: self.pos, speed });
        if self.trail.len() > TRAIL_LENGTH {
            self.trail.pop();
        }
    }

    /// Beam hit box: anchored at the current position, width centered,
    /// extending along the beam's vertical travel direction.
    pub fn beam_bounds(&self) -> Option<(Vec2, Vec2)> {
        let beam = self.beam?;
        let min_x = self.pos.x - beam.width / 2.0;
        let max_x = self.pos.x + beam.width / 2.0;
        let (min_y, max_y) = if self.vel.y >= 0.0 {
            (self.pos.y, self.pos.y + beam.height)
        } else {
            (self.pos.y - beam.height, self.pos.y)
        };
        Some((Vec2::new(min_x, min_y), Vec2::new(max_x, max_y)))
    }
}

/// Everything needed to spawn one projectile. Attack patterns produce lists
/// of these; `delay` staggers volleys on the simulation clock, never on host
/// timers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileDescriptor {
    pub pos: Vec2,
    pub vel: Vec2,
    pub accel: Option<Vec2>,
    pub damage: f32,
    pub penetration: u32,
    pub radius: f32,
    pub max_lifetime: f32,
    pub owner: OwnerSide,
    pub kind: ProjectileKind,
    pub homing: Option<Homing>,
    pub beam: Option<BeamExtents>,
    pub explosion_radius: Option<f32>,
    /// Seconds until the shot actually materializes
    pub delay: f32,
}

impl ProjectileDescriptor {
    pub fn bullet(pos: Vec2, vel: Vec2, damage: f32, owner: OwnerSide) -> Self {
        Self {
            pos,
            vel,
            accel: None,
            damage,
            penetration: 0,
            radius: 4.0,
            max_lifetime: 6.0,
            owner,
            kind: ProjectileKind::Bullet,
            homing: None,
            beam: None,
            explosion_radius: None,
            delay: 0.0,
        }
    }
}

/// Owns every in-flight projectile and the pending delayed shots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSystem {
    pool: Pool<Projectile>,
    pending: Vec<ProjectileDescriptor>,
}

impl ProjectileSystem {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pool: Pool::with_capacity(capacity),
            pending: Vec::new(),
        }
    }

    /// Queue or immediately materialize a projectile.
    pub fn spawn(&mut self, desc: ProjectileDescriptor) {
        if desc.delay > 0.0 {
            self.pending.push(desc);
            return;
        }
        self.materialize(desc);
    }

    fn materialize(&mut self, desc: ProjectileDescriptor) {
        self.pool.acquire(Projectile {
            pos: desc.pos,
            vel: desc.vel,
            accel: desc.accel,
            damage: desc.damage,
            penetration: desc.penetration,
            penetration_used: 0,
            radius: desc.radius,
            lifetime: 0.0,
            max_lifetime: desc.max_lifetime,
            owner: desc.owner,
            kind: desc.kind,
            homing: desc.homing,
            beam: desc.beam,
            explosion_radius: desc.explosion_radius,
            trail: Vec::with_capacity(TRAIL_LENGTH),
        });
    }

    /// Advance kinematics for every active projectile.
    ///
    /// `player_targets` are homing candidates for enemy shots,
    /// `enemy_targets` for player shots.
    pub fn update(
        &mut self,
        dt: f32,
        player_targets: &[HomingTarget],
        enemy_targets: &[HomingTarget],
    ) {
        // Delayed shots count down on the fixed-step clock
        let mut due = Vec::new();
        for desc in &mut self.pending {
            desc.delay -= dt;
            if desc.delay <= 0.0 {
                due.push(desc.clone());
            }
        }
        self.pending.retain(|d| d.delay > 0.0);
        for desc in due {
            self.materialize(desc);
        }

        let mut expired = Vec::new();
        for (idx, p) in self.pool.iter_mut() {
            if let Some(homing) = p.homing {
                let candidates = match p.owner {
                    OwnerSide::Player => enemy_targets,
                    OwnerSide::Enemy => player_targets,
                };
                let target_id = revalidate_target(homing.target_id, p.pos, candidates);
                if let Some(id) = target_id {
                    if let Some(target) = candidates.iter().find(|t| t.id == id) {
                        p.vel = steer_toward(p.pos, p.vel, target.pos, homing.turn_rate, dt);
                    }
                }
                p.homing = Some(Homing {
                    turn_rate: homing.turn_rate,
                    target_id,
                });
            }

            p.pos += p.vel * dt;
            if let Some(accel) = p.accel {
                p.vel += accel * dt;
            }
            if p.kind == ProjectileKind::Missile || p.kind == ProjectileKind::Orb {
                p.record_trail();
            }

            p.lifetime += dt;
            if p.lifetime >= p.max_lifetime || out_of_bounds(p.pos) {
                expired.push(idx);
            }
        }
        for idx in expired {
            self.pool.release(idx);
        }
    }

    /// Apply the penetration rule after a confirmed hit. Returns `true` when
    /// the projectile survives to damage further targets this tick.
    pub fn register_hit(&mut self, idx: usize) -> bool {
        let Some(p) = self.pool.get_mut(idx) else {
            return false;
        };
        if p.penetration_used < p.penetration {
            p.penetration_used += 1;
            p.damage *= PIERCE_DAMAGE_DECAY;
            true
        } else {
            self.pool.release(idx);
            false
        }
    }

    pub fn deactivate(&mut self, idx: usize) {
        self.pool.release(idx);
    }

    pub fn get(&self, idx: usize) -> Option<&Projectile> {
        self.pool.get(idx)
    }

    pub fn is_active(&self, idx: usize) -> bool {
        self.pool.is_alive(idx)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Projectile)> {
        self.pool.iter()
    }

    /// Release every enemy-owned projectile (bomb effect).
    pub fn clear_enemy_shots(&mut self) {
        self.pool.retain(|_, p| p.owner != OwnerSide::Enemy);
        self.pending.retain(|d| d.owner != OwnerSide::Enemy);
    }
}

fn out_of_bounds(pos: Vec2) -> bool {
    pos.x < -DESPAWN_MARGIN
        || pos.x > FIELD_WIDTH + DESPAWN_MARGIN
        || pos.y < -DESPAWN_MARGIN
        || pos.y > FIELD_HEIGHT + DESPAWN_MARGIN
}

/// Keep the stored target while it is live; otherwise greedily pick the
/// nearest live candidate (first found wins ties). `None` when no candidate
/// remains - the shot flies straight.
fn revalidate_target(current: Option<u32>, pos: Vec2, candidates: &[HomingTarget]) -> Option<u32> {
    if let Some(id) = current
        && candidates.iter().any(|t| t.id == id && !t.dead)
    {
        return Some(id);
    }
    let mut best: Option<(u32, f32)> = None;
    for t in candidates {
        if t.dead {
            continue;
        }
        let dist = pos.distance_squared(t.pos);
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((t.id, dist));
        }
    }
    best.map(|(id, _)| id)
}

/// Rotate `vel` toward `target` by at most `turn_rate * dt`, preserving speed.
fn steer_toward(pos: Vec2, vel: Vec2, target: Vec2, turn_rate: f32, dt: f32) -> Vec2 {
    if vel.length_squared() < f32::EPSILON {
        return vel;
    }
    let desired = vec_to_heading(target - pos);
    let current = vec_to_heading(vel);
    let delta = normalize_angle(desired - current);
    let max_turn = turn_rate * dt;
    let clamped = delta.clamp(-max_turn, max_turn);
    Vec2::from_angle(clamped).rotate(vel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use proptest::prelude::*;

    fn homing_missile(pos: Vec2, vel: Vec2, turn_rate: f32) -> ProjectileDescriptor {
        ProjectileDescriptor {
            homing: Some(Homing {
                turn_rate,
                target_id: None,
            }),
            kind: ProjectileKind::Missile,
            ..ProjectileDescriptor::bullet(pos, vel, 10.0, OwnerSide::Player)
        }
    }

    #[test]
    fn test_straight_shot_integrates_velocity() {
        let mut sys = ProjectileSystem::with_capacity(8);
        sys.spawn(ProjectileDescriptor::bullet(
            Vec2::new(100.0, 300.0),
            Vec2::new(0.0, -120.0),
            10.0,
            OwnerSide::Player,
        ));
        sys.update(1.0, &[], &[]);
        let (_, p) = sys.iter().next().unwrap();
        assert!((p.pos.y - 180.0).abs() < 0.001);
    }

    #[test]
    fn test_acceleration_applies_after_move() {
        let mut sys = ProjectileSystem::with_capacity(8);
        sys.spawn(ProjectileDescriptor {
            accel: Some(Vec2::new(0.0, 50.0)),
            ..ProjectileDescriptor::bullet(
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 10.0),
                5.0,
                OwnerSide::Enemy,
            )
        });
        sys.update(1.0, &[], &[]);
        let (_, p) = sys.iter().next().unwrap();
        // Position moved by the pre-acceleration velocity
        assert!((p.pos.y - 10.0).abs() < 0.001);
        assert!((p.vel.y - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_lifetime_expiry_releases_slot() {
        let mut sys = ProjectileSystem::with_capacity(8);
        sys.spawn(ProjectileDescriptor {
            max_lifetime: 0.5,
            ..ProjectileDescriptor::bullet(
                Vec2::new(400.0, 300.0),
                Vec2::ZERO,
                1.0,
                OwnerSide::Player,
            )
        });
        for _ in 0..40 {
            sys.update(SIM_DT, &[], &[]);
        }
        assert!(sys.is_empty());
    }

    #[test]
    fn test_out_of_bounds_expiry() {
        let mut sys = ProjectileSystem::with_capacity(8);
        sys.spawn(ProjectileDescriptor::bullet(
            Vec2::new(400.0, 10.0),
            Vec2::new(0.0, -400.0),
            1.0,
            OwnerSide::Player,
        ));
        for _ in 0..30 {
            sys.update(SIM_DT, &[], &[]);
        }
        assert!(sys.is_empty());
    }

    #[test]
    fn test_delayed_shot_materializes_on_sim_clock() {
        let mut sys = ProjectileSystem::with_capacity(8);
        sys.spawn(ProjectileDescriptor {
            delay: 0.1,
            ..ProjectileDescriptor::bullet(
                Vec2::new(400.0, 300.0),
                Vec2::ZERO,
                1.0,
                OwnerSide::Enemy,
            )
        });
        assert!(sys.is_empty());
        // 0.1s is six ticks at 60 Hz; stay pending one tick short of it
        for _ in 0..5 {
            sys.update(SIM_DT, &[], &[]);
        }
        assert!(sys.is_empty());
        for _ in 0..2 {
            sys.update(SIM_DT, &[], &[]);
        }
        assert_eq!(sys.len(), 1);
    }

    #[test]
    fn test_penetration_decay_sequence() {
        let mut sys = ProjectileSystem::with_capacity(8);
        sys.spawn(ProjectileDescriptor {
            penetration: 2,
            ..ProjectileDescriptor::bullet(
                Vec2::new(400.0, 300.0),
                Vec2::ZERO,
                100.0,
                OwnerSide::Player,
            )
        });
        let idx = sys.iter().next().unwrap().0;

        assert!((sys.get(idx).unwrap().damage - 100.0).abs() < 0.001);
        assert!(sys.register_hit(idx));
        assert!((sys.get(idx).unwrap().damage - 80.0).abs() < 0.001);
        assert!(sys.register_hit(idx));
        assert!((sys.get(idx).unwrap().damage - 64.0).abs() < 0.001);
        // Penetration budget exhausted: third hit deactivates
        assert!(!sys.register_hit(idx));
        assert!(!sys.is_active(idx));
    }

    #[test]
    fn test_homing_reacquires_nearest_live_target() {
        let targets = [
            HomingTarget {
                id: 1,
                pos: Vec2::new(500.0, 100.0),
                dead: true,
            },
            HomingTarget {
                id: 2,
                pos: Vec2::new(420.0, 100.0),
                dead: false,
            },
            HomingTarget {
                id: 3,
                pos: Vec2::new(100.0, 100.0),
                dead: false,
            },
        ];
        let picked = revalidate_target(Some(1), Vec2::new(400.0, 300.0), &targets);
        assert_eq!(picked, Some(2));
    }

    #[test]
    fn test_homing_none_when_no_live_candidates() {
        let targets = [HomingTarget {
            id: 1,
            pos: Vec2::ZERO,
            dead: true,
        }];
        assert_eq!(revalidate_target(Some(1), Vec2::ZERO, &targets), None);
        assert_eq!(revalidate_target(None, Vec2::ZERO, &[]), None);
    }

    #[test]
    fn test_turn_clamped_to_rate() {
        // Shot moving +x, target straight behind: a quarter-turn budget per
        // second must not flip the heading in one tick.
        let vel = Vec2::new(100.0, 0.0);
        let steered = steer_toward(
            Vec2::ZERO,
            vel,
            Vec2::new(-100.0, 0.01),
            std::f32::consts::FRAC_PI_2,
            SIM_DT,
        );
        let turned = normalize_angle(vec_to_heading(steered) - vec_to_heading(vel)).abs();
        assert!(turned <= std::f32::consts::FRAC_PI_2 * SIM_DT + 1e-4);
    }

    proptest! {
        /// Homing only redirects velocity; speed is invariant.
        #[test]
        fn prop_homing_preserves_speed(
            vx in -300.0_f32..300.0, vy in -300.0_f32..300.0,
            tx in -500.0_f32..500.0, ty in -500.0_f32..500.0,
            turn_rate in 0.1_f32..10.0,
        ) {
            prop_assume!(vx.abs() > 1.0 || vy.abs() > 1.0);
            let vel = Vec2::new(vx, vy);
            let steered = steer_toward(Vec2::ZERO, vel, Vec2::new(tx, ty), turn_rate, SIM_DT);
            prop_assert!((steered.length() - vel.length()).abs() < 1e-3);
        }
    }
}
