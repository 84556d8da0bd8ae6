//! Enemy behavior engine
//!
//! Movement is a closed set of patterns, each a pure function from
//! accumulated state-time and parameters to a *velocity* - position always
//! integrates velocity * dt regardless of pattern, so patterns compose with
//! knockback or scripted overrides without special cases.
//!
//! Fire control is rate-limited and accuracy-gated; every stochastic decision
//! draws from the seeded simulation RNG, never from ambient entropy.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::projectile::{Homing, OwnerSide, ProjectileDescriptor, ProjectileKind};
use crate::consts::FIELD_WIDTH;

/// Proportional gain for the circular orbit controller
const ORBIT_GAIN: f32 = 2.0;

/// Movement pattern tags with their tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MovementPattern {
    /// Initial velocity persists unchanged
    Linear,
    /// Horizontal velocity = amplitude * sin(t * frequency)
    Sine { amplitude: f32, frequency: f32 },
    /// Horizontal velocity alternates +/-amplitude every `period` seconds
    Zigzag { amplitude: f32, period: f32 },
    /// Orbit a fixed center; velocity is a proportional pull toward the
    /// moving target point on the circle
    Circular {
        center: Vec2,
        radius: f32,
        angular_speed: f32,
    },
    /// Straight at the player at a fixed speed
    Chase { speed: f32 },
    /// Hover above the player, tracking vertically while weaving sideways
    Strafe {
        amplitude: f32,
        frequency: f32,
        hover_offset: f32,
        gain: f32,
    },
}

impl MovementPattern {
    /// Velocity for this tick. Pure: no pattern mutates entity state.
    pub fn velocity(
        &self,
        state_time: f32,
        pos: Vec2,
        base_vel: Vec2,
        player_pos: Vec2,
    ) -> Vec2 {
        match *self {
            MovementPattern::Linear => base_vel,
            MovementPattern::Sine {
                amplitude,
                frequency,
            } => Vec2::new(amplitude * (state_time * frequency).sin(), base_vel.y),
            MovementPattern::Zigzag { amplitude, period } => {
                let phase = (state_time / period).floor() as i64;
                let sign = if phase % 2 == 0 { 1.0 } else { -1.0 };
                Vec2::new(amplitude * sign, base_vel.y)
            }
            MovementPattern::Circular {
                center,
                radius,
                angular_speed,
            } => {
                let theta = state_time * angular_speed;
                let target = center + Vec2::new(theta.cos(), theta.sin()) * radius;
                (target - pos) * ORBIT_GAIN
            }
            MovementPattern::Chase { speed } => (player_pos - pos).normalize_or_zero() * speed,
            MovementPattern::Strafe {
                amplitude,
                frequency,
                hover_offset,
                gain,
            } => Vec2::new(
                amplitude * (state_time * frequency).sin(),
                (player_pos.y - hover_offset - pos.y) * gain,
            ),
        }
    }
}

/// Bullet spread fired on a successful attack roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotPattern {
    Single,
    Triple,
    Fan,
    Homing,
}

/// Rate limiter + accuracy gate for enemy fire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FireControl {
    /// Shots per second
    pub fire_rate: f32,
    /// Probability a shot window actually fires
    pub accuracy: f32,
    /// Seconds since the last shot window
    pub since_last: f32,
}

impl FireControl {
    pub fn new(fire_rate: f32, accuracy: f32) -> Self {
        Self {
            fire_rate,
            accuracy,
            since_last: 0.0,
        }
    }

    /// Advance the limiter; returns `true` when this tick opens a shot
    /// window AND the accuracy roll passes. A failed roll still consumes
    /// the window.
    pub fn try_fire(&mut self, dt: f32, rng: &mut Pcg32) -> bool {
        self.since_last += dt;
        if self.fire_rate <= 0.0 || self.since_last < 1.0 / self.fire_rate {
            return false;
        }
        self.since_last = 0.0;
        rng.random::<f32>() <= self.accuracy
    }
}

/// Static stats for one enemy type.
#[derive(Debug, Clone)]
pub struct EnemyTemplate {
    pub name: &'static str,
    pub max_health: f32,
    /// Percentage damage reduction, 0..1
    pub armor: f32,
    /// Absorbs damage before health
    pub shield: f32,
    pub radius: f32,
    pub contact_damage: f32,
    pub descent_speed: f32,
    pub pattern: MovementPattern,
    pub fire_rate: f32,
    pub accuracy: f32,
    pub shot: ShotPattern,
    pub bullet_speed: f32,
    pub bullet_damage: f32,
    pub tier: u8,
    pub score_value: u32,
    pub experience: u32,
    pub drop_chance: f32,
}

/// Look up an enemy template by type name. Unknown names are a content
/// error, handled by the caller (log + skip, never fatal).
pub fn enemy_template(name: &str) -> Option<EnemyTemplate> {
    let t = match name {
        "scout" => EnemyTemplate {
            name: "scout",
            max_health: 20.0,
            armor: 0.0,
            shield: 0.0,
            radius: 14.0,
            contact_damage: 10.0,
            descent_speed: 90.0,
            pattern: MovementPattern::Linear,
            fire_rate: 0.4,
            accuracy: 0.5,
            shot: ShotPattern::Single,
            bullet_speed: 160.0,
            bullet_damage: 6.0,
            tier: 1,
            score_value: 100,
            experience: 5,
            drop_chance: 0.05,
        },
        "raider" => EnemyTemplate {
            name: "raider",
            max_health: 35.0,
            armor: 0.1,
            shield: 0.0,
            radius: 16.0,
            contact_damage: 14.0,
            descent_speed: 70.0,
            pattern: MovementPattern::Zigzag {
                amplitude: 120.0,
                period: 0.8,
            },
            fire_rate: 0.6,
            accuracy: 0.6,
            shot: ShotPattern::Single,
            bullet_speed: 180.0,
            bullet_damage: 8.0,
            tier: 1,
            score_value: 150,
            experience: 8,
            drop_chance: 0.08,
        },
        "gunner" => EnemyTemplate {
            name: "gunner",
            max_health: 60.0,
            armor: 0.2,
            shield: 20.0,
            radius: 18.0,
            contact_damage: 16.0,
            descent_speed: 40.0,
            pattern: MovementPattern::Strafe {
                amplitude: 90.0,
                frequency: 1.6,
                hover_offset: 320.0,
                gain: 1.2,
            },
            fire_rate: 1.2,
            accuracy: 0.75,
            shot: ShotPattern::Triple,
            bullet_speed: 200.0,
            bullet_damage: 7.0,
            tier: 2,
            score_value: 300,
            experience: 15,
            drop_chance: 0.15,
        },
        "weaver" => EnemyTemplate {
            name: "weaver",
            max_health: 45.0,
            armor: 0.0,
            shield: 0.0,
            radius: 15.0,
            contact_damage: 12.0,
            descent_speed: 60.0,
            pattern: MovementPattern::Sine {
                amplitude: 160.0,
                frequency: 3.0,
            },
            fire_rate: 0.9,
            accuracy: 0.55,
            shot: ShotPattern::Fan,
            bullet_speed: 150.0,
            bullet_damage: 6.0,
            tier: 2,
            score_value: 250,
            experience: 12,
            drop_chance: 0.1,
        },
        "orbiter" => EnemyTemplate {
            name: "orbiter",
            max_health: 80.0,
            armor: 0.15,
            shield: 30.0,
            radius: 20.0,
            contact_damage: 18.0,
            descent_speed: 0.0,
            pattern: MovementPattern::Circular {
                center: Vec2::new(FIELD_WIDTH / 2.0, 180.0),
                radius: 140.0,
                angular_speed: 1.2,
            },
            fire_rate: 0.7,
            accuracy: 0.8,
            shot: ShotPattern::Homing,
            bullet_speed: 110.0,
            bullet_damage: 10.0,
            tier: 3,
            score_value: 500,
            experience: 25,
            drop_chance: 0.25,
        },
        "lancer" => EnemyTemplate {
            name: "lancer",
            max_health: 30.0,
            armor: 0.0,
            shield: 0.0,
            radius: 13.0,
            contact_damage: 22.0,
            descent_speed: 0.0,
            pattern: MovementPattern::Chase { speed: 180.0 },
            fire_rate: 0.0,
            accuracy: 0.0,
            shot: ShotPattern::Single,
            bullet_speed: 0.0,
            bullet_damage: 0.0,
            tier: 2,
            score_value: 200,
            experience: 10,
            drop_chance: 0.06,
        },
        _ => return None,
    };
    Some(t)
}

/// A live enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: String,
    pub pos: Vec2,
    /// Base velocity fed to the movement pattern (descent for most types)
    pub base_vel: Vec2,
    pub vel: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub armor: f32,
    pub shield: f32,
    pub radius: f32,
    pub contact_damage: f32,
    pub pattern: MovementPattern,
    pub state_time: f32,
    pub fire: FireControl,
    pub shot: ShotPattern,
    pub bullet_speed: f32,
    pub bullet_damage: f32,
    pub tier: u8,
    pub score_value: u32,
    pub experience: u32,
    pub drop_chance: f32,
    dead: bool,
}

impl Enemy {
    pub fn from_template(id: u32, pos: Vec2, t: &EnemyTemplate, difficulty: f32) -> Self {
        Self {
            id,
            kind: t.name.to_string(),
            pos,
            base_vel: Vec2::new(0.0, t.descent_speed),
            vel: Vec2::ZERO,
            health: t.max_health * difficulty,
            max_health: t.max_health * difficulty,
            armor: t.armor,
            shield: t.shield * difficulty,
            radius: t.radius,
            contact_damage: t.contact_damage * difficulty,
            pattern: t.pattern,
            state_time: 0.0,
            fire: FireControl::new(t.fire_rate, t.accuracy),
            shot: t.shot,
            bullet_speed: t.bullet_speed,
            bullet_damage: t.bullet_damage * difficulty,
            tier: t.tier,
            score_value: t.score_value,
            experience: t.experience,
            drop_chance: t.drop_chance,
            dead: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn health_ratio(&self) -> f32 {
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    /// Advance movement and fire control for one tick. Newly fired shots are
    /// appended to `shots`.
    pub fn update(
        &mut self,
        dt: f32,
        player_pos: Vec2,
        rng: &mut Pcg32,
        shots: &mut Vec<ProjectileDescriptor>,
    ) {
        self.state_time += dt;
        self.vel = self
            .pattern
            .velocity(self.state_time, self.pos, self.base_vel, player_pos);
        self.pos += self.vel * dt;

        if self.bullet_damage > 0.0 && self.fire.try_fire(dt, rng) {
            self.emit_spread(player_pos, shots);
        }
    }

    /// Shield absorbs first, armor reduces the remainder. Returns `true`
    /// exactly once, on the hit that kills.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }
        let mut remaining = amount;
        if self.shield > 0.0 {
            let absorbed = remaining.min(self.shield);
            self.shield -= absorbed;
            remaining -= absorbed;
        }
        if remaining > 0.0 {
            self.health -= remaining * (1.0 - self.armor);
        }
        if self.health <= 0.0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Type-specific bullet spread aimed at the player's current position.
    fn emit_spread(&self, player_pos: Vec2, shots: &mut Vec<ProjectileDescriptor>) {
        let aim = (player_pos - self.pos).normalize_or_zero();
        if aim == Vec2::ZERO {
            return;
        }
        let mut shoot = |dir: Vec2, homing: Option<Homing>, kind: ProjectileKind| {
            shots.push(ProjectileDescriptor {
                homing,
                kind,
                ..ProjectileDescriptor::bullet(
                    self.pos,
                    dir * self.bullet_speed,
                    self.bullet_damage,
                    OwnerSide::Enemy,
                )
            });
        };
        match self.shot {
            ShotPattern::Single => shoot(aim, None, ProjectileKind::Bullet),
            ShotPattern::Triple => {
                for step in [-0.15_f32, 0.0, 0.15] {
                    shoot(Vec2::from_angle(step).rotate(aim), None, ProjectileKind::Bullet);
                }
            }
            ShotPattern::Fan => {
                for i in 0..5 {
                    let step = (i as f32 - 2.0) * 0.3;
                    shoot(Vec2::from_angle(step).rotate(aim), None, ProjectileKind::Bullet);
                }
            }
            ShotPattern::Homing => shoot(
                aim,
                Some(Homing {
                    turn_rate: 2.0,
                    target_id: None,
                }),
                ProjectileKind::Missile,
            ),
        }
    }
}

/// Spawn-formation shapes for wave descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formation {
    Line,
    Vee,
    Column,
    Swarm,
}

impl Formation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "line" => Some(Formation::Line),
            "vee" => Some(Formation::Vee),
            "column" => Some(Formation::Column),
            "swarm" => Some(Formation::Swarm),
            _ => None,
        }
    }

    /// Spawn position for slot `i` of `n`, just above the field.
    fn slot(&self, i: usize, n: usize, rng: &mut Pcg32) -> Vec2 {
        let fi = i as f32;
        let span = FIELD_WIDTH * 0.8;
        let left = FIELD_WIDTH * 0.1;
        match self {
            Formation::Line => {
                let step = span / n.max(1) as f32;
                Vec2::new(left + step * (fi + 0.5), -30.0)
            }
            Formation::Vee => {
                let half = (n / 2) as f32;
                let offset = fi - half;
                Vec2::new(
                    FIELD_WIDTH / 2.0 + offset * 50.0,
                    -30.0 - offset.abs() * 35.0,
                )
            }
            Formation::Column => Vec2::new(FIELD_WIDTH / 2.0, -30.0 - fi * 50.0),
            Formation::Swarm => Vec2::new(
                left + rng.random::<f32>() * span,
                -30.0 - rng.random::<f32>() * 120.0,
            ),
        }
    }
}

/// A wave as handed over by the external level director. The director
/// decides when a wave starts; the core owns the per-slot spacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveDescriptor {
    /// Enemy type names, one per slot
    pub enemies: Vec<String>,
    pub formation: Formation,
    pub difficulty: f32,
    /// Seconds between consecutive slot spawns (0 = all at once)
    pub spawn_interval: f32,
}

impl WaveDescriptor {
    /// Instantiate the wave's enemies. Unknown type names are logged and
    /// skipped; a content hole must not take down a combat tick.
    pub fn instantiate(&self, first_id: u32, rng: &mut Pcg32) -> Vec<Enemy> {
        let n = self.enemies.len();
        let mut spawned = Vec::with_capacity(n);
        for (i, name) in self.enemies.iter().enumerate() {
            let Some(template) = enemy_template(name) else {
                log::warn!("unknown enemy template '{name}', skipping spawn");
                continue;
            };
            let pos = self.formation.slot(i, n, rng);
            let id = first_id + spawned.len() as u32;
            spawned.push(Enemy::from_template(id, pos, &template, self.difficulty));
        }
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use rand::SeedableRng;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    #[test]
    fn test_linear_keeps_base_velocity() {
        let v = MovementPattern::Linear.velocity(
            3.0,
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 90.0),
            Vec2::ZERO,
        );
        assert_eq!(v, Vec2::new(0.0, 90.0));
    }

    #[test]
    fn test_zigzag_square_wave_flips_each_period() {
        let p = MovementPattern::Zigzag {
            amplitude: 100.0,
            period: 0.5,
        };
        let base = Vec2::new(0.0, 50.0);
        assert_eq!(p.velocity(0.1, Vec2::ZERO, base, Vec2::ZERO).x, 100.0);
        assert_eq!(p.velocity(0.6, Vec2::ZERO, base, Vec2::ZERO).x, -100.0);
        assert_eq!(p.velocity(1.1, Vec2::ZERO, base, Vec2::ZERO).x, 100.0);
        // Vertical descent untouched
        assert_eq!(p.velocity(0.1, Vec2::ZERO, base, Vec2::ZERO).y, 50.0);
    }

    #[test]
    fn test_circular_pulls_toward_orbit_point() {
        let p = MovementPattern::Circular {
            center: Vec2::new(400.0, 200.0),
            radius: 100.0,
            angular_speed: 1.0,
        };
        // At t=0 the orbit point is center + (radius, 0)
        let v = p.velocity(0.0, Vec2::new(400.0, 200.0), Vec2::ZERO, Vec2::ZERO);
        assert!((v - Vec2::new(200.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_chase_is_unit_vector_times_speed() {
        let p = MovementPattern::Chase { speed: 180.0 };
        let v = p.velocity(0.0, Vec2::new(0.0, 0.0), Vec2::ZERO, Vec2::new(300.0, 400.0));
        assert!((v.length() - 180.0).abs() < 0.001);
        assert!(v.x > 0.0 && v.y > 0.0);
    }

    #[test]
    fn test_fire_rate_limits_shot_windows() {
        let mut fire = FireControl::new(2.0, 1.0); // every 0.5s, always hits
        let mut rng = rng();
        let mut windows = 0;
        for _ in 0..60 {
            if fire.try_fire(SIM_DT, &mut rng) {
                windows += 1;
            }
        }
        assert_eq!(windows, 2);
    }

    #[test]
    fn test_zero_accuracy_never_fires() {
        let mut fire = FireControl::new(10.0, 0.0);
        let mut rng = rng();
        for _ in 0..600 {
            assert!(!fire.try_fire(SIM_DT, &mut rng));
        }
    }

    #[test]
    fn test_shield_depletes_before_health() {
        let t = enemy_template("gunner").unwrap();
        let mut e = Enemy::from_template(1, Vec2::ZERO, &t, 1.0);
        let shield = e.shield;
        e.take_damage(shield + 10.0);
        assert_eq!(e.shield, 0.0);
        // Armor applies only to the portion past the shield
        assert!((e.health - (e.max_health - 10.0 * (1.0 - e.armor))).abs() < 0.001);
    }

    #[test]
    fn test_death_is_idempotent() {
        let t = enemy_template("scout").unwrap();
        let mut e = Enemy::from_template(1, Vec2::ZERO, &t, 1.0);
        assert!(e.take_damage(25.0));
        assert!(e.is_dead());
        // Stale same-tick references may damage again; transition fires once
        assert!(!e.take_damage(25.0));
    }

    #[test]
    fn test_unknown_template_is_none() {
        assert!(enemy_template("battlestar").is_none());
    }

    #[test]
    fn test_wave_skips_unknown_types() {
        let wave = WaveDescriptor {
            enemies: vec!["scout".into(), "battlestar".into(), "raider".into()],
            formation: Formation::Line,
            difficulty: 1.0,
            spawn_interval: 0.0,
        };
        let spawned = wave.instantiate(10, &mut rng());
        assert_eq!(spawned.len(), 2);
        assert_eq!(spawned[0].id, 10);
        assert_eq!(spawned[1].id, 11);
    }

    #[test]
    fn test_triple_spread_aims_at_player() {
        let t = enemy_template("gunner").unwrap();
        let e = Enemy::from_template(1, Vec2::new(400.0, 100.0), &t, 1.0);
        let mut shots = Vec::new();
        e.emit_spread(Vec2::new(400.0, 500.0), &mut shots);
        assert_eq!(shots.len(), 3);
        for s in &shots {
            assert!(s.vel.y > 0.0, "spread should head toward the player");
            assert_eq!(s.owner, OwnerSide::Enemy);
        }
    }
}
