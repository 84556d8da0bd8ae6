//! Combat state and core simulation types
//!
//! All state that must be persisted for replay/determinism lives here. The
//! combat core owns its collaborators (projectile pool, particle store,
//! entity lists) and receives everything else per tick - it never reaches
//! into ambient globals.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::boss::{Boss, BossDescriptor, BossReward, boss_template};
use super::collision::CollisionResolver;
use super::enemy::{Enemy, WaveDescriptor};
use super::events::{CombatEvent, ParticleStyle};
use super::pool::Pool;
use super::projectile::{
    HomingTarget, OwnerSide, ProjectileDescriptor, ProjectileKind, ProjectileSystem,
};
use crate::consts::*;

/// Preallocated projectile slots
pub const PROJECTILE_POOL_SIZE: usize = 256;
/// Preallocated particle slots
pub const PARTICLE_POOL_SIZE: usize = 512;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Normalized, smoothed movement vector from the input layer
    pub movement: Vec2,
    /// Fire is held-state; the player gun has its own cooldown
    pub fire: bool,
    /// Just-pressed
    pub bomb: bool,
    /// Just-pressed
    pub switch_weapon: bool,
}

/// Player weapon flavors, toggled by the switch-weapon key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Fast spread shots
    Blaster,
    /// Slower piercing lance
    Lance,
}

/// The player craft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub shield: f32,
    pub weapon: WeaponKind,
    /// 1..=3, raised by weapon-upgrade pickups
    pub weapon_level: u8,
    pub bombs: u32,
    pub invulnerable_for: f32,
    pub fire_cooldown: f32,
}

impl Player {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            pos: Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT - 80.0),
            vel: Vec2::ZERO,
            radius: PLAYER_RADIUS,
            health: 100.0,
            max_health: 100.0,
            shield: 0.0,
            weapon: WeaponKind::Blaster,
            weapon_level: 1,
            bombs: 2,
            invulnerable_for: 0.0,
            fire_cooldown: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn is_invincible(&self) -> bool {
        self.invulnerable_for > 0.0
    }

    /// Movement, cooldowns, and gun fire for one tick.
    pub fn update(&mut self, dt: f32, input: &TickInput, shots: &mut Vec<ProjectileDescriptor>) {
        self.vel = input.movement * PLAYER_SPEED;
        self.pos += self.vel * dt;
        self.pos.x = self.pos.x.clamp(self.radius, FIELD_WIDTH - self.radius);
        self.pos.y = self.pos.y.clamp(self.radius, FIELD_HEIGHT - self.radius);

        if self.invulnerable_for > 0.0 {
            self.invulnerable_for = (self.invulnerable_for - dt).max(0.0);
        }
        if self.fire_cooldown > 0.0 {
            self.fire_cooldown -= dt;
        }
        if input.switch_weapon {
            self.weapon = match self.weapon {
                WeaponKind::Blaster => WeaponKind::Lance,
                WeaponKind::Lance => WeaponKind::Blaster,
            };
        }
        if input.fire && self.fire_cooldown <= 0.0 {
            self.emit_shots(shots);
        }
    }

    fn emit_shots(&mut self, shots: &mut Vec<ProjectileDescriptor>) {
        let muzzle = self.pos - Vec2::new(0.0, self.radius + 4.0);
        match self.weapon {
            WeaponKind::Blaster => {
                self.fire_cooldown = 0.14;
                let spreads: &[f32] = match self.weapon_level {
                    1 => &[0.0],
                    2 => &[-0.08, 0.08],
                    _ => &[-0.16, 0.0, 0.16],
                };
                for &step in spreads {
                    let dir = Vec2::from_angle(step).rotate(Vec2::new(0.0, -1.0));
                    shots.push(ProjectileDescriptor {
                        radius: 4.0,
                        ..ProjectileDescriptor::bullet(muzzle, dir * 520.0, 12.0, OwnerSide::Player)
                    });
                }
            }
            WeaponKind::Lance => {
                self.fire_cooldown = 0.3;
                shots.push(ProjectileDescriptor {
                    penetration: 2,
                    radius: 6.0,
                    kind: ProjectileKind::Orb,
                    ..ProjectileDescriptor::bullet(
                        muzzle,
                        Vec2::new(0.0, -420.0),
                        20.0 + 8.0 * self.weapon_level as f32,
                        OwnerSide::Player,
                    )
                });
            }
        }
    }

    /// Apply a hit. No-op while the post-hit invincibility window runs.
    /// Returns `true` if this hit killed the player.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_invincible() || !self.is_alive() {
            return false;
        }
        let mut remaining = amount;
        if self.shield > 0.0 {
            let absorbed = remaining.min(self.shield);
            self.shield -= absorbed;
            remaining -= absorbed;
        }
        self.health -= remaining;
        self.invulnerable_for = PLAYER_HIT_INVULN;
        self.health <= 0.0
    }
}

/// Power-up types dropped by destroyed enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    WeaponUpgrade,
    Shield,
    Repair,
    BombStock,
    ScoreGem,
}

/// A drifting pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub ttl: f32,
}

impl PowerUp {
    pub fn new(id: u32, kind: PowerUpKind, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            vel: Vec2::new(0.0, 60.0),
            radius: 12.0,
            ttl: 10.0,
        }
    }
}

/// A wave slot waiting out its staggered spawn delay, counted down on the
/// simulation clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSpawn {
    pub delay: f32,
    pub enemy: Enemy,
}

/// A visual-effect particle. Gameplay never reads these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub style: u8,
    pub life: f32,
    pub size: f32,
}

/// Complete combat state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Simulation tick counter
    pub tick: u64,
    pub player: Player,
    /// Active enemies (sorted by id for determinism)
    pub enemies: Vec<Enemy>,
    /// Staggered wave slots not yet on the field
    pub pending_spawns: Vec<PendingSpawn>,
    pub boss: Option<Boss>,
    pub projectiles: ProjectileSystem,
    pub powerups: Vec<PowerUp>,
    /// Visual particles (not gameplay-affecting)
    #[serde(skip, default = "default_particle_pool")]
    pub particles: Pool<Particle>,
    /// Advisory cap, adjusted by the loop's auto-quality controller
    #[serde(skip, default = "default_particle_cap")]
    pub particle_cap: usize,
    pub score: u64,
    pub experience: u64,
    /// Outward signals accumulated this tick
    #[serde(skip)]
    pub events: Vec<CombatEvent>,
    /// Grid + diagnostics, rebuilt every tick
    #[serde(skip, default)]
    pub resolver: CollisionResolver,
    next_id: u32,
}

fn default_particle_cap() -> usize {
    PARTICLE_POOL_SIZE
}

fn default_particle_pool() -> Pool<Particle> {
    Pool::with_capacity(PARTICLE_POOL_SIZE)
}

impl CombatState {
    /// Create a new combat state with the given seed
    pub fn new(seed: u64) -> Self {
        let mut state = Self {
            seed,
            tick: 0,
            player: Player::new(0),
            enemies: Vec::new(),
            pending_spawns: Vec::new(),
            boss: None,
            projectiles: ProjectileSystem::with_capacity(PROJECTILE_POOL_SIZE),
            powerups: Vec::new(),
            particles: Pool::with_capacity(PARTICLE_POOL_SIZE),
            particle_cap: PARTICLE_POOL_SIZE,
            score: 0,
            experience: 0,
            events: Vec::new(),
            resolver: CollisionResolver::default(),
            next_id: 1,
        };
        state.player.id = state.next_entity_id();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Per-tick RNG stream derived from the run seed and tick counter, so
    /// replays stay bit-identical without serializing generator state.
    pub fn tick_rng(&self) -> Pcg32 {
        self.salted_rng(0)
    }

    /// Like `tick_rng`, decorrelated by a caller salt (entity id, position
    /// bits) so several draws within one tick do not share a stream.
    pub fn salted_rng(&self, salt: u64) -> Pcg32 {
        Pcg32::seed_from_u64(
            self.seed
                ^ self.tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
                ^ salt.wrapping_mul(0x517C_C1B7_2722_0A95),
        )
    }

    /// Instantiate a wave handed over by the external level director.
    /// Slots past the first wait out the wave's spawn interval in the
    /// pending queue.
    pub fn spawn_wave(&mut self, wave: &WaveDescriptor) {
        let mut rng = self.tick_rng();
        let spawned = wave.instantiate(self.next_id, &mut rng);
        if spawned.is_empty() {
            return;
        }
        self.next_id += spawned.len() as u32;
        log::info!(
            "wave spawned: {} enemies ({:?})",
            spawned.len(),
            wave.formation
        );
        for (i, enemy) in spawned.into_iter().enumerate() {
            let delay = i as f32 * wave.spawn_interval;
            if delay <= 0.0 {
                self.enemies.push(enemy);
            } else {
                self.pending_spawns.push(PendingSpawn { delay, enemy });
            }
        }
        self.normalize_order();
    }

    /// Instantiate a boss. Unknown template ids are logged and skipped.
    pub fn spawn_boss(&mut self, desc: &BossDescriptor) {
        let Some(mut boss) = boss_template(&desc.template) else {
            log::warn!("unknown boss template '{}', skipping spawn", desc.template);
            return;
        };
        boss.id = self.next_entity_id();
        log::info!("boss '{}' entering", boss.name);
        self.events.push(CombatEvent::BossSpawned {
            name: boss.name.clone(),
        });
        self.boss = Some(boss);
    }

    /// Homing candidates on the enemy side (for player shots).
    pub fn enemy_targets(&self) -> Vec<HomingTarget> {
        let mut targets: Vec<HomingTarget> = self
            .enemies
            .iter()
            .map(|e| HomingTarget {
                id: e.id,
                pos: e.pos,
                dead: e.is_dead(),
            })
            .collect();
        if let Some(boss) = &self.boss {
            targets.push(HomingTarget {
                id: boss.id,
                pos: boss.pos,
                dead: boss.is_dead(),
            });
        }
        targets
    }

    /// Homing candidates on the player side (for enemy shots).
    pub fn player_targets(&self) -> Vec<HomingTarget> {
        vec![HomingTarget {
            id: self.player.id,
            pos: self.player.pos,
            dead: !self.player.is_alive(),
        }]
    }

    /// Request a particle burst, honoring the advisory quality cap, and
    /// signal it outward for the presentation layer.
    pub fn spawn_particle_burst(&mut self, pos: Vec2, style: ParticleStyle, count: u32) {
        use rand::Rng;
        self.events.push(CombatEvent::ParticleBurst { pos, style, count });
        let salt = ((pos.x.to_bits() as u64) << 32) | pos.y.to_bits() as u64;
        let mut rng = self.salted_rng(salt);
        for i in 0..count {
            if self.particles.len() >= self.particle_cap {
                break;
            }
            let theta = std::f32::consts::TAU * (i as f32 / count.max(1) as f32)
                + rng.random::<f32>() * 0.5;
            let speed = 60.0 + rng.random::<f32>() * 140.0;
            self.particles.acquire(Particle {
                pos,
                vel: Vec2::new(theta.cos(), theta.sin()) * speed,
                style: style as u8,
                life: 0.5 + rng.random::<f32>() * 0.5,
                size: 2.0 + rng.random::<f32>() * 4.0,
            });
        }
    }

    /// Credit score and experience, signaling the delta outward.
    pub fn award(&mut self, score: u32, experience: u32) {
        self.score += score as u64;
        self.experience += experience as u64;
        self.events.push(CombatEvent::ScoreDelta { amount: score });
    }

    /// Hand the tick's events to the host, leaving the buffer empty.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Reward/drop path for a freshly killed enemy. Callers gate on the
    /// idempotent death transition, so this runs once per enemy.
    pub(crate) fn handle_enemy_death(&mut self, i: usize) {
        let (id, pos, score, experience, drop_chance) = {
            let e = &self.enemies[i];
            (e.id, e.pos, e.score_value, e.experience, e.drop_chance)
        };
        self.award(score, experience);
        self.events.push(CombatEvent::EnemyDestroyed {
            pos,
            score,
            experience,
        });
        self.spawn_particle_burst(pos, ParticleStyle::Explosion, 16);
        let mut rng = self.salted_rng(id as u64);
        self.roll_drop(pos, drop_chance, &mut rng);
    }

    /// Reward path for the boss's killing hit.
    pub(crate) fn handle_boss_death(&mut self, reward: Option<BossReward>) {
        let Some(reward) = reward else {
            return;
        };
        let (id, pos) = self
            .boss
            .as_ref()
            .map(|b| (b.id, b.pos))
            .unwrap_or_default();
        self.award(reward.score, reward.experience);
        self.events.push(CombatEvent::BossDefeated {
            pos,
            score: reward.score,
        });
        self.events.push(CombatEvent::ScreenShake { intensity: 1.0 });
        self.spawn_particle_burst(pos, ParticleStyle::Explosion, 64);
        let mut rng = self.salted_rng(id as u64);
        self.roll_drop(pos, reward.drop_chance, &mut rng);
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.enemies.sort_by_key(|e| e.id);
        self.powerups.sort_by_key(|p| p.id);
    }

    /// Roll a power-up drop at a death site.
    pub fn roll_drop(&mut self, pos: Vec2, drop_chance: f32, rng: &mut Pcg32) {
        use rand::Rng;
        if rng.random::<f32>() >= drop_chance {
            return;
        }
        let kind = match rng.random_range(0..5u32) {
            0 => PowerUpKind::WeaponUpgrade,
            1 => PowerUpKind::Shield,
            2 => PowerUpKind::Repair,
            3 => PowerUpKind::BombStock,
            _ => PowerUpKind::ScoreGem,
        };
        let id = self.next_entity_id();
        self.powerups.push(PowerUp::new(id, kind, pos));
        self.events.push(CombatEvent::PowerUpDropped { pos, kind });
    }

    /// Apply a collected power-up to the player.
    pub fn apply_powerup(&mut self, kind: PowerUpKind) {
        match kind {
            PowerUpKind::WeaponUpgrade => {
                self.player.weapon_level = (self.player.weapon_level + 1).min(3);
            }
            PowerUpKind::Shield => {
                self.player.shield = (self.player.shield + 30.0).min(60.0);
            }
            PowerUpKind::Repair => {
                self.player.health = (self.player.health + 25.0).min(self.player.max_health);
            }
            PowerUpKind::BombStock => {
                self.player.bombs += 1;
            }
            PowerUpKind::ScoreGem => {
                self.award(500, 0);
            }
        }
        self.events.push(CombatEvent::PowerUpCollected { kind });
    }
}
