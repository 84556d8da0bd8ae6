//! Boss state machine
//!
//! A boss runs `Entering -> Phase(i) -> ... -> Dead`, with a transient
//! transition window between phases. Phases are gated by health-ratio
//! thresholds and only ever advance; the forward scan picks the first phase
//! past the current one whose threshold has been reached, so a burst of
//! damage inside one tick can commit past an intermediate phase.
//!
//! All choreography runs on the fixed-step clock. Staggered attacks are
//! expressed as per-shot delays carried by the projectile descriptors.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::CombatEvent;
use super::projectile::{
    BeamExtents, Homing, OwnerSide, ProjectileDescriptor, ProjectileKind,
};
use crate::consts::{
    BOSS_ATTACK_MIN_COOLDOWN, BOSS_ENTRANCE_SECS, BOSS_PHASE_COMMIT_SECS,
    BOSS_TRANSITION_INVULN_SECS, FIELD_WIDTH,
};

/// Proportional gain for phase movement controllers
const MOVE_GAIN: f32 = 2.0;
/// Shots in a circular barrage ring
const BARRAGE_COUNT: usize = 16;

/// A damageable sub-region with a periodic exposure cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakPoint {
    /// Offset from the boss anchor point
    pub offset: Vec2,
    pub radius: f32,
    /// Damage multiplier while exposed
    pub multiplier: f32,
    /// Exposed for this long out of every interval
    pub expose_duration: f32,
    pub expose_interval: f32,
}

impl WeakPoint {
    /// Duty cycle against the boss's shared elapsed clock.
    pub fn exposed(&self, elapsed: f32) -> bool {
        self.expose_interval > 0.0 && elapsed % self.expose_interval < self.expose_duration
    }
}

/// Phase movement shapes. Each yields a target point the proportional
/// controller steers toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossMovement {
    HorizontalSweep,
    FigureEight,
    Orbit,
    DualWeave,
}

impl BossMovement {
    fn target(&self, anchor: Vec2, t: f32) -> Vec2 {
        match self {
            BossMovement::HorizontalSweep => anchor + Vec2::new((t * 0.8).sin() * 220.0, 0.0),
            BossMovement::FigureEight => {
                anchor + Vec2::new(t.sin() * 200.0, (2.0 * t).sin() * 70.0)
            }
            BossMovement::Orbit => anchor + Vec2::new(t.cos() * 150.0, t.sin() * 60.0),
            BossMovement::DualWeave => {
                anchor
                    + Vec2::new(
                        (t * 1.7).sin() * 240.0 + (t * 0.6).sin() * 60.0,
                        (t * 2.3).sin() * 50.0,
                    )
            }
        }
    }
}

/// Shared attack vocabulary. Every pattern returns projectile descriptors
/// aimed using the boss-to-player vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPattern {
    Straight,
    Fan,
    Barrage,
    HomingMissile,
    LaserSweep,
    MissileVolley,
    Ultimate,
}

impl AttackPattern {
    /// Base damage before the phase damage multiplier.
    fn base_damage(&self) -> f32 {
        match self {
            AttackPattern::Straight => 8.0,
            AttackPattern::Fan => 6.0,
            AttackPattern::Barrage => 5.0,
            AttackPattern::HomingMissile => 12.0,
            AttackPattern::LaserSweep => 7.0,
            AttackPattern::MissileVolley => 9.0,
            AttackPattern::Ultimate => 6.0,
        }
    }

    /// Produce this pattern's shots. `elapsed` rotates time-varying
    /// patterns; `rng` drives aim jitter only.
    pub fn emit(
        &self,
        origin: Vec2,
        player_pos: Vec2,
        elapsed: f32,
        damage_scale: f32,
        rng: &mut Pcg32,
        shots: &mut Vec<ProjectileDescriptor>,
    ) {
        let aim = (player_pos - origin).normalize_or_zero();
        let aim = if aim == Vec2::ZERO { Vec2::Y } else { aim };
        let damage = self.base_damage() * damage_scale;
        let shot = |dir: Vec2, speed: f32| {
            ProjectileDescriptor::bullet(origin, dir * speed, damage, OwnerSide::Enemy)
        };

        match self {
            AttackPattern::Straight => {
                for step in [-0.1_f32, 0.0, 0.1] {
                    shots.push(shot(Vec2::from_angle(step).rotate(aim), 240.0));
                }
            }
            AttackPattern::Fan => {
                for i in 0..7 {
                    let step = (i as f32 - 3.0) * 0.3;
                    shots.push(shot(Vec2::from_angle(step).rotate(aim), 180.0));
                }
            }
            AttackPattern::Barrage => {
                // Ring rotates with the shared clock
                let spin = elapsed * 0.7;
                for i in 0..BARRAGE_COUNT {
                    let theta = spin + std::f32::consts::TAU * i as f32 / BARRAGE_COUNT as f32;
                    shots.push(shot(Vec2::from_angle(theta), 140.0));
                }
            }
            AttackPattern::HomingMissile => {
                shots.push(ProjectileDescriptor {
                    kind: ProjectileKind::Missile,
                    homing: Some(Homing {
                        turn_rate: 1.6,
                        target_id: None,
                    }),
                    ..shot(aim, 100.0)
                });
            }
            AttackPattern::LaserSweep => {
                // Parallel beam chains oscillating in angle
                let sweep = (elapsed * 2.0).sin() * 0.6;
                for chain in -1..=1i32 {
                    let offset = Vec2::new(chain as f32 * 46.0, 0.0);
                    let dir = Vec2::from_angle(sweep).rotate(aim);
                    for link in 0..4 {
                        shots.push(ProjectileDescriptor {
                            pos: origin + offset,
                            kind: ProjectileKind::Beam,
                            beam: Some(BeamExtents {
                                width: 8.0,
                                height: 42.0,
                            }),
                            delay: link as f32 * 0.08,
                            ..shot(dir, 320.0)
                        });
                    }
                }
            }
            AttackPattern::MissileVolley => {
                for i in 0..5 {
                    let jitter = (rng.random::<f32>() - 0.5) * 0.5;
                    shots.push(ProjectileDescriptor {
                        kind: ProjectileKind::Missile,
                        delay: i as f32 * 0.12,
                        ..shot(Vec2::from_angle(jitter).rotate(aim), 200.0)
                    });
                }
            }
            AttackPattern::Ultimate => {
                AttackPattern::Barrage.emit(origin, player_pos, elapsed, damage_scale, rng, shots);
                AttackPattern::HomingMissile
                    .emit(origin, player_pos, elapsed, damage_scale, rng, shots);
                AttackPattern::Fan.emit(origin, player_pos, elapsed, damage_scale, rng, shots);
            }
        }
    }
}

/// One health-gated behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossPhase {
    pub name: String,
    /// Phase entered once health ratio drops to or below this
    pub health_threshold: f32,
    /// Seconds between attacks
    pub attack_interval: f32,
    pub movement: BossMovement,
    pub speed_multiplier: f32,
    pub damage_multiplier: f32,
    pub rotation: Vec<AttackPattern>,
}

/// FSM states. Transition carries the destination phase; the index commit
/// is delayed so the choreography (shake, invulnerability flash) lands
/// before the behavior change. Invulnerability outlives the transition and
/// keeps running into the next active phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossState {
    Entering,
    Active,
    Transition { next: usize },
    Dead,
}

/// Reward descriptor emitted exactly once on death.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossReward {
    pub score: u32,
    pub experience: u32,
    pub drop_chance: f32,
}

/// Boss-spawn request from the external director.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossDescriptor {
    pub template: String,
}

/// A live boss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub id: u32,
    pub name: String,
    pub pos: Vec2,
    pub vel: Vec2,
    spawn_pos: Vec2,
    anchor: Vec2,
    pub health: f32,
    pub max_health: f32,
    /// Health represented by one HUD bar segment
    pub health_per_bar: f32,
    /// Flat damage subtraction, applied before the percentage reduction
    pub defense: f32,
    /// Percentage reduction, applied last
    pub damage_reduction: f32,
    pub radius: f32,
    pub contact_damage: f32,
    pub weak_points: Vec<WeakPoint>,
    pub phases: Vec<BossPhase>,
    pub phase_index: usize,
    pub state: BossState,
    /// Time in the current state
    state_time: f32,
    /// Shared clock: weak-point duty cycles and rotating barrages
    pub elapsed: f32,
    pub(crate) invulnerable_for: f32,
    attack_rotation_index: usize,
    since_attack: f32,
    score_value: u32,
    experience: u32,
    drop_chance: f32,
}

/// Look up a boss template by name.
pub fn boss_template(name: &str) -> Option<Boss> {
    let anchor = Vec2::new(FIELD_WIDTH / 2.0, 120.0);
    let spawn = Vec2::new(FIELD_WIDTH / 2.0, -160.0);
    let boss = match name {
        "dreadnought" => Boss {
            id: 0,
            name: "dreadnought".to_string(),
            pos: spawn,
            vel: Vec2::ZERO,
            spawn_pos: spawn,
            anchor,
            health: 2400.0,
            max_health: 2400.0,
            health_per_bar: 600.0,
            defense: 25.0,
            damage_reduction: 0.1,
            radius: 56.0,
            contact_damage: 30.0,
            weak_points: vec![
                WeakPoint {
                    offset: Vec2::new(40.0, 0.0),
                    radius: 14.0,
                    multiplier: 2.0,
                    expose_duration: 2.0,
                    expose_interval: 5.0,
                },
                WeakPoint {
                    offset: Vec2::new(-40.0, 0.0),
                    radius: 14.0,
                    multiplier: 2.0,
                    expose_duration: 2.0,
                    expose_interval: 7.0,
                },
            ],
            phases: vec![
                BossPhase {
                    name: "assault".to_string(),
                    health_threshold: 1.0,
                    attack_interval: 2.2,
                    movement: BossMovement::HorizontalSweep,
                    speed_multiplier: 1.0,
                    damage_multiplier: 1.0,
                    rotation: vec![
                        AttackPattern::Straight,
                        AttackPattern::Fan,
                        AttackPattern::MissileVolley,
                    ],
                },
                BossPhase {
                    name: "bombardment".to_string(),
                    health_threshold: 0.66,
                    attack_interval: 1.8,
                    movement: BossMovement::FigureEight,
                    speed_multiplier: 1.3,
                    damage_multiplier: 1.25,
                    rotation: vec![
                        AttackPattern::Barrage,
                        AttackPattern::Fan,
                        AttackPattern::HomingMissile,
                    ],
                },
                BossPhase {
                    name: "desperation".to_string(),
                    health_threshold: 0.33,
                    attack_interval: 1.4,
                    movement: BossMovement::DualWeave,
                    speed_multiplier: 1.6,
                    damage_multiplier: 1.5,
                    rotation: vec![
                        AttackPattern::LaserSweep,
                        AttackPattern::Barrage,
                        AttackPattern::Ultimate,
                    ],
                },
            ],
            phase_index: 0,
            state: BossState::Entering,
            state_time: 0.0,
            elapsed: 0.0,
            invulnerable_for: BOSS_ENTRANCE_SECS,
            attack_rotation_index: 0,
            since_attack: 0.0,
            score_value: 10_000,
            experience: 500,
            drop_chance: 1.0,
        },
        "hivemind" => Boss {
            id: 0,
            name: "hivemind".to_string(),
            pos: spawn,
            vel: Vec2::ZERO,
            spawn_pos: spawn,
            anchor,
            health: 3200.0,
            max_health: 3200.0,
            health_per_bar: 640.0,
            defense: 15.0,
            damage_reduction: 0.2,
            radius: 64.0,
            contact_damage: 26.0,
            weak_points: vec![WeakPoint {
                offset: Vec2::new(0.0, 30.0),
                radius: 18.0,
                multiplier: 2.5,
                expose_duration: 1.5,
                expose_interval: 6.0,
            }],
            phases: vec![
                BossPhase {
                    name: "swarm".to_string(),
                    health_threshold: 1.0,
                    attack_interval: 2.0,
                    movement: BossMovement::Orbit,
                    speed_multiplier: 1.0,
                    damage_multiplier: 1.0,
                    rotation: vec![AttackPattern::Fan, AttackPattern::HomingMissile],
                },
                BossPhase {
                    name: "frenzy".to_string(),
                    health_threshold: 0.75,
                    attack_interval: 1.6,
                    movement: BossMovement::HorizontalSweep,
                    speed_multiplier: 1.2,
                    damage_multiplier: 1.2,
                    rotation: vec![
                        AttackPattern::MissileVolley,
                        AttackPattern::Fan,
                        AttackPattern::Barrage,
                    ],
                },
                BossPhase {
                    name: "fission".to_string(),
                    health_threshold: 0.5,
                    attack_interval: 1.5,
                    movement: BossMovement::FigureEight,
                    speed_multiplier: 1.4,
                    damage_multiplier: 1.35,
                    rotation: vec![AttackPattern::Barrage, AttackPattern::LaserSweep],
                },
                BossPhase {
                    name: "rupture".to_string(),
                    health_threshold: 0.25,
                    attack_interval: 1.2,
                    movement: BossMovement::DualWeave,
                    speed_multiplier: 1.7,
                    damage_multiplier: 1.6,
                    rotation: vec![AttackPattern::Ultimate, AttackPattern::LaserSweep],
                },
            ],
            phase_index: 0,
            state: BossState::Entering,
            state_time: 0.0,
            elapsed: 0.0,
            invulnerable_for: BOSS_ENTRANCE_SECS,
            attack_rotation_index: 0,
            since_attack: 0.0,
            score_value: 16_000,
            experience: 800,
            drop_chance: 1.0,
        },
        _ => return None,
    };
    Some(boss)
}

impl Boss {
    pub fn is_dead(&self) -> bool {
        self.state == BossState::Dead
    }

    pub fn health_ratio(&self) -> f32 {
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    /// Remaining HUD bar segments, derived from health
    pub fn health_bars(&self) -> u32 {
        (self.health.max(0.0) / self.health_per_bar).ceil() as u32
    }

    pub fn invulnerable(&self) -> bool {
        self.invulnerable_for > 0.0 || self.state == BossState::Entering
    }

    pub fn current_phase(&self) -> &BossPhase {
        &self.phases[self.phase_index]
    }

    /// Weak-point multiplier for a hit at `point`, considering only
    /// currently-exposed points.
    pub fn weak_point_multiplier(&self, point: Vec2, extra_radius: f32) -> Option<f32> {
        self.weak_points
            .iter()
            .filter(|wp| wp.exposed(self.elapsed))
            .find(|wp| (self.pos + wp.offset).distance(point) < wp.radius + extra_radius)
            .map(|wp| wp.multiplier)
    }

    /// Advance the FSM one tick.
    pub fn update(
        &mut self,
        dt: f32,
        player_pos: Vec2,
        rng: &mut Pcg32,
        shots: &mut Vec<ProjectileDescriptor>,
        events: &mut Vec<CombatEvent>,
    ) {
        self.state_time += dt;
        if self.invulnerable_for > 0.0 {
            self.invulnerable_for = (self.invulnerable_for - dt).max(0.0);
        }

        match self.state {
            BossState::Entering => {
                let t = (self.state_time / BOSS_ENTRANCE_SECS).min(1.0);
                self.pos = self.spawn_pos.lerp(self.anchor, t);
                if t >= 1.0 {
                    self.state = BossState::Active;
                    self.state_time = 0.0;
                    self.invulnerable_for = 0.0;
                    self.elapsed = 0.0;
                }
            }
            BossState::Active => {
                self.elapsed += dt;
                self.steer(dt);
                if let Some(next) = self.scan_phase_advance() {
                    self.begin_transition(next, events);
                } else {
                    self.run_attacks(dt, player_pos, rng, shots);
                }
            }
            BossState::Transition { next } => {
                self.elapsed += dt;
                self.steer(dt);
                if self.state_time >= BOSS_PHASE_COMMIT_SECS {
                    self.phase_index = next;
                    self.attack_rotation_index = 0;
                    self.since_attack = 0.0;
                    self.state = BossState::Active;
                    self.state_time = 0.0;
                    events.push(CombatEvent::BossPhaseChanged {
                        phase: next,
                        name: self.phases[next].name.clone(),
                    });
                }
            }
            BossState::Dead => {}
        }
    }

    fn steer(&mut self, dt: f32) {
        let phase = &self.phases[self.phase_index];
        let target = phase.movement.target(self.anchor, self.elapsed);
        self.vel = (target - self.pos) * MOVE_GAIN * phase.speed_multiplier;
        self.pos += self.vel * dt;
    }

    /// Forward scan for the first not-yet-entered phase whose threshold has
    /// been reached. A one-tick damage spike may commit past intermediate
    /// phases; the index never moves backward.
    fn scan_phase_advance(&self) -> Option<usize> {
        let ratio = self.health_ratio();
        ((self.phase_index + 1)..self.phases.len())
            .find(|&j| ratio <= self.phases[j].health_threshold)
    }

    fn begin_transition(&mut self, next: usize, events: &mut Vec<CombatEvent>) {
        self.state = BossState::Transition { next };
        self.state_time = 0.0;
        self.invulnerable_for = BOSS_TRANSITION_INVULN_SECS;
        // Clear the in-progress attack cadence
        self.since_attack = 0.0;
        events.push(CombatEvent::ScreenShake { intensity: 0.6 });
    }

    fn run_attacks(
        &mut self,
        dt: f32,
        player_pos: Vec2,
        rng: &mut Pcg32,
        shots: &mut Vec<ProjectileDescriptor>,
    ) {
        self.since_attack += dt;
        let phase = &self.phases[self.phase_index];
        if phase.rotation.is_empty()
            || self.since_attack < phase.attack_interval
            || self.since_attack < BOSS_ATTACK_MIN_COOLDOWN
        {
            return;
        }
        let pattern = phase.rotation[self.attack_rotation_index % phase.rotation.len()];
        pattern.emit(
            self.pos,
            player_pos,
            self.elapsed,
            phase.damage_multiplier,
            rng,
            shots,
        );
        self.attack_rotation_index = (self.attack_rotation_index + 1) % phase.rotation.len();
        self.since_attack = 0.0;
    }

    /// Apply a hit. Damage while invulnerable is a no-op. Returns the reward
    /// descriptor on the killing hit, exactly once.
    ///
    /// `weak_multiplier` comes from `weak_point_multiplier`, 1.0 for body
    /// hits. Order: multiply, subtract flat defense, floor at 1, then the
    /// percentage reduction.
    pub fn take_damage(&mut self, raw: f32, weak_multiplier: f32) -> Option<BossReward> {
        if self.is_dead() || self.invulnerable() {
            return None;
        }
        let final_damage =
            (raw * weak_multiplier - self.defense).max(1.0) * (1.0 - self.damage_reduction);
        self.health -= final_damage;
        if self.health <= 0.0 {
            self.state = BossState::Dead;
            return Some(BossReward {
                score: self.score_value,
                experience: self.experience,
                drop_chance: self.drop_chance,
            });
        }
        None
    }
}
