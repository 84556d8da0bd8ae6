//! Collision detection and resolution
//!
//! One resolver pass per tick, in a fixed order: player body, enemy shots,
//! player shots (grid-accelerated), power-ups. The resolver applies damage
//! and deactivation but owns no gameplay state beyond per-tick diagnostics;
//! score, drops and particles are signaled through the combat state.
//!
//! Dead enemies stay in the active list until the next tick's sweep, so
//! same-tick stale references hit the idempotent death guard, not a missing
//! entity.

use glam::Vec2;

use super::events::{CombatEvent, ParticleStyle};
use super::grid::SpatialGrid;
use super::projectile::OwnerSide;
use super::state::CombatState;
use crate::consts::{DEFAULT_HIT_RADIUS, RAM_DAMAGE};

/// Circular hit test: distance between centers under the radius sum.
#[inline]
pub fn check_circle_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    a_pos.distance_squared(b_pos) < (a_radius + b_radius) * (a_radius + b_radius)
}

/// Circle vs axis-aligned box (beam hit test).
#[inline]
pub fn check_circle_aabb(center: Vec2, radius: f32, min: Vec2, max: Vec2) -> bool {
    let closest = center.clamp(min, max);
    center.distance_squared(closest) < radius * radius
}

/// Entities indexed by the collision grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderRef {
    /// Index into the enemy list
    Enemy(usize),
    Boss,
}

/// Per-tick diagnostics. Reset at the start of every resolve pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionStats {
    pub checks: u32,
    pub hits: u32,
}

/// Splash damage gathered during the projectile pass, applied after it.
#[derive(Debug, Clone, Copy)]
struct SplashRequest {
    pos: Vec2,
    radius: f32,
    damage: f32,
}

/// Cross-cuts the grid, projectiles and entities to resolve all pairwise
/// interactions for one tick.
#[derive(Debug, Clone, Default)]
pub struct CollisionResolver {
    grid: SpatialGrid<ColliderRef>,
    pub stats: CollisionStats,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every interaction for this tick, in the fixed pass order.
    pub fn resolve(&mut self, state: &mut CombatState) {
        self.stats = CollisionStats::default();
        self.rebuild_grid(state);

        self.resolve_player_body(state);
        self.resolve_enemy_shots(state);
        let splashes = self.resolve_player_shots(state);
        self.apply_splashes(state, splashes);
        self.resolve_powerups(state);
    }

    /// Rebuild the one-tick index from the live enemy set and boss.
    fn rebuild_grid(&mut self, state: &CombatState) {
        self.grid.clear();
        for (i, enemy) in state.enemies.iter().enumerate() {
            if enemy.is_dead() {
                continue;
            }
            self.grid.insert(ColliderRef::Enemy(i), enemy.pos, enemy.radius);
        }
        if let Some(boss) = &state.boss
            && !boss.is_dead()
        {
            self.grid.insert(ColliderRef::Boss, boss.pos, boss.radius);
        }
    }

    /// Pass 1: player body against enemy and boss hulls. Skipped entirely
    /// while the player's post-hit invincibility runs.
    fn resolve_player_body(&mut self, state: &mut CombatState) {
        if !state.player.is_alive() || state.player.is_invincible() {
            return;
        }
        let player_pos = state.player.pos;
        let player_radius = state.player.radius;

        let mut contact_damage = None;
        for i in 0..state.enemies.len() {
            let (damage, died) = {
                let enemy = &mut state.enemies[i];
                if enemy.is_dead() {
                    continue;
                }
                self.stats.checks += 1;
                if !check_circle_collision(player_pos, player_radius, enemy.pos, enemy.radius) {
                    continue;
                }
                self.stats.hits += 1;
                (enemy.contact_damage, enemy.take_damage(RAM_DAMAGE))
            };
            if died {
                state.handle_enemy_death(i);
            }
            contact_damage = Some(damage);
            break;
        }

        if contact_damage.is_none() {
            let mut ram = None;
            if let Some(boss) = state.boss.as_mut().filter(|b| !b.is_dead()) {
                self.stats.checks += 1;
                if check_circle_collision(player_pos, player_radius, boss.pos, boss.radius) {
                    self.stats.hits += 1;
                    ram = Some((boss.contact_damage, boss.take_damage(RAM_DAMAGE, 1.0)));
                }
            }
            if let Some((damage, reward)) = ram {
                state.handle_boss_death(reward);
                contact_damage = Some(damage);
            }
        }

        if let Some(damage) = contact_damage {
            Self::hurt_player(state, damage);
        }
    }

    /// Pass 2: enemy projectiles against the player. A hit always consumes
    /// the shot; there is no penetration through the player.
    fn resolve_enemy_shots(&mut self, state: &mut CombatState) {
        if !state.player.is_alive() {
            return;
        }
        let player_pos = state.player.pos;
        let player_radius = state.player.radius;

        let shot_indices: Vec<usize> = state
            .projectiles
            .iter()
            .filter(|(_, p)| p.owner == OwnerSide::Enemy)
            .map(|(idx, _)| idx)
            .collect();

        for idx in shot_indices {
            let Some(p) = state.projectiles.get(idx) else {
                continue;
            };
            self.stats.checks += 1;
            let hit = match p.beam_bounds() {
                Some((min, max)) => check_circle_aabb(player_pos, player_radius, min, max),
                None => check_circle_collision(player_pos, player_radius, p.pos, p.radius),
            };
            if !hit {
                continue;
            }
            self.stats.hits += 1;
            let damage = p.damage;
            state.projectiles.deactivate(idx);
            Self::hurt_player(state, damage);
        }
    }

    /// Pass 3: player projectiles against enemies and boss, using the grid
    /// to bound candidate sets. A projectile that deactivates mid-pass
    /// stops checking further candidates.
    fn resolve_player_shots(&mut self, state: &mut CombatState) -> Vec<SplashRequest> {
        let mut splashes = Vec::new();
        let shot_indices: Vec<usize> = state
            .projectiles
            .iter()
            .filter(|(_, p)| p.owner == OwnerSide::Player)
            .map(|(idx, _)| idx)
            .collect();

        for idx in shot_indices {
            let Some(p) = state.projectiles.get(idx) else {
                continue;
            };
            let query_radius = match p.beam {
                Some(beam) => p.radius.max(beam.width.max(beam.height)),
                None => p.radius,
            };
            let candidates = self.grid.query(p.pos, query_radius, None);

            for candidate in candidates {
                let Some(p) = state.projectiles.get(idx) else {
                    break;
                };
                let shot_pos = p.pos;
                let shot_radius = p.radius;
                let shot_damage = p.damage;
                let beam = p.beam_bounds();
                let explosion = p.explosion_radius;

                let landed = match candidate {
                    ColliderRef::Enemy(i) => {
                        let died = {
                            let enemy = &mut state.enemies[i];
                            if enemy.is_dead() {
                                continue;
                            }
                            self.stats.checks += 1;
                            let hit = match beam {
                                Some((min, max)) => {
                                    check_circle_aabb(enemy.pos, enemy.radius, min, max)
                                }
                                None => check_circle_collision(
                                    shot_pos,
                                    shot_radius,
                                    enemy.pos,
                                    hit_radius(enemy.radius),
                                ),
                            };
                            if !hit {
                                continue;
                            }
                            self.stats.hits += 1;
                            enemy.take_damage(shot_damage)
                        };
                        if died {
                            state.handle_enemy_death(i);
                        }
                        true
                    }
                    ColliderRef::Boss => {
                        let reward = {
                            let Some(boss) = state.boss.as_mut() else {
                                continue;
                            };
                            if boss.is_dead() {
                                continue;
                            }
                            self.stats.checks += 1;
                            let hit = match beam {
                                Some((min, max)) => {
                                    check_circle_aabb(boss.pos, boss.radius, min, max)
                                }
                                None => check_circle_collision(
                                    shot_pos,
                                    shot_radius,
                                    boss.pos,
                                    hit_radius(boss.radius),
                                ),
                            };
                            if !hit {
                                continue;
                            }
                            self.stats.hits += 1;
                            let multiplier = boss
                                .weak_point_multiplier(shot_pos, shot_radius)
                                .unwrap_or(1.0);
                            boss.take_damage(shot_damage, multiplier)
                        };
                        state.handle_boss_death(reward);
                        true
                    }
                };

                // Penetration bookkeeping: decay or deactivate
                if landed && !state.projectiles.register_hit(idx) {
                    if let Some(radius) = explosion {
                        splashes.push(SplashRequest {
                            pos: shot_pos,
                            radius,
                            damage: shot_damage * 0.5,
                        });
                    }
                    break;
                }
            }
        }
        splashes
    }

    /// Secondary area damage from exploding shots, applied after the main
    /// projectile pass.
    fn apply_splashes(&mut self, state: &mut CombatState, splashes: Vec<SplashRequest>) {
        for splash in splashes {
            state.spawn_particle_burst(splash.pos, ParticleStyle::Explosion, 24);
            state
                .events
                .push(CombatEvent::ScreenShake { intensity: 0.25 });
            for i in 0..state.enemies.len() {
                let died = {
                    let enemy = &mut state.enemies[i];
                    if enemy.is_dead() {
                        continue;
                    }
                    self.stats.checks += 1;
                    if !check_circle_collision(
                        splash.pos,
                        splash.radius,
                        enemy.pos,
                        enemy.radius,
                    ) {
                        continue;
                    }
                    self.stats.hits += 1;
                    enemy.take_damage(splash.damage)
                };
                if died {
                    state.handle_enemy_death(i);
                }
            }
            let mut reward = None;
            if let Some(boss) = state.boss.as_mut().filter(|b| !b.is_dead()) {
                self.stats.checks += 1;
                if check_circle_collision(splash.pos, splash.radius, boss.pos, boss.radius) {
                    self.stats.hits += 1;
                    reward = boss.take_damage(splash.damage, 1.0);
                }
            }
            state.handle_boss_death(reward);
        }
    }

    /// Pass 4: player against drifting power-ups.
    fn resolve_powerups(&mut self, state: &mut CombatState) {
        if !state.player.is_alive() {
            return;
        }
        let player_pos = state.player.pos;
        let player_radius = state.player.radius;

        let mut collected = Vec::new();
        for powerup in &state.powerups {
            self.stats.checks += 1;
            if check_circle_collision(player_pos, player_radius, powerup.pos, powerup.radius) {
                self.stats.hits += 1;
                collected.push((powerup.id, powerup.kind));
            }
        }
        for (_, kind) in &collected {
            state.apply_powerup(*kind);
        }
        state
            .powerups
            .retain(|p| !collected.iter().any(|(id, _)| *id == p.id));
    }

    fn hurt_player(state: &mut CombatState, damage: f32) {
        if state.player.is_invincible() || !state.player.is_alive() {
            return;
        }
        let killed = state.player.take_damage(damage);
        state.events.push(CombatEvent::PlayerHit { damage });
        let pos = state.player.pos;
        state.spawn_particle_burst(pos, ParticleStyle::HitFlash, 12);
        if killed {
            state.events.push(CombatEvent::PlayerDestroyed);
        }
    }
}

/// Explicit hitbox radius, falling back to the fixed default.
#[inline]
fn hit_radius(radius: f32) -> f32 {
    if radius > 0.0 { radius } else { DEFAULT_HIT_RADIUS }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::enemy::{Enemy, enemy_template};
    use crate::sim::projectile::{BeamExtents, ProjectileDescriptor, ProjectileKind};
    use crate::sim::state::{PowerUp, PowerUpKind};

    fn state_with_enemies(positions: &[Vec2], kind: &str) -> CombatState {
        let mut state = CombatState::new(7);
        let template = enemy_template(kind).unwrap();
        for &pos in positions {
            let id = state.next_entity_id();
            state
                .enemies
                .push(Enemy::from_template(id, pos, &template, 1.0));
        }
        state
    }

    #[test]
    fn test_circle_collision_radius_sum() {
        assert!(check_circle_collision(
            Vec2::ZERO,
            10.0,
            Vec2::new(15.0, 0.0),
            10.0
        ));
        assert!(!check_circle_collision(
            Vec2::ZERO,
            10.0,
            Vec2::new(25.0, 0.0),
            10.0
        ));
    }

    #[test]
    fn test_circle_aabb_overlap() {
        let min = Vec2::new(0.0, 0.0);
        let max = Vec2::new(10.0, 40.0);
        assert!(check_circle_aabb(Vec2::new(12.0, 20.0), 5.0, min, max));
        assert!(!check_circle_aabb(Vec2::new(20.0, 20.0), 5.0, min, max));
    }

    #[test]
    fn test_scout_kill_scenario() {
        // Scout (20 hp) takes a 25-damage shot with no penetration budget
        let mut state = state_with_enemies(&[Vec2::new(400.0, 300.0)], "scout");
        state.projectiles.spawn(ProjectileDescriptor::bullet(
            Vec2::new(400.0, 302.0),
            Vec2::ZERO,
            25.0,
            OwnerSide::Player,
        ));
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);

        assert!(state.enemies[0].is_dead());
        // Dead enemy stays in the set until next tick's sweep
        assert_eq!(state.enemies.len(), 1);
        assert!(state.projectiles.is_empty());
        assert!(state.events.iter().any(|e| matches!(
            e,
            CombatEvent::EnemyDestroyed { score: 100, .. }
        )));
        assert_eq!(state.score, 100);
        assert!(resolver.stats.hits >= 1);
    }

    #[test]
    fn test_penetration_decay_across_three_enemies() {
        // Three scouts stacked in one cell; shot has penetration 2, damage 100
        let positions = [
            Vec2::new(400.0, 300.0),
            Vec2::new(410.0, 300.0),
            Vec2::new(420.0, 300.0),
        ];
        let mut state = state_with_enemies(&positions, "scout");
        state.projectiles.spawn(ProjectileDescriptor {
            penetration: 2,
            radius: 30.0,
            ..ProjectileDescriptor::bullet(
                Vec2::new(405.0, 300.0),
                Vec2::ZERO,
                100.0,
                OwnerSide::Player,
            )
        });
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);

        // Applied damage decays 100 -> 80 -> 64 (scout has no armor)
        assert!((state.enemies[0].health - (20.0 - 100.0)).abs() < 0.001);
        assert!((state.enemies[1].health - (20.0 - 80.0)).abs() < 0.001);
        assert!((state.enemies[2].health - (20.0 - 64.0)).abs() < 0.001);
        assert!(state.projectiles.is_empty(), "budget exhausted on third hit");
    }

    #[test]
    fn test_player_body_ram_damages_both() {
        let mut state = state_with_enemies(&[Vec2::new(400.0, 520.0)], "scout");
        state.player.pos = Vec2::new(400.0, 520.0);
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);

        assert!(state.player.health < state.player.max_health);
        // Scout took the fixed ram damage
        assert!((state.enemies[0].health - 10.0).abs() < 0.001);
        assert!(state
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::PlayerHit { .. })));
    }

    #[test]
    fn test_invincible_player_skips_body_pass() {
        let mut state = state_with_enemies(&[Vec2::new(400.0, 520.0)], "scout");
        state.player.pos = Vec2::new(400.0, 520.0);
        state.player.invulnerable_for = 1.0;
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);

        assert_eq!(state.player.health, state.player.max_health);
        assert_eq!(state.enemies[0].health, 20.0);
    }

    #[test]
    fn test_enemy_shot_consumed_on_player_hit() {
        let mut state = CombatState::new(7);
        state.projectiles.spawn(ProjectileDescriptor::bullet(
            state.player.pos,
            Vec2::ZERO,
            8.0,
            OwnerSide::Enemy,
        ));
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);

        assert!(state.projectiles.is_empty());
        assert!((state.player.health - 92.0).abs() < 0.001);
    }

    #[test]
    fn test_beam_hits_by_rectangle() {
        // Beam anchored below the enemy, extending upward through it
        let mut state = state_with_enemies(&[Vec2::new(400.0, 250.0)], "scout");
        state.projectiles.spawn(ProjectileDescriptor {
            kind: ProjectileKind::Beam,
            beam: Some(BeamExtents {
                width: 10.0,
                height: 80.0,
            }),
            ..ProjectileDescriptor::bullet(
                Vec2::new(400.0, 300.0),
                Vec2::new(0.0, -200.0),
                25.0,
                OwnerSide::Player,
            )
        });
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);
        assert!(state.enemies[0].is_dead());
    }

    #[test]
    fn test_powerup_collection() {
        let mut state = CombatState::new(7);
        let id = state.next_entity_id();
        state
            .powerups
            .push(PowerUp::new(id, PowerUpKind::Repair, state.player.pos));
        state.player.health = 50.0;
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);

        assert!(state.powerups.is_empty());
        assert_eq!(state.player.health, 75.0);
        assert!(state.events.iter().any(|e| matches!(
            e,
            CombatEvent::PowerUpCollected {
                kind: PowerUpKind::Repair
            }
        )));
    }

    #[test]
    fn test_splash_damages_neighbors() {
        let positions = [Vec2::new(400.0, 300.0), Vec2::new(430.0, 300.0)];
        let mut state = state_with_enemies(&positions, "scout");
        state.projectiles.spawn(ProjectileDescriptor {
            explosion_radius: Some(60.0),
            ..ProjectileDescriptor::bullet(
                Vec2::new(400.0, 302.0),
                Vec2::ZERO,
                25.0,
                OwnerSide::Player,
            )
        });
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);

        // Direct hit kills the first, splash (12.5) chips the second
        assert!(state.enemies[0].is_dead());
        assert!((state.enemies[1].health - 7.5).abs() < 0.001);
    }

    #[test]
    fn test_boss_weak_point_resolver_path() {
        use crate::sim::boss::{BossState, boss_template};
        let mut state = CombatState::new(7);
        let mut boss = boss_template("dreadnought").unwrap();
        boss.id = state.next_entity_id();
        boss.state = BossState::Active;
        boss.invulnerable_for = 0.0;
        boss.pos = Vec2::new(400.0, 120.0);
        boss.elapsed = 0.5; // weak point at (+40, 0) exposed
        state.boss = Some(boss);

        state.projectiles.spawn(ProjectileDescriptor::bullet(
            Vec2::new(440.0, 120.0),
            Vec2::ZERO,
            50.0,
            OwnerSide::Player,
        ));
        let mut resolver = CollisionResolver::new();
        resolver.resolve(&mut state);

        // max(1, 50*2.0 - 25) * 0.9 = 67.5
        let boss = state.boss.as_ref().unwrap();
        assert!((boss.max_health - boss.health - 67.5).abs() < 0.01);
    }
}
