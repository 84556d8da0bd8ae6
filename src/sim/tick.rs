//! Fixed timestep simulation tick
//!
//! One call advances the whole combat state by a constant dt, in a fixed
//! phase order: sweep -> player -> enemies -> boss -> projectiles -> grid +
//! collision -> particles -> power-ups. Exactly one phase executes at a
//! time; nothing is mutated by two phases in the same tick.

use glam::Vec2;

use super::events::{CombatEvent, ParticleStyle};
use super::state::{CombatState, TickInput};
use crate::consts::{DESPAWN_MARGIN, FIELD_HEIGHT, FIELD_WIDTH};

/// Damage a bomb deals to every enemy on the field
const BOMB_DAMAGE: f32 = 50.0;

/// Advance the combat state by one fixed timestep
pub fn tick(state: &mut CombatState, input: &TickInput, dt: f32) {
    state.tick += 1;

    // Sweep last tick's casualties so stale same-tick references stayed
    // valid through the previous resolver pass
    sweep(state);
    step_pending_spawns(state, dt);

    let mut rng = state.tick_rng();
    let mut shots = Vec::new();

    // Player movement and fire
    state.player.update(dt, input, &mut shots);
    if input.bomb {
        detonate_bomb(state);
    }
    let player_pos = state.player.pos;

    // Enemy movement and fire
    for enemy in state.enemies.iter_mut() {
        if !enemy.is_dead() {
            enemy.update(dt, player_pos, &mut rng, &mut shots);
        }
    }

    // Boss FSM
    if let Some(boss) = state.boss.as_mut() {
        boss.update(dt, player_pos, &mut rng, &mut shots, &mut state.events);
    }

    for desc in shots {
        state.projectiles.spawn(desc);
    }

    // Projectile kinematics, with homing candidate lists for both sides
    let enemy_targets = state.enemy_targets();
    let player_targets = state.player_targets();
    state.projectiles.update(dt, &player_targets, &enemy_targets);

    // Grid rebuild + collision resolution
    let mut resolver = std::mem::take(&mut state.resolver);
    resolver.resolve(state);
    state.resolver = resolver;

    step_particles(state, dt);
    step_powerups(state, dt);

    // Ensure deterministic ordering
    state.normalize_order();
}

/// Remove entities that finished dying or left the field last tick.
fn sweep(state: &mut CombatState) {
    state.enemies.retain(|e| {
        if e.is_dead() {
            return false;
        }
        // Enemies spawn above the field; they only despawn once they exit
        // past the margins below or to the sides
        e.pos.y < FIELD_HEIGHT + DESPAWN_MARGIN
            && e.pos.x > -DESPAWN_MARGIN
            && e.pos.x < FIELD_WIDTH + DESPAWN_MARGIN
    });
    if state.boss.as_ref().is_some_and(|b| b.is_dead()) {
        state.boss = None;
    }
}

/// Move staggered wave slots onto the field once their delay runs out.
fn step_pending_spawns(state: &mut CombatState, dt: f32) {
    if state.pending_spawns.is_empty() {
        return;
    }
    for pending in &mut state.pending_spawns {
        pending.delay -= dt;
    }
    let (due, waiting): (Vec<_>, Vec<_>) = state
        .pending_spawns
        .drain(..)
        .partition(|p| p.delay <= 0.0);
    state.pending_spawns = waiting;
    state.enemies.extend(due.into_iter().map(|p| p.enemy));
}

/// Bomb: clears every enemy shot and damages everything on the field.
fn detonate_bomb(state: &mut CombatState) {
    if !state.player.is_alive() || state.player.bombs == 0 {
        return;
    }
    state.player.bombs -= 1;
    state.projectiles.clear_enemy_shots();
    state.events.push(CombatEvent::BombDetonated);
    state.events.push(CombatEvent::ScreenShake { intensity: 0.8 });
    let center = Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0);
    state.spawn_particle_burst(center, ParticleStyle::Explosion, 48);

    for i in 0..state.enemies.len() {
        let died = {
            let enemy = &mut state.enemies[i];
            if enemy.is_dead() {
                continue;
            }
            enemy.take_damage(BOMB_DAMAGE)
        };
        if died {
            state.handle_enemy_death(i);
        }
    }
    let reward = state
        .boss
        .as_mut()
        .filter(|b| !b.is_dead())
        .and_then(|b| b.take_damage(BOMB_DAMAGE, 1.0));
    state.handle_boss_death(reward);
}

/// Integrate visual particles; drag, shrink, expire.
fn step_particles(state: &mut CombatState, dt: f32) {
    for (_, particle) in state.particles.iter_mut() {
        particle.pos += particle.vel * dt;
        particle.vel *= 0.96;
        particle.life -= dt * 1.5;
        particle.size *= 0.995;
    }
    state.particles.retain(|_, p| p.life > 0.0);
}

/// Drift power-ups down the field and expire them on TTL or exit.
fn step_powerups(state: &mut CombatState, dt: f32) {
    for powerup in state.powerups.iter_mut() {
        powerup.pos += powerup.vel * dt;
        powerup.ttl -= dt;
    }
    state
        .powerups
        .retain(|p| p.ttl > 0.0 && p.pos.y < FIELD_HEIGHT + DESPAWN_MARGIN);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::enemy::{Formation, WaveDescriptor};
    use crate::sim::projectile::{OwnerSide, ProjectileDescriptor};
    use crate::sim::state::{PowerUp, PowerUpKind};

    fn wave(enemies: &[&str]) -> WaveDescriptor {
        WaveDescriptor {
            enemies: enemies.iter().map(|s| s.to_string()).collect(),
            formation: Formation::Line,
            difficulty: 1.0,
            spawn_interval: 0.0,
        }
    }

    #[test]
    fn test_staggered_wave_trickles_in() {
        let mut state = CombatState::new(5);
        state.spawn_wave(&WaveDescriptor {
            spawn_interval: 0.2,
            ..wave(&["scout", "scout", "scout"])
        });
        assert_eq!(state.enemies.len(), 1);

        // 0.2s later the second slot lands, 0.2s after that the third
        for _ in 0..13 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.enemies.len(), 2);
        for _ in 0..13 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.enemies.len(), 3);
        assert!(state.pending_spawns.is_empty());
    }

    #[test]
    fn test_killed_enemy_removed_next_tick() {
        let mut state = CombatState::new(5);
        state.spawn_wave(&wave(&["scout"]));
        let enemy_pos = state.enemies[0].pos;
        state.projectiles.spawn(ProjectileDescriptor::bullet(
            enemy_pos,
            Vec2::ZERO,
            25.0,
            OwnerSide::Player,
        ));
        // The projectile drifts with zero velocity, so it still overlaps on
        // the resolve phase of this tick
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.enemies.len(), 1);
        assert!(state.enemies[0].is_dead());

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.enemies.is_empty());
    }

    #[test]
    fn test_determinism_same_seed_same_inputs() {
        let mut a = CombatState::new(4242);
        let mut b = CombatState::new(4242);
        a.spawn_wave(&wave(&["scout", "gunner", "weaver"]));
        b.spawn_wave(&wave(&["scout", "gunner", "weaver"]));

        let inputs = [
            TickInput {
                movement: Vec2::new(0.4, -0.2),
                fire: true,
                ..Default::default()
            },
            TickInput {
                movement: Vec2::new(-1.0, 0.0),
                fire: true,
                ..Default::default()
            },
            TickInput::default(),
        ];
        for step in 0..300 {
            let input = &inputs[step % inputs.len()];
            tick(&mut a, input, SIM_DT);
            tick(&mut b, input, SIM_DT);
        }

        assert_eq!(a.tick, b.tick);
        assert_eq!(a.score, b.score);
        assert_eq!(a.player.pos, b.player.pos);
        assert_eq!(a.enemies.len(), b.enemies.len());
        assert_eq!(a.projectiles.len(), b.projectiles.len());
        for (ea, eb) in a.enemies.iter().zip(&b.enemies) {
            assert_eq!(ea.pos, eb.pos);
            assert_eq!(ea.health, eb.health);
        }
    }

    #[test]
    fn test_bomb_clears_enemy_shots_and_damages() {
        let mut state = CombatState::new(5);
        state.spawn_wave(&wave(&["scout"]));
        state.projectiles.spawn(ProjectileDescriptor::bullet(
            Vec2::new(100.0, 100.0),
            Vec2::ZERO,
            8.0,
            OwnerSide::Enemy,
        ));
        let input = TickInput {
            bomb: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert_eq!(state.player.bombs, 1);
        assert!(
            state
                .projectiles
                .iter()
                .all(|(_, p)| p.owner != OwnerSide::Enemy)
        );
        assert!(state.enemies[0].is_dead(), "bomb damage kills a scout");
        assert!(
            state
                .events
                .iter()
                .any(|e| matches!(e, CombatEvent::BombDetonated))
        );
    }

    #[test]
    fn test_bomb_without_stock_is_noop() {
        let mut state = CombatState::new(5);
        state.player.bombs = 0;
        let input = TickInput {
            bomb: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.player.bombs, 0);
        assert!(
            !state
                .events
                .iter()
                .any(|e| matches!(e, CombatEvent::BombDetonated))
        );
    }

    #[test]
    fn test_powerup_ttl_expires() {
        let mut state = CombatState::new(5);
        let id = state.next_entity_id();
        let mut p = PowerUp::new(id, PowerUpKind::Shield, Vec2::new(100.0, 100.0));
        p.ttl = 0.05;
        state.powerups.push(p);
        for _ in 0..10 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(state.powerups.is_empty());
    }

    #[test]
    fn test_particles_decay_and_release() {
        let mut state = CombatState::new(5);
        state.spawn_particle_burst(Vec2::new(400.0, 300.0), ParticleStyle::Spark, 20);
        assert!(!state.particles.is_empty());
        for _ in 0..180 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(state.particles.is_empty());
    }

    #[test]
    fn test_enemy_exiting_field_is_swept() {
        let mut state = CombatState::new(5);
        state.spawn_wave(&wave(&["scout"]));
        state.enemies[0].pos = Vec2::new(400.0, FIELD_HEIGHT + DESPAWN_MARGIN + 10.0);
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.enemies.is_empty());
    }

    #[test]
    fn test_boss_lifecycle_through_tick() {
        use crate::sim::boss::BossDescriptor;
        let mut state = CombatState::new(5);
        state.spawn_boss(&BossDescriptor {
            template: "dreadnought".into(),
        });
        assert!(state.boss.is_some());
        assert!(
            state
                .events
                .iter()
                .any(|e| matches!(e, CombatEvent::BossSpawned { .. }))
        );
        // Entrance completes on the fixed clock
        for _ in 0..((2.5 / SIM_DT) as usize) {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        let boss = state.boss.as_ref().unwrap();
        assert!(!boss.invulnerable());
    }
}
