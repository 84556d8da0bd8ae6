//! Starlance headless demo
//!
//! Drives a scripted 45-second combat through the fixed-step loop with
//! synthetic frame timestamps: two waves, a boss, and an autopiloted player.
//! Useful for eyeballing the event stream and score flow without a renderer.

use glam::Vec2;

use starlance::consts::SIM_DT;
use starlance::sim::{
    BossDescriptor, CombatEvent, CombatState, Formation, TickInput, WaveDescriptor,
};
use starlance::{GameLoop, Settings};

fn main() {
    env_logger::init();
    log::info!("starlance headless demo starting");

    let mut state = CombatState::new(0xC0FFEE);
    let mut game_loop = GameLoop::new(Settings::default());

    state.spawn_wave(&WaveDescriptor {
        enemies: vec!["scout".into(), "scout".into(), "raider".into(), "scout".into()],
        formation: Formation::Vee,
        difficulty: 1.0,
        spawn_interval: 0.0,
    });

    let step_ms = SIM_DT as f64 * 1000.0;
    let total_frames = 45 * 60;

    for frame in 0..total_frames {
        let now = frame as f64 * step_ms;
        let t = frame as f32 * SIM_DT;

        // Scripted autopilot: weave across the lower field, hold fire,
        // spend one bomb mid-run
        let input = TickInput {
            movement: Vec2::new((t * 0.8).sin(), (t * 0.3).cos() * 0.4),
            fire: true,
            bomb: frame == 1500,
            switch_weapon: frame == 900,
        };

        match frame {
            700 => state.spawn_wave(&WaveDescriptor {
                enemies: vec!["gunner".into(), "weaver".into(), "gunner".into()],
                formation: Formation::Line,
                difficulty: 1.2,
                spawn_interval: 0.4,
            }),
            1800 => state.spawn_boss(&BossDescriptor {
                template: "dreadnought".into(),
            }),
            _ => {}
        }

        let report = game_loop.frame(now, &mut state, &input);
        for event in &report.events {
            match event {
                CombatEvent::BossSpawned { name } => log::info!("boss inbound: {name}"),
                CombatEvent::BossPhaseChanged { phase, name } => {
                    log::info!("boss phase {phase}: {name}")
                }
                CombatEvent::BossDefeated { score, .. } => {
                    log::info!("boss down, +{score}")
                }
                CombatEvent::PlayerDestroyed => log::warn!("player destroyed"),
                _ => {}
            }
        }

        if !state.player.is_alive() {
            break;
        }
    }

    let snapshot = game_loop.snapshot(&state);
    if log::log_enabled!(log::Level::Debug) {
        match serde_json::to_string(&snapshot) {
            Ok(json) => log::debug!("final snapshot: {json}"),
            Err(err) => log::warn!("snapshot serialization failed: {err}"),
        }
    }
    println!(
        "demo over: score {}, xp {}, hp {:.0}%, enemies left {}, boss {}",
        snapshot.score,
        snapshot.experience,
        snapshot.player.health_ratio * 100.0,
        snapshot.enemies.len(),
        if snapshot.boss.is_some() { "alive" } else { "none" },
    );
}
