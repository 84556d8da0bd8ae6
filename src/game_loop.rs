//! Fixed timestep game loop
//!
//! The host calls `frame` once per display refresh with a monotonic
//! timestamp; the loop clamps the elapsed time, accumulates it, and drains
//! whole fixed steps through the simulation with a constant dt. At most
//! `MAX_STEPS_PER_FRAME` steps run per callback - any further backlog is
//! discarded, so a stalled host skips ahead instead of spiraling into
//! catch-up. The sub-step remainder is handed back as the render
//! interpolation factor.

use crate::consts::{MAX_STEPS_PER_FRAME, SIM_DT};
use crate::settings::Settings;
use crate::sim::events::CombatEvent;
use crate::sim::snapshot::RenderSnapshot;
use crate::sim::state::{CombatState, TickInput};
use crate::sim::tick::tick;

/// Below this measured FPS the auto-quality controller steps down
const FPS_FLOOR: u32 = 45;
/// At or above this it steps back up
const FPS_RECOVER: u32 = 57;

/// What one frame callback did.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Fixed steps drained this callback
    pub steps: u32,
    /// Leftover accumulator fraction, in [0, 1)
    pub alpha: f32,
    /// Events emitted by the drained steps, in order
    pub events: Vec<CombatEvent>,
}

/// Accumulator-driven fixed-step driver with FPS tracking and advisory
/// quality throttling.
#[derive(Debug, Clone)]
pub struct GameLoop {
    accumulator: f32,
    last_time_ms: Option<f64>,
    settings: Settings,
    // FPS over rolling 1-second windows
    window_start_ms: Option<f64>,
    frames_in_window: u32,
    fps: u32,
    /// Raw elapsed time of the last callback (ms), for diagnostics
    last_frame_ms: f64,
    /// Wall time spent draining fixed steps last callback (ms)
    last_update_ms: f64,
}

impl GameLoop {
    pub fn new(settings: Settings) -> Self {
        Self {
            accumulator: 0.0,
            last_time_ms: None,
            settings,
            window_start_ms: None,
            frames_in_window: 0,
            fps: 0,
            last_frame_ms: 0.0,
            last_update_ms: 0.0,
        }
    }

    /// Drive the simulation for one frame callback.
    ///
    /// One-shot inputs (bomb, weapon switch) only apply to the first drained
    /// step; held inputs apply to all of them.
    pub fn frame(
        &mut self,
        now_ms: f64,
        state: &mut CombatState,
        input: &TickInput,
    ) -> FrameReport {
        let raw_dt = match self.last_time_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => SIM_DT,
        };
        self.last_time_ms = Some(now_ms);
        self.last_frame_ms = (raw_dt * 1000.0) as f64;

        // Stall guard: clamp to twice the drainable budget
        let max_frame = 2.0 * SIM_DT * MAX_STEPS_PER_FRAME as f32;
        self.accumulator += raw_dt.clamp(0.0, max_frame);

        let mut step_input = input.clone();
        let mut steps = 0;
        let mut events = Vec::new();
        let update_start = std::time::Instant::now();
        while self.accumulator >= SIM_DT && steps < MAX_STEPS_PER_FRAME {
            tick(state, &step_input, SIM_DT);
            events.extend(state.drain_events());
            self.accumulator -= SIM_DT;
            steps += 1;
            step_input.bomb = false;
            step_input.switch_weapon = false;
        }
        self.last_update_ms = update_start.elapsed().as_secs_f64() * 1000.0;
        if self.accumulator >= SIM_DT {
            // Cap hit: the backlog is dropped, never played back
            self.accumulator = 0.0;
        }

        if let Some(fps) = self.track_fps(now_ms) {
            self.fps = fps;
            self.auto_adjust_quality();
        }
        state.particle_cap = self.settings.max_particles();

        FrameReport {
            steps,
            alpha: self.accumulator / SIM_DT,
            events,
        }
    }

    /// Capture a render snapshot using the current interpolation factor.
    pub fn snapshot(&self, state: &CombatState) -> RenderSnapshot {
        RenderSnapshot::capture(state, self.accumulator / SIM_DT)
    }

    /// Rolling FPS over the last completed 1-second window
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Raw elapsed time of the last callback, in milliseconds
    pub fn last_frame_ms(&self) -> f64 {
        self.last_frame_ms
    }

    /// Wall time the last callback spent inside the fixed-step drain
    pub fn last_update_ms(&self) -> f64 {
        self.last_update_ms
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Count frames; returns the measured FPS when a 1-second window closes.
    fn track_fps(&mut self, now_ms: f64) -> Option<u32> {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        self.frames_in_window += 1;
        let elapsed = now_ms - start;
        if elapsed < 1000.0 {
            return None;
        }
        let fps = (self.frames_in_window as f64 * 1000.0 / elapsed).round() as u32;
        self.window_start_ms = Some(now_ms);
        self.frames_in_window = 0;
        Some(fps)
    }

    /// Advisory: throttle the particle budget down when FPS sits below the
    /// floor, restore it once the rate recovers near target.
    fn auto_adjust_quality(&mut self) {
        if !self.settings.auto_quality {
            return;
        }
        if self.fps < FPS_FLOOR {
            let lowered = self.settings.quality.lower();
            if lowered != self.settings.quality {
                log::info!(
                    "fps {} below floor, quality {} -> {}",
                    self.fps,
                    self.settings.quality.as_str(),
                    lowered.as_str()
                );
                self.settings.quality = lowered;
            }
        } else if self.fps >= FPS_RECOVER {
            let raised = self.settings.quality.higher();
            if raised != self.settings.quality {
                log::info!(
                    "fps {} recovered, quality {} -> {}",
                    self.fps,
                    self.settings.quality.as_str(),
                    raised.as_str()
                );
                self.settings.quality = raised;
            }
        }
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
