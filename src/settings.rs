//! Game settings and quality presets
//!
//! The simulation only consumes the particle budget; everything else is
//! advisory for the presentation layer. Persistence belongs to the host.

use serde::{Deserialize, Serialize};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 96,
            QualityPreset::Medium => 256,
            QualityPreset::High => 512,
        }
    }

    /// Trail length multiplier (1.0 = full)
    pub fn trail_quality(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.25,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }

    /// One notch down, used by the auto-quality controller
    pub fn lower(&self) -> Self {
        match self {
            QualityPreset::High => QualityPreset::Medium,
            _ => QualityPreset::Low,
        }
    }

    /// One notch up
    pub fn higher(&self) -> Self {
        match self {
            QualityPreset::Low => QualityPreset::Medium,
            _ => QualityPreset::High,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Let the loop drop/raise quality with measured FPS
    pub auto_quality: bool,
    /// Screen shake on explosions/impacts
    pub screen_shake: bool,
    /// Particle effects
    pub particles: bool,
    /// Show FPS counter
    pub show_fps: bool,
    /// Reduced motion (minimize shake, flashes)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            auto_quality: true,
            screen_shake: true,
            particles: true,
            show_fps: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_round_trip() {
        for preset in [QualityPreset::Low, QualityPreset::Medium, QualityPreset::High] {
            assert_eq!(QualityPreset::from_str(preset.as_str()), Some(preset));
        }
        assert_eq!(QualityPreset::from_str("ultra"), None);
    }

    #[test]
    fn test_particles_off_zeroes_cap() {
        let settings = Settings {
            particles: false,
            ..Default::default()
        };
        assert_eq!(settings.max_particles(), 0);
    }

    #[test]
    fn test_quality_ladder() {
        assert_eq!(QualityPreset::High.lower(), QualityPreset::Medium);
        assert_eq!(QualityPreset::Medium.lower(), QualityPreset::Low);
        assert_eq!(QualityPreset::Low.lower(), QualityPreset::Low);
        assert_eq!(QualityPreset::Low.higher(), QualityPreset::Medium);
        assert_eq!(QualityPreset::High.higher(), QualityPreset::High);
    }
}
