//! Game settings and balance
//!
//! Loaded from a JSON file when one is given; every field has a default so
//! partial files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{POINTS_PER_LEVEL, SIM_DT};

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Game settings/balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Falling ===
    /// Fall speed at level 1 (world units per second)
    pub base_fall_speed: f32,
    /// Extra fall speed per level above 1
    pub fall_speed_increment: f32,
    /// Speed multiplier while fast drop is held
    pub fast_drop_multiplier: f32,
    /// Distance from the sphere center where new tiles appear (world +Y)
    pub spawn_height: f32,

    // === Game over ===
    /// World height a tile in the outermost layer must exceed to end the run
    pub game_over_height: f32,

    // === Timing ===
    /// Duration of the flash/fade of a cleared layer
    pub clear_fade_secs: f32,
    /// Pause between two consecutive layer clears
    pub inter_clear_delay_secs: f32,
    /// Ticks to wait after a landing before checking completions
    pub completion_check_delay_ticks: u32,

    // === Controls ===
    /// Sphere rotation rate for full stick deflection (radians per second)
    pub sphere_turn_speed: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_fall_speed: 1.5,
            fall_speed_increment: 0.25,
            fast_drop_multiplier: 5.0,
            spawn_height: 8.0,

            game_over_height: 3.6,

            clear_fade_secs: 0.6,
            inter_clear_delay_secs: 0.4,
            completion_check_delay_ticks: 1,

            sphere_turn_speed: 2.0,
        }
    }
}

impl Settings {
    /// Level reached at a given score (1-based)
    pub fn level_for_score(score: u64) -> u32 {
        (score / POINTS_PER_LEVEL) as u32 + 1
    }

    /// Fall speed for a level
    pub fn fall_speed(&self, level: u32) -> f32 {
        self.base_fall_speed + level.saturating_sub(1) as f32 * self.fall_speed_increment
    }

    /// Fade duration in simulation ticks
    pub fn clear_fade_ticks(&self) -> u32 {
        secs_to_ticks(self.clear_fade_secs)
    }

    /// Inter-clear delay in simulation ticks
    pub fn inter_clear_delay_ticks(&self) -> u32 {
        secs_to_ticks(self.inter_clear_delay_secs)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Read settings from a JSON file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Using default settings ({})", e);
                Self::default()
            }
        }
    }
}

fn secs_to_ticks(secs: f32) -> u32 {
    (secs.max(0.0) / SIM_DT).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_score() {
        assert_eq!(Settings::level_for_score(0), 1);
        assert_eq!(Settings::level_for_score(999), 1);
        assert_eq!(Settings::level_for_score(1000), 2);
        assert_eq!(Settings::level_for_score(3500), 4);
    }

    #[test]
    fn test_fall_speed_grows_with_level() {
        let settings = Settings::default();
        assert_eq!(settings.fall_speed(1), settings.base_fall_speed);
        assert!(settings.fall_speed(3) > settings.fall_speed(2));
        let expected = settings.base_fall_speed + 2.0 * settings.fall_speed_increment;
        assert!((settings.fall_speed(3) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "base_fall_speed": 3.0 }"#).unwrap();
        assert_eq!(settings.base_fall_speed, 3.0);
        assert_eq!(settings.spawn_height, Settings::default().spawn_height);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default("/definitely/not/here.json");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_tick_conversion() {
        let settings = Settings::default();
        assert_eq!(settings.clear_fade_ticks(), 36);
        assert_eq!(settings.inter_clear_delay_ticks(), 24);
    }
}
