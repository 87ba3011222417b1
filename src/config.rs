//! Game tuning loaded from YAML. Every field has a default, so an empty file
//! is a valid configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_spawn_locations() -> Vec<[f32; 3]> {
    vec![
        [10.8, 0.0, 22.0],
        [25.0, 0.0, 15.0],
        [15.0, 0.0, 35.0],
        [35.0, 0.0, 25.0],
        [5.0, 0.0, 30.0],
        [30.0, 0.0, 5.0],
        [20.0, 0.0, 40.0],
        [40.0, 0.0, 20.0],
    ]
}

fn default_classic_mutants() -> Vec<[f32; 3]> {
    vec![[10.8, 0.0, 22.0]]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Fixes mode randomness; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub waves: WaveConfig,
    #[serde(default)]
    pub survival: SurvivalConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    /// Points enemies spawn at in Waves and Survival.
    #[serde(default = "default_spawn_locations")]
    pub spawn_locations: Vec<[f32; 3]>,
    /// Enemies placed at level setup in Classic.
    #[serde(default = "default_classic_mutants")]
    pub classic_mutants: Vec<[f32; 3]>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            frame: FrameConfig::default(),
            waves: WaveConfig::default(),
            survival: SurvivalConfig::default(),
            player: PlayerConfig::default(),
            spawn_locations: default_spawn_locations(),
            classic_mutants: default_classic_mutants(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Upper bound on a single frame's dt, in seconds.
    pub max_dt: f32,
    pub fixed_step: f32,
    pub max_substeps: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_dt: 1.0 / 30.0,
            fixed_step: 1.0 / 60.0,
            max_substeps: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Countdown between waves.
    pub delay: f32,
    /// Gap between consecutive spawns of one wave.
    pub spawn_spacing: f32,
    pub initial_enemies: u32,
    pub max_enemies: u32,
    pub indicator_hide_delay: f32,
    pub start_banner_duration: f32,
    pub complete_banner_duration: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            delay: 30.0,
            spawn_spacing: 1.0,
            initial_enemies: 3,
            max_enemies: 8,
            indicator_hide_delay: 3.0,
            start_banner_duration: 3.0,
            complete_banner_duration: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    /// Time the safe zone stays put before relocating.
    pub safe_zone_interval: f32,
    /// Declared alongside the interval; no transition reads it.
    pub safe_zone_duration: f32,
    pub safe_zone_radius: f32,
    pub safe_zone_height: f32,
    /// Edge length of the square the safe zone is placed in, centered on the
    /// origin.
    pub map_size: f32,
    pub spawn_period: f32,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            safe_zone_interval: 45.0,
            safe_zone_duration: 10.0,
            safe_zone_radius: 5.0,
            safe_zone_height: 0.5,
            map_size: 40.0,
            spawn_period: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub start_position: [f32; 3],
    pub start_yaw_degrees: f32,
    pub max_health: f32,
    pub hit_damage: f32,
    /// Health per second regained inside the safe zone.
    pub regen_rate: f32,
    pub regen_sound_interval: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_position: [2.14, 1.48, -1.36],
            start_yaw_degrees: -90.0,
            max_health: 100.0,
            hit_damage: 10.0,
            regen_rate: 20.0,
            regen_sound_interval: 0.5,
        }
    }
}

impl PlayerConfig {
    pub fn start_position(&self) -> Vec3 {
        Vec3::from_array(self.start_position)
    }

    pub fn start_rotation(&self) -> Quat {
        Quat::from_axis_angle(Vec3::Y, self.start_yaw_degrees.to_radians())
    }
}

impl GameConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: GameConfig =
            serde_yaml::from_str(text).context("Failed to parse game config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize game config")
    }

    pub fn spawn_points(&self) -> Vec<Vec3> {
        self.spawn_locations
            .iter()
            .copied()
            .map(Vec3::from_array)
            .collect()
    }

    pub fn classic_points(&self) -> Vec<Vec3> {
        self.classic_mutants
            .iter()
            .copied()
            .map(Vec3::from_array)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spawn_locations.is_empty() {
            return Err(ConfigError::Validation(
                "at least one spawn location is required".into(),
            ));
        }

        let positive = [
            ("frame.max_dt", self.frame.max_dt),
            ("frame.fixed_step", self.frame.fixed_step),
            ("waves.delay", self.waves.delay),
            ("survival.safe_zone_interval", self.survival.safe_zone_interval),
            ("survival.safe_zone_duration", self.survival.safe_zone_duration),
            ("survival.safe_zone_radius", self.survival.safe_zone_radius),
            ("survival.map_size", self.survival.map_size),
            ("survival.spawn_period", self.survival.spawn_period),
            ("player.max_health", self.player.max_health),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "{field} must be greater than zero, got {value}"
                )));
            }
        }

        if self.waves.spawn_spacing < 0.0 {
            return Err(ConfigError::Validation(
                "waves.spawn_spacing must not be negative".into(),
            ));
        }

        if self.waves.initial_enemies == 0 {
            return Err(ConfigError::Validation(
                "waves.initial_enemies must be at least 1".into(),
            ));
        }

        if self.waves.max_enemies < self.waves.initial_enemies {
            return Err(ConfigError::Validation(format!(
                "waves.max_enemies ({}) is below waves.initial_enemies ({})",
                self.waves.max_enemies, self.waves.initial_enemies
            )));
        }

        if self.frame.max_substeps == 0 {
            return Err(ConfigError::Validation(
                "frame.max_substeps must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<GameConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: GameConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }
}
