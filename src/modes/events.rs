use glam::Vec3;
use serde::Serialize;

/// State changes the mode manager reports to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeEvent {
    /// Emitted every countdown tick while time remains.
    WaveCountdown { wave: u32, seconds_left: u32 },
    /// Once per displayed second during the last five.
    CountdownBeep { seconds_left: u32, last_seconds: bool },
    WaveStarted { wave: u32, enemies: u32 },
    WaveCompleted { wave: u32, next_wave_in: f32 },
    WavePanelHidden,
    WaveIndicatorHidden,
    EnemySpawnRequested { location: Vec3, accepted: bool },
    SafeZoneActivated { position: Vec3 },
    SafeZoneMoved { position: Vec3 },
    SafeZoneDeactivated,
}
