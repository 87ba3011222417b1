//! Game-mode state machine: Classic, Survival and Waves.
//!
//! The manager owns every timer and spawn cadence. It never touches audio or
//! the HUD; it queues [`ModeEvent`]s for the presentation layer instead.
//! Delayed actions (staggered wave spawns, banner hides) run on the mode
//! clock, so they pause with the game.

mod events;
mod survival;
mod waves;

use std::fmt;

use clap::ValueEnum;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{GameConfig, SurvivalConfig, WaveConfig};
use crate::ecs::{Entity, EntityManager, MUTANT_PREFIX};
use crate::rng::RngManager;

pub use events::ModeEvent;
pub use survival::SafeZoneInfo;

use survival::SurvivalState;
use waves::WaveState;

/// Component whose health decides whether an enemy counts as alive.
pub const CHARACTER_CONTROLLER: &str = "CharacterController";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Classic,
    Survival,
    Waves,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GameMode::Classic => "classic",
            GameMode::Survival => "survival",
            GameMode::Waves => "waves",
        };
        f.write_str(label)
    }
}

/// What the mode manager needs from whoever owns the enemies.
pub trait EnemyRoster {
    /// Asks for one enemy at `location`; `false` when the request was
    /// dropped (for example, spawning is not configured).
    fn request_spawn(&mut self, location: Vec3) -> bool;

    /// Requested enemies that are not registered yet.
    fn spawns_in_flight(&self) -> usize;

    /// Registered enemies still standing.
    fn alive_enemies(&self) -> usize;
}

/// Enemies among `entities`: named with the mutant prefix and reporting
/// health above zero on their character controller.
pub fn count_alive_enemies<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> usize {
    entities
        .into_iter()
        .filter(|entity| {
            entity
                .name()
                .is_some_and(|name| name.starts_with(MUTANT_PREFIX))
        })
        .filter(|entity| {
            entity
                .get_component(CHARACTER_CONTROLLER)
                .and_then(|controller| controller.health())
                .is_some_and(|health| health > 0.0)
        })
        .count()
}

impl EnemyRoster for EntityManager {
    fn request_spawn(&mut self, location: Vec3) -> bool {
        self.spawn_mutant(location).is_some()
    }

    fn spawns_in_flight(&self) -> usize {
        EntityManager::spawns_in_flight(self)
    }

    fn alive_enemies(&self) -> usize {
        count_alive_enemies(self.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    Spawn,
    Emit(ModeEvent),
}

#[derive(Debug, Clone)]
struct Scheduled {
    due: f64,
    action: Deferred,
}

pub struct GameModeManager {
    mode: GameMode,
    waves_config: WaveConfig,
    survival_config: SurvivalConfig,
    spawn_points: Vec<Vec3>,
    clock: f64,
    waves: WaveState,
    survival: SurvivalState,
    scheduled: Vec<Scheduled>,
    events: Vec<ModeEvent>,
    rng: RngManager,
}

impl GameModeManager {
    pub fn new(config: &GameConfig) -> Self {
        Self::with_rng(config, RngManager::seeded_or_entropy(config.seed))
    }

    pub fn with_rng(config: &GameConfig, rng: RngManager) -> Self {
        Self {
            mode: GameMode::Classic,
            waves_config: config.waves.clone(),
            survival_config: config.survival.clone(),
            spawn_points: config.spawn_points(),
            clock: 0.0,
            waves: WaveState::new(&config.waves),
            survival: SurvivalState::default(),
            scheduled: Vec::new(),
            events: Vec::new(),
            rng,
        }
    }

    pub fn set_mode(&mut self, mode: GameMode) {
        info!(from = %self.mode, to = %mode, "game mode set");
        self.reset();
        self.mode = mode;
    }

    /// Returns wave and safe-zone state to their initial values and drops
    /// every delayed action.
    pub fn reset(&mut self) {
        if self.survival.zone.is_some() {
            self.events.push(ModeEvent::SafeZoneDeactivated);
        }
        if self.mode == GameMode::Waves {
            self.events.push(ModeEvent::WavePanelHidden);
            self.events.push(ModeEvent::WaveIndicatorHidden);
        }
        if !self.scheduled.is_empty() {
            debug!(dropped = self.scheduled.len(), "dropping scheduled mode actions");
        }
        self.scheduled.clear();
        self.clock = 0.0;
        self.waves = WaveState::new(&self.waves_config);
        self.survival = SurvivalState::default();
    }

    /// Advances the active mode by `dt` seconds.
    pub fn update(&mut self, dt: f32, roster: &mut dyn EnemyRoster) {
        self.clock += f64::from(dt);
        match self.mode {
            GameMode::Waves => self.update_waves(dt, roster),
            GameMode::Survival => self.update_survival(dt, roster),
            GameMode::Classic => {}
        }
        self.run_due(roster);
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Seconds of game time since the mode was set.
    pub fn mode_clock(&self) -> f64 {
        self.clock
    }

    /// Events raised since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<ModeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[ModeEvent] {
        &self.events
    }

    /// Wave spawns scheduled but not yet requested.
    pub fn queued_spawns(&self) -> usize {
        self.scheduled
            .iter()
            .filter(|scheduled| scheduled.action == Deferred::Spawn)
            .count()
    }

    fn schedule(&mut self, delay: f32, action: Deferred) {
        self.scheduled.push(Scheduled {
            due: self.clock + f64::from(delay),
            action,
        });
    }

    fn run_due(&mut self, roster: &mut dyn EnemyRoster) {
        if self.scheduled.is_empty() {
            return;
        }
        let clock = self.clock;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|scheduled| scheduled.due <= clock);
        self.scheduled = waiting;

        let mut due = due;
        due.sort_by(|a, b| a.due.total_cmp(&b.due));
        for scheduled in due {
            match scheduled.action {
                Deferred::Spawn => self.spawn_enemy(roster),
                Deferred::Emit(event) => self.events.push(event),
            }
        }
    }

    /// `None` when no spawn points are configured.
    fn random_spawn_location(&mut self) -> Option<Vec3> {
        if self.spawn_points.is_empty() {
            return None;
        }
        let index = self
            .rng
            .stream("spawn_points")
            .gen_range(0..self.spawn_points.len());
        Some(self.spawn_points[index])
    }

    fn spawn_enemy(&mut self, roster: &mut dyn EnemyRoster) {
        let Some(location) = self.random_spawn_location() else {
            warn!("no spawn locations configured, enemy spawn skipped");
            return;
        };
        let accepted = roster.request_spawn(location);
        debug!(?location, accepted, clock = self.clock, "enemy spawn requested");
        self.events
            .push(ModeEvent::EnemySpawnRequested { location, accepted });
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn classic_mode_does_nothing_per_tick() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Classic);
        let mut roster = RecordingRoster::default();
        for _ in 0..200 {
            manager.update(0.5, &mut roster);
        }
        assert!(roster.requests.is_empty());
        assert!(manager.drain_events().is_empty());
        assert!(!manager.is_safe_zone_active());
    }

    #[test]
    fn set_mode_resets_sub_state() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Survival);
        let mut roster = RecordingRoster::default();
        manager.update(1.0, &mut roster);
        assert!(manager.is_safe_zone_active());

        manager.set_mode(GameMode::Waves);

        assert_eq!(manager.mode(), GameMode::Waves);
        assert!(!manager.is_safe_zone_active());
        assert_eq!(manager.wave_number(), 1);
        assert_eq!(manager.enemies_per_wave(), 3);
        assert_eq!(manager.mode_clock(), 0.0);
        assert!(manager
            .drain_events()
            .contains(&ModeEvent::SafeZoneDeactivated));
    }

    #[test]
    fn spawn_points_come_from_the_configured_set() {
        let config = GameConfig::default();
        let points = config.spawn_points();
        let mut manager = seeded(&config, GameMode::Classic);
        for _ in 0..50 {
            let location = manager.random_spawn_location().unwrap();
            assert!(points.contains(&location));
        }
    }

    #[test]
    fn refused_spawns_are_reported_not_fatal() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Classic);
        let mut roster = RecordingRoster {
            refuse: true,
            ..Default::default()
        };
        manager.spawn_enemy(&mut roster);
        assert!(matches!(
            manager.drain_events().as_slice(),
            [ModeEvent::EnemySpawnRequested { accepted: false, .. }]
        ));
    }

    #[test]
    fn empty_spawn_set_skips_wave_spawns() {
        let mut config = GameConfig::default();
        config.spawn_locations.clear();
        config.waves.delay = 0.1;
        let mut manager = seeded(&config, GameMode::Waves);
        let mut roster = RecordingRoster::default();

        for _ in 0..30 {
            manager.update(0.2, &mut roster);
        }

        assert!(roster.requests.is_empty());
        assert!(!manager
            .drain_events()
            .iter()
            .any(|event| matches!(event, ModeEvent::EnemySpawnRequested { .. })));
        assert!(manager.wave_number() > 1);
    }

    #[test]
    fn mode_names_round_trip_through_serde() {
        let text = serde_json::to_string(&GameMode::Survival).unwrap();
        assert_eq!(text, "\"survival\"");
        assert_eq!(GameMode::Waves.to_string(), "waves");
    }
}
