//! One play session: owns the entity registry, the mode state machine and
//! the collaborators, and runs the per-frame order.

use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::ecs::{Entity, EntityManager};
use crate::error::SessionError;
use crate::headless::{DummyTemplate, FixedStepWorld, LogAudio, LogHud, NullScene};
use crate::interfaces::{AudioCues, Hud, PhysicsWorld, Scene};
use crate::modes::{count_alive_enemies, GameMode, GameModeManager, ModeEvent, SafeZoneInfo};
use crate::player::{PlayerHealth, PLAYER_ENTITY, PLAYER_HEALTH};
use crate::presentation::Presenter;
use crate::safe_zone::{SafeZoneMarker, SAFE_ZONE_ENTITY, SAFE_ZONE_MARKER};
use crate::spawn::{EnemyTemplate, SpawnConfig};

/// Largest x or z drift before the safe-zone marker is moved.
const MARKER_TOLERANCE: f32 = 0.1;

/// Enemy lifetime used when no template is supplied.
pub const DEFAULT_ENEMY_LIFETIME: f32 = 8.0;

pub struct SessionBuilder {
    config: GameConfig,
    physics: Option<Arc<dyn PhysicsWorld>>,
    scene: Option<Arc<dyn Scene>>,
    template: Option<Arc<dyn EnemyTemplate>>,
    audio: Option<Arc<dyn AudioCues>>,
    hud: Option<Arc<dyn Hud>>,
}

impl SessionBuilder {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            physics: None,
            scene: None,
            template: None,
            audio: None,
            hud: None,
        }
    }

    pub fn with_physics(mut self, physics: Arc<dyn PhysicsWorld>) -> Self {
        self.physics = Some(physics);
        self
    }

    pub fn with_scene(mut self, scene: Arc<dyn Scene>) -> Self {
        self.scene = Some(scene);
        self
    }

    pub fn with_template(mut self, template: Arc<dyn EnemyTemplate>) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioCues>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_hud(mut self, hud: Arc<dyn Hud>) -> Self {
        self.hud = Some(hud);
        self
    }

    /// Missing collaborators fall back to the headless ones. Spawn tasks run
    /// on `runtime`.
    pub fn build(self, runtime: Handle) -> Session {
        let fixed_step = self.config.frame.fixed_step;
        let physics = self
            .physics
            .unwrap_or_else(|| Arc::new(FixedStepWorld::new(fixed_step)));
        let scene = self.scene.unwrap_or_else(|| Arc::new(NullScene));
        let template = self
            .template
            .unwrap_or_else(|| Arc::new(DummyTemplate::new(Some(DEFAULT_ENEMY_LIFETIME))));
        let audio = self.audio.unwrap_or_else(|| Arc::new(LogAudio::new()));
        let hud = self.hud.unwrap_or_else(|| Arc::new(LogHud::new()));

        Session {
            modes: GameModeManager::new(&self.config),
            entities: EntityManager::new().with_runtime(runtime),
            presenter: Presenter::new(audio, hud),
            physics,
            scene,
            template,
            config: self.config,
            current_mode: None,
            paused: false,
            frame: 0,
            time: 0.0,
        }
    }
}

/// Wave progress as of the end of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaveReport {
    pub number: u32,
    pub active: bool,
    pub enemies_per_wave: u32,
    pub timer: f32,
}

/// What happened during one [`Session::step`].
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub time: f64,
    pub dt: f32,
    /// True when the frame was skipped because the session is paused.
    pub paused: bool,
    pub substeps: u32,
    pub mode: Option<GameMode>,
    pub wave: Option<WaveReport>,
    pub safe_zone: Option<SafeZoneInfo>,
    pub entities: usize,
    pub alive_enemies: usize,
    pub spawns_in_flight: usize,
    pub player_health: Option<f32>,
    pub player_in_safe_zone: bool,
    pub events: Vec<ModeEvent>,
}

pub struct Session {
    config: GameConfig,
    entities: EntityManager,
    modes: GameModeManager,
    presenter: Presenter,
    physics: Arc<dyn PhysicsWorld>,
    scene: Arc<dyn Scene>,
    template: Arc<dyn EnemyTemplate>,
    current_mode: Option<GameMode>,
    paused: bool,
    frame: u64,
    time: f64,
}

impl Session {
    /// Builds the level for `mode` and starts it. Anything left from a
    /// previous run is cleaned up first; a level that fails to assemble
    /// leaves the running one untouched.
    pub fn start(&mut self, mode: GameMode) -> Result<(), SessionError> {
        info!(%mode, "starting session");
        let level = self.build_level(mode)?;

        self.entities.clear();
        self.entities.configure_spawns(SpawnConfig {
            template: self.template.clone(),
            scene: self.scene.clone(),
            physics: self.physics.clone(),
        });
        for entity in level {
            self.entities.add(entity);
        }

        self.entities.end_setup();
        self.modes.set_mode(mode);
        self.present_pending();

        let hud = self.presenter.hud().clone();
        hud.show_death_screen(false);
        hud.show_survival_radar(false);
        hud.show_safe_zone_indicator(false);
        self.current_mode = Some(mode);
        self.paused = false;
        self.frame = 0;
        self.time = 0.0;
        Ok(())
    }

    fn build_level(&mut self, mode: GameMode) -> Result<Vec<Entity>, SessionError> {
        let mut player = Entity::named(PLAYER_ENTITY).with_component(PlayerHealth::new(
            &self.config.player,
            self.presenter.audio().clone(),
            self.presenter.hud().clone(),
        ))?;
        player.set_position(self.config.player.start_position());
        player.set_rotation(self.config.player.start_rotation());
        let mut level = vec![player];

        match mode {
            GameMode::Classic => {
                for location in self.config.classic_points() {
                    let name = self.entities.next_mutant_name();
                    let mut mutant = Entity::named(name);
                    mutant.set_position(location);
                    let model = self.template.instantiate_model();
                    for component in self.template.assemble(model, &self.scene, &self.physics) {
                        mutant.add_component(component)?;
                    }
                    level.push(mutant);
                }
            }
            GameMode::Survival => {
                level.push(
                    Entity::named(SAFE_ZONE_ENTITY).with_component(SafeZoneMarker::new())?,
                );
            }
            GameMode::Waves => {}
        }
        Ok(level)
    }

    /// Runs one frame of `elapsed` seconds, clamped to the configured
    /// maximum. Does nothing while paused.
    pub fn step(&mut self, elapsed: f32) -> FrameReport {
        if self.paused || self.current_mode.is_none() {
            return self.report(0.0, 0, Vec::new(), true);
        }

        let dt = elapsed.clamp(0.0, self.config.frame.max_dt);
        self.frame += 1;
        self.time += f64::from(dt);

        let entities = &mut self.entities;
        let substeps = self.physics.step_simulation(
            dt,
            self.config.frame.max_substeps,
            &mut |world, step| entities.physics_update(world, step),
        );

        self.modes.update(dt, &mut self.entities);
        let events = self.modes.drain_events();
        self.presenter.present(&events);

        if self.modes.mode() == GameMode::Survival {
            self.bridge_safe_zone();
        }

        self.entities.update(dt);
        self.check_player_death();

        self.report(dt, substeps, events, false)
    }

    /// Restarts in the mode that was last started.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        let mode = self.current_mode.unwrap_or(GameMode::Classic);
        info!(%mode, "retrying");
        self.start(mode)
    }

    /// Tears the level down and resets every manager.
    pub fn exit_to_menu(&mut self) {
        info!("exiting to menu");
        self.entities.clear();
        self.modes.set_mode(GameMode::Classic);
        self.present_pending();

        let hud = self.presenter.hud();
        hud.show_death_screen(false);
        hud.hide_wave_panel();
        hud.hide_wave_indicator();
        hud.show_survival_radar(false);
        hud.show_safe_zone_indicator(false);

        self.current_mode = None;
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn current_mode(&self) -> Option<GameMode> {
        self.current_mode
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.entities
    }

    pub fn modes(&self) -> &GameModeManager {
        &self.modes
    }

    pub fn player_health(&self) -> Option<&PlayerHealth> {
        self.entities
            .get(PLAYER_ENTITY)?
            .component::<PlayerHealth>(PLAYER_HEALTH)
    }

    fn present_pending(&mut self) {
        let events = self.modes.drain_events();
        self.presenter.present(&events);
    }

    /// Keeps the marker, radar and player flags in line with the safe zone.
    fn bridge_safe_zone(&mut self) {
        let zone = self.modes.safe_zone_position();

        if let Some(marker) = self.entities.get_mut(SAFE_ZONE_ENTITY) {
            let current = marker.position();
            match zone {
                Some(zone) => {
                    let drifted = (current.x - zone.x).abs() > MARKER_TOLERANCE
                        || (current.z - zone.z).abs() > MARKER_TOLERANCE;
                    let hidden = marker
                        .component::<SafeZoneMarker>(SAFE_ZONE_MARKER)
                        .is_some_and(|marker| !marker.is_visible());
                    if drifted || hidden {
                        debug!(?zone, "moving safe zone marker");
                        marker.set_position(zone);
                        if let Some(marker) =
                            marker.component_mut::<SafeZoneMarker>(SAFE_ZONE_MARKER)
                        {
                            marker.show();
                        }
                    }
                }
                None => {
                    if let Some(marker) = marker.component_mut::<SafeZoneMarker>(SAFE_ZONE_MARKER) {
                        marker.hide();
                    }
                }
            }
        }

        let Some(player_position) = self.entities.get(PLAYER_ENTITY).map(Entity::position) else {
            return;
        };
        let inside = self.modes.is_player_in_safe_zone(player_position);
        if let Some(health) = self
            .entities
            .get_mut(PLAYER_ENTITY)
            .and_then(|player| player.component_mut::<PlayerHealth>(PLAYER_HEALTH))
        {
            health.set_in_safe_zone(inside);
        }

        let hud = self.presenter.hud();
        if let Some(zone) = zone {
            hud.update_radar(player_position, zone);
        }
        hud.show_safe_zone_indicator(inside);
    }

    fn check_player_death(&mut self) {
        let dead = self.player_health().is_some_and(PlayerHealth::is_dead);
        if dead && !self.paused {
            info!(frame = self.frame, "player is dead, pausing");
            self.paused = true;
            self.presenter.hud().show_death_screen(true);
        }
    }

    fn report(&self, dt: f32, substeps: u32, events: Vec<ModeEvent>, paused: bool) -> FrameReport {
        let mode = self.current_mode;
        let player = self.player_health();
        FrameReport {
            frame: self.frame,
            time: self.time,
            dt,
            paused,
            substeps,
            mode,
            wave: (mode == Some(GameMode::Waves)).then(|| WaveReport {
                number: self.modes.wave_number(),
                active: self.modes.is_wave_active(),
                enemies_per_wave: self.modes.enemies_per_wave(),
                timer: self.modes.wave_timer(),
            }),
            safe_zone: (mode == Some(GameMode::Survival)).then(|| self.modes.safe_zone_info()),
            entities: self.entities.len(),
            alive_enemies: count_alive_enemies(self.entities.iter()),
            spawns_in_flight: self.entities.spawns_in_flight(),
            player_health: player.map(PlayerHealth::current_health),
            player_in_safe_zone: player.is_some_and(PlayerHealth::is_in_safe_zone),
            events,
        }
    }
}
