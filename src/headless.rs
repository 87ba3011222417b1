//! Stand-ins for the rendering, physics, audio and HUD collaborators, so the
//! game logic runs from the command line and under test.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec3;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ecs::{Component, ComponentContext, Event};
use crate::interfaces::{AudioCues, Hud, PhysicsWorld, Scene};
use crate::modes::CHARACTER_CONTROLLER;
use crate::player::{HIT_TOPIC, PLAYER_ENTITY};
use crate::spawn::{EnemyTemplate, ModelInstance};

#[derive(Debug, Default)]
struct StepState {
    accumulator: f32,
    steps: u64,
}

/// Physics world that only keeps time: a fixed-step accumulator.
#[derive(Debug)]
pub struct FixedStepWorld {
    fixed_step: f32,
    state: Mutex<StepState>,
}

impl FixedStepWorld {
    pub fn new(fixed_step: f32) -> Self {
        Self {
            fixed_step,
            state: Mutex::new(StepState::default()),
        }
    }

    pub fn fixed_step(&self) -> f32 {
        self.fixed_step
    }

    /// Sub-steps taken since creation.
    pub fn steps_taken(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .steps
    }
}

impl PhysicsWorld for FixedStepWorld {
    fn step_simulation(
        &self,
        dt: f32,
        max_substeps: u32,
        on_substep: &mut dyn FnMut(&dyn PhysicsWorld, f32),
    ) -> u32 {
        let substeps = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.accumulator += dt;
            let mut substeps = 0;
            while state.accumulator >= self.fixed_step && substeps < max_substeps {
                state.accumulator -= self.fixed_step;
                substeps += 1;
            }
            if state.accumulator >= self.fixed_step {
                debug!(
                    behind = state.accumulator,
                    "physics fell behind, dropping accumulated time"
                );
                state.accumulator = 0.0;
            }
            state.steps += u64::from(substeps);
            substeps
        };

        for _ in 0..substeps {
            on_substep(self, self.fixed_step);
        }
        substeps
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct NullScene;

impl Scene for NullScene {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The per-instance model a [`DummyTemplate`] hands out.
#[derive(Debug, Clone)]
pub struct DummyModel {
    pub clips: Vec<&'static str>,
}

/// Enemy blueprint for headless runs: a walker that loses health over time.
#[derive(Debug, Clone)]
pub struct DummyTemplate {
    lifetime: Option<f32>,
    speed: f32,
}

impl DummyTemplate {
    /// Enemies die after `lifetime` seconds; `None` keeps them alive.
    pub fn new(lifetime: Option<f32>) -> Self {
        Self {
            lifetime,
            speed: 2.0,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

impl EnemyTemplate for DummyTemplate {
    fn instantiate_model(&self) -> ModelInstance {
        Box::new(DummyModel {
            clips: vec!["idle", "walk", "attack", "die"],
        })
    }

    fn assemble(
        &self,
        model: ModelInstance,
        _scene: &Arc<dyn Scene>,
        _physics: &Arc<dyn PhysicsWorld>,
    ) -> Vec<Box<dyn Component>> {
        let clips = match model.downcast::<DummyModel>() {
            Ok(model) => model.clips.len(),
            Err(_) => {
                warn!("enemy model is not a dummy model");
                0
            }
        };
        debug!(clips, "assembling dummy enemy");
        vec![Box::new(
            DummyController::new(self.lifetime).with_speed(self.speed),
        )]
    }
}

/// Enemy controller: walks toward the player, hits when close and withers
/// over its lifetime.
#[derive(Debug, Clone)]
pub struct DummyController {
    health: f32,
    decay_per_second: f32,
    speed: f32,
    attack_range: f32,
    attack_interval: f32,
    attack_cooldown: f32,
}

impl DummyController {
    pub const MAX_HEALTH: f32 = 100.0;

    pub fn new(lifetime: Option<f32>) -> Self {
        let decay_per_second = match lifetime {
            Some(lifetime) if lifetime > 0.0 => Self::MAX_HEALTH / lifetime,
            Some(_) => f32::INFINITY,
            None => 0.0,
        };
        Self {
            health: Self::MAX_HEALTH,
            decay_per_second,
            speed: 2.0,
            attack_range: 1.5,
            attack_interval: 1.0,
            attack_cooldown: 0.0,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn kill(&mut self) {
        self.health = 0.0;
    }
}

impl Component for DummyController {
    fn name(&self) -> &str {
        CHARACTER_CONTROLLER
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) {
        if !self.is_alive() {
            return;
        }
        self.health = (self.health - self.decay_per_second * dt).max(0.0);
        if !self.is_alive() {
            debug!(enemy = ctx.entity_name(), "enemy died");
            return;
        }

        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
        if self.attack_cooldown > 0.0 {
            return;
        }
        let position = ctx.position();
        let source = ctx.entity_id();
        let Some(player) = ctx.find_entity_mut(PLAYER_ENTITY) else {
            return;
        };
        if player.position().distance(position) <= self.attack_range {
            let mut hit = Event::new(HIT_TOPIC);
            if let Some(source) = source {
                hit = hit.with_source(source);
            }
            player.broadcast(&hit);
            self.attack_cooldown = self.attack_interval;
        }
    }

    fn physics_update(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        _world: &dyn PhysicsWorld,
        dt: f32,
    ) {
        if !self.is_alive() {
            return;
        }
        let Some(target) = ctx.find_entity(PLAYER_ENTITY).map(|player| player.position()) else {
            return;
        };
        let position = ctx.position();
        let mut offset = target - position;
        offset.y = 0.0;
        let distance = offset.length();
        if distance <= self.attack_range {
            return;
        }
        let step = (self.speed * dt).min(distance - self.attack_range);
        ctx.set_position(position + offset / distance * step);
    }

    fn health(&self) -> Option<f32> {
        Some(self.health)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Audio that logs each cue and remembers the order they played in.
#[derive(Debug, Default)]
pub struct LogAudio {
    played: Mutex<Vec<&'static str>>,
}

impl LogAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<&'static str> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, cue: &str) -> usize {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|played| **played == cue)
            .count()
    }

    fn play(&self, cue: &'static str) {
        debug!(cue, "audio cue");
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cue);
    }
}

impl AudioCues for LogAudio {
    fn countdown_beep(&self) {
        self.play("countdown_beep");
    }

    fn final_countdown_beep(&self) {
        self.play("final_countdown_beep");
    }

    fn wave_start(&self) {
        self.play("wave_start");
    }

    fn wave_complete(&self) {
        self.play("wave_complete");
    }

    fn safe_zone(&self) {
        self.play("safe_zone");
    }

    fn health_regen(&self) {
        self.play("health_regen");
    }

    fn enemy_hit(&self) {
        self.play("enemy_hit");
    }

    fn player_death(&self) {
        self.play("player_death");
    }
}

/// What a [`LogHud`] currently shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HudState {
    pub wave_panel: Option<String>,
    pub wave_indicator: Option<u32>,
    pub safe_zone_indicator: bool,
    pub radar_visible: bool,
    /// Planar distance from the player to the safe zone, as last shown.
    pub radar_distance: Option<f32>,
    pub health_percent: f32,
    pub death_screen: bool,
}

/// HUD that keeps its display state in memory and logs changes.
#[derive(Debug)]
pub struct LogHud {
    state: Mutex<HudState>,
}

impl Default for LogHud {
    fn default() -> Self {
        Self {
            state: Mutex::new(HudState {
                health_percent: 100.0,
                ..HudState::default()
            }),
        }
    }
}

impl LogHud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HudState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_state(&self, change: impl FnOnce(&mut HudState)) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut state);
    }
}

impl Hud for LogHud {
    fn show_wave_countdown(&self, wave: u32, seconds_left: u32) {
        let text = format!("WAVE {wave} INCOMING {seconds_left}");
        self.with_state(|state| {
            if state.wave_panel.as_deref() != Some(text.as_str()) {
                debug!(wave, seconds_left, "wave countdown");
                state.wave_panel = Some(text);
            }
        });
    }

    fn show_wave_announcement(&self, title: &str, subtitle: &str) {
        info!(title, subtitle, "wave announcement");
        self.with_state(|state| state.wave_panel = Some(format!("{title} {subtitle}")));
    }

    fn hide_wave_panel(&self) {
        self.with_state(|state| state.wave_panel = None);
    }

    fn show_wave_indicator(&self, wave: u32) {
        self.with_state(|state| state.wave_indicator = Some(wave));
    }

    fn hide_wave_indicator(&self) {
        self.with_state(|state| state.wave_indicator = None);
    }

    fn show_safe_zone_indicator(&self, visible: bool) {
        self.with_state(|state| {
            if state.safe_zone_indicator != visible {
                info!(visible, "safe zone indicator");
                state.safe_zone_indicator = visible;
            }
        });
    }

    fn show_survival_radar(&self, visible: bool) {
        self.with_state(|state| {
            state.radar_visible = visible;
            if !visible {
                state.radar_distance = None;
            }
        });
    }

    fn update_radar(&self, player: Vec3, zone: Vec3) {
        let planar = Vec3::new(zone.x - player.x, 0.0, zone.z - player.z).length();
        self.with_state(|state| state.radar_distance = Some(planar));
    }

    fn set_health(&self, percent: f32) {
        self.with_state(|state| state.health_percent = percent);
    }

    fn show_death_screen(&self, visible: bool) {
        if visible {
            info!("death screen shown");
        }
        self.with_state(|state| state.death_screen = visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Entity, EntityManager, FollowUps};

    #[test]
    fn fixed_step_world_counts_whole_steps() {
        let world = FixedStepWorld::new(0.25);
        let mut seen = Vec::new();
        let steps = world.step_simulation(0.6, 10, &mut |_, dt| seen.push(dt));
        assert_eq!(steps, 2);
        assert_eq!(seen, vec![0.25, 0.25]);

        // 0.1 carried over plus 0.15 makes one more.
        assert_eq!(world.step_simulation(0.15, 10, &mut |_, _| {}), 1);
        assert_eq!(world.steps_taken(), 3);
    }

    #[test]
    fn fixed_step_world_caps_substeps_and_drops_backlog() {
        let world = FixedStepWorld::new(0.25);
        assert_eq!(world.step_simulation(10.0, 4, &mut |_, _| {}), 4);
        assert_eq!(world.step_simulation(0.0, 4, &mut |_, _| {}), 0);
    }

    #[test]
    fn controller_withers_over_its_lifetime() {
        let mut manager = EntityManager::new();
        manager.add(
            Entity::named("Mutant0")
                .with_component(DummyController::new(Some(2.0)))
                .unwrap(),
        );
        manager.end_setup();
        manager.update(1.0);
        let health = manager
            .get("Mutant0")
            .and_then(|enemy| enemy.get_component(CHARACTER_CONTROLLER))
            .and_then(|controller| controller.health());
        assert_eq!(health, Some(50.0));

        manager.update(1.5);
        let controller = manager
            .get("Mutant0")
            .and_then(|enemy| enemy.component::<DummyController>(CHARACTER_CONTROLLER))
            .unwrap();
        assert!(!controller.is_alive());
    }

    #[test]
    fn controller_walks_to_player_and_hits() {
        let hits = Arc::new(Mutex::new(0));
        let mut player = Entity::named(PLAYER_ENTITY);
        let counter = hits.clone();
        player.register_event_handler(
            HIT_TOPIC,
            Box::new(move |_: &Event, _: &mut FollowUps| *counter.lock().unwrap() += 1),
        );

        let mut manager = EntityManager::new();
        manager.add(player);
        let mut enemy = Entity::named("Mutant0")
            .with_component(DummyController::new(None).with_speed(4.0))
            .unwrap();
        enemy.set_position(Vec3::new(5.5, 0.0, 0.0));
        manager.add(enemy);
        manager.end_setup();

        let world = FixedStepWorld::new(0.25);
        // Four steps to close in, then three more inside the attack cooldown.
        for _ in 0..7 {
            world.step_simulation(0.25, 10, &mut |world, dt| manager.physics_update(world, dt));
            manager.update(0.25);
        }

        let enemy = manager.get("Mutant0").unwrap();
        assert!((enemy.position().x - 1.5).abs() < 1e-4);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn log_hud_tracks_display_state() {
        let hud = LogHud::new();
        hud.show_wave_countdown(1, 5);
        hud.show_wave_indicator(1);
        hud.show_survival_radar(true);
        hud.update_radar(Vec3::new(0.0, 1.5, 0.0), Vec3::new(3.0, 0.5, 4.0));
        hud.set_health(40.0);

        let state = hud.snapshot();
        assert_eq!(state.wave_panel.as_deref(), Some("WAVE 1 INCOMING 5"));
        assert_eq!(state.wave_indicator, Some(1));
        assert_eq!(state.radar_distance, Some(5.0));
        assert_eq!(state.health_percent, 40.0);

        hud.hide_wave_panel();
        hud.show_survival_radar(false);
        let state = hud.snapshot();
        assert!(state.wave_panel.is_none());
        assert!(state.radar_distance.is_none());
    }

    #[test]
    fn log_audio_remembers_cues() {
        let audio = LogAudio::new();
        audio.countdown_beep();
        audio.final_countdown_beep();
        audio.countdown_beep();
        assert_eq!(audio.count("countdown_beep"), 2);
        assert_eq!(
            audio.played(),
            vec!["countdown_beep", "final_countdown_beep", "countdown_beep"]
        );
    }
}
