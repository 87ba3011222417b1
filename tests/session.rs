use std::sync::Arc;
use std::time::Duration;

use mutant_arena::{
    config::GameConfig,
    ecs::{Component, Event},
    error::SessionError,
    headless::{DummyController, DummyTemplate, LogAudio, LogHud},
    interfaces::{PhysicsWorld, Scene},
    modes::{GameMode, ModeEvent},
    player::{HIT_TOPIC, PLAYER_ENTITY},
    safe_zone::{SafeZoneMarker, SAFE_ZONE_ENTITY, SAFE_ZONE_MARKER},
    spawn::{EnemyTemplate, ModelInstance},
    Session, SessionBuilder,
};
use tokio::runtime::Handle;

/// Attaches a second `CharacterController`, which every entity rejects.
struct DoubledTemplate(DummyTemplate);

impl EnemyTemplate for DoubledTemplate {
    fn instantiate_model(&self) -> ModelInstance {
        self.0.instantiate_model()
    }

    fn assemble(
        &self,
        model: ModelInstance,
        scene: &Arc<dyn Scene>,
        physics: &Arc<dyn PhysicsWorld>,
    ) -> Vec<Box<dyn Component>> {
        let mut components = self.0.assemble(model, scene, physics);
        components.push(Box::new(DummyController::new(None)));
        components
    }
}

struct Rig {
    session: Session,
    audio: Arc<LogAudio>,
    hud: Arc<LogHud>,
}

fn rig(config: GameConfig, enemy_lifetime: Option<f32>) -> Rig {
    let audio = Arc::new(LogAudio::new());
    let hud = Arc::new(LogHud::new());
    let session = SessionBuilder::new(config)
        .with_template(Arc::new(DummyTemplate::new(enemy_lifetime)))
        .with_audio(audio.clone())
        .with_hud(hud.clone())
        .build(Handle::current());
    Rig {
        session,
        audio,
        hud,
    }
}

fn seeded() -> GameConfig {
    GameConfig {
        seed: Some(11),
        ..GameConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn classic_start_builds_player_and_static_mutants() {
    let mut rig = rig(seeded(), None);
    rig.session.start(GameMode::Classic).unwrap();

    let entities = rig.session.entities();
    let player = entities.get(PLAYER_ENTITY).expect("player exists");
    assert_eq!(player.position(), rig.session.config().player.start_position());
    assert!(entities.get("Mutant0").is_some());
    assert_eq!(entities.len(), 2);
    assert_eq!(rig.session.player_health().unwrap().current_health(), 100.0);
    assert_eq!(rig.hud.snapshot().health_percent, 100.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn frame_time_is_clamped() {
    let mut rig = rig(seeded(), None);
    rig.session.start(GameMode::Classic).unwrap();

    let report = rig.session.step(1.0);

    assert_eq!(report.dt, 1.0 / 30.0);
    assert_eq!(report.frame, 1);
    assert!(report.substeps >= 1);
    assert!(!report.paused);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn survival_marker_follows_zone_and_player_regenerates() {
    let mut rig = rig(seeded(), None);
    rig.session.start(GameMode::Survival).unwrap();

    let report = rig.session.step(1.0 / 30.0);
    let zone = report
        .safe_zone
        .and_then(|info| info.position)
        .expect("zone active after first frame");
    assert!(report
        .events
        .iter()
        .any(|event| matches!(event, ModeEvent::SafeZoneActivated { .. })));

    let marker = rig.session.entities().get(SAFE_ZONE_ENTITY).unwrap();
    assert_eq!(marker.position(), zone);
    assert!(marker
        .component::<SafeZoneMarker>(SAFE_ZONE_MARKER)
        .unwrap()
        .is_visible());
    assert!(rig.hud.snapshot().radar_visible);

    let player = rig.session.entities_mut().get_mut(PLAYER_ENTITY).unwrap();
    player.set_position(zone);
    player.broadcast(&Event::new(HIT_TOPIC).with_amount(50.0));

    let mut last = rig.session.step(1.0 / 30.0);
    assert!(last.player_in_safe_zone);
    assert!(rig.hud.snapshot().safe_zone_indicator);
    for _ in 0..30 {
        last = rig.session.step(1.0 / 30.0);
    }
    let health = last.player_health.unwrap();
    assert!(health > 65.0 && health <= 100.0, "{health}");
    assert!(rig.audio.count("health_regen") > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn death_pauses_until_retry() {
    let mut rig = rig(seeded(), None);
    rig.session.start(GameMode::Waves).unwrap();
    rig.session.step(1.0 / 30.0);

    rig.session
        .entities_mut()
        .get_mut(PLAYER_ENTITY)
        .unwrap()
        .broadcast(&Event::new(HIT_TOPIC).with_amount(500.0));
    let report = rig.session.step(1.0 / 30.0);
    assert!(rig.session.is_paused());
    assert_eq!(report.player_health, Some(0.0));
    assert!(rig.hud.snapshot().death_screen);
    assert_eq!(rig.audio.count("player_death"), 1);

    let frozen = rig.session.step(1.0 / 30.0);
    assert!(frozen.paused);
    assert_eq!(frozen.frame, report.frame);

    rig.session.retry().unwrap();
    assert!(!rig.session.is_paused());
    assert_eq!(rig.session.current_mode(), Some(GameMode::Waves));
    assert_eq!(rig.session.player_health().unwrap().current_health(), 100.0);
    assert!(!rig.hud.snapshot().death_screen);
    assert_eq!(rig.session.modes().wave_number(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exit_to_menu_clears_everything() {
    let mut rig = rig(seeded(), None);
    rig.session.start(GameMode::Survival).unwrap();
    rig.session.step(1.0 / 30.0);

    rig.session.exit_to_menu();

    assert!(rig.session.entities().is_empty());
    assert_eq!(rig.session.current_mode(), None);
    assert!(!rig.session.modes().is_safe_zone_active());
    let hud = rig.hud.snapshot();
    assert!(!hud.radar_visible);
    assert!(hud.wave_panel.is_none());
    assert!(rig.session.step(1.0 / 30.0).paused);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waves_session_spawns_and_completes_a_wave() {
    let mut config = seeded();
    config.waves.delay = 1.0;
    let mut rig = rig(config, Some(0.2));
    rig.session.start(GameMode::Waves).unwrap();

    let mut spawned = 0;
    let mut completed = false;
    for _ in 0..1000 {
        let report = rig.session.step(1.0 / 30.0);
        for event in &report.events {
            match event {
                ModeEvent::EnemySpawnRequested { accepted: true, .. } => spawned += 1,
                ModeEvent::WaveCompleted { wave: 1, .. } => completed = true,
                _ => {}
            }
        }
        if completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert!(completed);
    assert_eq!(spawned, 3);
    assert_eq!(rig.session.modes().wave_number(), 2);
    assert!(rig.audio.count("wave_start") >= 1);
    assert_eq!(rig.audio.count("wave_complete"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_level_keeps_the_running_one() {
    let mut session = SessionBuilder::new(seeded())
        .with_template(Arc::new(DoubledTemplate(DummyTemplate::new(None))))
        .build(Handle::current());
    session.start(GameMode::Survival).unwrap();
    session.step(1.0 / 30.0);
    let before = session.entities().len();

    let result = session.start(GameMode::Classic);

    assert!(matches!(result, Err(SessionError::Ecs(_))));
    assert_eq!(session.current_mode(), Some(GameMode::Survival));
    assert_eq!(session.modes().mode(), GameMode::Survival);
    assert_eq!(session.entities().len(), before);
    assert!(session.entities().get(SAFE_ZONE_ENTITY).is_some());
    assert!(session.entities().get("Mutant0").is_none());
    assert!(!session.step(1.0 / 30.0).paused);
}
