use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use mutant_arena::{
    config::{ConfigLoader, GameConfig},
    headless::{DummyTemplate, LogAudio, LogHud},
    modes::{GameMode, ModeEvent},
    session::FrameReport,
    SessionBuilder,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Mutant arena headless runner")]
struct Cli {
    /// Path to the game config YAML file (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Game mode to play
    #[arg(long, value_enum, default_value_t = GameMode::Waves)]
    mode: GameMode,

    /// Seconds of game time to simulate
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,

    /// Frame length in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Seconds a spawned enemy stays alive; 0 keeps enemies alive forever
    #[arg(long, default_value_t = 8.0)]
    enemy_lifetime: f32,

    /// Override the config seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print one JSON frame report per line, then a JSON summary
    #[arg(long)]
    json: bool,

    /// Step frames back to back instead of pacing them in real time
    #[arg(long)]
    fast: bool,
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    mode: Option<GameMode>,
    frames: u64,
    game_time: f64,
    waves_started: u32,
    waves_completed: u32,
    spawn_requests: u32,
    safe_zone_moves: u32,
    max_alive_enemies: usize,
    player_health: Option<f32>,
    player_died: bool,
    interrupted: bool,
}

impl RunSummary {
    fn record(&mut self, report: &FrameReport) {
        self.mode = report.mode;
        self.frames = report.frame;
        self.game_time = report.time;
        self.max_alive_enemies = self.max_alive_enemies.max(report.alive_enemies);
        self.player_health = report.player_health;
        for event in &report.events {
            match event {
                ModeEvent::WaveStarted { .. } => self.waves_started += 1,
                ModeEvent::WaveCompleted { .. } => self.waves_completed += 1,
                ModeEvent::EnemySpawnRequested { accepted: true, .. } => {
                    self.spawn_requests += 1
                }
                ModeEvent::SafeZoneMoved { .. } => self.safe_zone_moves += 1,
                _ => {}
            }
        }
    }
}

fn load_config(cli: &Cli) -> Result<GameConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::new(".").load(path)?,
        None => GameConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

async fn pace(ticker: &mut Interval, fast: bool) {
    if fast {
        tokio::task::yield_now().await;
    } else {
        ticker.tick().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let lifetime = (cli.enemy_lifetime > 0.0).then_some(cli.enemy_lifetime);

    let audio = Arc::new(LogAudio::new());
    let hud = Arc::new(LogHud::new());
    let mut session = SessionBuilder::new(config)
        .with_template(Arc::new(DummyTemplate::new(lifetime)))
        .with_audio(audio.clone())
        .with_hud(hud.clone())
        .build(tokio::runtime::Handle::current());
    session
        .start(cli.mode)
        .with_context(|| format!("Failed to start {} session", cli.mode))?;

    let frame = Duration::from_millis(cli.frame_ms.max(1));
    let frames = (f64::from(cli.seconds) / frame.as_secs_f64()).ceil() as u64;
    let mut ticker = tokio::time::interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut summary = RunSummary::default();
    for _ in 0..frames {
        tokio::select! {
            _ = &mut shutdown => {
                warn!("interrupted, stopping early");
                summary.interrupted = true;
                break;
            }
            _ = pace(&mut ticker, cli.fast) => {}
        }

        let report = session.step(frame.as_secs_f32());
        summary.record(&report);
        if cli.json {
            println!("{}", serde_json::to_string(&report)?);
        }
        if session.is_paused() {
            summary.player_died = true;
            info!(frame = report.frame, "player died, session paused");
            break;
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "{} session ran {} frames ({:.1}s). Waves completed: {}. Enemies requested: {}. Player health: {}.",
            cli.mode,
            summary.frames,
            summary.game_time,
            summary.waves_completed,
            summary.spawn_requests,
            summary
                .player_health
                .map_or_else(|| "n/a".to_string(), |health| format!("{health:.0}")),
        );
        println!(
            "Audio cues played: {}. HUD at exit: {:?}",
            audio.played().len(),
            hud.snapshot()
        );
    }
    Ok(())
}
