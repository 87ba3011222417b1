//! Turns mode events into audio cues and HUD operations.

use std::sync::Arc;

use tracing::trace;

use crate::interfaces::{AudioCues, Hud};
use crate::modes::ModeEvent;

pub struct Presenter {
    audio: Arc<dyn AudioCues>,
    hud: Arc<dyn Hud>,
}

impl Presenter {
    pub fn new(audio: Arc<dyn AudioCues>, hud: Arc<dyn Hud>) -> Self {
        Self { audio, hud }
    }

    pub fn audio(&self) -> &Arc<dyn AudioCues> {
        &self.audio
    }

    pub fn hud(&self) -> &Arc<dyn Hud> {
        &self.hud
    }

    pub fn present(&self, events: &[ModeEvent]) {
        for event in events {
            self.present_one(event);
        }
    }

    fn present_one(&self, event: &ModeEvent) {
        match event {
            ModeEvent::WaveCountdown { wave, seconds_left } => {
                self.hud.show_wave_countdown(*wave, *seconds_left);
            }
            ModeEvent::CountdownBeep { last_seconds, .. } => {
                if *last_seconds {
                    self.audio.final_countdown_beep();
                } else {
                    self.audio.countdown_beep();
                }
            }
            ModeEvent::WaveStarted { wave, .. } => {
                self.hud.show_wave_announcement(
                    &format!("WAVE {wave} STARTED!"),
                    "ELIMINATE ALL ENEMIES",
                );
                self.hud.show_wave_indicator(*wave);
                self.audio.wave_start();
            }
            ModeEvent::WaveCompleted { wave, next_wave_in } => {
                self.hud.show_wave_announcement(
                    &format!("WAVE {wave} COMPLETE!"),
                    &format!("NEXT WAVE IN {} SECONDS", next_wave_in.round() as u32),
                );
                self.audio.wave_complete();
            }
            ModeEvent::WavePanelHidden => self.hud.hide_wave_panel(),
            ModeEvent::WaveIndicatorHidden => self.hud.hide_wave_indicator(),
            ModeEvent::EnemySpawnRequested { location, accepted } => {
                trace!(?location, accepted, "spawn request has no presentation");
            }
            ModeEvent::SafeZoneActivated { .. } => {
                self.hud.show_survival_radar(true);
                self.audio.safe_zone();
            }
            ModeEvent::SafeZoneMoved { .. } => self.audio.safe_zone(),
            ModeEvent::SafeZoneDeactivated => {
                self.hud.show_survival_radar(false);
                self.hud.show_safe_zone_indicator(false);
            }
        }
    }
}
