use tracing::info;

use super::{Deferred, EnemyRoster, GameModeManager, ModeEvent};
use crate::config::WaveConfig;

/// Countdown beeps cover the last five displayed seconds.
const BEEP_WINDOW: u32 = 5;
/// Beeps at or below this many seconds use the urgent cue.
const FINAL_BEEPS: u32 = 3;

#[derive(Debug, Clone)]
pub(super) struct WaveState {
    pub(super) number: u32,
    pub(super) timer: f32,
    pub(super) active: bool,
    pub(super) enemies_per_wave: u32,
    last_countdown_second: Option<u32>,
}

impl WaveState {
    pub(super) fn new(config: &WaveConfig) -> Self {
        Self {
            number: 1,
            timer: 0.0,
            active: false,
            enemies_per_wave: config.initial_enemies,
            last_countdown_second: None,
        }
    }
}

/// Enemy count for wave `number`: grows by one every two waves, capped.
pub(super) fn enemies_for_wave(config: &WaveConfig, number: u32) -> u32 {
    config
        .initial_enemies
        .saturating_add(number / 2)
        .min(config.max_enemies)
}

impl GameModeManager {
    pub(super) fn update_waves(&mut self, dt: f32, roster: &mut dyn EnemyRoster) {
        if self.waves.active {
            // Queued and in-flight spawns count as still to come.
            if self.queued_spawns() == 0
                && roster.spawns_in_flight() == 0
                && roster.alive_enemies() == 0
            {
                self.end_wave();
            }
            return;
        }

        self.waves.timer += dt;
        let delay = self.waves_config.delay;
        let seconds_left = (delay - self.waves.timer).ceil().max(0.0) as u32;
        if seconds_left > 0 {
            self.events.push(ModeEvent::WaveCountdown {
                wave: self.waves.number,
                seconds_left,
            });
            if self.waves.last_countdown_second != Some(seconds_left)
                && seconds_left <= BEEP_WINDOW
            {
                self.events.push(ModeEvent::CountdownBeep {
                    seconds_left,
                    last_seconds: seconds_left <= FINAL_BEEPS,
                });
            }
            self.waves.last_countdown_second = Some(seconds_left);
        }

        if self.waves.timer >= delay {
            self.start_wave();
            self.waves.timer = 0.0;
        }
    }

    fn start_wave(&mut self) {
        let wave = self.waves.number;
        let enemies = self.waves.enemies_per_wave;
        self.waves.active = true;
        self.waves.last_countdown_second = None;
        info!(wave, enemies, "wave started");

        self.events.push(ModeEvent::WaveStarted { wave, enemies });
        let spacing = self.waves_config.spawn_spacing;
        for i in 0..enemies {
            self.schedule(spacing * i as f32, Deferred::Spawn);
        }
        self.schedule(
            self.waves_config.start_banner_duration,
            Deferred::Emit(ModeEvent::WavePanelHidden),
        );
    }

    fn end_wave(&mut self) {
        let wave = self.waves.number;
        self.waves.active = false;
        self.waves.number += 1;
        self.waves.enemies_per_wave = enemies_for_wave(&self.waves_config, self.waves.number);
        info!(
            wave,
            next_wave = self.waves.number,
            next_enemies = self.waves.enemies_per_wave,
            "wave complete"
        );

        self.events.push(ModeEvent::WaveCompleted {
            wave,
            next_wave_in: self.waves_config.delay,
        });
        // The start banner's pending hide must not cut the completion banner short.
        self.scheduled
            .retain(|scheduled| scheduled.action != Deferred::Emit(ModeEvent::WavePanelHidden));
        self.schedule(
            self.waves_config.indicator_hide_delay,
            Deferred::Emit(ModeEvent::WaveIndicatorHidden),
        );
        self.schedule(
            self.waves_config.complete_banner_duration,
            Deferred::Emit(ModeEvent::WavePanelHidden),
        );
    }

    pub fn wave_number(&self) -> u32 {
        self.waves.number
    }

    pub fn enemies_per_wave(&self) -> u32 {
        self.waves.enemies_per_wave
    }

    pub fn is_wave_active(&self) -> bool {
        self.waves.active
    }

    /// Countdown progress toward the next wave, in seconds.
    pub fn wave_timer(&self) -> f32 {
        self.waves.timer
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::GameMode;
    use super::*;
    use crate::config::GameConfig;

    fn run(manager: &mut GameModeManager, roster: &mut RecordingRoster, steps: usize, dt: f32) {
        for _ in 0..steps {
            manager.update(dt, roster);
        }
    }

    #[test]
    fn enemy_count_grows_every_two_waves_and_caps() {
        let config = WaveConfig::default();
        let counts: Vec<u32> = (1..=14).map(|n| enemies_for_wave(&config, n)).collect();
        assert_eq!(counts, vec![3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 8, 8, 8]);
    }

    #[test]
    fn first_wave_starts_after_thirty_seconds_with_staggered_spawns() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Waves);
        let mut roster = RecordingRoster::default();
        let mut spawn_times = Vec::new();
        let mut starts = 0;

        for _ in 0..70 {
            let before = roster.requests.len();
            manager.update(0.5, &mut roster);
            for _ in before..roster.requests.len() {
                spawn_times.push(manager.mode_clock());
            }
            starts += manager
                .drain_events()
                .iter()
                .filter(|e| matches!(e, ModeEvent::WaveStarted { .. }))
                .count();
            // Keep the wave open so it does not complete mid-test.
            roster.alive = roster.requests.len();
        }

        assert_eq!(starts, 1);
        assert_eq!(spawn_times, vec![30.0, 31.0, 32.0]);
        assert!(manager.is_wave_active());
    }

    #[test]
    fn transition_tick_has_no_countdown_event() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Waves);
        let mut roster = RecordingRoster::default();
        run(&mut manager, &mut roster, 59, 0.5);
        manager.drain_events();

        manager.update(0.5, &mut roster);
        let events = manager.drain_events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, ModeEvent::WaveCountdown { .. })));
        assert_eq!(
            events.first(),
            Some(&ModeEvent::WaveStarted {
                wave: 1,
                enemies: 3
            })
        );
        assert_eq!(manager.wave_timer(), 0.0);
    }

    #[test]
    fn countdown_beeps_once_per_second_in_last_five() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Waves);
        let mut roster = RecordingRoster::default();
        let mut beeps = Vec::new();
        for _ in 0..(30 * 60 - 1) {
            manager.update(1.0 / 60.0, &mut roster);
            for event in manager.drain_events() {
                if let ModeEvent::CountdownBeep {
                    seconds_left,
                    last_seconds,
                } = event
                {
                    beeps.push((seconds_left, last_seconds));
                }
            }
        }
        assert_eq!(
            beeps,
            vec![(5, false), (4, false), (3, true), (2, true), (1, true)]
        );
    }

    #[test]
    fn wave_completes_only_when_field_is_clear() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Waves);
        let mut roster = RecordingRoster::default();
        run(&mut manager, &mut roster, 60, 0.5);
        assert!(manager.is_wave_active());

        // Spawns 2 and 3 are still queued.
        run(&mut manager, &mut roster, 1, 0.5);
        assert!(manager.is_wave_active());
        assert_eq!(manager.queued_spawns(), 2);

        run(&mut manager, &mut roster, 3, 0.5);
        assert_eq!(manager.queued_spawns(), 0);
        assert_eq!(roster.requests.len(), 3);

        roster.in_flight = 1;
        run(&mut manager, &mut roster, 4, 0.5);
        assert!(manager.is_wave_active());

        roster.in_flight = 0;
        roster.alive = 2;
        run(&mut manager, &mut roster, 4, 0.5);
        assert!(manager.is_wave_active());

        roster.alive = 0;
        manager.drain_events();
        manager.update(0.5, &mut roster);
        assert!(!manager.is_wave_active());
        assert_eq!(manager.wave_number(), 2);
        assert_eq!(manager.enemies_per_wave(), 4);
        assert!(manager.drain_events().contains(&ModeEvent::WaveCompleted {
            wave: 1,
            next_wave_in: 30.0
        }));
    }

    #[test]
    fn completion_hides_indicator_then_panel() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Waves);
        let mut roster = RecordingRoster::default();
        run(&mut manager, &mut roster, 70, 0.5);
        assert!(!manager.is_wave_active());
        manager.drain_events();

        let mut hides = Vec::new();
        for _ in 0..10 {
            manager.update(0.5, &mut roster);
            for event in manager.drain_events() {
                if matches!(
                    event,
                    ModeEvent::WaveIndicatorHidden | ModeEvent::WavePanelHidden
                ) {
                    hides.push(event);
                }
            }
        }
        assert_eq!(
            hides,
            vec![ModeEvent::WaveIndicatorHidden, ModeEvent::WavePanelHidden]
        );
    }

    #[test]
    fn second_wave_counts_down_again() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Waves);
        let mut roster = RecordingRoster::default();
        // Wave 1 starts at 30s, its last spawn lands at 32s and it clears on
        // the next tick.
        run(&mut manager, &mut roster, 66, 0.5);
        assert_eq!(manager.wave_number(), 2);
        assert!(!manager.is_wave_active());

        run(&mut manager, &mut roster, 60, 0.5);
        assert!(manager.is_wave_active());
        run(&mut manager, &mut roster, 8, 0.5);
        assert_eq!(roster.requests.len(), 3 + 4);
    }
}
