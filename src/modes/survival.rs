use glam::{Vec2, Vec3};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use super::{EnemyRoster, GameModeManager, ModeEvent};

#[derive(Debug, Clone, Copy)]
pub(super) struct SafeZone {
    pub(super) position: Vec3,
    /// Time since the zone last moved.
    pub(super) timer: f32,
}

#[derive(Debug, Clone, Default)]
pub(super) struct SurvivalState {
    pub(super) zone: Option<SafeZone>,
    pub(super) spawn_timer: f32,
}

/// Snapshot of the safe zone for the HUD and reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafeZoneInfo {
    pub active: bool,
    pub position: Option<Vec3>,
    pub radius: f32,
}

impl GameModeManager {
    pub(super) fn update_survival(&mut self, dt: f32, roster: &mut dyn EnemyRoster) {
        if self.survival.zone.is_none() {
            self.activate_safe_zone();
        }

        let interval = self.survival_config.safe_zone_interval;
        let relocate = match self.survival.zone.as_mut() {
            Some(zone) => {
                zone.timer += dt;
                zone.timer >= interval
            }
            None => false,
        };
        if relocate {
            self.relocate_safe_zone();
        }

        self.survival.spawn_timer += dt;
        if self.survival.spawn_timer >= self.survival_config.spawn_period {
            let count = if self.rng.stream("survival").gen_bool(0.5) {
                2
            } else {
                1
            };
            debug!(count, "survival spawn burst");
            for _ in 0..count {
                self.spawn_enemy(roster);
            }
            self.survival.spawn_timer = 0.0;
        }
    }

    fn random_safe_zone_position(&mut self) -> Vec3 {
        let half = (self.survival_config.map_size / 2.0).abs();
        let half = if half.is_finite() { half } else { 0.0 };
        let mut rng = self.rng.stream("safe_zone");
        let x = rng.gen_range(-half..=half);
        let z = rng.gen_range(-half..=half);
        Vec3::new(x, self.survival_config.safe_zone_height, z)
    }

    fn activate_safe_zone(&mut self) {
        let position = self.random_safe_zone_position();
        self.survival.zone = Some(SafeZone {
            position,
            timer: 0.0,
        });
        info!(?position, "safe zone activated");
        self.events.push(ModeEvent::SafeZoneActivated { position });
    }

    fn relocate_safe_zone(&mut self) {
        let position = self.random_safe_zone_position();
        self.survival.zone = Some(SafeZone {
            position,
            timer: 0.0,
        });
        info!(?position, "safe zone moved");
        self.events.push(ModeEvent::SafeZoneMoved { position });
    }

    pub fn deactivate_safe_zone(&mut self) {
        if self.survival.zone.take().is_some() {
            info!("safe zone deactivated");
            self.events.push(ModeEvent::SafeZoneDeactivated);
        }
    }

    /// Inclusive planar (x, z) test against the active zone.
    pub fn is_player_in_safe_zone(&self, position: Vec3) -> bool {
        self.survival.zone.is_some_and(|zone| {
            let player = Vec2::new(position.x, position.z);
            let center = Vec2::new(zone.position.x, zone.position.z);
            player.distance(center) <= self.survival_config.safe_zone_radius
        })
    }

    pub fn is_safe_zone_active(&self) -> bool {
        self.survival.zone.is_some()
    }

    pub fn safe_zone_position(&self) -> Option<Vec3> {
        self.survival.zone.map(|zone| zone.position)
    }

    pub fn safe_zone_info(&self) -> SafeZoneInfo {
        SafeZoneInfo {
            active: self.survival.zone.is_some(),
            position: self.safe_zone_position(),
            radius: self.survival_config.safe_zone_radius,
        }
    }

    /// Seconds until the zone relocates; `None` while inactive.
    pub fn next_safe_zone_in(&self) -> Option<f32> {
        self.survival
            .zone
            .map(|zone| (self.survival_config.safe_zone_interval - zone.timer).max(0.0))
    }

    /// Progress toward the next survival spawn burst, in seconds.
    pub fn survival_spawn_timer(&self) -> f32 {
        self.survival.spawn_timer
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::GameMode;
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn first_update_activates_zone_inside_map() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Survival);
        let mut roster = RecordingRoster::default();
        assert!(!manager.is_safe_zone_active());
        assert!(manager.next_safe_zone_in().is_none());

        manager.update(0.5, &mut roster);

        let position = manager.safe_zone_position().unwrap();
        assert!((-20.0..=20.0).contains(&position.x));
        assert!((-20.0..=20.0).contains(&position.z));
        assert_eq!(position.y, 0.5);
        assert_eq!(
            manager.drain_events(),
            vec![ModeEvent::SafeZoneActivated { position }]
        );
        assert_eq!(manager.next_safe_zone_in(), Some(44.5));
    }

    #[test]
    fn zone_membership_is_planar_and_inclusive() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Survival);
        assert!(!manager.is_player_in_safe_zone(Vec3::ZERO));

        manager.survival.zone = Some(SafeZone {
            position: Vec3::new(3.0, 0.5, -4.0),
            timer: 0.0,
        });

        assert!(manager.is_player_in_safe_zone(Vec3::new(8.0, 1.0, -4.0)));
        assert!(manager.is_player_in_safe_zone(Vec3::new(3.0, 1.0, -9.0)));
        assert!(!manager.is_player_in_safe_zone(Vec3::new(8.0001, 1.0, -4.0)));
        assert!(manager.is_player_in_safe_zone(Vec3::new(3.0, 40.0, -4.0)));
    }

    #[test]
    fn zone_relocates_exactly_once_per_interval() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Survival);
        let mut roster = RecordingRoster::default();
        let mut moves = Vec::new();

        for _ in 0..100 {
            manager.update(0.5, &mut roster);
            for event in manager.drain_events() {
                if matches!(event, ModeEvent::SafeZoneMoved { .. }) {
                    moves.push(manager.mode_clock());
                }
            }
        }

        assert_eq!(moves, vec![45.0]);
        assert_eq!(manager.next_safe_zone_in(), Some(40.0));
    }

    #[test]
    fn survival_bursts_are_one_or_two_enemies() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Survival);
        let mut roster = RecordingRoster::default();

        for _ in 0..39 {
            manager.update(0.5, &mut roster);
        }
        assert!(roster.requests.is_empty());

        manager.update(0.5, &mut roster);
        assert!((1..=2).contains(&roster.requests.len()));
        assert_eq!(manager.survival_spawn_timer(), 0.0);
        let points = config.spawn_points();
        assert!(roster.requests.iter().all(|p| points.contains(p)));
    }

    #[test]
    fn negative_map_size_still_places_the_zone() {
        let mut config = GameConfig::default();
        config.survival.map_size = -4.0;
        let mut manager = seeded(&config, GameMode::Survival);
        let mut roster = RecordingRoster::default();

        manager.update(0.5, &mut roster);

        let position = manager.safe_zone_position().unwrap();
        assert!(position.x.abs() <= 2.0 && position.z.abs() <= 2.0);
    }

    #[test]
    fn deactivate_clears_zone_once() {
        let config = GameConfig::default();
        let mut manager = seeded(&config, GameMode::Survival);
        let mut roster = RecordingRoster::default();
        manager.update(0.5, &mut roster);
        manager.drain_events();

        manager.deactivate_safe_zone();
        manager.deactivate_safe_zone();

        assert_eq!(manager.drain_events(), vec![ModeEvent::SafeZoneDeactivated]);
        assert_eq!(
            manager.safe_zone_info(),
            SafeZoneInfo {
                active: false,
                position: None,
                radius: 5.0
            }
        );
    }
}
