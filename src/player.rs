//! The player's hit points: damage from `hit` events, regeneration inside
//! the safe zone and the one-time death signal.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::config::PlayerConfig;
use crate::ecs::{Component, ComponentContext, Event, FollowUps};
use crate::interfaces::{AudioCues, Hud};

pub const PLAYER_ENTITY: &str = "Player";
pub const PLAYER_HEALTH: &str = "PlayerHealth";
pub const HIT_TOPIC: &str = "hit";
pub const PLAYER_DEATH_TOPIC: &str = "player_death";

#[derive(Debug, Clone, Copy)]
struct Vitals {
    health: f32,
    max_health: f32,
    dead: bool,
}

impl Vitals {
    fn percent(&self) -> f32 {
        self.health / self.max_health * 100.0
    }
}

/// State shared between the component and its `hit` handler.
#[derive(Clone)]
struct Shared {
    vitals: Arc<Mutex<Vitals>>,
    audio: Arc<dyn AudioCues>,
    hud: Arc<dyn Hud>,
}

impl Shared {
    fn read(&self) -> Vitals {
        *self.vitals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn modify<R>(&self, change: impl FnOnce(&mut Vitals) -> R) -> R {
        let mut vitals = self.vitals.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut vitals)
    }

    /// Applies `damage`; returns true when this hit killed the player.
    fn take_hit(&self, damage: f32) -> bool {
        let (vitals, died) = self.modify(|vitals| {
            if vitals.dead {
                return (*vitals, false);
            }
            vitals.health = (vitals.health - damage).max(0.0);
            let died = vitals.health <= 0.0;
            vitals.dead = died;
            (*vitals, died)
        });
        if vitals.dead && !died {
            return false;
        }
        self.hud.set_health(vitals.percent());
        debug!(health = vitals.health, damage, "player hit");
        if died {
            info!("player died");
            self.audio.player_death();
        }
        died
    }
}

pub struct PlayerHealth {
    shared: Shared,
    hit_damage: f32,
    regen_rate: f32,
    regen_sound_interval: f32,
    regen_sound_timer: f32,
    in_safe_zone: bool,
}

impl PlayerHealth {
    pub fn new(config: &PlayerConfig, audio: Arc<dyn AudioCues>, hud: Arc<dyn Hud>) -> Self {
        Self {
            shared: Shared {
                vitals: Arc::new(Mutex::new(Vitals {
                    health: config.max_health,
                    max_health: config.max_health,
                    dead: false,
                })),
                audio,
                hud,
            },
            hit_damage: config.hit_damage,
            regen_rate: config.regen_rate,
            regen_sound_interval: config.regen_sound_interval,
            regen_sound_timer: 0.0,
            in_safe_zone: false,
        }
    }

    pub fn current_health(&self) -> f32 {
        self.shared.read().health
    }

    pub fn max_health(&self) -> f32 {
        self.shared.read().max_health
    }

    pub fn is_dead(&self) -> bool {
        self.shared.read().dead
    }

    pub fn is_in_safe_zone(&self) -> bool {
        self.in_safe_zone
    }

    pub fn set_in_safe_zone(&mut self, in_safe_zone: bool) {
        self.in_safe_zone = in_safe_zone;
    }

    /// Damage outside the event path; does not raise `player_death`.
    pub fn take_hit(&self, damage: f32) -> bool {
        self.shared.take_hit(damage)
    }

    pub fn revive(&mut self) {
        let vitals = self.shared.modify(|vitals| {
            vitals.dead = false;
            vitals.health = vitals.max_health;
            *vitals
        });
        self.regen_sound_timer = 0.0;
        self.shared.hud.set_health(vitals.percent());
        info!("player revived");
    }

    fn regenerate(&mut self, dt: f32) {
        let regen_rate = self.regen_rate;
        let in_zone = self.in_safe_zone;
        let healed = self.shared.modify(|vitals| {
            if !in_zone || vitals.dead || vitals.health >= vitals.max_health {
                return None;
            }
            vitals.health = (vitals.health + regen_rate * dt).min(vitals.max_health);
            Some(*vitals)
        });

        let Some(vitals) = healed else {
            self.regen_sound_timer = 0.0;
            return;
        };
        self.shared.hud.set_health(vitals.percent());
        self.regen_sound_timer += dt;
        if self.regen_sound_timer >= self.regen_sound_interval {
            self.shared.audio.health_regen();
            self.regen_sound_timer = 0.0;
        }
    }
}

impl Component for PlayerHealth {
    fn name(&self) -> &str {
        PLAYER_HEALTH
    }

    fn initialize(&mut self, ctx: &mut ComponentContext<'_>) {
        let shared = self.shared.clone();
        let default_damage = self.hit_damage;
        ctx.register_event_handler(
            HIT_TOPIC,
            Box::new(move |event: &Event, follow_ups: &mut FollowUps| {
                let damage = event.amount.unwrap_or(default_damage);
                if shared.take_hit(damage) {
                    follow_ups.push(Event::new(PLAYER_DEATH_TOPIC));
                }
            }),
        );
        self.shared.hud.set_health(self.shared.read().percent());
    }

    fn update(&mut self, _ctx: &mut ComponentContext<'_>, dt: f32) {
        self.regenerate(dt);
    }

    fn health(&self) -> Option<f32> {
        Some(self.current_health())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
