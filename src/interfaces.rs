//! Capability traits for the collaborators the core drives but does not own:
//! physics, the render scene, audio and the HUD.

use std::any::Any;

use glam::Vec3;

/// The physics engine's world.
pub trait PhysicsWorld: Send + Sync + 'static {
    /// Advances the simulation by `dt`, calling `on_substep` after every
    /// internal fixed sub-step with the world and the sub-step length.
    /// Returns the number of sub-steps taken.
    /// The world is shared with spawn templates; mutable state lives behind
    /// the implementation's own locks.
    fn step_simulation(
        &self,
        dt: f32,
        max_substeps: u32,
        on_substep: &mut dyn FnMut(&dyn PhysicsWorld, f32),
    ) -> u32;

    fn as_any(&self) -> &dyn Any;
}

/// The render scene new objects are added to.
pub trait Scene: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Named sound cues.
pub trait AudioCues: Send + Sync {
    fn countdown_beep(&self);
    fn final_countdown_beep(&self);
    fn wave_start(&self);
    fn wave_complete(&self);
    fn safe_zone(&self);
    fn health_regen(&self);
    fn enemy_hit(&self);
    fn player_death(&self);
}

/// Named display operations on the heads-up display.
pub trait Hud: Send + Sync {
    fn show_wave_countdown(&self, wave: u32, seconds_left: u32);
    fn show_wave_announcement(&self, title: &str, subtitle: &str);
    fn hide_wave_panel(&self);
    fn show_wave_indicator(&self, wave: u32);
    fn hide_wave_indicator(&self);
    fn show_safe_zone_indicator(&self, visible: bool);
    fn show_survival_radar(&self, visible: bool);
    fn update_radar(&self, player: Vec3, zone: Vec3);
    fn set_health(&self, percent: f32);
    fn show_death_screen(&self, visible: bool);
}
