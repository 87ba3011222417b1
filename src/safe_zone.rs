use std::any::Any;

use crate::ecs::{Component, ComponentContext};

pub const SAFE_ZONE_ENTITY: &str = "SafeZone";
pub const SAFE_ZONE_MARKER: &str = "SafeZoneMarker";

/// Ground marker for the survival safe zone. The session moves its entity
/// onto the zone; the marker only tracks visibility and its pulse phase.
#[derive(Debug, Default)]
pub struct SafeZoneMarker {
    visible: bool,
    pulse: f32,
}

impl SafeZoneMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.pulse = 0.0;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Seconds the marker has been pulsing since it was last hidden.
    pub fn pulse(&self) -> f32 {
        self.pulse
    }
}

impl Component for SafeZoneMarker {
    fn name(&self) -> &str {
        SAFE_ZONE_MARKER
    }

    fn update(&mut self, _ctx: &mut ComponentContext<'_>, dt: f32) {
        if self.visible {
            self.pulse += dt;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
