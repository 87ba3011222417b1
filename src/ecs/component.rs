//! The component contract and the context handed to components on each call.

use std::any::Any;

use glam::{Quat, Vec3};

use super::events::{Event, EventHandler, EventRegistry};
use super::{Entity, EntityId, Transform};
use crate::interfaces::PhysicsWorld;

/// A unit of behavior attached to exactly one [`Entity`].
///
/// Every lifecycle hook has a no-op default, so a component only implements
/// the capabilities it actually has.
pub trait Component: Send + 'static {
    /// Key of this component inside its entity.
    fn name(&self) -> &str;

    /// Called once, after the owning entity is registered.
    fn initialize(&mut self, _ctx: &mut ComponentContext<'_>) {}

    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) {}

    /// Called once per internal physics sub-step.
    fn physics_update(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        _world: &dyn PhysicsWorld,
        _dt: f32,
    ) {
    }

    /// Called once when the owning entity is removed from its manager.
    fn cleanup(&mut self) {}

    /// Hit points, for components that track them.
    fn health(&self) -> Option<f32> {
        None
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The registered entities other than the one currently being ticked.
///
/// Entity-to-entity lookups go through here instead of stored back-pointers.
pub struct Neighbors<'a> {
    before: &'a mut [Entity],
    after: &'a mut [Entity],
}

impl<'a> Neighbors<'a> {
    pub fn new(before: &'a mut [Entity], after: &'a mut [Entity]) -> Self {
        Self { before, after }
    }

    pub fn none() -> Self {
        Self {
            before: &mut [],
            after: &mut [],
        }
    }

    pub fn find(&self, name: &str) -> Option<&Entity> {
        self.before
            .iter()
            .chain(self.after.iter())
            .find(|entity| entity.name() == Some(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.before
            .iter_mut()
            .chain(self.after.iter_mut())
            .find(|entity| entity.name() == Some(name))
    }

    /// Shorter-lived copy, used to hand the same neighbors to each
    /// component of an entity in turn.
    pub fn reborrow(&mut self) -> Neighbors<'_> {
        Neighbors {
            before: &mut *self.before,
            after: &mut *self.after,
        }
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowed view of the owning entity plus its neighbors, valid for one call.
pub struct ComponentContext<'a> {
    pub(crate) id: Option<EntityId>,
    pub(crate) name: &'a str,
    pub(crate) transform: &'a mut Transform,
    pub(crate) events: &'a mut EventRegistry,
    pub(crate) neighbors: Neighbors<'a>,
}

impl<'a> ComponentContext<'a> {
    pub fn entity_id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn entity_name(&self) -> &str {
        self.name
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    pub fn register_event_handler(&mut self, topic: impl Into<String>, handler: EventHandler) {
        self.events.register(topic, handler);
    }

    /// Raises `event` on the owning entity.
    pub fn broadcast(&mut self, event: &Event) -> usize {
        self.events.broadcast(event)
    }

    /// Looks up another registered entity by name.
    pub fn find_entity(&self, name: &str) -> Option<&Entity> {
        self.neighbors.find(name)
    }

    pub fn find_entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.neighbors.find_mut(name)
    }
}
