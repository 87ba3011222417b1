//! Entities: named containers of components with a transform and a local
//! event registry.

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::component::{Component, ComponentContext, Neighbors};
use super::events::{Event, EventHandler, EventRegistry};
use crate::error::EcsError;
use crate::interfaces::PhysicsWorld;

/// Registration id, handed out by the manager in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub(crate) u64);

impl EntityId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

type CleanupHook = Box<dyn FnOnce(&Entity) + Send>;

#[derive(Default)]
pub struct Entity {
    id: Option<EntityId>,
    name: Option<String>,
    transform: Transform,
    components: Vec<Box<dyn Component>>,
    events: EventRegistry,
    on_cleanup: Option<CleanupHook>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        let mut entity = Self::new();
        entity.set_name(name);
        entity
    }

    /// `None` until the entity is added to a manager.
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
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

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Attaches `component` under its own name.
    ///
    /// A second component with an existing name is rejected; the one already
    /// attached stays in place.
    pub fn add_component(&mut self, component: Box<dyn Component>) -> Result<(), EcsError> {
        if self.get_component(component.name()).is_some() {
            let err = EcsError::DuplicateComponent {
                entity: self.display_name(),
                component: component.name().to_string(),
            };
            warn!(%err, "rejected component");
            return Err(err);
        }
        self.components.push(component);
        Ok(())
    }

    pub fn with_component(mut self, component: impl Component) -> Result<Self, EcsError> {
        self.add_component(Box::new(component))?;
        Ok(self)
    }

    pub fn get_component(&self, name: &str) -> Option<&dyn Component> {
        self.components
            .iter()
            .find(|component| component.name() == name)
            .map(|component| component.as_ref())
    }

    pub fn get_component_mut(&mut self, name: &str) -> Option<&mut dyn Component> {
        match self
            .components
            .iter_mut()
            .find(|component| component.name() == name)
        {
            Some(component) => Some(component.as_mut()),
            None => None,
        }
    }

    /// Typed lookup: the component named `name`, if it is a `T`.
    pub fn component<T: Component>(&self, name: &str) -> Option<&T> {
        self.get_component(name)?.as_any().downcast_ref::<T>()
    }

    pub fn component_mut<T: Component>(&mut self, name: &str) -> Option<&mut T> {
        self.get_component_mut(name)?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|component| component.name())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn register_event_handler(&mut self, topic: impl Into<String>, handler: EventHandler) {
        self.events.register(topic, handler);
    }

    /// Raises `event` on this entity only. Returns the number of handler
    /// invocations, follow-ups included.
    pub fn broadcast(&mut self, event: &Event) -> usize {
        self.events.broadcast(event)
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    /// Runs once on removal, after every component's `cleanup`.
    pub fn on_cleanup(&mut self, hook: impl FnOnce(&Entity) + Send + 'static) {
        self.on_cleanup = Some(Box::new(hook));
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        if self.name.is_none() {
            self.name = Some(id.to_string());
        }
        self.id = Some(id);
    }

    pub(crate) fn initialize(&mut self, neighbors: &mut Neighbors<'_>) {
        self.each_component(neighbors, |component, ctx| component.initialize(ctx));
    }

    pub(crate) fn update(&mut self, neighbors: &mut Neighbors<'_>, dt: f32) {
        self.each_component(neighbors, |component, ctx| component.update(ctx, dt));
    }

    pub(crate) fn physics_update(
        &mut self,
        neighbors: &mut Neighbors<'_>,
        world: &dyn PhysicsWorld,
        dt: f32,
    ) {
        self.each_component(neighbors, |component, ctx| {
            component.physics_update(ctx, world, dt)
        });
    }

    pub(crate) fn cleanup(&mut self) {
        for component in self.components.iter_mut() {
            component.cleanup();
        }
        if let Some(hook) = self.on_cleanup.take() {
            hook(self);
        }
        self.events.clear();
    }

    fn each_component(
        &mut self,
        neighbors: &mut Neighbors<'_>,
        mut call: impl FnMut(&mut dyn Component, &mut ComponentContext<'_>),
    ) {
        let Entity {
            id,
            name,
            transform,
            components,
            events,
            ..
        } = self;
        let name = name.as_deref().unwrap_or_default();
        for component in components.iter_mut() {
            let mut ctx = ComponentContext {
                id: *id,
                name,
                transform: &mut *transform,
                events: &mut *events,
                neighbors: neighbors.reborrow(),
            };
            call(component.as_mut(), &mut ctx);
        }
    }

    fn display_name(&self) -> String {
        match (&self.name, self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "<unregistered>".to_string(),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("components", &self.component_names().collect::<Vec<_>>())
            .field("events", &self.events)
            .finish()
    }
}
