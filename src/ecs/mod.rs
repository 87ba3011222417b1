//! Entity-Component registry.
//!
//! Entities own their components by name and their own event handlers; the
//! [`EntityManager`] owns the entities and drives their ticks.

pub mod component;
pub mod entity;
pub mod events;
pub mod manager;

pub use component::{Component, ComponentContext, Neighbors};
pub use entity::{Entity, EntityId, Transform};
pub use events::{Event, EventHandler, EventRegistry, FollowUps};
pub use manager::{EntityManager, MUTANT_PREFIX};
