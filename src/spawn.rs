//! Dynamic enemy construction.
//!
//! A spawn request becomes one tokio task: the heavy model clone runs on the
//! blocking pool, the template attaches its components, and the finished
//! entity travels back to the manager over a channel. The manager registers it
//! on its next `poll_spawns`, so an entity is never visible half-built.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Vec3;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;

use crate::ecs::{Component, Entity};
use crate::error::SpawnError;
use crate::interfaces::{PhysicsWorld, Scene};

/// A per-instance copy of the enemy model and its animation set.
pub type ModelInstance = Box<dyn Any + Send>;

/// Blueprint for dynamically spawned enemies.
pub trait EnemyTemplate: Send + Sync + 'static {
    /// Clones the shared model and animations for one instance. May be slow;
    /// it runs off the update thread.
    fn instantiate_model(&self) -> ModelInstance;

    /// Builds the components a fresh enemy carries.
    fn assemble(
        &self,
        model: ModelInstance,
        scene: &Arc<dyn Scene>,
        physics: &Arc<dyn PhysicsWorld>,
    ) -> Vec<Box<dyn Component>>;
}

/// Everything the manager needs before it can spawn anything.
#[derive(Clone)]
pub struct SpawnConfig {
    pub template: Arc<dyn EnemyTemplate>,
    pub scene: Arc<dyn Scene>,
    pub physics: Arc<dyn PhysicsWorld>,
}

impl fmt::Debug for SpawnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnConfig").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnId(pub(crate) u64);

impl fmt::Display for SpawnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spawn#{}", self.0)
    }
}

/// Cancellable reference to an in-flight spawn.
#[derive(Debug, Clone)]
pub struct SpawnHandle {
    id: SpawnId,
    name: String,
    abort: AbortHandle,
    cancelled: Arc<AtomicBool>,
}

impl SpawnHandle {
    pub(crate) fn new(
        id: SpawnId,
        name: String,
        abort: AbortHandle,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            name,
            abort,
            cancelled,
        }
    }

    pub fn id(&self) -> SpawnId {
        self.id
    }

    /// Name the entity will carry once registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the spawn. An entity that already finished assembling is
    /// discarded instead of registered.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The manager's side of a [`SpawnHandle`].
pub(crate) struct PendingSpawn {
    pub abort: AbortHandle,
    pub cancelled: Arc<AtomicBool>,
}

impl PendingSpawn {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

pub(crate) struct SpawnArrival {
    pub id: SpawnId,
    pub result: Result<Entity, SpawnError>,
}

pub(crate) async fn run_spawn(
    config: SpawnConfig,
    id: SpawnId,
    name: String,
    location: Vec3,
    arrivals: UnboundedSender<SpawnArrival>,
) {
    let result = assemble_enemy(config, name, location).await;
    // The receiver only disappears with the manager itself.
    let _ = arrivals.send(SpawnArrival { id, result });
}

async fn assemble_enemy(
    config: SpawnConfig,
    name: String,
    location: Vec3,
) -> Result<Entity, SpawnError> {
    let template = config.template.clone();
    let model = tokio::task::spawn_blocking(move || template.instantiate_model())
        .await
        .map_err(|source| SpawnError::Instantiate {
            name: name.clone(),
            source,
        })?;

    let mut entity = Entity::named(name.clone());
    entity.set_position(location);
    for component in config
        .template
        .assemble(model, &config.scene, &config.physics)
    {
        entity
            .add_component(component)
            .map_err(|source| SpawnError::Assemble {
                name: name.clone(),
                source,
            })?;
    }
    Ok(entity)
}
