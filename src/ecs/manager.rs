//! EntityManager - owns every live entity and drives their ticks.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use glam::Vec3;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::component::Neighbors;
use super::{Entity, EntityId};
use crate::interfaces::PhysicsWorld;
use crate::spawn::{run_spawn, PendingSpawn, SpawnArrival, SpawnConfig, SpawnHandle, SpawnId};

/// Prefix shared by every enemy's name.
pub const MUTANT_PREFIX: &str = "Mutant";

pub struct EntityManager {
    entities: Vec<Entity>,
    next_id: u64,
    spawn_config: Option<SpawnConfig>,
    runtime: Option<Handle>,
    pending: HashMap<SpawnId, PendingSpawn>,
    arrivals_tx: UnboundedSender<SpawnArrival>,
    arrivals_rx: UnboundedReceiver<SpawnArrival>,
    next_spawn: u64,
    mutant_counter: u64,
}

impl EntityManager {
    pub fn new() -> Self {
        let (arrivals_tx, arrivals_rx) = mpsc::unbounded_channel();
        Self {
            entities: Vec::new(),
            next_id: 0,
            spawn_config: None,
            runtime: None,
            pending: HashMap::new(),
            arrivals_tx,
            arrivals_rx,
            next_spawn: 0,
            mutant_counter: 0,
        }
    }

    /// Runtime the spawn tasks run on.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn set_runtime(&mut self, runtime: Handle) {
        self.runtime = Some(runtime);
    }

    /// One-time setup of the enemy template and target scene/physics world.
    pub fn configure_spawns(&mut self, config: SpawnConfig) {
        self.spawn_config = Some(config);
    }

    pub fn can_spawn(&self) -> bool {
        self.spawn_config.is_some() && self.runtime.is_some()
    }

    /// Registers `entity`, giving it the next id (and that id as its name if
    /// it has none). Names are not checked for uniqueness.
    pub fn add(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.assign_id(id);
        self.entities.push(entity);
        id
    }

    /// First entity named `name`.
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|entity| entity.name() == Some(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .find(|entity| entity.name() == Some(name))
    }

    pub fn get_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id() == Some(id))
    }

    pub fn get_by_id_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .find(|entity| entity.id() == Some(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Cleans up every component of the entity, then the entity, then drops
    /// it from the registry. Returns whether it was registered.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.entities[index].cleanup();
        let entity = self.entities.remove(index);
        debug!(id = %id, name = ?entity.name(), "entity removed");
        true
    }

    /// Removes every entity (with cleanup, in registration order) and cancels
    /// every pending spawn.
    pub fn clear(&mut self) {
        self.cancel_all_spawns();
        for entity in self.entities.iter_mut() {
            entity.cleanup();
        }
        self.entities.clear();
    }

    /// Initializes every component of every registered entity. Called once
    /// after the static level is assembled; spawned entities initialize on
    /// arrival instead.
    pub fn end_setup(&mut self) {
        for index in 0..self.entities.len() {
            self.with_entity_at(index, |entity, neighbors| entity.initialize(neighbors));
        }
        info!(entities = self.entities.len(), "setup complete");
    }

    /// Ticks every physics-aware component. Runs once per physics sub-step.
    pub fn physics_update(&mut self, world: &dyn PhysicsWorld, dt: f32) {
        let count = self.entities.len();
        for index in 0..count {
            self.with_entity_at(index, |entity, neighbors| {
                entity.physics_update(neighbors, world, dt)
            });
        }
    }

    /// Registers finished spawns, then ticks every entity once.
    pub fn update(&mut self, dt: f32) {
        self.poll_spawns();
        let count = self.entities.len();
        for index in 0..count {
            self.with_entity_at(index, |entity, neighbors| entity.update(neighbors, dt));
        }
    }

    /// Starts building a mutant at `location`.
    ///
    /// Without a spawn configuration or runtime this logs and returns `None`.
    /// Otherwise the entity shows up in the registry on some later
    /// [`poll_spawns`](Self::poll_spawns), already initialized.
    pub fn spawn_mutant(&mut self, location: Vec3) -> Option<SpawnHandle> {
        let (Some(config), Some(runtime)) = (self.spawn_config.clone(), self.runtime.clone())
        else {
            warn!(?location, "mutant assets not set, cannot spawn mutant");
            return None;
        };

        let id = SpawnId(self.next_spawn);
        self.next_spawn += 1;
        let name = self.next_mutant_name();

        let task = runtime.spawn(run_spawn(
            config,
            id,
            name.clone(),
            location,
            self.arrivals_tx.clone(),
        ));
        let cancelled = Arc::new(AtomicBool::new(false));
        self.pending.insert(
            id,
            PendingSpawn {
                abort: task.abort_handle(),
                cancelled: cancelled.clone(),
            },
        );
        debug!(%id, %name, ?location, "spawn requested");
        Some(SpawnHandle::new(id, name, task.abort_handle(), cancelled))
    }

    /// Registers and initializes every entity whose spawn has finished.
    /// Returns how many were registered.
    pub fn poll_spawns(&mut self) -> usize {
        // Taken before draining: a task that finished by now has already
        // sent its arrival.
        let finished: Vec<SpawnId> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.is_finished())
            .map(|(id, _)| *id)
            .collect();

        let mut registered = 0;
        while let Ok(arrival) = self.arrivals_rx.try_recv() {
            let Some(pending) = self.pending.remove(&arrival.id) else {
                continue;
            };
            if pending.is_cancelled() {
                debug!(id = %arrival.id, "discarding cancelled spawn");
                continue;
            }
            match arrival.result {
                Ok(entity) => {
                    let id = self.add(entity);
                    let index = self.entities.len() - 1;
                    self.with_entity_at(index, |entity, neighbors| entity.initialize(neighbors));
                    info!(spawn = %arrival.id, entity = %id, "spawned entity registered");
                    registered += 1;
                }
                Err(err) => warn!(spawn = %arrival.id, %err, "spawn failed"),
            }
        }

        for id in finished {
            if self.pending.remove(&id).is_some() {
                debug!(%id, "spawn ended without an entity");
            }
        }
        registered
    }

    /// Spawns requested but not yet registered, failed or cancelled.
    pub fn spawns_in_flight(&self) -> usize {
        self.pending
            .values()
            .filter(|pending| !pending.is_cancelled())
            .count()
    }

    pub fn cancel_spawn(&mut self, handle: &SpawnHandle) -> bool {
        handle.cancel();
        self.pending.remove(&handle.id()).is_some()
    }

    pub fn cancel_all_spawns(&mut self) {
        if !self.pending.is_empty() {
            debug!(count = self.pending.len(), "cancelling pending spawns");
        }
        for pending in self.pending.values() {
            pending.cancel();
        }
        self.pending.clear();
    }

    /// `Mutant0`, `Mutant1`, ... shared by static and spawned enemies.
    pub fn next_mutant_name(&mut self) -> String {
        let name = format!("{MUTANT_PREFIX}{}", self.mutant_counter);
        self.mutant_counter += 1;
        name
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities
            .iter()
            .position(|entity| entity.id() == Some(id))
    }

    fn with_entity_at(&mut self, index: usize, call: impl FnOnce(&mut Entity, &mut Neighbors<'_>)) {
        let (before, rest) = self.entities.split_at_mut(index);
        if let Some((entity, after)) = rest.split_first_mut() {
            let mut neighbors = Neighbors::new(before, after);
            call(entity, &mut neighbors);
        }
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}
