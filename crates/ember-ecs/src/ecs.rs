//! The [`Ecs`] is the top-level container. It owns the entity allocator and
//! one type-erased [`SparseSet`] per component type ever emplaced.
//!
//! Every operation is total: soft failures (dead entity, missing component,
//! duplicate emplace) come back as `bool`/`Option`, and each has a `try_*`
//! sibling that reports the reason as an [`EcsError`].
//!
//! The `Ecs` is single-threaded by construction. It performs no locking;
//! share it across threads only behind your own synchronisation.

use std::collections::HashMap;

use crate::entity::{Entity, EntityAllocator};
use crate::erased::ErasedSparseSet;
use crate::sparse_set::SparseSet;
use crate::type_id::{component_type_id, ComponentTypeId};
use crate::EcsError;

/// Log a storage tag mismatch. These only arise from internal logic errors,
/// so debug builds stop right here.
fn storage_mismatch(err: EcsError) -> EcsError {
    tracing::error!(error = %err, "component storage registered under the wrong type id");
    if cfg!(debug_assertions) {
        panic!("{err}");
    }
    err
}

// ---------------------------------------------------------------------------
// Ecs
// ---------------------------------------------------------------------------

/// Entity lifecycle plus per-type component storage.
#[derive(Default)]
pub struct Ecs {
    /// Entity slots, versions and the free list.
    allocator: EntityAllocator,
    /// One sparse set per component type, created on first emplace.
    storages: HashMap<ComponentTypeId, Box<dyn ErasedSparseSet>>,
}

impl std::fmt::Debug for Ecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ecs")
            .field("entity_count", &self.allocator.alive_count())
            .field("slot_count", &self.allocator.slot_count())
            .field("storage_count", &self.storages.len())
            .finish()
    }
}

impl Ecs {
    /// Create an empty ECS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an ECS with entity bookkeeping reserved for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            allocator: EntityAllocator::with_capacity(capacity),
            storages: HashMap::new(),
        }
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create an entity, reusing a destroyed slot (at its bumped version) if
    /// one is free, otherwise appending a new slot at version 0.
    pub fn try_create_entity(&mut self) -> Result<Entity, EcsError> {
        let entity = self.allocator.allocate()?;
        tracing::trace!(%entity, "created entity");
        Ok(entity)
    }

    /// Create an entity.
    ///
    /// # Panics
    ///
    /// Panics if all `2^24` entity indices are in use and none is free. Use
    /// [`try_create_entity`](Self::try_create_entity) to handle that case.
    pub fn create_entity(&mut self) -> Entity {
        match self.try_create_entity() {
            Ok(entity) => entity,
            Err(err) => panic!("{err}"),
        }
    }

    /// Destroy a live entity: drop its components from every storage, bump
    /// its slot's version and queue the slot for reuse.
    ///
    /// Fails with [`EcsError::DeadEntity`] for entities that were never
    /// created, are already destroyed, or carry a stale version.
    pub fn try_destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::DeadEntity { entity });
        }
        for storage in self.storages.values_mut() {
            storage.remove_entity(entity);
        }
        self.allocator.deallocate(entity)?;
        tracing::trace!(%entity, "destroyed entity");
        Ok(())
    }

    /// Destroy `entity`. Returns `false` if it was not live.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        self.try_destroy_entity(entity).is_ok()
    }

    /// Whether `entity` is live with a matching version.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Destroy every live entity. Component storages stay registered.
    pub fn clear(&mut self) {
        let live: Vec<Entity> = self.allocator.iter_alive().collect();
        for entity in live {
            // Every collected entity is live, so this cannot fail.
            let _ = self.try_destroy_entity(entity);
        }
    }

    // -- component storage --------------------------------------------------

    /// The sparse set for `T`, creating it on first use.
    fn storage_entry<T: 'static>(&mut self) -> Result<&mut SparseSet<T>, EcsError> {
        let id = component_type_id::<T>();
        let erased = self.storages.entry(id).or_insert_with(|| {
            tracing::debug!(
                component = std::any::type_name::<T>(),
                type_id = id.to_raw(),
                "registered component storage"
            );
            Box::new(SparseSet::<T>::new())
        });
        erased.downcast_mut::<T>().map_err(storage_mismatch)
    }

    /// The sparse set holding every `T`, if one has been created.
    pub fn storage<T: 'static>(&self) -> Option<&SparseSet<T>> {
        let erased = self.storages.get(&component_type_id::<T>())?;
        erased.downcast_ref::<T>().map_err(storage_mismatch).ok()
    }

    /// Mutable access to the sparse set holding every `T`.
    ///
    /// Emplacing through this handle bypasses the liveness check; callers
    /// must only use keys of live entities.
    pub fn storage_mut<T: 'static>(&mut self) -> Option<&mut SparseSet<T>> {
        let erased = self.storages.get_mut(&component_type_id::<T>())?;
        erased.downcast_mut::<T>().map_err(storage_mismatch).ok()
    }

    // -- component access ---------------------------------------------------

    /// Attach a `T` built by `make` to `entity`.
    ///
    /// `make` only runs if the entity is live and has no `T` yet.
    pub fn try_emplace_component_with<T: 'static>(
        &mut self,
        entity: Entity,
        make: impl FnOnce() -> T,
    ) -> Result<(), EcsError> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::DeadEntity { entity });
        }
        if self.storage_entry::<T>()?.emplace_with(entity, make) {
            Ok(())
        } else {
            Err(EcsError::DuplicateComponent {
                entity,
                component: std::any::type_name::<T>(),
            })
        }
    }

    /// Attach `value` to `entity`, reporting why it could not be attached.
    pub fn try_emplace_component<T: 'static>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), EcsError> {
        self.try_emplace_component_with(entity, || value)
    }

    /// Attach `value` to `entity`.
    ///
    /// Returns `false` if the entity is not live or already has a `T`; an
    /// existing `T` is left unchanged.
    pub fn emplace_component<T: 'static>(&mut self, entity: Entity, value: T) -> bool {
        self.try_emplace_component(entity, value).is_ok()
    }

    /// Like [`emplace_component`](Self::emplace_component) with a lazily
    /// built value.
    pub fn emplace_component_with<T: 'static>(
        &mut self,
        entity: Entity,
        make: impl FnOnce() -> T,
    ) -> bool {
        self.try_emplace_component_with(entity, make).is_ok()
    }

    /// Whether `entity` is live and has a `T`.
    pub fn has_component<T: 'static>(&self, entity: Entity) -> bool {
        self.get_component::<T>(entity).is_some()
    }

    /// The `T` on `entity`, or `None` if the entity is not live or has none.
    pub fn get_component<T: 'static>(&self, entity: Entity) -> Option<&T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.storage::<T>()?.get(entity)
    }

    /// Mutable access to the `T` on `entity`.
    pub fn get_component_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.storage_mut::<T>()?.get_mut(entity)
    }

    /// Detach and return the `T` on `entity`, reporting why nothing was
    /// removed.
    pub fn try_remove_component<T: 'static>(&mut self, entity: Entity) -> Result<T, EcsError> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::DeadEntity { entity });
        }
        self.storage_mut::<T>()
            .and_then(|set| set.remove(entity))
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            })
    }

    /// Detach and return the `T` on `entity`. Other component types on the
    /// entity and other entities' `T`s are untouched.
    pub fn remove_component<T: 'static>(&mut self, entity: Entity) -> Option<T> {
        self.try_remove_component(entity).ok()
    }

    // -- iteration ----------------------------------------------------------

    /// Iterate every `(entity, &T)`, in storage order.
    pub fn view<T: 'static>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.storage::<T>()
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// Iterate every `(entity, &mut T)`, in storage order.
    pub fn view_mut<T: 'static>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.storage_mut::<T>()
            .into_iter()
            .flat_map(|set| set.iter_mut())
    }

    /// Iterate live entities in index order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.allocator.iter_alive()
    }

    // -- counters -----------------------------------------------------------

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Number of entity slots ever created.
    pub fn slot_count(&self) -> usize {
        self.allocator.slot_count()
    }

    /// Number of slots retired after exhausting their version space.
    pub fn retired_count(&self) -> usize {
        self.allocator.retired_count()
    }

    /// Number of component storages created so far.
    pub fn storage_count(&self) -> usize {
        self.storages.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
