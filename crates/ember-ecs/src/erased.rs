//! Type-erased access to sparse sets.
//!
//! The [`Ecs`](crate::ecs::Ecs) keeps one [`SparseSet`] per component type in
//! a single map, so it needs a common object type for them:
//! [`ErasedSparseSet`]. Each erased set reports the [`ComponentTypeId`] of the
//! component it stores, and getting the concrete set back always checks that
//! tag *and* the Rust type before handing out a reference.

use std::any::Any;

use crate::entity::Entity;
use crate::sparse_set::SparseSet;
use crate::type_id::{component_type_id, ComponentTypeId};
use crate::EcsError;

/// Object-safe view of a [`SparseSet<C, Entity>`] for some unknown `C`.
pub trait ErasedSparseSet: Any {
    /// The type id of the stored component.
    fn component_type(&self) -> ComponentTypeId;

    /// Rust type name of the stored component.
    fn component_name(&self) -> &'static str;

    /// Whether `entity` has a component in this set.
    fn contains_entity(&self, entity: Entity) -> bool;

    /// Drop the component for `entity`. Returns `false` if there was none.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Whether the set is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored component.
    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: 'static> ErasedSparseSet for SparseSet<C, Entity> {
    fn component_type(&self) -> ComponentTypeId {
        component_type_id::<C>()
    }

    fn component_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn contains_entity(&self, entity: Entity) -> bool {
        self.contains(entity)
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn clear(&mut self) {
        SparseSet::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn ErasedSparseSet {
    /// Recover the concrete set for component type `C`.
    ///
    /// Fails with [`EcsError::StorageTypeMismatch`] if the set stores a
    /// different component type. The check runs in every build profile.
    pub fn downcast_ref<C: 'static>(&self) -> Result<&SparseSet<C, Entity>, EcsError> {
        let expected = component_type_id::<C>();
        let found = self.component_type();
        if expected != found {
            return Err(EcsError::StorageTypeMismatch { expected, found });
        }
        self.as_any()
            .downcast_ref::<SparseSet<C, Entity>>()
            .ok_or(EcsError::StorageTypeMismatch { expected, found })
    }

    /// Mutable counterpart of [`downcast_ref`](Self::downcast_ref).
    pub fn downcast_mut<C: 'static>(&mut self) -> Result<&mut SparseSet<C, Entity>, EcsError> {
        let expected = component_type_id::<C>();
        let found = self.component_type();
        if expected != found {
            return Err(EcsError::StorageTypeMismatch { expected, found });
        }
        self.as_any_mut()
            .downcast_mut::<SparseSet<C, Entity>>()
            .ok_or(EcsError::StorageTypeMismatch { expected, found })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);

    #[derive(Debug, PartialEq)]
    struct Mana(u32);

    fn boxed_health() -> Box<dyn ErasedSparseSet> {
        let mut set = SparseSet::<Health>::new();
        set.emplace(Entity::try_new(0, 0).unwrap(), Health(10));
        Box::new(set)
    }

    #[test]
    fn reports_component_type() {
        let erased = boxed_health();
        assert_eq!(erased.component_type(), component_type_id::<Health>());
        assert!(erased.component_name().ends_with("Health"));
        assert_eq!(erased.len(), 1);
    }

    #[test]
    fn downcast_to_matching_type() {
        let erased = boxed_health();
        let set = erased.downcast_ref::<Health>().unwrap();
        assert_eq!(set.get(Entity::try_new(0, 0).unwrap()), Some(&Health(10)));
    }

    #[test]
    fn downcast_to_wrong_type_is_rejected() {
        let mut erased = boxed_health();
        let err = erased.downcast_ref::<Mana>().unwrap_err();
        assert!(matches!(
            err,
            EcsError::StorageTypeMismatch { expected, found }
                if expected == component_type_id::<Mana>()
                    && found == component_type_id::<Health>()
        ));
        assert!(erased.downcast_mut::<Mana>().is_err());
    }

    #[test]
    fn erased_remove_and_clear() {
        let mut erased = boxed_health();
        let e = Entity::try_new(0, 0).unwrap();
        assert!(erased.contains_entity(e));
        assert!(erased.remove_entity(e));
        assert!(!erased.remove_entity(e));
        assert!(erased.is_empty());

        erased.downcast_mut::<Health>().unwrap().emplace(e, Health(1));
        erased.clear();
        assert!(!erased.contains_entity(e));
    }
}
