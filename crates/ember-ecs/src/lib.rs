//! Ember ECS -- sparse-set Entity Component System with generational entities.
//!
//! Each component type lives in its own [`SparseSet`](sparse_set::SparseSet),
//! giving O(1) insert, lookup and removal with densely packed storage. Entity
//! handles pack a 24-bit slot index with an 8-bit version, so a handle kept
//! past a destroy is rejected even after its slot has been reused.
//!
//! # Quick Start
//!
//! ```
//! use ember_ecs::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Position { x: f32, y: f32, z: f32 }
//!
//! let mut ecs = Ecs::new();
//! let e = ecs.create_entity();
//! assert!(ecs.emplace_component(e, Position { x: 1.0, y: 2.0, z: 3.0 }));
//! assert_eq!(ecs.get_component::<Position>(e), Some(&Position { x: 1.0, y: 2.0, z: 3.0 }));
//!
//! assert!(ecs.destroy_entity(e));
//! assert_eq!(ecs.get_component::<Position>(e), None);
//! ```

#![deny(unsafe_code)]

pub mod arena;
pub mod asset;
pub mod ecs;
pub mod entity;
pub mod erased;
pub mod sparse_set;
pub mod type_id;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity is not live (never created, destroyed, or stale version).
    #[error("entity {entity} is not live (destroyed, stale or never created)")]
    DeadEntity { entity: entity::Entity },

    /// The entity already has a component of this type.
    #[error("entity {entity} already has a `{component}` component")]
    DuplicateComponent {
        entity: entity::Entity,
        component: &'static str,
    },

    /// The entity has no component of this type.
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        entity: entity::Entity,
        component: &'static str,
    },

    /// An entity index does not fit in 24 bits.
    #[error("entity index {index} does not fit in 24 bits")]
    IndexOutOfRange { index: u32 },

    /// Every entity index is in use and none is free.
    #[error("entity capacity exhausted: all 2^24 indices are in use")]
    CapacityExhausted,

    /// A type-erased storage did not hold the component type it was
    /// registered under.
    #[error("component storage mismatch: expected {expected:?}, found {found:?}")]
    StorageTypeMismatch {
        expected: type_id::ComponentTypeId,
        found: type_id::ComponentTypeId,
    },

    /// An arena allocation failed.
    #[error(transparent)]
    Arena(#[from] arena::ArenaError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::arena::{ArenaError, ArenaHandle, ErasedArena, MetaArena, MetaStr};
    pub use crate::asset::{AssetId, AssetIdError, AssetKind};
    pub use crate::ecs::Ecs;
    pub use crate::entity::Entity;
    pub use crate::erased::ErasedSparseSet;
    pub use crate::sparse_set::{SparseKey, SparseSet};
    pub use crate::type_id::{component_type_id, ComponentTypeId};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    // -- test component types -----------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct MeshRef(AssetId);

    // -- lifecycle scenarios ------------------------------------------------

    #[test]
    fn recycled_slot_rejects_old_handle() {
        let mut ecs = Ecs::new();

        let e0 = ecs.create_entity();
        assert_eq!((e0.index(), e0.version()), (0, 0));
        assert!(ecs.emplace_component(e0, Position { x: 1.0, y: 2.0, z: 3.0 }));
        assert_eq!(
            ecs.get_component::<Position>(e0),
            Some(&Position { x: 1.0, y: 2.0, z: 3.0 })
        );

        assert!(ecs.destroy_entity(e0));

        let e1 = ecs.create_entity();
        assert_eq!((e1.index(), e1.version()), (0, 1));

        // Old handle is stale.
        assert_eq!(ecs.get_component::<Position>(e0), None);
        assert!(!ecs.has_component::<Position>(e0));
        assert!(!ecs.destroy_entity(e0));
        assert!(ecs.is_alive(e1));

        // Components do not survive recycling.
        assert!(!ecs.has_component::<Position>(e1));
    }

    #[test]
    fn duplicate_emplace_keeps_first_value() {
        let mut ecs = Ecs::new();
        let e = ecs.create_entity();
        assert!(ecs.emplace_component(e, Velocity { dx: 1.0, dy: 2.0 }));
        assert!(!ecs.emplace_component(e, Velocity { dx: 3.0, dy: 4.0 }));
        assert_eq!(
            ecs.get_component::<Velocity>(e),
            Some(&Velocity { dx: 1.0, dy: 2.0 })
        );
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut ecs = Ecs::new();
        let e = ecs.create_entity();
        assert!(ecs.destroy_entity(e));
        assert!(!ecs.destroy_entity(e));
        assert!(matches!(
            ecs.try_destroy_entity(e),
            Err(EcsError::DeadEntity { .. })
        ));
    }

    #[test]
    fn stale_handle_cannot_touch_new_occupant() {
        let mut ecs = Ecs::new();
        let old = ecs.create_entity();
        ecs.destroy_entity(old);
        let new = ecs.create_entity();
        assert_eq!(new.index(), old.index());

        assert!(!ecs.emplace_component(old, 5u32));
        assert!(ecs.emplace_component(new, 7u32));
        assert_eq!(ecs.get_component::<u32>(old), None);
        assert_eq!(ecs.get_component_mut::<u32>(old), None);
        assert_eq!(ecs.remove_component::<u32>(old), None);
        assert!(!ecs.destroy_entity(old));
        assert_eq!(ecs.get_component::<u32>(new), Some(&7));
    }

    #[test]
    fn entities_unique_without_destruction() {
        let mut ecs = Ecs::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1_000 {
            assert!(seen.insert(ecs.create_entity()));
        }
        assert_eq!(ecs.entity_count(), 1_000);
    }

    // -- component isolation ------------------------------------------------

    #[test]
    fn removing_one_type_leaves_others() {
        let mut ecs = Ecs::new();
        let a = ecs.create_entity();
        let b = ecs.create_entity();
        ecs.emplace_component(a, Position { x: 1.0, y: 1.0, z: 1.0 });
        ecs.emplace_component(a, Velocity { dx: 1.0, dy: 1.0 });
        ecs.emplace_component(b, Position { x: 2.0, y: 2.0, z: 2.0 });

        assert!(ecs.remove_component::<Position>(a).is_some());

        assert!(!ecs.has_component::<Position>(a));
        assert_eq!(
            ecs.get_component::<Velocity>(a),
            Some(&Velocity { dx: 1.0, dy: 1.0 })
        );
        assert_eq!(
            ecs.get_component::<Position>(b),
            Some(&Position { x: 2.0, y: 2.0, z: 2.0 })
        );
    }

    #[test]
    fn swap_remove_through_ecs() {
        let mut ecs = Ecs::new();
        let e1 = ecs.create_entity();
        let e2 = ecs.create_entity();
        let e3 = ecs.create_entity();
        ecs.emplace_component(e1, Position { x: 1.0, y: 0.0, z: 0.0 });
        ecs.emplace_component(e2, Position { x: 2.0, y: 0.0, z: 0.0 });
        ecs.emplace_component(e3, Position { x: 3.0, y: 0.0, z: 0.0 });

        ecs.remove_component::<Position>(e1);

        assert_eq!(ecs.get_component::<Position>(e2).map(|p| p.x), Some(2.0));
        assert_eq!(ecs.get_component::<Position>(e3).map(|p| p.x), Some(3.0));
        assert_eq!(ecs.view::<Position>().count(), 2);
    }

    #[test]
    fn asset_handles_are_plain_component_data() {
        let mut ecs = Ecs::new();
        let e = ecs.create_entity();
        let mesh = AssetId::try_new(AssetKind::Mesh, 17).unwrap().with_registered(true);
        ecs.emplace_component(e, MeshRef(mesh));
        let stored = ecs.get_component::<MeshRef>(e).unwrap().0;
        assert_eq!(stored, mesh);
        assert_eq!(stored.kind(), Some(AssetKind::Mesh));
    }

    #[test]
    fn arena_error_converts_into_ecs_error() {
        let mut pool = MetaArena::with_capacity(0);
        let err: EcsError = pool.push_str("x").unwrap_err().into();
        assert!(matches!(err, EcsError::Arena(ArenaError::OutOfMemory { .. })));
    }

    #[test]
    fn error_messages_name_the_entity() {
        let e = Entity::try_new(3, 1).unwrap();
        let msg = EcsError::DeadEntity { entity: e }.to_string();
        assert!(msg.contains("3v1"), "{msg}");
    }
}
