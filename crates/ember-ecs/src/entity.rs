//! Entity identifiers and slot allocation.
//!
//! An [`Entity`] is a 32-bit handle that packs a *version* counter in the high
//! 8 bits and a slot *index* in the low 24 bits. The version is bumped every
//! time a slot is recycled, so a handle captured before a destroy can never be
//! confused with the entity that later occupies the same slot.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::EcsError;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[version: u8 | index: u24]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u32);

impl Entity {
    /// Number of bits reserved for the slot index.
    pub const INDEX_BITS: u32 = 24;
    /// Number of bits reserved for the version counter.
    pub const VERSION_BITS: u32 = 8;
    /// Mask selecting the index bits.
    pub const INDEX_MASK: u32 = (1 << Self::INDEX_BITS) - 1;
    /// Largest representable slot index (`2^24 - 1`).
    pub const MAX_INDEX: u32 = Self::INDEX_MASK;
    /// Largest representable version. A slot at this version is retired
    /// rather than recycled when destroyed.
    pub const MAX_VERSION: u8 = u8::MAX;

    /// Construct an entity from an index and version.
    ///
    /// Returns [`EcsError::IndexOutOfRange`] if `index` does not fit in
    /// [`INDEX_BITS`](Self::INDEX_BITS). The index is never truncated.
    pub fn try_new(index: u32, version: u8) -> Result<Self, EcsError> {
        if index > Self::MAX_INDEX {
            return Err(EcsError::IndexOutOfRange { index });
        }
        Ok(Self::from_parts(index, version))
    }

    /// Pack without range checking. Callers guarantee `index <= MAX_INDEX`.
    #[inline]
    pub(crate) fn from_parts(index: u32, version: u8) -> Self {
        debug_assert!(index <= Self::MAX_INDEX, "entity index {index} overflows 24 bits");
        Self((version as u32) << Self::INDEX_BITS | (index & Self::INDEX_MASK))
    }

    /// The index portion (low 24 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 & Self::INDEX_MASK
    }

    /// The version portion (high 8 bits).
    #[inline]
    pub fn version(self) -> u8 {
        (self.0 >> Self::INDEX_BITS) as u8
    }

    /// The same slot at the next version, or `None` if the version would wrap.
    #[inline]
    pub fn next_version(self) -> Option<Self> {
        self.version()
            .checked_add(1)
            .map(|version| Self::from_parts(self.index(), version))
    }

    /// Raw `u32` representation.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// Reconstruct from a raw `u32`. Every bit pattern is a valid entity.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.version())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.version())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out [`Entity`] handles and recycles destroyed slots.
///
/// Every slot ever created stays in `slots`, holding the handle that the slot
/// will (or currently does) answer to. Free indices are kept in a FIFO queue
/// so version increments are spread over many slots instead of one hot slot.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current handle for each slot. Destroyed slots already carry the bumped
    /// version they will be handed out with next.
    slots: Vec<Entity>,
    /// Whether the slot is currently live.
    alive: Vec<bool>,
    /// Recyclable indices (FIFO).
    free_indices: VecDeque<u32>,
    /// Number of live entities.
    live: usize,
    /// Slots whose version is exhausted and will never be handed out again.
    retired: usize,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator with room for `capacity` slots before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            alive: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Allocate an entity, reusing the oldest free slot if there is one.
    ///
    /// Fails with [`EcsError::CapacityExhausted`] only when the free list is
    /// empty and every one of the `2^24` indices has been handed out.
    pub fn allocate(&mut self) -> Result<Entity, EcsError> {
        let entity = if let Some(index) = self.free_indices.pop_front() {
            // Version was already bumped on destroy.
            self.alive[index as usize] = true;
            self.slots[index as usize]
        } else {
            let index = self.slots.len();
            if index > Entity::MAX_INDEX as usize {
                return Err(EcsError::CapacityExhausted);
            }
            let entity = Entity::from_parts(index as u32, 0);
            self.slots.push(entity);
            self.alive.push(true);
            entity
        };
        self.live += 1;
        Ok(entity)
    }

    /// Destroy `entity`, bumping its slot's version and queueing the slot for
    /// reuse.
    ///
    /// A slot already at [`Entity::MAX_VERSION`] is retired instead of
    /// recycled, so a wrapped version can never make a stale handle live again.
    pub fn deallocate(&mut self, entity: Entity) -> Result<(), EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::DeadEntity { entity });
        }
        let idx = entity.index() as usize;
        self.alive[idx] = false;
        self.live -= 1;
        match entity.next_version() {
            Some(next) => {
                self.slots[idx] = next;
                self.free_indices.push_back(entity.index());
            }
            None => {
                self.retired += 1;
                tracing::warn!(
                    %entity,
                    retired = self.retired,
                    "entity slot exhausted its version space and is retired"
                );
            }
        }
        Ok(())
    }

    /// Returns `true` if `entity` is live and its version matches the slot's.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index() as usize;
        idx < self.slots.len() && self.alive[idx] && self.slots[idx] == entity
    }

    /// Number of live entities.
    pub fn alive_count(&self) -> usize {
        self.live
    }

    /// Number of slots ever created, live or not.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of retired slots.
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    /// Number of slots waiting in the free list.
    pub fn free_count(&self) -> usize {
        self.free_indices.len()
    }

    /// Iterate live entities in index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .zip(&self.alive)
            .filter_map(|(&entity, &alive)| alive.then_some(entity))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_unique_ids() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<Entity> = (0..100).map(|_| alloc.allocate().unwrap()).collect();
        let mut raw: Vec<u32> = ids.iter().map(|e| e.to_raw()).collect();
        raw.sort();
        raw.dedup();
        assert_eq!(raw.len(), 100);
    }

    #[test]
    fn version_increments_on_recycle() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate().unwrap();
        assert_eq!(e0.version(), 0);
        alloc.deallocate(e0).unwrap();
        let e1 = alloc.allocate().unwrap();
        assert_eq!(e1.index(), e0.index());
        assert_eq!(e1.version(), 1);
        assert_ne!(e0, e1);
    }

    #[test]
    fn stale_id_detection() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate().unwrap();
        assert!(alloc.is_alive(e0));
        alloc.deallocate(e0).unwrap();
        assert!(!alloc.is_alive(e0));
        let e1 = alloc.allocate().unwrap();
        assert!(!alloc.is_alive(e0), "stale ID still not alive after recycle");
        assert!(alloc.is_alive(e1));
    }

    #[test]
    fn double_deallocate_fails() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate().unwrap();
        assert!(alloc.deallocate(e).is_ok());
        assert!(matches!(
            alloc.deallocate(e),
            Err(EcsError::DeadEntity { entity }) if entity == e
        ));
    }

    #[test]
    fn forged_next_version_is_not_alive() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate().unwrap();
        alloc.deallocate(e).unwrap();
        // The slot holds version 1 while sitting in the free list.
        let forged = Entity::try_new(e.index(), 1).unwrap();
        assert!(!alloc.is_alive(forged));
        assert!(alloc.deallocate(forged).is_err());
    }

    #[test]
    fn free_list_is_fifo() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate().unwrap();
        let b = alloc.allocate().unwrap();
        alloc.deallocate(a).unwrap();
        alloc.deallocate(b).unwrap();
        assert_eq!(alloc.allocate().unwrap().index(), a.index());
        assert_eq!(alloc.allocate().unwrap().index(), b.index());
    }

    #[test]
    fn slot_is_retired_on_version_wraparound() {
        let mut alloc = EntityAllocator::new();
        let mut e = alloc.allocate().unwrap();
        for expected in 0..=u8::MAX {
            assert_eq!(e.index(), 0);
            assert_eq!(e.version(), expected);
            alloc.deallocate(e).unwrap();
            if expected < u8::MAX {
                e = alloc.allocate().unwrap();
            }
        }
        assert_eq!(alloc.retired_count(), 1);
        assert_eq!(alloc.free_count(), 0);

        // Slot 0 is gone for good; the next entity gets a fresh index.
        let fresh = alloc.allocate().unwrap();
        assert_eq!(fresh.index(), 1);
        assert_eq!(fresh.version(), 0);

        // No version-0 handle for slot 0 can come back to life.
        assert!(!alloc.is_alive(Entity::try_new(0, 0).unwrap()));
    }

    #[test]
    fn alive_count_and_iteration() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate().unwrap();
        let e1 = alloc.allocate().unwrap();
        let e2 = alloc.allocate().unwrap();
        alloc.deallocate(e1).unwrap();
        assert_eq!(alloc.alive_count(), 2);
        assert_eq!(alloc.slot_count(), 3);
        assert_eq!(alloc.iter_alive().collect::<Vec<_>>(), vec![e0, e2]);
    }

    #[test]
    fn entity_bit_layout() {
        let e = Entity::try_new(42, 7).unwrap();
        assert_eq!(e.index(), 42);
        assert_eq!(e.version(), 7);
        assert_eq!(e.to_raw(), (7 << 24) | 42);
        assert_eq!(Entity::from_raw(e.to_raw()), e);
        assert_eq!(format!("{e}"), "42v7");
        assert_eq!(format!("{e:?}"), "Entity(42v7)");
    }

    #[test]
    fn oversized_index_is_rejected() {
        assert!(Entity::try_new(Entity::MAX_INDEX, 0).is_ok());
        assert!(matches!(
            Entity::try_new(Entity::MAX_INDEX + 1, 0),
            Err(EcsError::IndexOutOfRange { index }) if index == 1 << 24
        ));
    }

    #[test]
    fn next_version_stops_at_max() {
        let e = Entity::try_new(3, 254).unwrap();
        let next = e.next_version().unwrap();
        assert_eq!(next.index(), 3);
        assert_eq!(next.version(), 255);
        assert_eq!(next.next_version(), None);
    }

    #[test]
    fn serializes_as_raw_u32() {
        let e = Entity::try_new(5, 2).unwrap();
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, e.to_raw().to_string());
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
