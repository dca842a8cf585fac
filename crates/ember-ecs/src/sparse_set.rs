//! Densely packed per-component-type storage.
//!
//! A [`SparseSet`] keeps three parallel arrays:
//!
//! - `sparse[key index] -> dense index` ([`INVALID`] when absent),
//! - `dense[dense index] -> key` (which key occupies a dense slot),
//! - `components[dense index] -> C` (the payload, parallel to `dense`).
//!
//! Lookup, insertion and removal are all O(1). Removal swaps the removed slot
//! with the *last* dense slot, so dense order is not preserved across
//! [`SparseSet::remove`] and nothing may rely on it.

use std::fmt;

use crate::entity::Entity;

/// Sentinel stored in `sparse` for keys that have no component.
pub const INVALID: usize = usize::MAX;

/// Most slots the sparse array grows past the highest key in one step.
const MAX_GROWTH_SLACK: usize = 1 << 16;

// ---------------------------------------------------------------------------
// SparseKey
// ---------------------------------------------------------------------------

/// A key that can address a slot in the sparse array.
///
/// The sparse array is as long as the largest key seen, so keys should be
/// dense small integers. [`Entity`] indices are bounded to 24 bits; raw
/// `u32`/`usize` keys are not, and a huge key costs a huge allocation.
pub trait SparseKey: Copy + Eq + fmt::Debug {
    /// Position of this key in the sparse array.
    fn sparse_index(self) -> usize;
}

impl SparseKey for Entity {
    #[inline]
    fn sparse_index(self) -> usize {
        self.index() as usize
    }
}

impl SparseKey for u32 {
    #[inline]
    fn sparse_index(self) -> usize {
        self as usize
    }
}

impl SparseKey for usize {
    #[inline]
    fn sparse_index(self) -> usize {
        self
    }
}

// ---------------------------------------------------------------------------
// SparseSet
// ---------------------------------------------------------------------------

/// Maps keys to components of a single type.
///
/// The dense array stores the full key, so a key whose index matches but whose
/// other bits differ (e.g. an [`Entity`] with another version) is not
/// considered contained.
#[derive(Clone)]
pub struct SparseSet<C, K: SparseKey = Entity> {
    sparse: Vec<usize>,
    dense: Vec<K>,
    components: Vec<C>,
}

impl<C, K: SparseKey> SparseSet<C, K> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Create an empty set with room for `capacity` components.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::with_capacity(capacity),
            dense: Vec::with_capacity(capacity),
            components: Vec::with_capacity(capacity),
        }
    }

    /// Dense slot holding `key`, if any.
    #[inline]
    fn dense_index(&self, key: K) -> Option<usize> {
        let dense = *self.sparse.get(key.sparse_index())?;
        if dense < self.components.len() && self.dense[dense] == key {
            Some(dense)
        } else {
            None
        }
    }

    /// Whether `key` has a component. Never fails; out-of-range keys are
    /// simply absent.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.dense_index(key).is_some()
    }

    /// Store `component` for `key`.
    ///
    /// Returns `false` and leaves the existing component untouched if `key`
    /// already has one.
    pub fn emplace(&mut self, key: K, component: C) -> bool {
        self.emplace_with(key, || component)
    }

    /// Like [`emplace`](Self::emplace), but only builds the component when
    /// the slot is actually free.
    ///
    /// A slot held by a different key with the same index (e.g. an older
    /// entity version) also counts as taken.
    pub fn emplace_with(&mut self, key: K, make: impl FnOnce() -> C) -> bool {
        let idx = key.sparse_index();
        if self.sparse.get(idx).is_some_and(|&d| d != INVALID) {
            return false;
        }
        if idx >= self.sparse.len() && !self.grow_sparse(idx) {
            return false;
        }
        self.sparse[idx] = self.dense.len();
        self.dense.push(key);
        self.components.push(make());
        true
    }

    /// Make `sparse[idx]` addressable. Returns `false` if the array cannot
    /// be allocated.
    fn grow_sparse(&mut self, idx: usize) -> bool {
        let Some(needed) = idx.checked_add(1) else {
            return false;
        };
        // Double what is needed so a run of rising keys does not resize on
        // every insert, but never over-allocate by more than MAX_GROWTH_SLACK.
        let new_len = needed
            .saturating_mul(2)
            .min(needed.saturating_add(MAX_GROWTH_SLACK));
        if self.sparse.try_reserve_exact(new_len - self.sparse.len()).is_err() {
            tracing::warn!(key_index = idx, "sparse array allocation failed");
            return false;
        }
        self.sparse.resize(new_len, INVALID);
        true
    }

    /// Remove and return the component for `key`. `None` if absent.
    ///
    /// The last dense slot is moved into the hole, so the component that
    /// lived there changes address.
    pub fn remove(&mut self, key: K) -> Option<C> {
        let dense = self.dense_index(key)?;
        let last = self.dense.len() - 1;
        self.dense.swap_remove(dense);
        let removed = self.components.swap_remove(dense);
        if dense != last {
            let moved = self.dense[dense];
            self.sparse[moved.sparse_index()] = dense;
        }
        self.sparse[key.sparse_index()] = INVALID;
        Some(removed)
    }

    /// The component for `key`, if present.
    #[inline]
    pub fn get(&self, key: K) -> Option<&C> {
        self.dense_index(key).map(|d| &self.components[d])
    }

    /// Mutable access to the component for `key`, if present.
    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut C> {
        self.dense_index(key).map(|d| &mut self.components[d])
    }

    /// Number of stored components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the set holds no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Current length of the sparse array.
    pub fn sparse_len(&self) -> usize {
        self.sparse.len()
    }

    /// Keys in dense order.
    pub fn ids(&self) -> &[K] {
        &self.dense
    }

    /// Components in dense order, parallel to [`ids`](Self::ids).
    pub fn components(&self) -> &[C] {
        &self.components
    }

    /// Mutable components in dense order.
    pub fn components_mut(&mut self) -> &mut [C] {
        &mut self.components
    }

    /// Iterate `(key, &component)` in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &C)> + '_ {
        self.dense.iter().copied().zip(self.components.iter())
    }

    /// Iterate `(key, &mut component)` in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut C)> + '_ {
        self.dense.iter().copied().zip(self.components.iter_mut())
    }

    /// Drop every component. The sparse array keeps its allocation.
    pub fn clear(&mut self) {
        self.sparse.fill(INVALID);
        self.dense.clear();
        self.components.clear();
    }
}

impl<C, K: SparseKey> Default for SparseSet<C, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: fmt::Debug, K: SparseKey> fmt::Debug for SparseSet<C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
