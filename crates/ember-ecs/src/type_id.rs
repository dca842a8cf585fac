//! Process-wide component type identifiers.
//!
//! Every Rust type used as a component is lazily assigned a
//! [`ComponentTypeId`] the first time it is asked for. Ids are handed out from
//! 0 in first-use order and stay fixed for the lifetime of the process. They
//! are not stable across runs and must never be persisted.
//!
//! Assignment goes through a mutex-guarded registry so ids stay unique even if
//! two threads race on first use; each thread keeps a local cache so lookups
//! after the first one do not touch the lock.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque, lightweight identifier for a component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    /// The raw integer value.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match type_name_of(*self) {
            Some(name) => write!(f, "{name}#{}", self.0),
            None => write!(f, "#{}", self.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TypeRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    /// Indexed by `ComponentTypeId.0`.
    names: Vec<&'static str>,
}

fn registry() -> &'static Mutex<TypeRegistry> {
    static REGISTRY: OnceLock<Mutex<TypeRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(TypeRegistry::default()))
}

thread_local! {
    static LOCAL_CACHE: RefCell<HashMap<TypeId, ComponentTypeId>> = RefCell::new(HashMap::new());
}

/// The [`ComponentTypeId`] for `T`, assigning a new one on first use.
pub fn component_type_id<T: 'static>() -> ComponentTypeId {
    let rust_type = TypeId::of::<T>();
    if let Some(id) = LOCAL_CACHE.with(|cache| cache.borrow().get(&rust_type).copied()) {
        return id;
    }

    let id = {
        // The registry holds no invariant a panicking holder could break.
        let mut reg = registry().lock().unwrap_or_else(PoisonError::into_inner);
        let next = ComponentTypeId(reg.names.len() as u32);
        let id = *reg.by_type.entry(rust_type).or_insert(next);
        if id == next {
            reg.names.push(std::any::type_name::<T>());
            tracing::trace!(component = std::any::type_name::<T>(), id = id.0, "assigned component type id");
        }
        id
    };

    LOCAL_CACHE.with(|cache| cache.borrow_mut().insert(rust_type, id));
    id
}

/// The Rust type name behind `id`, if it has been assigned.
pub fn type_name_of(id: ComponentTypeId) -> Option<&'static str> {
    let reg = registry().lock().unwrap_or_else(PoisonError::into_inner);
    reg.names.get(id.0 as usize).copied()
}

/// Number of component type ids assigned so far in this process.
pub fn assigned_count() -> usize {
    registry()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .names
        .len()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
