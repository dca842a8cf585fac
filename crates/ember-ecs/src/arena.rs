//! Linear byte arenas for metadata pools.
//!
//! [`ErasedArena`] is a fixed-capacity bump allocator. Allocations are never
//! freed individually; [`ErasedArena::reset`] releases everything at once and
//! bumps an epoch so handles from before the reset stop resolving.
//!
//! [`MetaArena`] stores strings (entity names, asset paths, shader names) in
//! an [`ErasedArena`] and hands out copyable [`MetaStr`] handles.

use std::fmt;
use std::marker::PhantomData;

/// Largest alignment an arena can honour. The backing store is a `Vec<u64>`.
pub const MAX_ALIGN: usize = std::mem::align_of::<u64>();

/// Errors produced by arena allocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// Not enough room left for the request.
    #[error("arena out of memory: requested {requested} bytes, {remaining} remaining")]
    OutOfMemory { requested: usize, remaining: usize },

    /// The alignment is zero, not a power of two, or above [`MAX_ALIGN`].
    #[error("unsupported alignment {align} (must be a power of two <= {max})", max = MAX_ALIGN)]
    InvalidAlignment { align: usize },
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// A byte range inside one epoch of an [`ErasedArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaRange {
    offset: usize,
    len: usize,
    epoch: u32,
}

impl ArenaRange {
    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the range is zero bytes long.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A typed handle to a value stored with [`ErasedArena::alloc_value`].
pub struct ArenaHandle<T> {
    range: ArenaRange,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ArenaHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaHandle<T> {}

impl<T> PartialEq for ArenaHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.range == other.range
    }
}

impl<T> Eq for ArenaHandle<T> {}

impl<T> fmt::Debug for ArenaHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaHandle")
            .field("type", &std::any::type_name::<T>())
            .field("offset", &self.range.offset)
            .field("epoch", &self.range.epoch)
            .finish()
    }
}

impl<T> ArenaHandle<T> {
    /// The underlying byte range.
    pub fn range(&self) -> ArenaRange {
        self.range
    }
}

// ---------------------------------------------------------------------------
// ErasedArena
// ---------------------------------------------------------------------------

/// Fixed-capacity bump allocator over an 8-byte aligned buffer.
#[derive(Debug, Clone)]
pub struct ErasedArena {
    words: Vec<u64>,
    offset: usize,
    epoch: u32,
}

impl ErasedArena {
    /// Create an arena holding at least `bytes` bytes, rounded up to a
    /// multiple of [`MAX_ALIGN`].
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            words: vec![0; bytes.div_ceil(MAX_ALIGN)],
            offset: 0,
            epoch: 0,
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.words.len() * MAX_ALIGN
    }

    /// Bytes consumed so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.offset
    }

    /// Bytes left before the arena is full.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.offset
    }

    /// Reserve `size` bytes aligned to `align`.
    pub fn alloc(&mut self, size: usize, align: usize) -> Result<ArenaRange, ArenaError> {
        if !align.is_power_of_two() || align > MAX_ALIGN {
            return Err(ArenaError::InvalidAlignment { align });
        }
        let out_of_memory = ArenaError::OutOfMemory {
            requested: size,
            remaining: self.remaining(),
        };
        let start = self.offset.next_multiple_of(align);
        let end = start.checked_add(size).ok_or(out_of_memory.clone())?;
        if end > self.capacity() {
            return Err(out_of_memory);
        }
        self.offset = end;
        Ok(ArenaRange {
            offset: start,
            len: size,
            epoch: self.epoch,
        })
    }

    /// Copy `value` into the arena.
    pub fn alloc_value<T: bytemuck::Pod>(&mut self, value: T) -> Result<ArenaHandle<T>, ArenaError> {
        let range = self.alloc(std::mem::size_of::<T>(), std::mem::align_of::<T>())?;
        if let Some(dst) = self.bytes_mut(range) {
            dst.copy_from_slice(bytemuck::bytes_of(&value));
        }
        Ok(ArenaHandle {
            range,
            _marker: PhantomData,
        })
    }

    /// The bytes of `range`, or `None` if it predates the last reset.
    pub fn bytes(&self, range: ArenaRange) -> Option<&[u8]> {
        if range.epoch != self.epoch {
            return None;
        }
        let all: &[u8] = bytemuck::cast_slice(&self.words);
        all.get(range.offset..range.offset.checked_add(range.len)?)
    }

    /// Mutable bytes of `range`, or `None` if it predates the last reset.
    pub fn bytes_mut(&mut self, range: ArenaRange) -> Option<&mut [u8]> {
        if range.epoch != self.epoch {
            return None;
        }
        let all: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        all.get_mut(range.offset..range.offset.checked_add(range.len)?)
    }

    /// The value behind `handle`.
    pub fn get<T: bytemuck::Pod>(&self, handle: ArenaHandle<T>) -> Option<&T> {
        bytemuck::try_from_bytes(self.bytes(handle.range)?).ok()
    }

    /// Mutable access to the value behind `handle`.
    pub fn get_mut<T: bytemuck::Pod>(&mut self, handle: ArenaHandle<T>) -> Option<&mut T> {
        bytemuck::try_from_bytes_mut(self.bytes_mut(handle.range)?).ok()
    }

    /// Release every allocation. Existing handles stop resolving.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

// ---------------------------------------------------------------------------
// MetaArena
// ---------------------------------------------------------------------------

/// Handle to a string stored in a [`MetaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaStr(ArenaRange);

impl MetaStr {
    /// Length of the string in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A pool of immutable strings backed by an [`ErasedArena`].
#[derive(Debug, Clone)]
pub struct MetaArena {
    arena: ErasedArena,
    count: usize,
}

impl MetaArena {
    /// Create a pool with room for `bytes` bytes of string data.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            arena: ErasedArena::with_capacity(bytes),
            count: 0,
        }
    }

    /// Copy `s` into the pool.
    pub fn push_str(&mut self, s: &str) -> Result<MetaStr, ArenaError> {
        let range = self.arena.alloc(s.len(), 1)?;
        if let Some(dst) = self.arena.bytes_mut(range) {
            dst.copy_from_slice(s.as_bytes());
        }
        self.count += 1;
        Ok(MetaStr(range))
    }

    /// The string behind `handle`, or `None` if it predates the last reset.
    pub fn get(&self, handle: MetaStr) -> Option<&str> {
        std::str::from_utf8(self.arena.bytes(handle.0)?).ok()
    }

    /// Number of strings pushed since the last reset.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no strings are stored.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bytes of string data stored.
    pub fn used(&self) -> usize {
        self.arena.used()
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Drop every string. Existing handles stop resolving.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.count = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
