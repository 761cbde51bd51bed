//! # Thread Handles
//!
//! Generation-checked references into the scheduler's thread table.
//!
//! ```text
//!  31            16 15             0
//! ┌────────────────┬────────────────┐
//! │   generation   │   index + 1    │
//! └────────────────┴────────────────┘
//! ```
//!
//! The low half is never zero, so `0` encodes "no thread" in
//! [`AtomicThreadHandle`]. A table slot that is reused gets a new generation,
//! so a stale handle can never resolve to the new occupant.

use core::fmt;
use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};

/// Highest usable thread table index
pub const MAX_THREAD_INDEX: u16 = u16::MAX - 1;

/// Weak reference to a thread table slot
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ThreadHandle(NonZeroU32);

impl ThreadHandle {
    /// Handle for `index` at `generation`; `None` if `index` exceeds [`MAX_THREAD_INDEX`]
    pub const fn new(index: u16, generation: u16) -> Option<Self> {
        if index > MAX_THREAD_INDEX {
            return None;
        }
        Self::from_raw(((generation as u32) << 16) | (index as u32 + 1))
    }

    /// Decode a raw value produced by [`ThreadHandle::raw`]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw & 0xFFFF == 0 {
            return None;
        }
        match NonZeroU32::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Thread table index
    pub const fn index(self) -> u16 {
        (self.0.get() & 0xFFFF) as u16 - 1
    }

    /// Slot generation
    pub const fn generation(self) -> u16 {
        (self.0.get() >> 16) as u16
    }

    /// Encoded value
    pub const fn raw(self) -> u32 {
        self.0.get()
    }

    /// Handle for the next occupant of the same slot
    pub const fn next_generation(self) -> Self {
        let raw = ((self.generation().wrapping_add(1) as u32) << 16) | (self.0.get() & 0xFFFF);
        match NonZeroU32::new(raw) {
            Some(value) => Self(value),
            None => self,
        }
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({}#{})", self.index(), self.generation())
    }
}

/// Nullable thread handle with atomic access
#[derive(Debug)]
#[repr(transparent)]
pub struct AtomicThreadHandle(AtomicU32);

impl AtomicThreadHandle {
    /// Holding no thread
    pub const fn empty() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Current value
    pub fn load(&self) -> Option<ThreadHandle> {
        ThreadHandle::from_raw(self.0.load(Ordering::Acquire))
    }

    /// Replace the value
    pub fn store(&self, handle: Option<ThreadHandle>) {
        self.0.store(handle.map_or(0, ThreadHandle::raw), Ordering::Release);
    }

    /// Clear the value if it is still `handle`
    pub fn clear_if(&self, handle: ThreadHandle) -> bool {
        self.0
            .compare_exchange(handle.raw(), 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicThreadHandle {
    fn default() -> Self {
        Self::empty()
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<Option<ThreadHandle>>(), 4);
static_assertions::const_assert_eq!(core::mem::size_of::<AtomicThreadHandle>(), 4);
