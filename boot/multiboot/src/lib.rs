//! # Ember Multiboot
//!
//! Boot-time view of what GRUB and the assembly boot stub hand over to the
//! kernel, in two stages:
//!
//! ```text
//! ┌────────────────────────┐    initialize()    ┌──────────────────────┐
//! │ BootInfoSource         │ ─────────────────▶ │ EarlyStructure       │
//! │ (borrowed raw memory)  │   no allocation    │ memory + block maps  │
//! └────────────────────────┘                    └──────────┬───────────┘
//!                                                          │ parse()
//!                                                          ▼  needs a heap
//!                                               ┌──────────────────────┐
//!                                               │ BootStructure        │
//!                                               │ cmdline, options,    │
//!                                               │ modules, loader name │
//!                                               └──────────────────────┘
//! ```
//!
//! The early stage runs before any allocator exists; the full parse runs
//! once the early heap is usable.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

use core::fmt;

pub mod info;
pub mod memory;
pub mod options;
pub mod structure;

pub use info::{BootInfoSource, InfoFlags, ModuleSource, RawMultibootInfo, BOOTLOADER_MAGIC};
pub use memory::{BlockKind, BlockMapEntry, MemoryKind, MemoryMapEntry, MemoryMapIter};
pub use options::KernelOptions;
pub use structure::{BootModule, BootStructure, EarlyStructure};

// =============================================================================
// Parse Error
// =============================================================================

/// Error raised while reading boot information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A memory map record runs past the end of the map
    TruncatedMemoryMap {
        /// Byte offset of the record
        offset: usize,
    },

    /// More memory map records than the early structure holds
    MemoryMapTooLarge,

    /// More block map entries than the early structure holds
    BlockMapTooLarge,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TruncatedMemoryMap { offset } => {
                write!(f, "Memory map record at offset {} is truncated", offset)
            },
            ParseError::MemoryMapTooLarge => {
                write!(f, "Memory map has more than {} records", structure::MAX_MEMORY_REGIONS)
            },
            ParseError::BlockMapTooLarge => {
                write!(f, "Block map has more than {} entries", structure::MAX_BLOCK_ENTRIES)
            },
        }
    }
}
