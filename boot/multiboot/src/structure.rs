//! # Boot Structure
//!
//! Two-stage decoding of the boot information.
//!
//! [`EarlyStructure::initialize`] copies the memory map and the block map
//! into fixed-capacity storage. It runs before the kernel heap exists and
//! never allocates. [`EarlyStructure::parse`] decodes the rest (command
//! line, options, modules, loader name) into owned, heap-backed values.

use alloc::string::String;
use alloc::vec::Vec;

use arrayvec::ArrayVec;

use crate::info::{BootInfoSource, InfoFlags};
use crate::memory::{BlockKind, BlockMapEntry, MemoryMapEntry, MemoryMapIter};
use crate::options::KernelOptions;
use crate::ParseError;

/// Memory map records kept by the early structure
pub const MAX_MEMORY_REGIONS: usize = 64;

/// Block map entries kept by the early structure
pub const MAX_BLOCK_ENTRIES: usize = 16;

// =============================================================================
// Early Structure
// =============================================================================

/// Allocation-free snapshot of the memory map and block map
#[derive(Debug, Clone, Default)]
pub struct EarlyStructure {
    flags: u32,
    lower_memory: u32,
    upper_memory: u32,
    memory_map: ArrayVec<MemoryMapEntry, MAX_MEMORY_REGIONS>,
    block_map: ArrayVec<BlockMapEntry, MAX_BLOCK_ENTRIES>,
}

impl EarlyStructure {
    /// Copy the maps out of `source`
    pub fn initialize(source: &BootInfoSource<'_>) -> Result<Self, ParseError> {
        let mut memory_map = ArrayVec::new();
        for entry in MemoryMapIter::new(source.memory_map) {
            memory_map
                .try_push(entry?)
                .map_err(|_| ParseError::MemoryMapTooLarge)?;
        }

        let mut block_map = ArrayVec::new();
        for entry in source.block_map.iter().take_while(|entry| !entry.is_terminator()) {
            block_map
                .try_push(*entry)
                .map_err(|_| ParseError::BlockMapTooLarge)?;
        }

        let flags = source.info.flags();
        let (lower_memory, upper_memory) = if flags.contains(InfoFlags::MEMORY) {
            (source.info.mem_lower, source.info.mem_upper)
        } else {
            (0, 0)
        };

        log::debug!(
            "Multiboot: {} memory regions, {} reserved block runs",
            memory_map.len(),
            block_map.len()
        );

        Ok(Self {
            flags: flags.bits(),
            lower_memory,
            upper_memory,
            memory_map,
            block_map,
        })
    }

    /// Validity flags of the information structure
    pub fn flags(&self) -> InfoFlags {
        InfoFlags::from_bits_retain(self.flags)
    }

    /// Memory map records in boot loader order
    pub fn memory_map(&self) -> &[MemoryMapEntry] {
        &self.memory_map
    }

    /// Block runs reserved by the boot stub
    pub fn block_map(&self) -> &[BlockMapEntry] {
        &self.block_map
    }

    /// First block run of `kind`
    pub fn find_block(&self, kind: BlockKind) -> Option<&BlockMapEntry> {
        self.block_map.iter().find(|entry| entry.kind() == Some(kind))
    }

    /// Decode everything that needs the heap
    ///
    /// Boot loader strings are raw bytes; invalid UTF-8 sequences become
    /// U+FFFD instead of failing the boot.
    pub fn parse(&self, source: &BootInfoSource<'_>) -> BootStructure {
        let command_line = source.command_line.map(lossy).unwrap_or_default();
        let options = KernelOptions::parse(&command_line);

        let modules = source
            .modules
            .iter()
            .map(|module| BootModule {
                start: module.start,
                end: module.end,
                name: lossy(module.name),
            })
            .collect();

        BootStructure {
            command_line,
            options,
            boot_loader_name: source.boot_loader_name.map(lossy),
            modules,
            lower_memory: self.lower_memory,
            upper_memory: self.upper_memory,
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// =============================================================================
// Full Structure
// =============================================================================

/// A module loaded by the boot loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootModule {
    /// Physical start
    pub start: u32,
    /// Physical end (exclusive)
    pub end: u32,
    /// Module string, usually its path
    pub name: String,
}

impl BootModule {
    /// Size in bytes
    pub fn size(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

/// Fully decoded boot information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootStructure {
    /// Raw command line
    pub command_line: String,
    /// Options parsed from the command line
    pub options: KernelOptions,
    /// Name reported by the boot loader
    pub boot_loader_name: Option<String>,
    /// Loaded modules
    pub modules: Vec<BootModule>,
    /// KiB of memory below 1 MiB
    pub lower_memory: u32,
    /// KiB of memory above 1 MiB
    pub upper_memory: u32,
}

impl BootStructure {
    /// Module whose string equals `name`
    pub fn module(&self, name: &str) -> Option<&BootModule> {
        self.modules.iter().find(|module| module.name == name)
    }
}

// =============================================================================
// TESTS
// =============================================================================
