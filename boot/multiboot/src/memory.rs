//! # Memory Map and Block Map
//!
//! The boot loader's memory map describes physical RAM. The block map is
//! produced by the assembly boot stub: it records the 4 MiB blocks it
//! reserved and mapped before paging was enabled (initial kernel heap,
//! paging structures, relocated Multiboot data).

use core::fmt;

use crate::ParseError;

// =============================================================================
// MEMORY MAP
// =============================================================================

/// Size of one memory map record including its `size` field
pub const MEMORY_MAP_ENTRY_SIZE: usize = 24;

/// Type of a memory map region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    /// Usable RAM
    Available,
    /// Reserved by firmware or hardware
    Reserved,
    /// ACPI tables, reclaimable after parsing
    AcpiReclaimable,
    /// ACPI non-volatile storage
    AcpiNvs,
    /// Defective RAM
    BadRam,
    /// A type this kernel does not know
    Unknown(u32),
}

impl MemoryKind {
    /// Decode the Multiboot type field
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Available,
            2 => Self::Reserved,
            3 => Self::AcpiReclaimable,
            4 => Self::AcpiNvs,
            5 => Self::BadRam,
            other => Self::Unknown(other),
        }
    }

    /// Encode as the Multiboot type field
    pub const fn raw(self) -> u32 {
        match self {
            Self::Available => 1,
            Self::Reserved => 2,
            Self::AcpiReclaimable => 3,
            Self::AcpiNvs => 4,
            Self::BadRam => 5,
            Self::Unknown(other) => other,
        }
    }
}

/// One physical memory region
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapEntry {
    /// Physical start address
    pub address: u64,
    /// Length in bytes
    pub length: u64,
    /// Region type
    pub kind: MemoryKind,
}

impl MemoryMapEntry {
    /// A region of `kind` spanning `[address, address + length)`
    pub const fn new(address: u64, length: u64, kind: MemoryKind) -> Self {
        Self {
            address,
            length,
            kind,
        }
    }

    /// Exclusive end address
    pub const fn end(&self) -> u64 {
        self.address.saturating_add(self.length)
    }

    /// Whether the region is usable RAM
    pub const fn is_available(&self) -> bool {
        matches!(self.kind, MemoryKind::Available)
    }
}

impl fmt::Debug for MemoryMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:#012x} - {:#012x}] {:?}",
            self.address,
            self.end(),
            self.kind
        )
    }
}

/// Iterator over the size-prefixed records of a raw memory map
#[derive(Debug, Clone)]
pub struct MemoryMapIter<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> MemoryMapIter<'a> {
    /// Iterate over `bytes` (`mmap_length` bytes at `mmap_addr`)
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(word)
}

impl Iterator for MemoryMapIter<'_> {
    type Item = Result<MemoryMapEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }

        let offset = self.offset;
        let remaining = self.bytes.len() - offset;
        if remaining < MEMORY_MAP_ENTRY_SIZE {
            self.offset = self.bytes.len();
            return Some(Err(ParseError::TruncatedMemoryMap { offset }));
        }

        // `size` excludes the size field itself
        let size = read_u32(self.bytes, offset);
        let next = size
            .checked_add(4)
            .and_then(|record| offset.checked_add(record as usize));
        let Some(next) = next.filter(|_| size as usize >= MEMORY_MAP_ENTRY_SIZE - 4) else {
            self.offset = self.bytes.len();
            return Some(Err(ParseError::TruncatedMemoryMap { offset }));
        };

        let entry = MemoryMapEntry::new(
            read_u64(self.bytes, offset + 4),
            read_u64(self.bytes, offset + 12),
            MemoryKind::from_raw(read_u32(self.bytes, offset + 20)),
        );
        self.offset = next;
        Some(Ok(entry))
    }
}

// =============================================================================
// BLOCK MAP
// =============================================================================

/// Purpose of a block reserved by the boot stub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BlockKind {
    /// Initial kernel heap
    HeapReserved      = 0,
    /// Page tables of the bootstrap address space
    PagingReserved    = 1,
    /// Relocated Multiboot structures
    MultibootReserved = 2,
}

/// A run of 4 MiB blocks reserved before paging
///
/// Layout shared with the boot stub; a `block_count` of zero terminates the
/// table.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMapEntry {
    /// Physical start address
    pub start_address: u32,
    /// Virtual start address after paging is enabled
    pub virtual_start_address: u32,
    /// Number of 4 MiB blocks
    pub block_count: u32,
    /// Whether the stub mapped the blocks in the initial page directory
    pub initial_map: u32,
    /// Raw [`BlockKind`]
    pub kind: u32,
}

/// Size of one reserved block
pub const BLOCK_SIZE: u32 = 4 * 1024 * 1024;

impl BlockMapEntry {
    /// An entry of `block_count` blocks
    pub const fn new(
        start_address: u32,
        virtual_start_address: u32,
        block_count: u32,
        kind: BlockKind,
    ) -> Self {
        Self {
            start_address,
            virtual_start_address,
            block_count,
            initial_map: 1,
            kind: kind as u32,
        }
    }

    /// Decoded purpose
    pub const fn kind(&self) -> Option<BlockKind> {
        match self.kind {
            0 => Some(BlockKind::HeapReserved),
            1 => Some(BlockKind::PagingReserved),
            2 => Some(BlockKind::MultibootReserved),
            _ => None,
        }
    }

    /// Whether this entry terminates the table
    pub const fn is_terminator(&self) -> bool {
        self.block_count == 0
    }

    /// Bytes covered
    pub const fn size(&self) -> u64 {
        self.block_count as u64 * BLOCK_SIZE as u64
    }
}

// =============================================================================
// TESTS
// =============================================================================
