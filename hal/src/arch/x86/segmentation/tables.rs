//! # Descriptor Table Builder
//!
//! Builds the two GDTs the kernel uses:
//!
//! ```text
//! System GDT (paging enabled)          BIOS GDT (paging disabled)
//! ──────────────────────────────       ───────────────────────────────
//! 0  null                              0  null
//! 1  kernel code   0x9A  ring 0        1  kernel code   0x9A
//! 2  kernel data   0x92  ring 0        2  kernel data   0x92
//! 3  user code     0xFA  ring 3        3  16-bit code   0x9A  base = BIOS window
//! 4  user data     0xF2  ring 3
//! 5  TSS           0x89
//! ```
//!
//! The system table gets two GDTR payloads that differ only in their base:
//! the physical one is loaded during the bootstrap window, the virtual one
//! once the kernel runs in the higher half. The BIOS table is only used with
//! paging disabled, so its payload carries the physical base.

use core::mem::size_of;

use super::gdt::{AccessByte, DescriptorFlags, GdtDescriptor, GdtEntry, GDT_ENTRY_SIZE};
use super::tss::TaskStateSegment;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Entries in the system GDT
pub const SYSTEM_GDT_ENTRIES: usize = 6;

/// Entries in the BIOS call GDT
pub const BIOS_GDT_ENTRIES: usize = 4;

/// Flat 4 GiB limit
const FLAT_LIMIT: u32 = 0xFFFF_FFFF;

// =============================================================================
// LAYOUT
// =============================================================================

/// Address-space parameters the tables depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Offset added to a physical kernel address to get its virtual address
    pub kernel_virtual_offset: u32,
    /// Physical base of the 16-bit BIOS call code window
    pub bios_code_base: u32,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            kernel_virtual_offset: 0xC000_0000,
            bios_code_base: 0x4000,
        }
    }
}

/// The three GDTR payloads produced for the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRegisters {
    /// System GDT at its higher-half address
    pub system_virtual: GdtDescriptor,
    /// System GDT at its physical address
    pub system_physical: GdtDescriptor,
    /// BIOS GDT at its physical address
    pub bios: GdtDescriptor,
}

impl DescriptorRegisters {
    /// Payloads for tables located at the given physical addresses
    pub const fn new(system_gdt: u32, bios_gdt: u32, layout: &TableLayout) -> Self {
        Self {
            system_virtual: GdtDescriptor::for_entries(
                system_gdt.wrapping_add(layout.kernel_virtual_offset),
                SYSTEM_GDT_ENTRIES,
            ),
            system_physical: GdtDescriptor::for_entries(system_gdt, SYSTEM_GDT_ENTRIES),
            bios: GdtDescriptor::for_entries(bios_gdt, BIOS_GDT_ENTRIES),
        }
    }
}

// =============================================================================
// TABLE CONSTRUCTION
// =============================================================================

/// Entries of the system GDT, with the TSS descriptor pointing at `tss_base`
pub const fn system_table(tss_base: u32) -> [GdtEntry; SYSTEM_GDT_ENTRIES] {
    [
        GdtEntry::NULL,
        GdtEntry::new(0, FLAT_LIMIT, AccessByte::KERNEL_CODE, DescriptorFlags::FLAT_32),
        GdtEntry::new(0, FLAT_LIMIT, AccessByte::KERNEL_DATA, DescriptorFlags::FLAT_32),
        GdtEntry::new(0, FLAT_LIMIT, AccessByte::USER_CODE, DescriptorFlags::FLAT_32),
        GdtEntry::new(0, FLAT_LIMIT, AccessByte::USER_DATA, DescriptorFlags::FLAT_32),
        GdtEntry::new(
            tss_base,
            size_of::<TaskStateSegment>() as u32,
            AccessByte::TSS_AVAILABLE,
            DescriptorFlags::SYSTEM_32,
        ),
    ]
}

/// Entries of the BIOS call GDT
pub const fn bios_table(bios_code_base: u32) -> [GdtEntry; BIOS_GDT_ENTRIES] {
    [
        GdtEntry::NULL,
        GdtEntry::new(0, FLAT_LIMIT, AccessByte::KERNEL_CODE, DescriptorFlags::FLAT_32),
        GdtEntry::new(0, FLAT_LIMIT, AccessByte::KERNEL_DATA, DescriptorFlags::FLAT_32),
        GdtEntry::new(bios_code_base, FLAT_LIMIT, AccessByte::KERNEL_CODE, DescriptorFlags::FLAT_16),
    ]
}

/// Write `entries` into raw table memory, word by word
///
/// # Safety
/// `table` must be valid for `entries.len() * 4` word writes.
unsafe fn write_entries(table: *mut u16, entries: &[GdtEntry]) {
    for (index, entry) in entries.iter().enumerate() {
        for (word_index, word) in entry.words().iter().enumerate() {
            unsafe { table.add(index * 4 + word_index).write_unaligned(*word) };
        }
    }
}

/// Zero-fill and populate both GDTs and their GDTR payloads
///
/// All pointers are physical addresses of memory reserved before paging is
/// enabled; their numeric value is used as the physical table base.
///
/// # Safety
/// - `system_gdt` must be writable for [`SYSTEM_GDT_ENTRIES`] descriptors.
/// - `bios_gdt` must be writable for [`BIOS_GDT_ENTRIES`] descriptors.
/// - Each descriptor pointer must be writable for 6 bytes.
/// - Must run before any of the tables is loaded.
pub unsafe fn initialize_global_descriptor_tables(
    system_gdt: *mut u16,
    bios_gdt: *mut u16,
    system_descriptor: *mut u16,
    bios_descriptor: *mut u16,
    physical_descriptor: *mut u16,
    tss_base: u32,
    layout: &TableLayout,
) -> DescriptorRegisters {
    unsafe {
        core::ptr::write_bytes(system_gdt.cast::<u8>(), 0, SYSTEM_GDT_ENTRIES * GDT_ENTRY_SIZE);
        core::ptr::write_bytes(bios_gdt.cast::<u8>(), 0, BIOS_GDT_ENTRIES * GDT_ENTRY_SIZE);

        write_entries(system_gdt, &system_table(tss_base));
        write_entries(bios_gdt, &bios_table(layout.bios_code_base));
    }

    let registers =
        DescriptorRegisters::new(system_gdt as usize as u32, bios_gdt as usize as u32, layout);

    unsafe {
        system_descriptor.cast::<GdtDescriptor>().write_unaligned(registers.system_virtual);
        physical_descriptor.cast::<GdtDescriptor>().write_unaligned(registers.system_physical);
        bios_descriptor.cast::<GdtDescriptor>().write_unaligned(registers.bios);
    }

    log::debug!(
        "GDT: system at {:#010x}, BIOS at {:#010x}, TSS at {:#010x}",
        system_gdt as usize,
        bios_gdt as usize,
        tss_base
    );

    registers
}

// =============================================================================
// TESTS
// =============================================================================
