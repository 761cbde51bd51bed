//! # Descriptor Table Setup
//!
//! Entry point the boot stub calls, with paging still disabled, to build
//! the system GDT, the BIOS call GDT and their GDTR payloads in memory it
//! reserved.

use ember_hal::arch::x86::segmentation::{self, DescriptorRegisters, TableLayout};

use crate::config::BootConfig;

/// Table layout for `config`
pub fn table_layout(config: &BootConfig) -> TableLayout {
    TableLayout {
        kernel_virtual_offset: config.kernel_virtual_offset,
        bios_code_base: config.bios_code_base,
    }
}

/// Build both GDTs with the TSS descriptor pointing at the kernel's task
/// state segment
///
/// # Safety
/// Same contract as [`segmentation::initialize_global_descriptor_tables`]:
/// every pointer must address writable memory of the right size, and no
/// table may be loaded yet.
pub unsafe fn initialize_global_descriptor_tables(
    config: &BootConfig,
    system_gdt: *mut u16,
    bios_gdt: *mut u16,
    system_descriptor: *mut u16,
    bios_descriptor: *mut u16,
    physical_descriptor: *mut u16,
) -> DescriptorRegisters {
    let tss_base = segmentation::task_state_segment_address() as u32;
    unsafe {
        segmentation::initialize_global_descriptor_tables(
            system_gdt,
            bios_gdt,
            system_descriptor,
            bios_descriptor,
            physical_descriptor,
            tss_base,
            &table_layout(config),
        )
    }
}
