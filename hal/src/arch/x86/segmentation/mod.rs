//! # i386 Segmentation
//!
//! Memory protection is done with paging; segmentation only provides the
//! flat ring 0 / ring 3 segments, the TSS used for stack switching, and a
//! separate table for BIOS calls made with paging disabled.
//!
//! | Index | Selector | Description         | DPL |
//! |-------|----------|---------------------|-----|
//! | 0     | 0x00     | Null descriptor     | -   |
//! | 1     | 0x08     | Kernel code         | 0   |
//! | 2     | 0x10     | Kernel data         | 0   |
//! | 3     | 0x1B     | User code           | 3   |
//! | 4     | 0x23     | User data           | 3   |
//! | 5     | 0x28     | TSS                 | 0   |

pub mod gdt;
pub mod selectors;
pub mod tables;
pub mod tss;

pub use gdt::{AccessByte, DescriptorFlags, GdtDescriptor, GdtEntry};
#[cfg(target_arch = "x86")]
pub use gdt::load_gdt;
#[cfg(target_arch = "x86")]
pub use selectors::load_task_register;
pub use selectors::{
    Rpl, SegmentSelector, TableIndicator, BIOS_CS, KERNEL_CS, KERNEL_DS, TSS_SELECTOR, USER_CS,
    USER_DS,
};
pub use tables::{
    bios_table, initialize_global_descriptor_tables, system_table, DescriptorRegisters,
    TableLayout, BIOS_GDT_ENTRIES, SYSTEM_GDT_ENTRIES,
};
pub use tss::{task_state_segment, task_state_segment_address, TaskStateSegment, TSS_SIZE};
