//! # Boot Configuration
//!
//! Memory layout constants and tunables the bootstrap sequence needs.
//! These come from the linker script and the boot stub; the defaults match
//! the stock i386 layout with the kernel mapped at 3 GiB.

use core::ops::Range;
use core::time::Duration;

use crate::platform::JobPriority;

/// Kernel image and heap placement, plus the job tunables used at boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootConfig {
    /// Offset between physical and kernel virtual addresses
    pub kernel_virtual_offset: u32,
    /// Exclusive end of the bootstrap heap
    pub kernel_heap_end: u32,
    /// Virtual range of the kernel's read-only sections
    pub write_protected: Range<u32>,
    /// Interval of the paging-area refill job
    pub paging_refill_interval: Duration,
    /// Priority of the paging-area refill job
    pub paging_refill_priority: JobPriority,
    /// Physical base of the 16-bit BIOS call window
    pub bios_code_base: u32,
}

impl BootConfig {
    /// Stock layout
    pub const fn new() -> Self {
        Self {
            kernel_virtual_offset: 0xC000_0000,
            kernel_heap_end: 0xC100_0000,
            write_protected: 0..0,
            paging_refill_interval: Duration::from_secs(1),
            paging_refill_priority: JobPriority::High,
            bios_code_base: 0x4000,
        }
    }

    /// Same layout with the read-only sections at `range`
    pub const fn with_write_protected(mut self, range: Range<u32>) -> Self {
        self.write_protected = range;
        self
    }

    /// Same layout with the bootstrap heap ending at `end`
    pub const fn with_heap_end(mut self, end: u32) -> Self {
        self.kernel_heap_end = end;
        self
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::new()
    }
}
