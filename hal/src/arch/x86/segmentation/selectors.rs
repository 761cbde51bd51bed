//! # Segment Selectors
//!
//! Selectors into the system GDT built by [`super::tables`].

use core::fmt;

// =============================================================================
// PRIVILEGE LEVELS
// =============================================================================

/// Requested privilege level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Rpl {
    /// Kernel
    Ring0 = 0,
    /// Unused
    Ring1 = 1,
    /// Unused
    Ring2 = 2,
    /// User
    Ring3 = 3,
}

impl Rpl {
    /// Decode the low two bits
    pub const fn from_raw(value: u8) -> Self {
        match value & 3 {
            0 => Rpl::Ring0,
            1 => Rpl::Ring1,
            2 => Rpl::Ring2,
            _ => Rpl::Ring3,
        }
    }
}

/// Descriptor table a selector points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TableIndicator {
    /// Global descriptor table
    Gdt = 0,
    /// Local descriptor table
    Ldt = 1,
}

// =============================================================================
// SEGMENT SELECTOR
// =============================================================================

/// 16-bit segment selector
///
/// ```text
///  15                            3   2   1   0
/// ┌───────────────────────────────┬───┬───────┐
/// │            Index              │TI │  RPL  │
/// └───────────────────────────────┴───┴───────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SegmentSelector(u16);

impl SegmentSelector {
    /// Null selector
    pub const NULL: Self = Self(0);

    /// Selector for a GDT entry
    pub const fn new(index: u16, rpl: Rpl) -> Self {
        Self::with_table(index, TableIndicator::Gdt, rpl)
    }

    /// Selector for an entry in either table
    pub const fn with_table(index: u16, table: TableIndicator, rpl: Rpl) -> Self {
        Self((rpl as u16) | ((table as u16) << 2) | (index << 3))
    }

    /// Raw selector value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Table index
    pub const fn index(self) -> u16 {
        self.0 >> 3
    }

    /// Whether the selector points into the LDT
    pub const fn is_ldt(self) -> bool {
        self.0 & 0x04 != 0
    }

    /// Requested privilege level
    pub const fn rpl(self) -> Rpl {
        Rpl::from_raw((self.0 & 3) as u8)
    }
}

impl fmt::Debug for SegmentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentSelector")
            .field("raw", &format_args!("{:#06x}", self.0))
            .field("index", &self.index())
            .field("rpl", &self.rpl())
            .field("ldt", &self.is_ldt())
            .finish()
    }
}

impl fmt::Display for SegmentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

// =============================================================================
// STANDARD SELECTORS
// =============================================================================

/// Kernel code (index 1)
pub const KERNEL_CS: SegmentSelector = SegmentSelector::new(1, Rpl::Ring0);

/// Kernel data (index 2)
pub const KERNEL_DS: SegmentSelector = SegmentSelector::new(2, Rpl::Ring0);

/// User code (index 3)
pub const USER_CS: SegmentSelector = SegmentSelector::new(3, Rpl::Ring3);

/// User data (index 4)
pub const USER_DS: SegmentSelector = SegmentSelector::new(4, Rpl::Ring3);

/// Task state segment (index 5)
pub const TSS_SELECTOR: SegmentSelector = SegmentSelector::new(5, Rpl::Ring0);

/// 16-bit BIOS call code segment (index 3 of the BIOS GDT)
pub const BIOS_CS: SegmentSelector = SegmentSelector::new(3, Rpl::Ring0);

// =============================================================================
// SELECTOR OPERATIONS
// =============================================================================

#[cfg(target_arch = "x86")]
mod imp {
    use core::arch::asm;

    use super::SegmentSelector;

    /// Load the task register
    ///
    /// # Safety
    /// The selector must reference an available TSS descriptor in the loaded GDT.
    #[inline]
    pub unsafe fn load_task_register(selector: SegmentSelector) {
        unsafe {
            asm!("ltr {0:x}", in(reg) selector.raw(), options(nostack, preserves_flags));
        }
    }

    /// Read CS
    #[inline]
    pub fn current_cs() -> SegmentSelector {
        let value: u16;
        unsafe {
            asm!("mov {0:x}, cs", out(reg) value, options(nomem, nostack, preserves_flags));
        }
        SegmentSelector(value)
    }
}

#[cfg(target_arch = "x86")]
pub use imp::{current_cs, load_task_register};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_selectors() {
        assert_eq!(KERNEL_CS.raw(), 0x08);
        assert_eq!(KERNEL_DS.raw(), 0x10);
        assert_eq!(USER_CS.raw(), 0x1B);
        assert_eq!(USER_DS.raw(), 0x23);
        assert_eq!(TSS_SELECTOR.raw(), 0x28);
        assert_eq!(BIOS_CS.raw(), 0x18);
    }

    #[test]
    fn test_selector_fields() {
        let selector = SegmentSelector::with_table(7, TableIndicator::Ldt, Rpl::Ring3);
        assert_eq!(selector.raw(), 3 | (1 << 2) | (7 << 3));
        assert_eq!(selector.index(), 7);
        assert!(selector.is_ldt());
        assert_eq!(selector.rpl(), Rpl::Ring3);
        assert!(!USER_DS.is_ldt());
    }
}
