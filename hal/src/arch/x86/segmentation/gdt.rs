//! # GDT Entries
//!
//! 32-bit segment descriptors.
//!
//! ```text
//! word  bits   contents
//! ─────────────────────────────────────────────
//! 0     0-15   limit 0-15
//! 1     0-15   base 0-15
//! 2     0-7    base 16-23
//! 2     8-15   access byte
//! 3     0-3    limit 16-19
//! 3     4-7    flags (G, D/B, L, AVL)
//! 3     8-15   base 24-31
//! ```

use core::fmt;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Size of one descriptor
pub const GDT_ENTRY_SIZE: usize = 8;

// =============================================================================
// ACCESS BYTE
// =============================================================================

bitflags::bitflags! {
    /// Descriptor access byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessByte: u8 {
        /// Present
        const PRESENT = 1 << 7;
        /// Privilege level bit 0
        const DPL_0 = 1 << 5;
        /// Privilege level bit 1
        const DPL_1 = 1 << 6;
        /// Code/data (clear for system descriptors)
        const DESCRIPTOR_TYPE = 1 << 4;
        /// Executable
        const EXECUTABLE = 1 << 3;
        /// Direction/conforming
        const DIRECTION_CONFORMING = 1 << 2;
        /// Readable (code) / writable (data)
        const READABLE_WRITABLE = 1 << 1;
        /// Accessed, or busy for a TSS
        const ACCESSED = 1 << 0;
    }
}

impl AccessByte {
    /// Ring 0 code, readable (0x9A)
    pub const KERNEL_CODE: Self = Self::PRESENT
        .union(Self::DESCRIPTOR_TYPE)
        .union(Self::EXECUTABLE)
        .union(Self::READABLE_WRITABLE);
    /// Ring 0 data, writable (0x92)
    pub const KERNEL_DATA: Self = Self::PRESENT
        .union(Self::DESCRIPTOR_TYPE)
        .union(Self::READABLE_WRITABLE);
    /// Ring 3 code (0xFA)
    pub const USER_CODE: Self = Self::KERNEL_CODE.union(Self::DPL_0).union(Self::DPL_1);
    /// Ring 3 data (0xF2)
    pub const USER_DATA: Self = Self::KERNEL_DATA.union(Self::DPL_0).union(Self::DPL_1);
    /// Available 32-bit TSS (0x89)
    pub const TSS_AVAILABLE: Self = Self::PRESENT.union(Self::EXECUTABLE).union(Self::ACCESSED);

    /// Descriptor privilege level
    pub const fn dpl(self) -> u8 {
        (self.bits() >> 5) & 3
    }
}

// =============================================================================
// DESCRIPTOR FLAGS
// =============================================================================

bitflags::bitflags! {
    /// High nibble of descriptor word 3
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DescriptorFlags: u8 {
        /// Limit counts 4 KiB pages
        const GRANULARITY = 1 << 3;
        /// 32-bit default operand size
        const SIZE_32 = 1 << 2;
        /// 64-bit code (unused on i386)
        const LONG_MODE = 1 << 1;
        /// Available for software
        const AVAILABLE = 1 << 0;
    }
}

impl DescriptorFlags {
    /// Page-granular 32-bit segment (0xC)
    pub const FLAT_32: Self = Self::GRANULARITY.union(Self::SIZE_32);
    /// Page-granular 16-bit segment (0x8)
    pub const FLAT_16: Self = Self::GRANULARITY;
    /// Byte-granular 32-bit system segment (0x4)
    pub const SYSTEM_32: Self = Self::SIZE_32;
}

// =============================================================================
// GDT ENTRY
// =============================================================================

/// One 8-byte descriptor
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct GdtEntry(u64);

impl GdtEntry {
    /// Null descriptor
    pub const NULL: Self = Self(0);

    /// Encode a descriptor
    pub const fn new(base: u32, limit: u32, access: AccessByte, flags: DescriptorFlags) -> Self {
        Self::from_parts(base, limit, access.bits(), flags.bits())
    }

    /// Encode a descriptor from raw access and flag values
    pub const fn from_parts(base: u32, limit: u32, access: u8, flags: u8) -> Self {
        let words = [
            (limit & 0xFFFF) as u16,
            (base & 0xFFFF) as u16,
            (((base >> 16) & 0xFF) as u16) | ((access as u16) << 8),
            (((limit >> 16) & 0xF) as u16)
                | (((flags as u16) << 4) & 0xF0)
                | (((base >> 16) & 0xFF00) as u16),
        ];
        Self::from_words(words)
    }

    /// Rebuild a descriptor from its four words
    pub const fn from_words(words: [u16; 4]) -> Self {
        Self(
            words[0] as u64
                | (words[1] as u64) << 16
                | (words[2] as u64) << 32
                | (words[3] as u64) << 48,
        )
    }

    /// The four 16-bit words in memory order
    pub const fn words(self) -> [u16; 4] {
        [
            self.0 as u16,
            (self.0 >> 16) as u16,
            (self.0 >> 32) as u16,
            (self.0 >> 48) as u16,
        ]
    }

    /// Raw descriptor
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Segment base
    pub const fn base(self) -> u32 {
        (((self.0 >> 16) & 0xFF_FFFF) | ((self.0 >> 32) & 0xFF00_0000)) as u32
    }

    /// 20-bit segment limit
    pub const fn limit(self) -> u32 {
        ((self.0 & 0xFFFF) | ((self.0 >> 32) & 0xF_0000)) as u32
    }

    /// Access byte
    pub const fn access(self) -> AccessByte {
        AccessByte::from_bits_retain((self.0 >> 40) as u8)
    }

    /// Flag nibble
    pub const fn flags(self) -> DescriptorFlags {
        DescriptorFlags::from_bits_retain(((self.0 >> 52) & 0xF) as u8)
    }

    /// Whether this is the null descriptor
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for GdtEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GdtEntry({:#018x})", self.0)
    }
}

// =============================================================================
// GDT DESCRIPTOR (for LGDT)
// =============================================================================

/// Pseudo-descriptor loaded into GDTR
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GdtDescriptor {
    /// Table size in bytes minus one
    pub limit: u16,
    /// Linear base address
    pub base: u32,
}

impl GdtDescriptor {
    /// Descriptor for a table of `entries` descriptors at `base`
    pub const fn for_entries(base: u32, entries: usize) -> Self {
        Self {
            limit: (entries * GDT_ENTRY_SIZE - 1) as u16,
            base,
        }
    }
}

impl fmt::Debug for GdtDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limit = self.limit;
        let base = self.base;
        f.debug_struct("GdtDescriptor")
            .field("limit", &limit)
            .field("base", &format_args!("{:#010x}", base))
            .finish()
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<GdtEntry>(), GDT_ENTRY_SIZE);
static_assertions::const_assert_eq!(core::mem::size_of::<GdtDescriptor>(), 6);

/// Load GDTR
///
/// # Safety
/// The table must stay mapped at `descriptor.base` while it is in use and
/// its code/data entries must match the currently loaded selectors.
#[cfg(target_arch = "x86")]
#[inline]
pub unsafe fn load_gdt(descriptor: &GdtDescriptor) {
    unsafe {
        core::arch::asm!(
            "lgdt [{}]",
            in(reg) descriptor as *const GdtDescriptor,
            options(readonly, nostack, preserves_flags)
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================
