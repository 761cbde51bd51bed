//! # Control Registers
//!
//! CR0 access and the interrupt flag instructions for i386.
//!
//! ```text
//! CR0 bits used by the kernel
//! ─────────────────────────────────────────────
//! 0   PE  Protected mode enable
//! 1   MP  Monitor coprocessor (WAIT honours TS)
//! 2   EM  x87 emulation (FPU instructions trap)
//! 3   TS  Task switched (next FPU instruction traps)
//! 4   ET  Extension type (387 present)
//! 5   NE  Native FPU error reporting
//! 16  WP  Write protect in ring 0
//! 31  PG  Paging enable
//! ```

bitflags::bitflags! {
    /// CR0 flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cr0: u32 {
        /// Protected mode enable
        const PE = 1 << 0;
        /// Monitor coprocessor
        const MP = 1 << 1;
        /// x87 emulation
        const EM = 1 << 2;
        /// Task switched
        const TS = 1 << 3;
        /// Extension type
        const ET = 1 << 4;
        /// Numeric error
        const NE = 1 << 5;
        /// Write protect
        const WP = 1 << 16;
        /// Alignment mask
        const AM = 1 << 18;
        /// Not write-through
        const NW = 1 << 29;
        /// Cache disable
        const CD = 1 << 30;
        /// Paging
        const PG = 1 << 31;
    }
}

impl Cr0 {
    /// Bits set to arm the lazy FPU trap
    pub const FPU_MONITOR: Self = Self::MP.union(Self::TS);

    /// Whether FPU instructions currently trap
    pub const fn fpu_trapping(self) -> bool {
        self.intersects(Self::TS.union(Self::EM))
    }
}

/// EFLAGS interrupt enable bit
pub const EFLAGS_IF: u32 = 1 << 9;

#[cfg(target_arch = "x86")]
mod imp {
    use core::arch::asm;

    use super::{Cr0, EFLAGS_IF};

    impl Cr0 {
        /// Read CR0
        #[inline]
        pub fn read() -> Self {
            let value: u32;
            unsafe {
                asm!("mov {}, cr0", out(reg) value, options(nomem, nostack, preserves_flags));
            }
            Self::from_bits_retain(value)
        }

        /// Write CR0
        ///
        /// # Safety
        /// Changing PE, PG or WP alters the memory model under running code.
        #[inline]
        pub unsafe fn write(value: Self) {
            unsafe {
                asm!("mov cr0, {}", in(reg) value.bits(), options(nostack, preserves_flags));
            }
        }

        /// Read-modify-write CR0
        ///
        /// # Safety
        /// Same as [`Cr0::write`].
        #[inline]
        pub unsafe fn update<F: FnOnce(&mut Self)>(f: F) {
            let mut value = Self::read();
            f(&mut value);
            unsafe { Self::write(value) };
        }
    }

    /// Disable maskable interrupts
    #[inline]
    pub fn cli() {
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
    }

    /// Enable maskable interrupts
    ///
    /// # Safety
    /// An IDT with valid handlers must be loaded.
    #[inline]
    pub unsafe fn sti() {
        unsafe {
            asm!("sti", options(nomem, nostack));
        }
    }

    /// Read EFLAGS
    #[inline]
    pub fn eflags() -> u32 {
        let flags: u32;
        unsafe {
            asm!("pushfd", "pop {}", out(reg) flags, options(nomem, preserves_flags));
        }
        flags
    }

    /// Whether `EFLAGS.IF` is set
    #[inline]
    pub fn interrupts_enabled() -> bool {
        eflags() & EFLAGS_IF != 0
    }

    /// Mask interrupts and halt forever
    #[inline]
    pub fn halt_forever() -> ! {
        loop {
            unsafe {
                asm!("cli", "hlt", options(nomem, nostack));
            }
        }
    }
}

#[cfg(target_arch = "x86")]
pub use imp::{cli, eflags, halt_forever, interrupts_enabled, sti};
