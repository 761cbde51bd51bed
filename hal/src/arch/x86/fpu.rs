//! # x87 FPU State
//!
//! Register images and the save/restore instructions used for lazy FPU
//! context switching on i386.
//!
//! ## Save Formats
//!
//! | Format   | Instructions      | Image size | Requires      |
//! |----------|-------------------|------------|---------------|
//! | Legacy   | FNSAVE / FRSTOR   | 108 bytes  | x87 FPU       |
//! | Extended | FXSAVE / FXRSTOR  | 512 bytes  | CPUID.FXSR    |
//!
//! [`FpuContext`] is sized and aligned for the larger extended image so one
//! buffer type holds either format. Both formats keep the x87 control word
//! in the first two bytes.

use core::fmt;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Size of an FPU context buffer (FXSAVE area)
pub const FPU_CONTEXT_SIZE: usize = 512;

/// Size of an FNSAVE image in 32-bit protected mode
pub const FNSAVE_AREA_SIZE: usize = 108;

/// x87 control word after `fninit` (all exceptions masked, 64-bit precision)
pub const DEFAULT_CONTROL_WORD: u16 = 0x037F;

/// MXCSR after reset (all SIMD exceptions masked)
pub const DEFAULT_MXCSR: u32 = 0x1F80;

/// Status word seeded before the FPU self-test; `fnstsw` must overwrite it with 0
pub const FPU_PROBE_PATTERN: u16 = 0x1797;

// =============================================================================
// SAVE FORMAT
// =============================================================================

/// Instruction pair used to move FPU state in and out of memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpuSaveFormat {
    /// FNSAVE/FRSTOR
    Legacy,
    /// FXSAVE/FXRSTOR
    Extended,
}

impl FpuSaveFormat {
    /// Pick the best format the processor supports
    pub const fn select(fxsr_available: bool) -> Self {
        if fxsr_available {
            Self::Extended
        } else {
            Self::Legacy
        }
    }

    /// Number of bytes the format writes
    pub const fn image_size(self) -> usize {
        match self {
            Self::Legacy => FNSAVE_AREA_SIZE,
            Self::Extended => FPU_CONTEXT_SIZE,
        }
    }

    /// Instruction pair name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Legacy => "FNSAVE/FRSTOR",
            Self::Extended => "FXSAVE/FXRSTOR",
        }
    }

    const fn status_word_offset(self) -> usize {
        match self {
            Self::Legacy => 4,
            Self::Extended => 2,
        }
    }
}

// =============================================================================
// FPU CONTEXT
// =============================================================================

/// Saved FPU register image owned by exactly one thread
///
/// The contents are architecture-defined and opaque to the kernel; only the
/// leading control/status words are interpreted for diagnostics.
#[repr(C, align(16))]
#[derive(Clone, PartialEq, Eq)]
pub struct FpuContext {
    bytes: [u8; FPU_CONTEXT_SIZE],
}

impl FpuContext {
    /// An all-zero image
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; FPU_CONTEXT_SIZE],
        }
    }

    /// The image `fninit` followed by a save in `format` produces
    pub fn initial(format: FpuSaveFormat) -> Self {
        let mut context = Self::zeroed();
        context.write_u16(0, DEFAULT_CONTROL_WORD);
        match format {
            // Tag word: all registers empty
            FpuSaveFormat::Legacy => context.write_u16(8, 0xFFFF),
            FpuSaveFormat::Extended => {
                context.bytes[24..28].copy_from_slice(&DEFAULT_MXCSR.to_le_bytes());
            },
        }
        context
    }

    /// Raw image bytes
    pub fn as_bytes(&self) -> &[u8; FPU_CONTEXT_SIZE] {
        &self.bytes
    }

    /// Mutable raw image bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8; FPU_CONTEXT_SIZE] {
        &mut self.bytes
    }

    /// The portion of the image a save in `format` writes
    pub fn image(&self, format: FpuSaveFormat) -> &[u8] {
        &self.bytes[..format.image_size()]
    }

    /// x87 control word (same offset in both formats)
    pub fn control_word(&self) -> u16 {
        self.read_u16(0)
    }

    /// x87 status word
    pub fn status_word(&self, format: FpuSaveFormat) -> u16 {
        self.read_u16(format.status_word_offset())
    }

    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    fn write_u16(&mut self, offset: usize, value: u16) {
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for FpuContext {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for FpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FpuContext")
            .field("fcw", &format_args!("{:#06x}", self.control_word()))
            .field("raw_status", &format_args!("{:#06x}", self.read_u16(2)))
            .finish_non_exhaustive()
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<FpuContext>(), FPU_CONTEXT_SIZE);
static_assertions::const_assert_eq!(core::mem::align_of::<FpuContext>(), 16);

// =============================================================================
// X87 OPERATIONS
// =============================================================================

#[cfg(target_arch = "x86")]
mod imp {
    use core::arch::asm;

    use super::{FpuContext, FPU_PROBE_PATTERN};
    use crate::arch::x86::control_regs::Cr0;
    use crate::arch::x86::cpuid::CpuFeatures;

    /// Initialize the x87 FPU
    ///
    /// # Safety
    /// Discards the live FPU state.
    #[inline]
    pub unsafe fn fninit() {
        unsafe {
            asm!("fninit", options(nostack, preserves_flags));
        }
    }

    /// Save x87 state without checking for pending exceptions
    ///
    /// # Safety
    /// `CR0.TS` and `CR0.EM` must be clear. Re-initializes the FPU afterwards.
    #[inline]
    pub unsafe fn fnsave(area: *mut FpuContext) {
        unsafe {
            asm!("fnsave [{}]", in(reg) area, options(nostack, preserves_flags));
        }
    }

    /// Restore x87 state
    ///
    /// # Safety
    /// `area` must hold an FNSAVE image.
    #[inline]
    pub unsafe fn frstor(area: *const FpuContext) {
        unsafe {
            asm!("frstor [{}]", in(reg) area, options(nostack, preserves_flags));
        }
    }

    /// Save x87/SSE state
    ///
    /// # Safety
    /// FXSR must be supported and `area` 16-byte aligned.
    #[inline]
    pub unsafe fn fxsave(area: *mut FpuContext) {
        unsafe {
            asm!("fxsave [{}]", in(reg) area, options(nostack, preserves_flags));
        }
    }

    /// Restore x87/SSE state
    ///
    /// # Safety
    /// FXSR must be supported and `area` must hold an FXSAVE image.
    #[inline]
    pub unsafe fn fxrstor(area: *const FpuContext) {
        unsafe {
            asm!("fxrstor [{}]", in(reg) area, options(nostack, preserves_flags));
        }
    }

    /// Software FPU self-test
    ///
    /// Clears EM and TS, resets the FPU and stores its status word over a
    /// seeded pattern. A present FPU writes 0.
    pub fn probe_fpu() -> bool {
        let mut status: u16 = FPU_PROBE_PATTERN;
        unsafe {
            Cr0::update(|cr0| cr0.remove(Cr0::EM | Cr0::TS));
            asm!(
                "fninit",
                "fnstsw [{}]",
                in(reg) &mut status as *mut u16,
                options(nostack, preserves_flags)
            );
        }
        status == 0
    }

    /// Detect an x87 FPU
    pub fn fpu_available() -> bool {
        if CpuFeatures::read().contains(CpuFeatures::FPU) {
            return true;
        }

        let cr0 = Cr0::read();
        if cr0.contains(Cr0::EM) || !cr0.contains(Cr0::ET) {
            return false;
        }

        probe_fpu()
    }
}

#[cfg(target_arch = "x86")]
pub use imp::{fninit, fnsave, fpu_available, frstor, fxrstor, fxsave, probe_fpu};

// =============================================================================
// TESTS
// =============================================================================
