//! # Hardware Control Interface
//!
//! The only operations the kernel core performs directly on the processor.

use crate::arch::x86::fpu::{FpuContext, FpuSaveFormat};

/// Privileged processor operations used by the execution-control core.
///
/// Implementations must be callable from interrupt context: no method may
/// block or allocate.
pub trait Hardware: Send + Sync {
    /// Mask maskable interrupts (`cli`).
    ///
    /// Idempotent at the hardware level.
    fn mask_interrupts(&self);

    /// Unmask maskable interrupts (`sti`).
    ///
    /// # Safety
    /// Interrupt handlers must be installed and no critical section may
    /// still require interrupts to be masked.
    unsafe fn unmask_interrupts(&self);

    /// Whether maskable interrupts are currently delivered (`EFLAGS.IF`).
    fn interrupts_enabled(&self) -> bool;

    /// Stop the processor for good.
    fn halt(&self) -> !;

    /// Whether an x87 FPU is present (CPUID probe plus self-test).
    fn fpu_present(&self) -> bool;

    /// Whether `FXSAVE`/`FXRSTOR` are supported.
    fn extended_fpu_save(&self) -> bool;

    /// Set `CR0.TS` and `CR0.MP` so that the next FPU instruction raises
    /// the device-not-available trap.
    ///
    /// # Safety
    /// The device-not-available handler must be installed.
    unsafe fn arm_fpu_monitor(&self);

    /// Clear `CR0.TS` so FPU instructions execute directly again.
    ///
    /// # Safety
    /// Must only be done by the FPU trap handler or during FPU setup.
    unsafe fn disarm_fpu_monitor(&self);

    /// Reset the FPU to its power-on state (`fninit`).
    ///
    /// # Safety
    /// Discards the live FPU registers.
    unsafe fn reset_fpu(&self);

    /// Store the live FPU registers into `area`.
    ///
    /// # Safety
    /// `format` must be supported by the processor and `CR0.TS` must be clear.
    unsafe fn save_fpu(&self, format: FpuSaveFormat, area: &mut FpuContext);

    /// Load the FPU registers from `area`.
    ///
    /// # Safety
    /// `format` must be supported, `CR0.TS` must be clear, and `area` must
    /// hold an image written in the same format.
    unsafe fn restore_fpu(&self, format: FpuSaveFormat, area: &FpuContext);
}
