//! # Fatal Path
//!
//! There is no caller above the kernel that could recover from a broken
//! invariant, so every error that reaches a kernel-facing entry point ends
//! here: log the diagnostic, mask interrupts, stop the processor.

use ember_hal::{Hardware, InterruptFrame};

use crate::error::{KernelError, KernelResult};

/// Report `error` and halt
#[cold]
#[inline(never)]
pub fn halt(hardware: &dyn Hardware, error: &KernelError) -> ! {
    hardware.mask_interrupts();
    log::error!("KERNEL FAILURE: {}", error);
    log::error!("System halted");
    hardware.halt()
}

/// Dump an interrupt frame for an unrecoverable fault and halt
#[cold]
#[inline(never)]
pub fn halt_on_fault(hardware: &dyn Hardware, frame: &InterruptFrame) -> ! {
    hardware.mask_interrupts();
    log::error!("UNHANDLED FAULT");
    log::error!("{:?}", frame);
    log::error!("System halted");
    hardware.halt()
}

/// Halt instead of propagating an error
pub trait OrHalt<T> {
    /// Unwrap the value or halt the processor with the error
    fn or_halt(self, hardware: &dyn Hardware) -> T;
}

impl<T> OrHalt<T> for KernelResult<T> {
    fn or_halt(self, hardware: &dyn Hardware) -> T {
        match self {
            Ok(value) => value,
            Err(error) => halt(hardware, &error),
        }
    }
}
