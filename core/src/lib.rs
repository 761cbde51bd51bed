//! # Ember Kernel Core
//!
//! The execution-control substrate every other kernel subsystem runs on.
//!
//! ## Components
//!
//! - **Interrupt nesting**: re-entrant interrupt masking on top of the binary
//!   hardware flag
//! - **Lazy FPU switching**: per-thread FPU register images, swapped only when
//!   a thread actually uses the FPU
//! - **Service registry**: the identifier-keyed table subsystems use to find
//!   each other
//! - **Fatal path**: every invariant violation ends in a diagnostic and a
//!   halted processor
//!
//! ## Ownership
//!
//! None of the components is an ambient global. Each is a plain structure
//! that the boot code owns and hands out by reference, so tests build
//! isolated instances against [`ember_hal::SimulatedCpu`].
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │   bootstrap (init)   │
//!                 └──────────┬───────────┘
//!        ┌───────────────────┼─────────────────────┐
//!        ▼                   ▼                     ▼
//! ┌──────────────┐   ┌───────────────┐    ┌─────────────────┐
//! │ Interrupt    │   │ FpuController │    │ ServiceRegistry │
//! │ Nesting      │   │               │    │                 │
//! └──────┬───────┘   └───────┬───────┘    └─────────────────┘
//!        └─────────┬─────────┘
//!                  ▼
//!          trait Hardware (ember-hal)
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod debug;
pub mod error;
pub mod fatal;
pub mod fpu;
pub mod interrupts;
pub mod registry;

pub use error::{ErrorKind, KernelError, KernelResult};
pub use fatal::OrHalt;
pub use fpu::{FpuController, FpuScheduler, FpuSlot, FpuThreadTable, ThreadHandle, TrapOutcome};
pub use interrupts::{InterruptGuard, InterruptNesting};
pub use registry::{Service, ServiceId, ServiceRegistry};

#[doc(hidden)]
pub use alloc::format as __format;

/// Kernel version
pub const KERNEL_VERSION: KernelVersion = KernelVersion {
    major: 0,
    minor: 1,
    patch: 0,
};

/// Kernel version structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Patch version
    pub patch: u16,
}

impl core::fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
