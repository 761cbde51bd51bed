//! # Ember Hardware Abstraction Layer
//!
//! The narrow seam between the kernel core and the i386 processor.
//!
//! ## Overview
//!
//! Everything the execution-control substrate needs from the processor is
//! expressed through the [`Hardware`] trait:
//!
//! - Masking and unmasking maskable interrupts (`cli` / `sti`)
//! - Halting the processor
//! - FPU monitoring (`CR0.TS` / `CR0.MP`), reset and context save/restore
//!
//! Two implementations exist:
//!
//! ```text
//! ┌────────────────────────────┐      ┌────────────────────────────┐
//! │  arch::x86::X86Cpu         │      │  sim::SimulatedCpu         │
//! │  target_arch = "x86" only  │      │  any host, pure software   │
//! │  real privileged opcodes   │      │  used by unit tests        │
//! └─────────────┬──────────────┘      └─────────────┬──────────────┘
//!               └──────────────┬──────────────────────┘
//!                              ▼
//!                      trait Hardware
//! ```
//!
//! Layout-only code (descriptor entries, the task state segment, segment
//! selectors, FPU register images) compiles on every target so it can be
//! checked on the build host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod arch;
pub mod hardware;
pub mod sim;

#[cfg(target_arch = "x86")]
pub use arch::x86::X86Cpu;
pub use arch::x86::fpu::{FpuContext, FpuSaveFormat, FPU_CONTEXT_SIZE};
pub use arch::x86::frame::InterruptFrame;
pub use hardware::Hardware;
pub use sim::SimulatedCpu;
