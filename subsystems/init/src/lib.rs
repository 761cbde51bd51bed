//! # Ember Init
//!
//! Brings the kernel from boot loader hand-off to a running system.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         ASSEMBLY ENTRY STUB                         │
//! │  reserves GDT memory, heap/paging blocks, enables paging            │
//! └──────────────┬──────────────────────────────────┬───────────────────┘
//!                │ descriptors::                    │ System::
//!                │ initialize_global_descriptor_    │ initialize_system()
//!                │ tables()                         ▼
//!                ▼                       ┌───────────────────────────┐
//!        ┌───────────────┐               │  16 steps, run once       │
//!        │ system GDT    │               │  BootPhase: PreMemory ... │
//!        │ BIOS GDT, TSS │               │  ... Initialized          │
//!        └───────────────┘               └─────────────┬─────────────┘
//!                                                      │ Platform
//!                                                      ▼
//!                        heap, paging, scheduler, timers, jobs, storage
//! ```
//!
//! ## Invariants
//!
//! 1. **Run once**: a second call to `initialize_system` is an error.
//! 2. **Linear phases**: a phase is entered only from the one before it.
//! 3. **Early memory**: the bootstrap heap accepts allocations from
//!    `HeapReady` until `Initialized`, never afterwards.
//! 4. **Registration**: services are registered from `ServicesPartial` on.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod config;
pub mod descriptors;
pub mod factory;
pub mod memory;
pub mod phase;
pub mod platform;
pub mod system;

#[cfg(test)]
mod sim;

pub use config::BootConfig;
pub use factory::InstanceFactory;
pub use phase::{BootPhase, PhaseTracker, PHASE_ORDER};
pub use platform::{
    ClockDevice, HeapMemoryManager, Job, JobId, JobPriority, JobService, MemoryService, Platform,
    ProcessId, SchedulerService, TimerDevice,
};
pub use system::System;
