//! # Platform Collaborators
//!
//! The bootstrap sequence wires together subsystems that live outside the
//! kernel core: the heap allocator, paging and frame allocation, the
//! scheduler, timer and clock devices, the job and storage services and
//! the system-call gate. They are reached only through the traits below.
//!
//! ```text
//!                    ┌────────────────────┐
//!                    │  System<Platform>  │
//!                    └─────────┬──────────┘
//!      ┌──────────────┬────────┼──────────┬───────────────┐
//!      ▼              ▼        ▼          ▼               ▼
//!  HeapMemory    MemoryService Scheduler TimerDevice   JobService
//!  Manager       (paging)      Service   ClockDevice   TimeService ...
//! ```
//!
//! A [`Platform`] is the factory for all of them.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::ops::Range;
use core::ptr::NonNull;
use core::time::Duration;

use ember_core::{KernelResult, Service};
use ember_hal::Hardware;

// =============================================================================
// MEMORY
// =============================================================================

/// Allocator managing one virtual address range
pub trait HeapMemoryManager: Send {
    /// Take over `[start, end)`
    fn initialize(&mut self, start: u32, end: u32);

    /// Allocate `size` bytes; an `alignment` of zero means the default
    fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>>;

    /// Return memory obtained from [`HeapMemoryManager::allocate`]
    ///
    /// # Safety
    /// `pointer` must come from this manager and not be freed twice.
    unsafe fn free(&mut self, pointer: NonNull<u8>);

    /// Class name used by the instance factory
    fn class_name(&self) -> &'static str;
}

/// Paging, frame allocation and the page-fault handler
pub trait MemoryService: Service {
    /// Install the page-fault handler
    fn plug_in(&self);

    /// Activate the bootstrap address space
    fn switch_to_bootstrap_address_space(&self);

    /// Job that refills the paging-area manager's free block pool
    fn paging_refill_job(&self) -> Box<dyn Job>;

    /// Clear the writable bit on every page in `range`
    fn write_protect(&self, range: Range<u32>);
}

// =============================================================================
// SCHEDULING
// =============================================================================

/// Process identifier handed out by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

/// Thread and process scheduler
pub trait SchedulerService: Service {
    /// Create the kernel process in the bootstrap address space
    fn create_kernel_process(&self) -> KernelResult<ProcessId>;

    /// Make `process` runnable
    fn ready(&self, process: ProcessId) -> KernelResult<()>;
}

// =============================================================================
// TIME
// =============================================================================

/// Periodic timer interrupt source (the PIT)
pub trait TimerDevice: Send + Sync {
    /// Program the device and route its interrupt
    fn plug_in(&self);
}

/// Battery-backed real-time clock
pub trait ClockDevice: Send + Sync {
    /// Program the device and route its interrupt
    fn plug_in(&self);

    /// Whether the stored date survived (CMOS not cleared)
    fn is_valid(&self) -> bool;
}

/// Job priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobPriority {
    /// Runs when nothing else is due
    Low,
    /// Default
    Normal,
    /// Runs before other due jobs
    High,
}

/// Identifier of a registered job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u32);

/// Recurring piece of kernel work
pub trait Job: Send {
    /// Name for diagnostics
    fn name(&self) -> &'static str;

    /// Do one round of work
    fn run(&mut self);
}

/// Timer-driven job execution
pub trait JobService: Service {
    /// Run `job` every `interval`
    fn register_job(&self, job: Box<dyn Job>, priority: JobPriority, interval: Duration) -> JobId;
}

// =============================================================================
// PLATFORM
// =============================================================================

/// Factory for every collaborator the bootstrap sequence needs
pub trait Platform: Send + Sync {
    /// Processor control
    type Hardware: Hardware;
    /// Bootstrap heap and default heap prototype
    type Heap: HeapMemoryManager + Default + 'static;
    /// Memory service
    type Memory: MemoryService;
    /// Scheduler service
    type Scheduler: SchedulerService;
    /// Periodic timer
    type Timer: TimerDevice + 'static;
    /// Real-time clock
    type Clock: ClockDevice + 'static;
    /// Time service
    type Time: Service;
    /// Job service
    type Jobs: JobService;
    /// Storage service
    type Storage: Service;

    /// The processor
    fn hardware(&self) -> &Self::Hardware;

    /// Build the paging-area manager, the frame allocator for
    /// `[0, last_frame_address]` and the bootstrap address space
    fn create_memory_service(&self, last_frame_address: u32) -> KernelResult<Self::Memory>;

    /// Run deferred static initializers
    fn run_static_initializers(&self);

    /// Scheduler service
    fn create_scheduler(&self) -> Self::Scheduler;

    /// Periodic timer
    fn create_timer(&self) -> Arc<Self::Timer>;

    /// Real-time clock, if one is present
    fn probe_clock(&self) -> Option<Arc<Self::Clock>>;

    /// Time service on `timer`, with wall-clock time from `clock` if any
    fn create_time_service(
        &self,
        timer: Arc<Self::Timer>,
        clock: Option<Arc<Self::Clock>>,
    ) -> Self::Time;

    /// Job service on `timer`, with `clock` as the second tick source if any
    fn create_job_service(
        &self,
        timer: Arc<Self::Timer>,
        clock: Option<Arc<Self::Clock>>,
    ) -> Self::Jobs;

    /// Storage service
    fn create_storage_service(&self) -> Self::Storage;

    /// Open the system-call gate
    fn enable_system_calls(&self);
}
