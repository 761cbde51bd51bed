//! Simulated platform for host-side boot tests
//!
//! Every collaborator appends to a shared event log so tests can check the
//! order in which the boot sequence drives them.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;
use core::ptr::NonNull;
use core::time::Duration;

use ember_core::{
    ErrorKind, FpuScheduler, FpuSlot, FpuThreadTable, KernelResult, Service, ThreadHandle,
};
use ember_hal::SimulatedCpu;
use ember_multiboot::{BlockMapEntry, MemoryMapEntry};
use spin::Mutex;

use crate::platform::{
    ClockDevice, HeapMemoryManager, Job, JobId, JobPriority, JobService, MemoryService, Platform,
    ProcessId, SchedulerService, TimerDevice,
};

pub(crate) type Events = Arc<Mutex<Vec<&'static str>>>;

fn record(events: &Events, event: &'static str) {
    events.lock().push(event);
}

// =============================================================================
// Boot information
// =============================================================================

/// Memory map records in the boot loader's wire format
pub fn encode_memory_map(entries: &[MemoryMapEntry]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for entry in entries {
        bytes.extend_from_slice(&20u32.to_le_bytes());
        bytes.extend_from_slice(&entry.address.to_le_bytes());
        bytes.extend_from_slice(&entry.length.to_le_bytes());
        bytes.extend_from_slice(&entry.kind.raw().to_le_bytes());
    }
    bytes
}

/// One heap block at 4 MiB, mapped at 3 GiB + 4 MiB
pub const HEAP_BLOCK: BlockMapEntry =
    BlockMapEntry::new(0x0040_0000, 0xC040_0000, 1, ember_multiboot::BlockKind::HeapReserved);

// =============================================================================
// Memory
// =============================================================================

/// Bump allocator handing out addresses inside its range
#[derive(Debug, Default)]
pub struct BumpHeap {
    range: Range<u32>,
    next: u32,
    live: usize,
}

impl BumpHeap {
    pub fn live(&self) -> usize {
        self.live
    }
}

impl HeapMemoryManager for BumpHeap {
    fn initialize(&mut self, start: u32, end: u32) {
        self.range = start..end;
        self.next = start;
    }

    fn allocate(&mut self, size: usize, _alignment: usize) -> Option<NonNull<u8>> {
        let size = u32::try_from(size).ok()?.checked_add(7)? & !7;
        let end = self.next.checked_add(size)?;
        if size == 0 || end > self.range.end {
            return None;
        }
        let pointer = NonNull::new(self.next as usize as *mut u8)?;
        self.next = end;
        self.live += 1;
        Some(pointer)
    }

    unsafe fn free(&mut self, _pointer: NonNull<u8>) {
        self.live -= 1;
    }

    fn class_name(&self) -> &'static str {
        "BumpMemoryManager"
    }
}

pub struct RefillJob {
    runs: usize,
}

impl Job for RefillJob {
    fn name(&self) -> &'static str {
        "PagingAreaManagerRefill"
    }

    fn run(&mut self) {
        self.runs += 1;
    }
}

pub struct SimMemory {
    events: Events,
    pub last_frame_address: u32,
    pub protected: Mutex<Option<Range<u32>>>,
}

impl Service for SimMemory {
    fn name(&self) -> &'static str {
        "MemoryService"
    }
}

impl MemoryService for SimMemory {
    fn plug_in(&self) {
        record(&self.events, "memory.plug_in");
    }

    fn switch_to_bootstrap_address_space(&self) {
        record(&self.events, "memory.switch_address_space");
    }

    fn paging_refill_job(&self) -> Box<dyn Job> {
        Box::new(RefillJob { runs: 0 })
    }

    fn write_protect(&self, range: Range<u32>) {
        record(&self.events, "memory.write_protect");
        *self.protected.lock() = Some(range);
    }
}

// =============================================================================
// Scheduling
// =============================================================================

struct ThreadTable {
    current: Option<ThreadHandle>,
    threads: Vec<(ThreadHandle, FpuSlot)>,
}

impl FpuThreadTable for ThreadTable {
    fn current_thread(&self) -> Option<ThreadHandle> {
        self.current
    }

    fn fpu_slot(&mut self, thread: ThreadHandle) -> Option<&mut FpuSlot> {
        self.threads
            .iter_mut()
            .find(|(handle, _)| *handle == thread)
            .map(|(_, slot)| slot)
    }
}

pub struct SimScheduler {
    events: Events,
    processes: Mutex<Vec<(ProcessId, bool)>>,
    table: Mutex<ThreadTable>,
}

impl SimScheduler {
    pub fn is_ready(&self, process: ProcessId) -> bool {
        self.processes
            .lock()
            .iter()
            .any(|(id, ready)| *id == process && *ready)
    }

    pub fn spawn(&self, index: u16, slot: FpuSlot) -> ThreadHandle {
        let handle = ThreadHandle::new(index, 0).unwrap();
        self.table.lock().threads.push((handle, slot));
        handle
    }

    pub fn switch_to(&self, thread: ThreadHandle) {
        self.table.lock().current = Some(thread);
    }
}

impl Service for SimScheduler {
    fn name(&self) -> &'static str {
        "SchedulerService"
    }
}

impl SchedulerService for SimScheduler {
    fn create_kernel_process(&self) -> KernelResult<ProcessId> {
        record(&self.events, "scheduler.create_process");
        let mut processes = self.processes.lock();
        let id = ProcessId(processes.len() as u32);
        processes.push((id, false));
        Ok(id)
    }

    fn ready(&self, process: ProcessId) -> KernelResult<()> {
        record(&self.events, "scheduler.ready");
        let mut processes = self.processes.lock();
        match processes.iter_mut().find(|(id, _)| *id == process) {
            Some((_, ready)) => {
                *ready = true;
                Ok(())
            },
            None => ember_core::kernel_bail!(ErrorKind::InvalidArgument, "unknown process"),
        }
    }
}

impl FpuScheduler for SimScheduler {
    fn with_locked<R>(&self, f: impl FnOnce(&mut dyn FpuThreadTable) -> R) -> R {
        let mut table = self.table.lock();
        f(&mut *table)
    }
}

// =============================================================================
// Time and jobs
// =============================================================================

pub struct SimTimer {
    events: Events,
}

impl TimerDevice for SimTimer {
    fn plug_in(&self) {
        record(&self.events, "timer.plug_in");
    }
}

pub struct SimClock {
    events: Events,
    valid: bool,
}

impl ClockDevice for SimClock {
    fn plug_in(&self) {
        record(&self.events, "clock.plug_in");
    }

    fn is_valid(&self) -> bool {
        self.valid
    }
}

pub struct SimTime {
    pub clock_backed: bool,
}

impl Service for SimTime {
    fn name(&self) -> &'static str {
        "TimeService"
    }
}

pub struct SimJobs {
    pub clock_backed: bool,
    pub jobs: Mutex<Vec<(&'static str, JobPriority, Duration)>>,
}

impl Service for SimJobs {
    fn name(&self) -> &'static str {
        "JobService"
    }
}

impl JobService for SimJobs {
    fn register_job(&self, job: Box<dyn Job>, priority: JobPriority, interval: Duration) -> JobId {
        let mut jobs = self.jobs.lock();
        jobs.push((job.name(), priority, interval));
        JobId(jobs.len() as u32 - 1)
    }
}

pub struct SimStorage;

impl Service for SimStorage {
    fn name(&self) -> &'static str {
        "StorageService"
    }
}

// =============================================================================
// Platform
// =============================================================================

pub struct SimPlatform {
    pub cpu: SimulatedCpu,
    pub events: Events,
    /// `Some(valid)` when a real-time clock is present
    pub clock: Option<bool>,
}

impl SimPlatform {
    pub fn new(cpu: SimulatedCpu, clock: Option<bool>) -> Self {
        Self {
            cpu,
            events: Arc::new(Mutex::new(Vec::new())),
            clock,
        }
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }
}

impl Platform for SimPlatform {
    type Hardware = SimulatedCpu;
    type Heap = BumpHeap;
    type Memory = SimMemory;
    type Scheduler = SimScheduler;
    type Timer = SimTimer;
    type Clock = SimClock;
    type Time = SimTime;
    type Jobs = SimJobs;
    type Storage = SimStorage;

    fn hardware(&self) -> &SimulatedCpu {
        &self.cpu
    }

    fn create_memory_service(&self, last_frame_address: u32) -> KernelResult<SimMemory> {
        record(&self.events, "memory.create");
        Ok(SimMemory {
            events: self.events.clone(),
            last_frame_address,
            protected: Mutex::new(None),
        })
    }

    fn run_static_initializers(&self) {
        record(&self.events, "static_initializers");
    }

    fn create_scheduler(&self) -> SimScheduler {
        SimScheduler {
            events: self.events.clone(),
            processes: Mutex::new(Vec::new()),
            table: Mutex::new(ThreadTable {
                current: None,
                threads: Vec::new(),
            }),
        }
    }

    fn create_timer(&self) -> Arc<SimTimer> {
        Arc::new(SimTimer {
            events: self.events.clone(),
        })
    }

    fn probe_clock(&self) -> Option<Arc<SimClock>> {
        self.clock.map(|valid| {
            Arc::new(SimClock {
                events: self.events.clone(),
                valid,
            })
        })
    }

    fn create_time_service(&self, _timer: Arc<SimTimer>, clock: Option<Arc<SimClock>>) -> SimTime {
        SimTime {
            clock_backed: clock.is_some(),
        }
    }

    fn create_job_service(&self, _timer: Arc<SimTimer>, clock: Option<Arc<SimClock>>) -> SimJobs {
        SimJobs {
            clock_backed: clock.is_some(),
            jobs: Mutex::new(Vec::new()),
        }
    }

    fn create_storage_service(&self) -> SimStorage {
        SimStorage
    }

    fn enable_system_calls(&self) {
        record(&self.events, "syscalls");
    }
}
