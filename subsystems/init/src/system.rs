//! # System
//!
//! The kernel's root object. It owns the interrupt nesting counter, the
//! service registry, the FPU controller and the bootstrap heap, and runs the
//! boot sequence exactly once.
//!
//! ```text
//!  1  early boot info         ─┐
//!  2  bootstrap heap           │ PreMemory → HeapReady
//!  3  physical memory size     │
//!  4  paging + frame allocator ┘ → PagingReady
//!  5  memory service, page faults → AddressSpaceReady
//!  6  static initializers        → ServicesPartial
//!  7  register memory service
//!  8  scheduler + kernel process → SchedulerReady
//!  9  enable interrupts, PIT     → InterruptsEnabled
//! 10  time + job services        → TimersReady
//! 11  paging-area refill job
//! 12  heap prototype, storage service
//! 13  system calls               → SyscallsEnabled
//! 14  full boot info parse
//! 15  write-protect kernel code
//! 16                             → Initialized
//! ```

use alloc::boxed::Box;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};

use ember_core::debug::logger;
use ember_core::fatal::{self, OrHalt};
use ember_core::{
    ErrorKind, FpuController, FpuScheduler, InterruptNesting, KernelError, KernelResult, Service,
    ServiceId, ServiceRegistry, ThreadHandle, TrapOutcome,
};
use ember_hal::{Hardware, InterruptFrame};
use ember_multiboot::{BootInfoSource, BootStructure, EarlyStructure, KernelOptions, ParseError};
use spin::{Mutex, Once};

use crate::config::BootConfig;
use crate::factory::InstanceFactory;
use crate::memory;
use crate::phase::{BootPhase, PhaseTracker};
use crate::platform::{
    ClockDevice, HeapMemoryManager, JobService, MemoryService, Platform, SchedulerService,
    TimerDevice,
};

/// Kernel root object
pub struct System<P: Platform> {
    platform: P,
    config: BootConfig,
    phase: PhaseTracker,
    started: AtomicBool,
    interrupts: InterruptNesting,
    registry: ServiceRegistry,
    heap: Mutex<Option<P::Heap>>,
    heap_prototypes: InstanceFactory<dyn HeapMemoryManager>,
    fpu: Once<FpuController>,
    early: Once<EarlyStructure>,
    boot: Once<BootStructure>,
}

fn default_heap<H: HeapMemoryManager + Default + 'static>() -> Box<dyn HeapMemoryManager> {
    Box::new(H::default())
}

fn boot_info_error(error: ParseError) -> KernelError {
    ember_core::kernel_error!(ErrorKind::IllegalState, "malformed boot information", "{}", error)
}

impl<P: Platform> System<P> {
    /// A system that has not booted yet
    pub const fn new(platform: P, config: BootConfig) -> Self {
        Self {
            platform,
            config,
            phase: PhaseTracker::new(),
            started: AtomicBool::new(false),
            interrupts: InterruptNesting::new(),
            registry: ServiceRegistry::new(),
            heap: Mutex::new(None),
            heap_prototypes: InstanceFactory::new(),
            fpu: Once::new(),
            early: Once::new(),
            boot: Once::new(),
        }
    }

    // =========================================================================
    // Boot
    // =========================================================================

    /// Boot the kernel, halting on any failure
    ///
    /// Called once by the assembly entry stub. The stub installs a console
    /// with [`ember_core::debug::set_early_console`] and the logger with
    /// [`ember_core::debug::init_logger`] first; otherwise the diagnostic
    /// printed before a halt goes nowhere.
    pub fn initialize_system(&self, source: &BootInfoSource<'_>) {
        self.try_initialize_system(source)
            .or_halt(self.platform.hardware());
    }

    /// Run the boot sequence
    ///
    /// Fails with `IllegalState` when called a second time.
    pub fn try_initialize_system(&self, source: &BootInfoSource<'_>) -> KernelResult<()> {
        ember_core::kernel_ensure!(
            self.started
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok(),
            ErrorKind::IllegalState,
            "initialize_system() called twice"
        );

        let hardware = self.platform.hardware();

        // 1. Memory map and block map, without allocating
        let early = EarlyStructure::initialize(source).map_err(boot_info_error)?;
        let early = self.early.call_once(|| early);

        // 2. Bootstrap heap in the block reserved by the boot stub
        let heap_range = memory::find_heap_block(early.block_map(), self.config.kernel_heap_end)?;
        let mut heap = P::Heap::default();
        heap.initialize(heap_range.start, heap_range.end);
        *self.heap.lock() = Some(heap);
        self.phase.enter(BootPhase::HeapReady)?;
        log::info!(
            "Kernel heap at {:#010x}-{:#010x}",
            heap_range.start,
            heap_range.end
        );

        // 3. Physical memory size
        let memory_size = memory::physical_memory_size(early.memory_map())?;
        log::info!("Physical memory: {} KiB", memory_size / 1024);

        // 4. Paging-area manager, frame allocator, bootstrap address space
        let memory_service = self
            .platform
            .create_memory_service(memory::last_frame_address(memory_size))?;
        self.phase.enter(BootPhase::PagingReady)?;

        // 5. Page faults can be serviced from here on
        memory_service.plug_in();
        memory_service.switch_to_bootstrap_address_space();
        self.phase.enter(BootPhase::AddressSpaceReady)?;

        // 6. Static initializers, which also brings up the registry lock
        self.platform.run_static_initializers();
        self.phase.enter(BootPhase::ServicesPartial)?;

        // 7.
        self.register_service(ServiceId::MEMORY, memory_service)?;
        log::info!("Welcome to Ember {}", ember_core::KERNEL_VERSION);
        log::info!("Memory management has been initialized");

        // 8. Scheduler and the kernel process
        log::info!("Initializing scheduler");
        let scheduler = self.platform.create_scheduler();
        let kernel_process = scheduler.create_kernel_process()?;
        scheduler.ready(kernel_process)?;
        self.register_service(ServiceId::SCHEDULER, scheduler)?;
        self.install_fpu()?;
        self.phase.enter(BootPhase::SchedulerReady)?;

        // 9. Pairs with the implicit disable at kernel entry
        log::info!("Enabling interrupts");
        self.interrupts.enable(hardware)?;
        self.phase.enter(BootPhase::InterruptsEnabled)?;

        log::info!("Initializing PIT");
        let timer = self.platform.create_timer();
        timer.plug_in();

        // 10. Time and jobs, degraded without a real-time clock
        match self.platform.probe_clock() {
            Some(clock) => {
                log::info!("Initializing RTC");
                clock.plug_in();
                let valid = clock.is_valid();

                let time = self
                    .platform
                    .create_time_service(timer.clone(), Some(clock.clone()));
                self.register_service(ServiceId::TIME, time)?;
                let jobs = self.platform.create_job_service(timer, Some(clock));
                self.register_service(ServiceId::JOB, jobs)?;

                if !valid {
                    log::warn!("CMOS has been cleared, RTC is probably providing invalid date and time");
                }
            },
            None => {
                log::warn!("RTC not available, wall-clock time is unreliable");
                let time = self.platform.create_time_service(timer.clone(), None);
                self.register_service(ServiceId::TIME, time)?;
                let jobs = self.platform.create_job_service(timer, None);
                self.register_service(ServiceId::JOB, jobs)?;
            },
        }
        self.phase.enter(BootPhase::TimersReady)?;

        // 11.
        let memory_service = self.registry.get::<P::Memory>(ServiceId::MEMORY)?;
        let job = memory_service.paging_refill_job();
        log::debug!("Registering job '{}'", job.name());
        self.registry.get::<P::Jobs>(ServiceId::JOB)?.register_job(
            job,
            self.config.paging_refill_priority,
            self.config.paging_refill_interval,
        );

        // 12.
        let class_name = P::Heap::default().class_name();
        self.heap_prototypes
            .register_prototype(class_name, default_heap::<P::Heap>)?;
        self.register_service(ServiceId::STORAGE, self.platform.create_storage_service())?;

        // 13.
        log::info!("Enabling system calls");
        self.platform.enable_system_calls();
        self.phase.enter(BootPhase::SyscallsEnabled)?;

        // 14. Everything that needed the heap to parse
        log::info!("Parsing multiboot structure");
        let boot = early.parse(source);
        apply_options(&boot.options);
        self.boot.call_once(|| boot);

        // 15.
        memory_service.write_protect(self.config.write_protected.clone());

        // 16.
        self.phase.enter(BootPhase::Initialized)?;
        log::info!("System initialized");
        Ok(())
    }

    fn install_fpu(&self) -> KernelResult<()> {
        let hardware = self.platform.hardware();
        if !hardware.fpu_present() {
            log::warn!("No FPU present, floating point instructions will fault");
            return Ok(());
        }

        let controller = FpuController::new(hardware)?;
        self.fpu.call_once(|| controller);
        Ok(())
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Current boot phase
    pub fn phase(&self) -> BootPhase {
        self.phase.current()
    }

    /// Whether the boot sequence finished
    pub fn is_initialized(&self) -> bool {
        self.phase.is_initialized()
    }

    /// Boot configuration
    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Platform collaborators
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Memory map and block map, once step 1 ran
    pub fn early_structure(&self) -> Option<&EarlyStructure> {
        self.early.get()
    }

    /// Fully parsed boot information, once step 14 ran
    pub fn boot_structure(&self) -> Option<&BootStructure> {
        self.boot.get()
    }

    /// Heap memory manager prototypes
    pub fn heap_prototypes(&self) -> &InstanceFactory<dyn HeapMemoryManager> {
        &self.heap_prototypes
    }

    // =========================================================================
    // Early memory
    // =========================================================================

    /// Allocate from the bootstrap heap
    ///
    /// Fails with `IllegalState` before the heap exists and after the boot
    /// sequence finished.
    pub fn allocate_early_memory(&self, size: usize) -> KernelResult<NonNull<u8>> {
        ember_core::kernel_ensure!(
            !self.is_initialized(),
            ErrorKind::IllegalState,
            "allocate_early_memory() called after system has been initialized"
        );

        let mut heap = self.heap.lock();
        let Some(heap) = heap.as_mut() else {
            ember_core::kernel_bail!(ErrorKind::IllegalState, "bootstrap heap not initialized");
        };

        match heap.allocate(size, 0) {
            Some(pointer) => Ok(pointer),
            None => ember_core::kernel_bail!(
                ErrorKind::IllegalState,
                "bootstrap heap exhausted",
                "{} bytes requested",
                size
            ),
        }
    }

    /// Return memory to the bootstrap heap
    ///
    /// Fails with `IllegalState` after the boot sequence finished.
    ///
    /// # Safety
    /// `pointer` must come from [`System::allocate_early_memory`] and not
    /// have been freed.
    pub unsafe fn free_early_memory(&self, pointer: NonNull<u8>) -> KernelResult<()> {
        ember_core::kernel_ensure!(
            !self.is_initialized(),
            ErrorKind::IllegalState,
            "free_early_memory() called after system has been initialized"
        );

        let mut heap = self.heap.lock();
        let Some(heap) = heap.as_mut() else {
            ember_core::kernel_bail!(ErrorKind::IllegalState, "bootstrap heap not initialized");
        };

        unsafe { heap.free(pointer) };
        Ok(())
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Bind `service` to `id`
    ///
    /// Fails with `IllegalState` before [`BootPhase::ServicesPartial`] and
    /// with `InvalidArgument` if `id` is taken.
    pub fn register_service<S: Service>(&self, id: ServiceId, service: S) -> KernelResult<()> {
        self.phase
            .require_at_least(BootPhase::ServicesPartial, "register_service")?;
        self.registry.register(id, service)
    }

    /// Whether `id` is bound
    pub fn is_service_registered(&self, id: ServiceId) -> bool {
        self.registry.is_registered(id)
    }

    /// The service bound to `id`
    pub fn get_service<T: Service>(&self, id: ServiceId) -> KernelResult<&T> {
        self.registry.get(id)
    }

    /// The service registry
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    // =========================================================================
    // Interrupts
    // =========================================================================

    /// Enter a masked section; halts on a corrupted nesting counter
    pub fn disable_interrupts(&self) {
        let hardware = self.platform.hardware();
        self.interrupts.disable(hardware).or_halt(hardware);
    }

    /// Leave a masked section; halts on an unbalanced call
    pub fn enable_interrupts(&self) {
        let hardware = self.platform.hardware();
        self.interrupts.enable(hardware).or_halt(hardware);
    }

    /// The nesting controller
    pub fn interrupts(&self) -> &InterruptNesting {
        &self.interrupts
    }

    // =========================================================================
    // FPU
    // =========================================================================

    /// The FPU controller, if the processor has an FPU
    pub fn fpu(&self) -> Option<&FpuController> {
        self.fpu.get()
    }

    /// Make the next FPU instruction trap
    ///
    /// # Safety
    /// The device-not-available handler must be installed.
    pub unsafe fn arm_fpu_monitor(&self) {
        if let Some(controller) = self.fpu.get() {
            unsafe { controller.arm_monitor(self.platform.hardware()) };
        }
    }

    /// Device-not-available handler
    pub fn handle_fpu_trap<S: FpuScheduler + ?Sized>(
        &self,
        scheduler: &S,
        frame: &InterruptFrame,
    ) -> TrapOutcome {
        let hardware = self.platform.hardware();
        let Some(controller) = self.fpu.get() else {
            log::error!("FPU trap without an FPU controller");
            fatal::halt_on_fault(hardware, frame);
        };
        controller.on_trap(hardware, scheduler, frame).or_halt(hardware)
    }

    /// Thread teardown hook; forgets `thread` as the FPU owner
    pub fn on_thread_terminated(&self, thread: ThreadHandle) -> bool {
        self.fpu
            .get()
            .is_some_and(|controller| controller.on_thread_terminated(thread))
    }

    /// Stop the kernel after an unrecoverable fault
    pub fn panic(&self, frame: &InterruptFrame) -> ! {
        let hardware = self.platform.hardware();
        if let Err(error) = self.interrupts.disable(hardware) {
            log::error!("{}", error);
        }
        fatal::halt_on_fault(hardware, frame)
    }
}

fn apply_options(options: &KernelOptions) {
    let Some(value) = options.get("log_level") else {
        return;
    };

    match logger::parse_level(value) {
        Some(level) => {
            logger::set_level(level);
            log::info!("Log level set to {}", level);
        },
        None => log::warn!("Ignoring unknown log level '{}'", value),
    }
}

impl<P: Platform> core::fmt::Debug for System<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("System")
            .field("phase", &self.phase())
            .field("interrupt_depth", &self.interrupts.depth())
            .field("services", &self.registry.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use ember_hal::arch::x86::frame::DEVICE_NOT_AVAILABLE;
    use ember_hal::{FpuSaveFormat, SimulatedCpu};
    use ember_multiboot::{BlockMapEntry, InfoFlags, MemoryKind, MemoryMapEntry, RawMultibootInfo};

    use super::*;
    use crate::platform::{JobPriority, ProcessId};
    use crate::sim::{encode_memory_map, SimJobs, SimMemory, SimPlatform, SimScheduler, SimTime, HEAP_BLOCK};

    const BLOCKS: [BlockMapEntry; 1] = [HEAP_BLOCK];

    fn system(clock: Option<bool>) -> System<SimPlatform> {
        let config = BootConfig::new().with_write_protected(0xC010_0000..0xC014_0000);
        System::new(SimPlatform::new(SimulatedCpu::new(), clock), config)
    }

    fn source<'a>(memory_map: &'a [u8]) -> BootInfoSource<'a> {
        BootInfoSource {
            info: RawMultibootInfo {
                flags: (InfoFlags::MEMORY_MAP | InfoFlags::CMDLINE).bits(),
                ..RawMultibootInfo::default()
            },
            memory_map,
            block_map: &BLOCKS,
            command_line: Some(&b"/boot/ember.elf root=/dev/hdd0p1"[..]),
            ..BootInfoSource::default()
        }
    }

    fn usable_memory() -> Vec<u8> {
        encode_memory_map(&[
            MemoryMapEntry::new(0, 0x9_FC00, MemoryKind::Available),
            MemoryMapEntry::new(0x10_0000, 0x7F0_0000, MemoryKind::Available),
        ])
    }

    #[test]
    fn test_boot_without_clock() {
        let system = system(None);
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();

        assert_eq!(system.phase(), BootPhase::Initialized);
        assert_eq!(
            system.registry().registered_ids(),
            [
                ServiceId::MEMORY,
                ServiceId::SCHEDULER,
                ServiceId::TIME,
                ServiceId::JOB,
                ServiceId::STORAGE
            ]
        );
        assert!(!system.get_service::<SimTime>(ServiceId::TIME).unwrap().clock_backed);
        assert!(!system.get_service::<SimJobs>(ServiceId::JOB).unwrap().clock_backed);

        let cpu = &system.platform().cpu;
        assert!(cpu.interrupts_enabled());
        assert_eq!(system.interrupts().depth(), 0);
        assert_eq!(cpu.unmask_count(), 1);

        let error = system.allocate_early_memory(64).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IllegalState);
        let error = unsafe { system.free_early_memory(NonNull::dangling()) }.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn test_boot_sequence_order() {
        let system = system(Some(true));
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();

        assert_eq!(
            system.platform().events(),
            [
                "memory.create",
                "memory.plug_in",
                "memory.switch_address_space",
                "static_initializers",
                "scheduler.create_process",
                "scheduler.ready",
                "timer.plug_in",
                "clock.plug_in",
                "syscalls",
                "memory.write_protect",
            ]
        );
    }

    #[test]
    fn test_boot_with_clock() {
        let system = system(Some(false));
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();

        assert!(system.get_service::<SimTime>(ServiceId::TIME).unwrap().clock_backed);
        assert!(system.get_service::<SimJobs>(ServiceId::JOB).unwrap().clock_backed);
        assert_eq!(system.registry().len(), 5);
    }

    #[test]
    fn test_boot_wires_collaborators() {
        let system = system(None);
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();

        let memory = system.get_service::<SimMemory>(ServiceId::MEMORY).unwrap();
        assert_eq!(memory.last_frame_address, 0x07FF_FFFF);
        assert_eq!(*memory.protected.lock(), Some(0xC010_0000..0xC014_0000));

        let scheduler = system.get_service::<SimScheduler>(ServiceId::SCHEDULER).unwrap();
        assert!(scheduler.is_ready(ProcessId(0)));

        let jobs = system.get_service::<SimJobs>(ServiceId::JOB).unwrap();
        assert_eq!(
            *jobs.jobs.lock(),
            [("PagingAreaManagerRefill", JobPriority::High, core::time::Duration::from_secs(1))]
        );

        assert_eq!(system.heap_prototypes().class_names(), ["BumpMemoryManager"]);
        let boot = system.boot_structure().unwrap();
        assert_eq!(boot.options.get("root"), Some("/dev/hdd0p1"));
        assert_eq!(system.early_structure().unwrap().memory_map().len(), 2);
    }

    #[test]
    fn test_boot_accepts_non_utf8_command_line() {
        let system = system(None);
        let memory_map = usable_memory();
        let source = BootInfoSource {
            command_line: Some(&b"/boot/ember.elf root=/dev/hd\xe40"[..]),
            ..source(&memory_map)
        };
        system.try_initialize_system(&source).unwrap();

        assert!(system.is_initialized());
        let boot = system.boot_structure().unwrap();
        assert_eq!(boot.options.get("root"), Some("/dev/hd\u{FFFD}0"));
    }

    #[test]
    fn test_all_reserved_memory_stops_boot() {
        let system = system(None);
        let memory_map = encode_memory_map(&[MemoryMapEntry::new(0, 0x10_0000, MemoryKind::Reserved)]);

        let error = system.try_initialize_system(&source(&memory_map)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IllegalState);
        assert_eq!(error.message(), "no usable memory found");
        assert_eq!(system.phase(), BootPhase::HeapReady);
        assert!(system.registry().is_empty());

        // The bootstrap heap is already usable at this point
        let pointer = system.allocate_early_memory(32).unwrap();
        assert_eq!(pointer.as_ptr() as usize, 0xC040_0000);
        assert_eq!(system.heap.lock().as_ref().map(|heap| heap.live()), Some(1));
        unsafe { system.free_early_memory(pointer).unwrap() };
        assert_eq!(system.heap.lock().as_ref().map(|heap| heap.live()), Some(0));
    }

    #[test]
    fn test_missing_heap_block_stops_boot() {
        let system = system(None);
        let memory_map = usable_memory();
        let source = BootInfoSource {
            block_map: &[],
            ..source(&memory_map)
        };

        let error = system.try_initialize_system(&source).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IllegalState);
        assert_eq!(system.phase(), BootPhase::PreMemory);
        assert_eq!(
            system.allocate_early_memory(8).map(|_| ()).unwrap_err().message(),
            "bootstrap heap not initialized"
        );
    }

    #[test]
    fn test_second_boot_is_rejected() {
        let system = system(None);
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();

        let error = system.try_initialize_system(&source(&memory_map)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IllegalState);
        assert_eq!(system.registry().len(), 5);
    }

    #[test]
    fn test_register_before_services_partial() {
        let system = system(None);
        let error = system.register_service(ServiceId::STORAGE, crate::sim::SimStorage).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IllegalState);
        assert!(!system.is_service_registered(ServiceId::STORAGE));
    }

    #[test]
    fn test_duplicate_registration_after_boot() {
        let system = system(None);
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();

        let error = system.register_service(ServiceId::STORAGE, crate::sim::SimStorage).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert!(system.register_service(ServiceId::NETWORK, crate::sim::SimStorage).is_ok());
    }

    #[test]
    fn test_interrupt_facade_nests() {
        let system = system(None);
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();
        let cpu = &system.platform().cpu;

        system.disable_interrupts();
        system.disable_interrupts();
        system.enable_interrupts();
        assert!(!cpu.interrupts_enabled());
        system.enable_interrupts();
        assert!(cpu.interrupts_enabled());
    }

    #[test]
    #[should_panic(expected = "processor halted")]
    fn test_unbalanced_enable_halts() {
        let system = system(None);
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();
        system.enable_interrupts();
    }

    #[test]
    #[should_panic(expected = "processor halted")]
    fn test_failed_boot_halts() {
        let system = system(None);
        system.initialize_system(&BootInfoSource::default());
    }

    #[test]
    fn test_fpu_trap_through_system() {
        let system = system(None);
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();

        let controller = system.fpu().unwrap();
        assert_eq!(controller.format(), FpuSaveFormat::Extended);

        let scheduler = system.get_service::<SimScheduler>(ServiceId::SCHEDULER).unwrap();
        let thread = scheduler.spawn(1, controller.new_slot());
        scheduler.switch_to(thread);
        unsafe { system.arm_fpu_monitor() };
        assert!(system.platform().cpu.cr0().fpu_trapping());

        let frame = InterruptFrame::for_vector(DEVICE_NOT_AVAILABLE);
        assert_eq!(
            system.handle_fpu_trap(scheduler, &frame),
            TrapOutcome::Switched {
                from: None,
                to: thread
            }
        );
        assert_eq!(system.handle_fpu_trap(scheduler, &frame), TrapOutcome::Spurious);
        assert!(system.on_thread_terminated(thread));
        assert!(!system.on_thread_terminated(thread));
    }

    #[test]
    fn test_boot_without_fpu() {
        let platform = SimPlatform::new(SimulatedCpu::with_capabilities(false, false), None);
        let system = System::new(platform, BootConfig::new());
        let memory_map = usable_memory();
        system.try_initialize_system(&source(&memory_map)).unwrap();

        assert!(system.fpu().is_none());
        assert!(!system.on_thread_terminated(ThreadHandle::new(1, 0).unwrap()));
    }
}
