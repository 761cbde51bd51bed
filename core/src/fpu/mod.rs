//! # Lazy FPU Context Switching
//!
//! Saving and restoring FPU registers on every thread switch is expensive
//! and most threads never touch the FPU. Instead the scheduler arms the
//! FPU monitor (`CR0.TS`) on each switch; the first FPU instruction of the
//! new thread raises the device-not-available trap and only then are the
//! registers exchanged.
//!
//! ```text
//!            thread B executes an FPU instruction
//!                          │
//!                          ▼
//!                 #NM  →  on_trap()
//!                          │
//!          ┌───────────────┴───────────────┐
//!   current == last owner          current != last owner
//!          │                               │
//!      spurious                save last owner's image (if any)
//!     (return)                 restore B's image
//!                              last owner := B
//! ```
//!
//! The last owner is a weak [`ThreadHandle`]: it does not keep the thread
//! alive and is cleared by [`FpuController::on_thread_terminated`] when the
//! thread is destroyed. Its generation makes a stale handle resolve to
//! nothing in the thread table.

pub mod handle;

use ember_hal::{FpuContext, FpuSaveFormat, Hardware, InterruptFrame};

use crate::error::{ErrorKind, KernelResult};

pub use handle::{AtomicThreadHandle, ThreadHandle, MAX_THREAD_INDEX};

// =============================================================================
// SCHEDULER INTERFACE
// =============================================================================

/// Per-thread FPU storage, as seen while the scheduler lock is held
pub trait FpuThreadTable {
    /// Thread currently running on the processor
    fn current_thread(&self) -> Option<ThreadHandle>;

    /// FPU image storage of a live thread; `None` for a stale handle
    fn fpu_slot(&mut self, thread: ThreadHandle) -> Option<&mut FpuSlot>;
}

/// Mutual exclusion provided by the scheduler
pub trait FpuScheduler {
    /// Run `f` with thread switches excluded
    fn with_locked<R>(&self, f: impl FnOnce(&mut dyn FpuThreadTable) -> R) -> R;
}

/// FPU image owned by one thread
#[derive(Clone, PartialEq, Eq)]
pub struct FpuSlot {
    context: FpuContext,
}

impl FpuSlot {
    /// Slot holding `context`
    pub const fn new(context: FpuContext) -> Self {
        Self { context }
    }

    /// Saved image
    pub fn context(&self) -> &FpuContext {
        &self.context
    }
}

impl core::fmt::Debug for FpuSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.context.fmt(f)
    }
}

/// Result of a device-not-available trap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// The current thread already owned the FPU
    Spurious,
    /// Ownership moved to `to`
    Switched {
        /// Previous owner whose image was saved
        from: Option<ThreadHandle>,
        /// New owner
        to: ThreadHandle,
    },
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Lazy FPU context switch controller
#[derive(Debug)]
pub struct FpuController {
    format: FpuSaveFormat,
    default_context: FpuContext,
    last_owner: AtomicThreadHandle,
}

impl FpuController {
    /// Probe the FPU and snapshot its reset state
    ///
    /// Fails with `UnsupportedOperation` if the processor has no FPU.
    pub fn new(hardware: &dyn Hardware) -> KernelResult<Self> {
        crate::kernel_ensure!(
            hardware.fpu_present(),
            ErrorKind::UnsupportedOperation,
            "no floating point unit present"
        );

        let format = FpuSaveFormat::select(hardware.extended_fpu_save());
        let mut default_context = FpuContext::zeroed();

        // SAFETY: no thread owns the FPU yet and the format was probed.
        unsafe {
            hardware.disarm_fpu_monitor();
            hardware.reset_fpu();
            hardware.save_fpu(format, &mut default_context);
        }

        log::info!("FPU: using {} for context switches", format.name());

        Ok(Self {
            format,
            default_context,
            last_owner: AtomicThreadHandle::empty(),
        })
    }

    /// Save format in use
    pub fn format(&self) -> FpuSaveFormat {
        self.format
    }

    /// Image every thread starts from
    pub fn default_context(&self) -> &FpuContext {
        &self.default_context
    }

    /// Fresh storage for a new thread
    pub fn new_slot(&self) -> FpuSlot {
        FpuSlot::new(self.default_context.clone())
    }

    /// Thread whose registers are in the FPU
    pub fn last_owner(&self) -> Option<ThreadHandle> {
        self.last_owner.load()
    }

    /// Make the next FPU instruction trap
    ///
    /// # Safety
    /// The device-not-available handler must be installed and must call
    /// [`FpuController::on_trap`].
    pub unsafe fn arm_monitor(&self, hardware: &dyn Hardware) {
        unsafe { hardware.arm_fpu_monitor() };
    }

    /// Handle the device-not-available trap
    pub fn on_trap<S: FpuScheduler + ?Sized>(
        &self,
        hardware: &dyn Hardware,
        scheduler: &S,
        frame: &InterruptFrame,
    ) -> KernelResult<TrapOutcome> {
        scheduler.with_locked(|table| {
            // SAFETY: we are the trap handler.
            unsafe { hardware.disarm_fpu_monitor() };

            let Some(current) = table.current_thread() else {
                crate::kernel_bail!(
                    ErrorKind::IllegalState,
                    "FPU trap without a current thread",
                    "eip {:#010x}",
                    frame.eip
                );
            };

            let previous = self.last_owner.load();
            if previous == Some(current) {
                log::trace!("FPU: spurious trap for {:?}", current);
                return Ok(TrapOutcome::Spurious);
            }

            if let Some(previous) = previous {
                match table.fpu_slot(previous) {
                    // SAFETY: TS is clear and the format was probed.
                    Some(slot) => unsafe { hardware.save_fpu(self.format, &mut slot.context) },
                    None => log::warn!("FPU: previous owner {:?} is gone", previous),
                }
            }

            let Some(slot) = table.fpu_slot(current) else {
                crate::kernel_bail!(
                    ErrorKind::IllegalState,
                    "current thread has no FPU storage",
                    "{:?}",
                    current
                );
            };
            // SAFETY: the slot holds an image in `self.format`.
            unsafe { hardware.restore_fpu(self.format, &slot.context) };

            self.last_owner.store(Some(current));
            Ok(TrapOutcome::Switched {
                from: previous,
                to: current,
            })
        })
    }

    /// Forget `thread` if it owns the FPU; returns whether it did
    ///
    /// Safe to call concurrently with [`FpuController::on_trap`].
    pub fn on_thread_terminated(&self, thread: ThreadHandle) -> bool {
        self.last_owner.clear_if(thread)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use ember_hal::arch::x86::control_regs::Cr0;
    use ember_hal::arch::x86::frame::DEVICE_NOT_AVAILABLE;
    use ember_hal::SimulatedCpu;
    use spin::Mutex;

    use super::*;

    struct Table {
        current: Option<ThreadHandle>,
        threads: Vec<(ThreadHandle, FpuSlot)>,
    }

    impl FpuThreadTable for Table {
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

    struct Scheduler {
        table: Mutex<Table>,
    }

    impl Scheduler {
        fn new() -> Self {
            Self {
                table: Mutex::new(Table {
                    current: None,
                    threads: Vec::new(),
                }),
            }
        }

        fn spawn(&self, controller: &FpuController, index: u16) -> ThreadHandle {
            let handle = ThreadHandle::new(index, 0).unwrap();
            self.table.lock().threads.push((handle, controller.new_slot()));
            handle
        }

        fn destroy(&self, controller: &FpuController, thread: ThreadHandle) {
            controller.on_thread_terminated(thread);
            self.table.lock().threads.retain(|(handle, _)| *handle != thread);
        }

        fn switch_to(&self, cpu: &SimulatedCpu, controller: &FpuController, thread: ThreadHandle) {
            self.table.lock().current = Some(thread);
            unsafe { controller.arm_monitor(cpu) };
        }

        fn saved(&self, thread: ThreadHandle) -> FpuContext {
            self.table.lock().fpu_slot(thread).unwrap().context().clone()
        }
    }

    impl FpuScheduler for Scheduler {
        fn with_locked<R>(&self, f: impl FnOnce(&mut dyn FpuThreadTable) -> R) -> R {
            let mut table = self.table.lock();
            f(&mut *table)
        }
    }

    fn trap(cpu: &SimulatedCpu, controller: &FpuController, scheduler: &Scheduler) -> TrapOutcome {
        controller
            .on_trap(cpu, scheduler, &InterruptFrame::for_vector(DEVICE_NOT_AVAILABLE))
            .unwrap()
    }

    #[test]
    fn test_default_context_is_reset_state() {
        let cpu = SimulatedCpu::new();
        let controller = FpuController::new(&cpu).unwrap();
        assert_eq!(controller.format(), FpuSaveFormat::Extended);
        assert_eq!(controller.default_context(), &FpuContext::initial(FpuSaveFormat::Extended));
        assert_eq!(controller.last_owner(), None);

        let legacy = SimulatedCpu::legacy();
        let controller = FpuController::new(&legacy).unwrap();
        assert_eq!(controller.format(), FpuSaveFormat::Legacy);
    }

    #[test]
    fn test_missing_fpu_is_unsupported() {
        let cpu = SimulatedCpu::with_capabilities(false, false);
        let error = FpuController::new(&cpu).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn test_first_trap_loads_default_without_saving() {
        let cpu = SimulatedCpu::new();
        let controller = FpuController::new(&cpu).unwrap();
        let scheduler = Scheduler::new();
        let a = scheduler.spawn(&controller, 0);
        let saves = cpu.save_count();

        cpu.compute(0x5A);
        scheduler.switch_to(&cpu, &controller, a);
        assert!(cpu.cr0().contains(Cr0::TS));

        let outcome = trap(&cpu, &controller, &scheduler);
        assert_eq!(outcome, TrapOutcome::Switched { from: None, to: a });
        assert_eq!(cpu.save_count(), saves);
        assert_eq!(&cpu.registers(), controller.default_context());
        assert!(!cpu.cr0().contains(Cr0::TS));
        assert_eq!(controller.last_owner(), Some(a));
    }

    fn check_images_survive_switches(cpu: SimulatedCpu) {
        let controller = FpuController::new(&cpu).unwrap();
        let format = controller.format();
        let scheduler = Scheduler::new();
        let a = scheduler.spawn(&controller, 0);
        let b = scheduler.spawn(&controller, 1);

        scheduler.switch_to(&cpu, &controller, a);
        trap(&cpu, &controller, &scheduler);
        cpu.compute(0xAA);
        let image_a = cpu.registers();

        scheduler.switch_to(&cpu, &controller, b);
        let outcome = trap(&cpu, &controller, &scheduler);
        assert_eq!(outcome, TrapOutcome::Switched { from: Some(a), to: b });
        assert_eq!(scheduler.saved(a).image(format), image_a.image(format));
        assert_eq!(cpu.registers().image(format), controller.default_context().image(format));

        cpu.compute(0xBB);
        let image_b = cpu.registers();

        scheduler.switch_to(&cpu, &controller, a);
        trap(&cpu, &controller, &scheduler);
        assert_eq!(cpu.registers().image(format), image_a.image(format));
        assert_eq!(scheduler.saved(b).image(format), image_b.image(format));
        assert_eq!(controller.last_owner(), Some(a));
    }

    #[test]
    fn test_images_survive_switches_extended() {
        check_images_survive_switches(SimulatedCpu::new());
    }

    #[test]
    fn test_images_survive_switches_legacy() {
        check_images_survive_switches(SimulatedCpu::legacy());
    }

    #[test]
    fn test_spurious_trap_moves_no_registers() {
        let cpu = SimulatedCpu::new();
        let controller = FpuController::new(&cpu).unwrap();
        let scheduler = Scheduler::new();
        let a = scheduler.spawn(&controller, 0);

        scheduler.switch_to(&cpu, &controller, a);
        trap(&cpu, &controller, &scheduler);
        let (saves, restores) = (cpu.save_count(), cpu.restore_count());

        // Re-armed on a switch back to the same thread
        scheduler.switch_to(&cpu, &controller, a);
        assert_eq!(trap(&cpu, &controller, &scheduler), TrapOutcome::Spurious);
        assert_eq!((cpu.save_count(), cpu.restore_count()), (saves, restores));
        assert!(!cpu.cr0().contains(Cr0::TS));
    }

    #[test]
    fn test_terminated_owner_is_not_saved() {
        let cpu = SimulatedCpu::new();
        let controller = FpuController::new(&cpu).unwrap();
        let scheduler = Scheduler::new();
        let a = scheduler.spawn(&controller, 0);
        let b = scheduler.spawn(&controller, 1);

        scheduler.switch_to(&cpu, &controller, a);
        trap(&cpu, &controller, &scheduler);
        assert!(!controller.on_thread_terminated(b));
        scheduler.destroy(&controller, a);
        assert_eq!(controller.last_owner(), None);

        let saves = cpu.save_count();
        scheduler.switch_to(&cpu, &controller, b);
        let outcome = trap(&cpu, &controller, &scheduler);
        assert_eq!(outcome, TrapOutcome::Switched { from: None, to: b });
        assert_eq!(cpu.save_count(), saves);
    }

    #[test]
    fn test_stale_owner_handle_is_skipped() {
        let cpu = SimulatedCpu::new();
        let controller = FpuController::new(&cpu).unwrap();
        let scheduler = Scheduler::new();
        let a = scheduler.spawn(&controller, 0);

        scheduler.switch_to(&cpu, &controller, a);
        trap(&cpu, &controller, &scheduler);
        // Slot reused without the termination hook running
        scheduler.table.lock().threads.clear();
        let reused = a.next_generation();
        scheduler.table.lock().threads.push((reused, controller.new_slot()));

        let saves = cpu.save_count();
        scheduler.switch_to(&cpu, &controller, reused);
        let outcome = trap(&cpu, &controller, &scheduler);
        assert_eq!(outcome, TrapOutcome::Switched { from: Some(a), to: reused });
        assert_eq!(cpu.save_count(), saves);
    }

    /// Runs the teardown hook for `victim` while a trap holds the lock
    struct TeardownDuringTrap<'a> {
        scheduler: &'a Scheduler,
        controller: &'a FpuController,
        victim: ThreadHandle,
    }

    impl FpuScheduler for TeardownDuringTrap<'_> {
        fn with_locked<R>(&self, f: impl FnOnce(&mut dyn FpuThreadTable) -> R) -> R {
            self.scheduler.with_locked(|table| {
                assert!(self.controller.on_thread_terminated(self.victim));
                f(table)
            })
        }
    }

    #[test]
    fn test_termination_inside_trap() {
        let cpu = SimulatedCpu::new();
        let controller = FpuController::new(&cpu).unwrap();
        let scheduler = Scheduler::new();
        let a = scheduler.spawn(&controller, 0);
        let b = scheduler.spawn(&controller, 1);

        scheduler.switch_to(&cpu, &controller, a);
        trap(&cpu, &controller, &scheduler);

        let saves = cpu.save_count();
        scheduler.switch_to(&cpu, &controller, b);
        let teardown = TeardownDuringTrap {
            scheduler: &scheduler,
            controller: &controller,
            victim: a,
        };
        let outcome = controller
            .on_trap(&cpu, &teardown, &InterruptFrame::for_vector(DEVICE_NOT_AVAILABLE))
            .unwrap();

        assert_eq!(outcome, TrapOutcome::Switched { from: None, to: b });
        assert_eq!(cpu.save_count(), saves);
        assert_eq!(controller.last_owner(), Some(b));
        assert!(!controller.on_thread_terminated(a));
    }

    #[test]
    fn test_termination_races_traps() {
        let cpu = SimulatedCpu::new();
        let controller = FpuController::new(&cpu).unwrap();
        let scheduler = Scheduler::new();
        let a = scheduler.spawn(&controller, 0);
        let b = scheduler.spawn(&controller, 1);
        let c = scheduler.spawn(&controller, 2);

        scheduler.switch_to(&cpu, &controller, a);
        trap(&cpu, &controller, &scheduler);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..500 {
                    let thread = if round % 2 == 0 { b } else { c };
                    scheduler.switch_to(&cpu, &controller, thread);
                    trap(&cpu, &controller, &scheduler);
                    assert_ne!(controller.last_owner(), Some(a));
                }
            });
            scope.spawn(|| {
                scheduler.destroy(&controller, a);
                // Later generations of the same index die without ever running
                let mut victim = a;
                for _ in 0..500 {
                    victim = victim.next_generation();
                    scheduler.table.lock().threads.push((victim, controller.new_slot()));
                    scheduler.destroy(&controller, victim);
                }
            });
        });

        let owner = controller.last_owner();
        assert!(owner == Some(b) || owner == Some(c), "owner {:?}", owner);
        assert!(scheduler.table.lock().fpu_slot(a).is_none());
    }

    #[test]
    fn test_trap_without_current_thread_fails() {
        let cpu = SimulatedCpu::new();
        let controller = FpuController::new(&cpu).unwrap();
        let scheduler = Scheduler::new();
        let error = controller
            .on_trap(&cpu, &scheduler, &InterruptFrame::for_vector(DEVICE_NOT_AVAILABLE))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IllegalState);
    }
}
