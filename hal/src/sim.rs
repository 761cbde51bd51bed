//! # Simulated Processor
//!
//! A software [`Hardware`] implementation for host-side tests of the
//! interrupt nesting and FPU ownership logic.
//!
//! The simulation tracks the interrupt flag, the CR0 FPU bits and one live
//! FPU register file. Privileged operations that would fault on real
//! hardware (saving while `CR0.TS` is set, using FXSAVE without FXSR)
//! panic instead, and [`Hardware::halt`] panics with `"processor halted"`.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use spin::Mutex;

use crate::arch::x86::control_regs::Cr0;
use crate::arch::x86::fpu::{FpuContext, FpuSaveFormat};
use crate::hardware::Hardware;

/// Software model of an i386 processor
#[derive(Debug)]
pub struct SimulatedCpu {
    interrupts: AtomicBool,
    cr0: AtomicU32,
    fpu_present: bool,
    extended: bool,
    registers: Mutex<FpuContext>,
    masks: AtomicUsize,
    unmasks: AtomicUsize,
    saves: AtomicUsize,
    restores: AtomicUsize,
}

impl SimulatedCpu {
    /// A processor with an FPU and FXSR, interrupts masked
    pub fn new() -> Self {
        Self::with_capabilities(true, true)
    }

    /// A processor with only the legacy FPU save format
    pub fn legacy() -> Self {
        Self::with_capabilities(true, false)
    }

    /// A processor with the given FPU capabilities
    pub fn with_capabilities(fpu_present: bool, extended: bool) -> Self {
        Self {
            interrupts: AtomicBool::new(false),
            cr0: AtomicU32::new((Cr0::PE | Cr0::ET).bits()),
            fpu_present,
            extended,
            registers: Mutex::new(FpuContext::zeroed()),
            masks: AtomicUsize::new(0),
            unmasks: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            restores: AtomicUsize::new(0),
        }
    }

    /// Current CR0
    pub fn cr0(&self) -> Cr0 {
        Cr0::from_bits_retain(self.cr0.load(Ordering::SeqCst))
    }

    /// Snapshot of the live FPU registers
    pub fn registers(&self) -> FpuContext {
        self.registers.lock().clone()
    }

    /// Simulate a thread computing with the FPU: overwrite the live registers
    ///
    /// Panics if FPU instructions would trap.
    pub fn compute(&self, pattern: u8) {
        assert!(!self.cr0().fpu_trapping(), "FPU instruction with CR0.TS set");
        self.registers.lock().as_bytes_mut().fill(pattern);
    }

    /// Number of `mask_interrupts` calls
    pub fn mask_count(&self) -> usize {
        self.masks.load(Ordering::SeqCst)
    }

    /// Number of `unmask_interrupts` calls
    pub fn unmask_count(&self) -> usize {
        self.unmasks.load(Ordering::SeqCst)
    }

    /// Number of FPU saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of FPU restores
    pub fn restore_count(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }

    fn update_cr0(&self, f: impl FnOnce(&mut Cr0)) {
        let mut cr0 = self.cr0();
        f(&mut cr0);
        self.cr0.store(cr0.bits(), Ordering::SeqCst);
    }

    fn check_format(&self, format: FpuSaveFormat) {
        assert!(self.fpu_present, "FPU instruction without an FPU");
        assert!(!self.cr0().fpu_trapping(), "FPU instruction with CR0.TS set");
        if format == FpuSaveFormat::Extended {
            assert!(self.extended, "FXSAVE without FXSR support");
        }
    }

    fn initial_format(&self) -> FpuSaveFormat {
        FpuSaveFormat::select(self.extended)
    }
}

impl Default for SimulatedCpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Hardware for SimulatedCpu {
    fn mask_interrupts(&self) {
        self.interrupts.store(false, Ordering::SeqCst);
        self.masks.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn unmask_interrupts(&self) {
        self.interrupts.store(true, Ordering::SeqCst);
        self.unmasks.fetch_add(1, Ordering::SeqCst);
    }

    fn interrupts_enabled(&self) -> bool {
        self.interrupts.load(Ordering::SeqCst)
    }

    fn halt(&self) -> ! {
        self.interrupts.store(false, Ordering::SeqCst);
        panic!("processor halted");
    }

    fn fpu_present(&self) -> bool {
        self.fpu_present
    }

    fn extended_fpu_save(&self) -> bool {
        self.extended
    }

    unsafe fn arm_fpu_monitor(&self) {
        self.update_cr0(|cr0| cr0.insert(Cr0::FPU_MONITOR));
    }

    unsafe fn disarm_fpu_monitor(&self) {
        self.update_cr0(|cr0| cr0.remove(Cr0::TS));
    }

    unsafe fn reset_fpu(&self) {
        assert!(self.fpu_present, "FPU instruction without an FPU");
        *self.registers.lock() = FpuContext::initial(self.initial_format());
    }

    unsafe fn save_fpu(&self, format: FpuSaveFormat, area: &mut FpuContext) {
        self.check_format(format);
        let size = format.image_size();
        let mut registers = self.registers.lock();
        area.as_bytes_mut()[..size].copy_from_slice(&registers.as_bytes()[..size]);
        if format == FpuSaveFormat::Legacy {
            // FNSAVE reinitializes the FPU
            *registers = FpuContext::initial(FpuSaveFormat::Legacy);
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn restore_fpu(&self, format: FpuSaveFormat, area: &FpuContext) {
        self.check_format(format);
        let size = format.image_size();
        self.registers.lock().as_bytes_mut()[..size].copy_from_slice(&area.as_bytes()[..size]);
        self.restores.fetch_add(1, Ordering::SeqCst);
    }
}
