//! # Interrupt Nesting Controller
//!
//! Hardware masking is binary; critical sections nest. A process-wide
//! counter records how many critical sections currently need interrupts
//! masked, and only the outermost `enable` unmasks them again.
//!
//! ```text
//! depth  operation          hardware
//! ─────────────────────────────────────────
//!   1    (kernel entry)     masked
//!   0    enable()           sti
//!   1    disable()          cli
//!   2    disable()          cli
//!   1    enable()           -
//!   0    enable()           sti
//! ```
//!
//! The counter starts at 1 because the boot loader enters the kernel with
//! interrupts masked; the bootstrap sequencer's first `enable` pairs with
//! that implicit `disable`.
//!
//! Both operations use a single atomic read-modify-write and never block,
//! so they are safe from interrupt and fault handlers.

use core::sync::atomic::{AtomicI32, Ordering};

use ember_hal::Hardware;

use crate::error::{ErrorKind, KernelResult};
use crate::fatal::OrHalt;

/// Depth at kernel entry
pub const INITIAL_DEPTH: i32 = 1;

/// Nested interrupt-disable counter
#[derive(Debug)]
pub struct InterruptNesting {
    depth: AtomicI32,
}

impl InterruptNesting {
    /// A counter in the kernel-entry state (depth 1, interrupts masked)
    pub const fn new() -> Self {
        Self {
            depth: AtomicI32::new(INITIAL_DEPTH),
        }
    }

    /// Current nesting depth
    pub fn depth(&self) -> i32 {
        self.depth.load(Ordering::SeqCst)
    }

    /// Enter a critical section
    ///
    /// Always masks interrupts. Fails if the counter was already negative,
    /// which means an earlier `enable` was unbalanced.
    pub fn disable(&self, hardware: &dyn Hardware) -> KernelResult<()> {
        let previous = self.depth.fetch_add(1, Ordering::SeqCst);
        hardware.mask_interrupts();

        crate::kernel_ensure!(
            previous >= 0,
            ErrorKind::IllegalState,
            "interrupt nesting counter is negative",
            "depth before disable: {}",
            previous
        );
        Ok(())
    }

    /// Leave a critical section
    ///
    /// Unmasks interrupts only when leaving the outermost section. Fails
    /// without unmasking if there was no section to leave.
    pub fn enable(&self, hardware: &dyn Hardware) -> KernelResult<()> {
        let previous = self.depth.fetch_sub(1, Ordering::SeqCst);

        if previous == 1 {
            // SAFETY: the counter reached zero, no critical section is open.
            unsafe { hardware.unmask_interrupts() };
        }

        crate::kernel_ensure!(
            previous >= 1,
            ErrorKind::IllegalState,
            "unbalanced interrupt enable",
            "depth before enable: {}",
            previous
        );
        Ok(())
    }

    /// Enter a critical section that ends when the guard is dropped
    pub fn guard<'a>(&'a self, hardware: &'a dyn Hardware) -> KernelResult<InterruptGuard<'a>> {
        self.disable(hardware)?;
        Ok(InterruptGuard {
            nesting: self,
            hardware,
        })
    }

    /// Run `f` inside a critical section
    pub fn without_interrupts<R>(
        &self,
        hardware: &dyn Hardware,
        f: impl FnOnce() -> R,
    ) -> KernelResult<R> {
        let _guard = self.guard(hardware)?;
        Ok(f())
    }
}

impl Default for InterruptNesting {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII critical section
///
/// Dropping the guard performs the matching `enable`; an unbalanced counter
/// at that point halts the kernel.
pub struct InterruptGuard<'a> {
    nesting: &'a InterruptNesting,
    hardware: &'a dyn Hardware,
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.nesting.enable(self.hardware).or_halt(self.hardware);
    }
}

impl core::fmt::Debug for InterruptGuard<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InterruptGuard")
            .field("depth", &self.nesting.depth())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
