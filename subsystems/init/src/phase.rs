//! # Boot Phases
//!
//! The bootstrap sequence moves through a strictly linear set of phases.
//! Each phase unlocks operations that are illegal before it.
//!
//! ```text
//! PreMemory ─▶ HeapReady ─▶ PagingReady ─▶ AddressSpaceReady ─▶ ServicesPartial
//!                                                                     │
//! Initialized ◀─ SyscallsEnabled ◀─ TimersReady ◀─ InterruptsEnabled ◀─ SchedulerReady
//! ```
//!
//! | Phase               | Unlocks                                  |
//! |---------------------|------------------------------------------|
//! | `HeapReady`         | early memory allocation                  |
//! | `ServicesPartial`   | service registration                     |
//! | `InterruptsEnabled` | the periodic timer                       |
//! | `Initialized`       | forbids early memory allocation and free |

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use ember_core::{ErrorKind, KernelResult};

// =============================================================================
// BOOT PHASE
// =============================================================================

/// Boot phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum BootPhase {
    /// Kernel entry, nothing set up
    PreMemory         = 0,
    /// The bootstrap heap is usable
    HeapReady         = 1,
    /// Paging structures and frame allocator exist
    PagingReady       = 2,
    /// Running in the bootstrap address space
    AddressSpaceReady = 3,
    /// Static initializers ran; the registry is usable
    ServicesPartial   = 4,
    /// The kernel process is ready to run
    SchedulerReady    = 5,
    /// Hardware interrupts are enabled
    InterruptsEnabled = 6,
    /// Time and job services are registered
    TimersReady       = 7,
    /// System calls are accepted
    SyscallsEnabled   = 8,
    /// Boot finished
    Initialized       = 9,
}

/// All phases in boot order
pub const PHASE_ORDER: [BootPhase; 10] = [
    BootPhase::PreMemory,
    BootPhase::HeapReady,
    BootPhase::PagingReady,
    BootPhase::AddressSpaceReady,
    BootPhase::ServicesPartial,
    BootPhase::SchedulerReady,
    BootPhase::InterruptsEnabled,
    BootPhase::TimersReady,
    BootPhase::SyscallsEnabled,
    BootPhase::Initialized,
];

impl BootPhase {
    /// Phase for a raw discriminant
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if (raw as usize) < PHASE_ORDER.len() {
            Some(PHASE_ORDER[raw as usize])
        } else {
            None
        }
    }

    /// The phase after this one
    pub const fn next(self) -> Option<Self> {
        Self::from_raw(self as u32 + 1)
    }

    /// The phase before this one
    pub const fn previous(self) -> Option<Self> {
        match (self as u32).checked_sub(1) {
            Some(raw) => Self::from_raw(raw),
            None => None,
        }
    }

    /// Phase name
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreMemory => "PreMemory",
            Self::HeapReady => "HeapReady",
            Self::PagingReady => "PagingReady",
            Self::AddressSpaceReady => "AddressSpaceReady",
            Self::ServicesPartial => "ServicesPartial",
            Self::SchedulerReady => "SchedulerReady",
            Self::InterruptsEnabled => "InterruptsEnabled",
            Self::TimersReady => "TimersReady",
            Self::SyscallsEnabled => "SyscallsEnabled",
            Self::Initialized => "Initialized",
        }
    }
}

impl fmt::Display for BootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PHASE TRACKER
// =============================================================================

/// Current boot phase, readable from any context
#[derive(Debug)]
pub struct PhaseTracker {
    current: AtomicU32,
}

impl PhaseTracker {
    /// Tracker at [`BootPhase::PreMemory`]
    pub const fn new() -> Self {
        Self {
            current: AtomicU32::new(BootPhase::PreMemory as u32),
        }
    }

    /// Current phase
    pub fn current(&self) -> BootPhase {
        BootPhase::from_raw(self.current.load(Ordering::Acquire)).unwrap_or(BootPhase::PreMemory)
    }

    /// Move into `phase` from the phase right before it
    ///
    /// Fails with `IllegalState` if the tracker is anywhere else; phases are
    /// never skipped or revisited.
    pub fn enter(&self, phase: BootPhase) -> KernelResult<()> {
        let Some(from) = phase.previous() else {
            ember_core::kernel_bail!(ErrorKind::IllegalState, "cannot re-enter the first boot phase");
        };

        match self.current.compare_exchange(
            from as u32,
            phase as u32,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                log::debug!("Boot phase: {} -> {}", from, phase);
                Ok(())
            },
            Err(actual) => ember_core::kernel_bail!(
                ErrorKind::IllegalState,
                "boot phase out of order",
                "entering {} from {:?}",
                phase,
                BootPhase::from_raw(actual)
            ),
        }
    }

    /// Fail with `IllegalState` unless `phase` has been reached
    pub fn require_at_least(&self, phase: BootPhase, operation: &'static str) -> KernelResult<()> {
        let current = self.current();
        ember_core::kernel_ensure!(
            current >= phase,
            ErrorKind::IllegalState,
            "operation not available in this boot phase",
            "{} needs {}, system is in {}",
            operation,
            phase,
            current
        );
        Ok(())
    }

    /// Whether the boot finished
    pub fn is_initialized(&self) -> bool {
        self.current() == BootPhase::Initialized
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
