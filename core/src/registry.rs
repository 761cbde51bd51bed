//! # Kernel Service Registry
//!
//! The only way kernel subsystems find each other. Each service is bound
//! once, during bootstrap, to a small integer identifier and lives for the
//! rest of the kernel's lifetime.
//!
//! ```text
//!  id   slot
//! ┌────┬───────────────────────────┐
//! │  0 │ MemoryService             │
//! │  1 │ SchedulerService          │
//! │  2 │ TimeService               │
//! │  3 │ JobService                │
//! │  4 │ (empty)                   │
//! │ .. │                           │
//! │255 │ (empty)                   │
//! └────┴───────────────────────────┘
//! ```
//!
//! Registration is append-only and serialized by a spinlock (the registry
//! is used before any blocking primitive exists). Lookups do not take the
//! lock: registration only happens while the bootstrap runs single-threaded,
//! and a bound slot never changes again.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::{Mutex, Once};

use crate::error::{ErrorKind, KernelResult};

// =============================================================================
// SERVICE IDS
// =============================================================================

/// Number of registry slots
pub const MAX_SERVICES: usize = 256;

/// Registry slot identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ServiceId(pub u8);

impl ServiceId {
    /// Memory and paging
    pub const MEMORY: Self = Self(0);
    /// Thread scheduler
    pub const SCHEDULER: Self = Self(1);
    /// Time keeping
    pub const TIME: Self = Self(2);
    /// Periodic jobs
    pub const JOB: Self = Self(3);
    /// Block storage
    pub const STORAGE: Self = Self(4);
    /// Filesystem
    pub const FILESYSTEM: Self = Self(5);
    /// Interrupt dispatch
    pub const INTERRUPT: Self = Self(6);
    /// Processes
    pub const PROCESS: Self = Self(7);
    /// Networking
    pub const NETWORK: Self = Self(8);
    /// Power management
    pub const POWER: Self = Self(9);
    /// Sound
    pub const SOUND: Self = Self(10);
    /// Information (kernel log, boot data)
    pub const INFORMATION: Self = Self(11);

    /// Slot index
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// SERVICE TRAIT
// =============================================================================

/// Upcast to [`Any`] for typed lookups
pub trait AsAny: Any {
    /// `self` as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A kernel service
pub trait Service: AsAny + Send + Sync {
    /// Human-readable name
    fn name(&self) -> &'static str;
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Fixed-capacity map from [`ServiceId`] to service instances
pub struct ServiceRegistry {
    slots: [Once<Box<dyn Service>>; MAX_SERVICES],
    lock: Mutex<()>,
    count: AtomicUsize,
}

impl ServiceRegistry {
    /// An empty registry
    pub const fn new() -> Self {
        Self {
            slots: [const { Once::new() }; MAX_SERVICES],
            lock: Mutex::new(()),
            count: AtomicUsize::new(0),
        }
    }

    /// Bind `service` to `id`
    ///
    /// Fails with `InvalidArgument` if `id` is already bound; the existing
    /// service is kept.
    pub fn register<S: Service>(&self, id: ServiceId, service: S) -> KernelResult<()> {
        self.register_boxed(id, Box::new(service))
    }

    /// Bind an already boxed service to `id`
    pub fn register_boxed(&self, id: ServiceId, service: Box<dyn Service>) -> KernelResult<()> {
        let _lock = self.lock.lock();
        let slot = &self.slots[id.index()];

        if let Some(existing) = slot.get() {
            crate::kernel_bail!(
                ErrorKind::InvalidArgument,
                "service id already registered",
                "{} is bound to '{}', refusing '{}'",
                id,
                existing.name(),
                service.name()
            );
        }

        log::debug!("Registry: {} -> {}", id, service.name());
        slot.call_once(|| service);
        self.count.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Whether `id` is bound
    pub fn is_registered(&self, id: ServiceId) -> bool {
        self.slots[id.index()].is_completed()
    }

    /// The service bound to `id`, as its concrete type
    pub fn get<T: Service>(&self, id: ServiceId) -> KernelResult<&T> {
        let service = self.get_dyn(id)?;
        match service.as_any().downcast_ref::<T>() {
            Some(service) => Ok(service),
            None => crate::kernel_bail!(
                ErrorKind::InvalidArgument,
                "service has a different type",
                "{} is '{}', requested {}",
                id,
                service.name(),
                core::any::type_name::<T>()
            ),
        }
    }

    /// The service bound to `id`
    pub fn get_dyn(&self, id: ServiceId) -> KernelResult<&dyn Service> {
        match self.slots[id.index()].get() {
            Some(service) => Ok(service.as_ref()),
            None => crate::kernel_bail!(
                ErrorKind::IllegalState,
                "service not registered",
                "{}",
                id
            ),
        }
    }

    /// Number of bound services
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether no service is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bound identifiers in ascending order
    pub fn registered_ids(&self) -> Vec<ServiceId> {
        (0..MAX_SERVICES)
            .filter(|index| self.slots[*index].is_completed())
            .map(|index| ServiceId(index as u8))
            .collect()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.registered_ids())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Memory {
        frames: usize,
    }

    impl Service for Memory {
        fn name(&self) -> &'static str {
            "memory"
        }
    }

    struct Clock(u64);

    impl Service for Clock {
        fn name(&self) -> &'static str {
            "clock"
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ServiceRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.is_registered(ServiceId::MEMORY));

        registry.register(ServiceId::MEMORY, Memory { frames: 32 }).unwrap();
        registry.register(ServiceId::TIME, Clock(99)).unwrap();

        assert!(registry.is_registered(ServiceId::MEMORY));
        assert!(registry.is_registered(ServiceId::TIME));
        assert_eq!(registry.get::<Memory>(ServiceId::MEMORY).unwrap().frames, 32);
        assert_eq!(registry.get::<Clock>(ServiceId::TIME).unwrap().0, 99);
        assert_eq!(registry.get_dyn(ServiceId::TIME).unwrap().name(), "clock");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.registered_ids(), alloc::vec![ServiceId::MEMORY, ServiceId::TIME]);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = ServiceRegistry::new();
        registry.register(ServiceId::MEMORY, Memory { frames: 1 }).unwrap();

        let error = registry.register(ServiceId::MEMORY, Memory { frames: 2 }).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert_eq!(registry.get::<Memory>(ServiceId::MEMORY).unwrap().frames, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_failures() {
        let registry = ServiceRegistry::new();
        let error = registry.get::<Memory>(ServiceId::STORAGE).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IllegalState);

        registry.register(ServiceId(200), Clock(1)).unwrap();
        let error = registry.get::<Memory>(ServiceId(200)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_static_registry() {
        static REGISTRY: ServiceRegistry = ServiceRegistry::new();
        REGISTRY.register(ServiceId(255), Clock(5)).unwrap();
        assert!(REGISTRY.is_registered(ServiceId(255)));
    }
}
