//! # Instance Factory
//!
//! Named prototypes that produce fresh instances on request. The boot
//! sequence registers the default heap memory manager here so that
//! processes can later create their own heaps by class name.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use ember_core::{ErrorKind, KernelResult};
use spin::Mutex;

type Constructor<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

/// Registry of prototypes producing `T`
pub struct InstanceFactory<T: ?Sized> {
    prototypes: Mutex<BTreeMap<&'static str, Constructor<T>>>,
}

impl<T: ?Sized> InstanceFactory<T> {
    /// An empty factory
    pub const fn new() -> Self {
        Self {
            prototypes: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register `constructor` under `class_name`
    ///
    /// Fails with `InvalidArgument` if the name is taken.
    pub fn register_prototype(
        &self,
        class_name: &'static str,
        constructor: impl Fn() -> Box<T> + Send + Sync + 'static,
    ) -> KernelResult<()> {
        let mut prototypes = self.prototypes.lock();
        ember_core::kernel_ensure!(
            !prototypes.contains_key(class_name),
            ErrorKind::InvalidArgument,
            "prototype already registered",
            "{}",
            class_name
        );
        prototypes.insert(class_name, Box::new(constructor));
        log::debug!("Factory: registered prototype '{}'", class_name);
        Ok(())
    }

    /// A fresh instance of `class_name`
    pub fn create(&self, class_name: &str) -> KernelResult<Box<T>> {
        match self.prototypes.lock().get(class_name) {
            Some(constructor) => Ok(constructor()),
            None => ember_core::kernel_bail!(
                ErrorKind::InvalidArgument,
                "no prototype for class",
                "{}",
                class_name
            ),
        }
    }

    /// Whether `class_name` has a prototype
    pub fn contains(&self, class_name: &str) -> bool {
        self.prototypes.lock().contains_key(class_name)
    }

    /// Registered class names in order
    pub fn class_names(&self) -> Vec<&'static str> {
        self.prototypes.lock().keys().copied().collect()
    }
}

impl<T: ?Sized> Default for InstanceFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> core::fmt::Debug for InstanceFactory<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InstanceFactory")
            .field("classes", &self.class_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send {
        fn corners(&self) -> u32;
    }

    struct Square;

    impl Shape for Square {
        fn corners(&self) -> u32 {
            4
        }
    }

    #[test]
    fn test_create_fresh_instances() {
        let factory: InstanceFactory<dyn Shape> = InstanceFactory::new();
        factory.register_prototype("Square", || Box::new(Square)).unwrap();

        assert!(factory.contains("Square"));
        assert_eq!(factory.create("Square").unwrap().corners(), 4);
        assert_eq!(factory.class_names(), ["Square"]);
    }

    #[test]
    fn test_duplicate_and_unknown_classes() {
        let factory: InstanceFactory<dyn Shape> = InstanceFactory::new();
        factory.register_prototype("Square", || Box::new(Square)).unwrap();

        let error = factory.register_prototype("Square", || Box::new(Square)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);

        let error = factory.create("Circle").map(|_| ()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert_eq!(error.details(), Some("Circle"));
    }
}
