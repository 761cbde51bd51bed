//! # Kernel Diagnostics
//!
//! Console sinks and the `log` backend.

pub mod console;
pub mod logger;

pub use console::{print, set_console, set_early_console, ConsoleWriter};
pub use logger::{init_logger, set_level, KernelLogger};
