//! # Kernel Logger
//!
//! `log` backend that writes `[LEVEL] target: message` lines to the
//! debug console.

use core::fmt;
use core::str::FromStr;

use log::{LevelFilter, Log, Metadata, Record};

use super::console::{self, ConsoleWriter};

/// The `log` backend
#[derive(Debug)]
pub struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            console::print(format_args!("{}\n", Line(record)));
        }
    }

    fn flush(&self) {}
}

struct Line<'a, 'b>(&'a Record<'b>);

impl fmt::Display for Line<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:<5}] {}: {}", self.0.level(), self.0.target(), self.0.args())
    }
}

/// Format one record onto `console`
pub fn write_record(console: &mut dyn ConsoleWriter, record: &Record<'_>) -> fmt::Result {
    console::write_to_console(console, format_args!("{}\n", Line(record)))
}

/// Install the kernel logger
///
/// Only the first call installs the backend; later calls adjust the level.
pub fn init_logger(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_err() {
        log::debug!("logger already installed");
    }
    set_level(level);
}

/// Change the maximum log level
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

/// Parse a `log_level=` command-line value
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(value).ok()
}
