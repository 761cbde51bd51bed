//! # Debug Console
//!
//! Byte sinks for kernel diagnostics. The early slot is filled by the boot
//! code with a polled serial port; a later console (e.g. a terminal
//! device) replaces it once available.

use core::fmt::{self, Write};

use spin::Mutex;

/// A byte sink for kernel output
pub trait ConsoleWriter: Send {
    /// Write one byte
    fn write_byte(&mut self, byte: u8);

    /// Write a string
    fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }

    /// Flush buffered output
    fn flush(&mut self) {}
}

static CONSOLE: Mutex<Option<&'static mut dyn ConsoleWriter>> = Mutex::new(None);

static EARLY_CONSOLE: Mutex<Option<&'static mut dyn ConsoleWriter>> = Mutex::new(None);

/// Install the console
pub fn set_console(writer: &'static mut dyn ConsoleWriter) {
    *CONSOLE.lock() = Some(writer);
}

/// Install the early console
pub fn set_early_console(writer: &'static mut dyn ConsoleWriter) {
    *EARLY_CONSOLE.lock() = Some(writer);
}

/// Whether any console is installed
pub fn has_console() -> bool {
    CONSOLE.lock().is_some() || EARLY_CONSOLE.lock().is_some()
}

/// Print to the console, falling back to the early console
pub fn print(args: fmt::Arguments<'_>) {
    if let Some(console) = CONSOLE.lock().as_mut() {
        let _ = write_to_console(*console, args);
    } else if let Some(console) = EARLY_CONSOLE.lock().as_mut() {
        let _ = write_to_console(*console, args);
    }
}

/// Write formatted output to a console
pub fn write_to_console(console: &mut dyn ConsoleWriter, args: fmt::Arguments<'_>) -> fmt::Result {
    struct Adapter<'a>(&'a mut dyn ConsoleWriter);

    impl Write for Adapter<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            ConsoleWriter::write_str(self.0, s);
            Ok(())
        }
    }

    Adapter(console).write_fmt(args)
}

#[cfg(target_arch = "x86")]
impl ConsoleWriter for ember_hal::arch::x86::serial::SerialPort {
    fn write_byte(&mut self, byte: u8) {
        if byte == b'\n' {
            ember_hal::arch::x86::serial::SerialPort::write_byte(self, b'\r');
        }
        ember_hal::arch::x86::serial::SerialPort::write_byte(self, byte);
    }
}

/// Print to the kernel console
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::debug::console::print(format_args!($($arg)*))
    };
}

/// Print a line to the kernel console
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {
        $crate::kprint!("{}\n", format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    struct Buffer(Vec<u8>);

    impl ConsoleWriter for Buffer {
        fn write_byte(&mut self, byte: u8) {
            self.0.push(byte);
        }
    }

    #[test]
    fn test_formatted_write() {
        let mut buffer = Buffer(Vec::new());
        write_to_console(&mut buffer, format_args!("depth={} owner={:?}", 2, Some(3))).unwrap();
        assert_eq!(buffer.0, b"depth=2 owner=Some(3)");
    }
}
