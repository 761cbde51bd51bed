//! # 16550 UART
//!
//! Polled serial output used as the kernel log sink.

use core::arch::asm;
use core::fmt;

/// I/O base of COM1
pub const COM1_BASE: u16 = 0x3F8;

const DATA: u16 = 0;
const INTERRUPT_ENABLE: u16 = 1;
const FIFO_CONTROL: u16 = 2;
const LINE_CONTROL: u16 = 3;
const MODEM_CONTROL: u16 = 4;
const LINE_STATUS: u16 = 5;

const LINE_STATUS_THR_EMPTY: u8 = 1 << 5;

/// Write a byte to an I/O port
///
/// # Safety
/// Port writes can reconfigure arbitrary devices.
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    unsafe {
        asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
    }
}

/// Read a byte from an I/O port
///
/// # Safety
/// Port reads can have device side effects.
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    unsafe {
        asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
    }
    value
}

/// A serial port driven by polling
pub struct SerialPort {
    base: u16,
}

impl SerialPort {
    /// Port at `base`; call [`SerialPort::init`] before use
    pub const fn new(base: u16) -> Self {
        Self { base }
    }

    /// 115200 baud, 8N1, FIFO enabled, interrupts off
    ///
    /// # Safety
    /// `base` must be the I/O base of a 16550-compatible UART.
    pub unsafe fn init(&mut self) {
        unsafe {
            outb(self.base + INTERRUPT_ENABLE, 0x00);
            outb(self.base + LINE_CONTROL, 0x80);
            outb(self.base + DATA, 0x01);
            outb(self.base + INTERRUPT_ENABLE, 0x00);
            outb(self.base + LINE_CONTROL, 0x03);
            outb(self.base + FIFO_CONTROL, 0xC7);
            outb(self.base + MODEM_CONTROL, 0x0B);
        }
    }

    /// Send one byte, waiting for the transmit holding register
    pub fn write_byte(&mut self, byte: u8) {
        unsafe {
            while inb(self.base + LINE_STATUS) & LINE_STATUS_THR_EMPTY == 0 {
                core::hint::spin_loop();
            }
            outb(self.base + DATA, byte);
        }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
        Ok(())
    }
}
