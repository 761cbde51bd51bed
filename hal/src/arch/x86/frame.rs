//! # Interrupt Frame
//!
//! Register state pushed by the common interrupt entry stub.

use core::fmt;

/// Registers captured on interrupt or fault entry
///
/// Field order matches the push order of the entry stub (segment registers
/// and `pushad` first, then vector, error code and the CPU-pushed part).
#[allow(missing_docs)]
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptFrame {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub interrupt: u32,
    pub error: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

/// Device-not-available vector (#NM)
pub const DEVICE_NOT_AVAILABLE: u32 = 7;

impl InterruptFrame {
    /// A frame for `vector` with all registers zero
    pub const fn for_vector(vector: u32) -> Self {
        Self {
            gs: 0,
            fs: 0,
            es: 0,
            ds: 0,
            edi: 0,
            esi: 0,
            ebp: 0,
            esp: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            interrupt: vector,
            error: 0,
            eip: 0,
            cs: 0,
            eflags: 0,
        }
    }

    /// Whether the interrupted code ran in ring 3
    pub const fn from_user_mode(&self) -> bool {
        self.cs & 3 == 3
    }
}

impl fmt::Debug for InterruptFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vector={} error={:#x}", self.interrupt, self.error)?;
        writeln!(
            f,
            "eip={:#010x} cs={:#06x} eflags={:#010x}",
            self.eip, self.cs, self.eflags
        )?;
        writeln!(
            f,
            "eax={:#010x} ebx={:#010x} ecx={:#010x} edx={:#010x}",
            self.eax, self.ebx, self.ecx, self.edx
        )?;
        writeln!(
            f,
            "esi={:#010x} edi={:#010x} ebp={:#010x} esp={:#010x}",
            self.esi, self.edi, self.ebp, self.esp
        )?;
        write!(
            f,
            "ds={:#06x} es={:#06x} fs={:#06x} gs={:#06x}",
            self.ds, self.es, self.fs, self.gs
        )
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<InterruptFrame>(), 17 * 4);
