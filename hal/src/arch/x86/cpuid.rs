//! # CPUID Feature Probe
//!
//! Standard feature flags from leaf 1 (EDX) needed by the kernel core.

bitflags::bitflags! {
    /// CPUID leaf 1 EDX feature bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuFeatures: u32 {
        /// On-chip x87 FPU
        const FPU = 1 << 0;
        /// Virtual 8086 mode extensions
        const VME = 1 << 1;
        /// Time stamp counter
        const TSC = 1 << 4;
        /// Model specific registers
        const MSR = 1 << 5;
        /// Physical address extension
        const PAE = 1 << 6;
        /// On-chip APIC
        const APIC = 1 << 9;
        /// SYSENTER/SYSEXIT
        const SEP = 1 << 11;
        /// Global pages
        const PGE = 1 << 13;
        /// Conditional move
        const CMOV = 1 << 15;
        /// MMX
        const MMX = 1 << 23;
        /// FXSAVE/FXRSTOR
        const FXSR = 1 << 24;
        /// SSE
        const SSE = 1 << 25;
        /// SSE2
        const SSE2 = 1 << 26;
    }
}

impl CpuFeatures {
    /// Whether the extended FPU save format is usable
    pub const fn has_fxsr(self) -> bool {
        self.contains(Self::FXSR)
    }
}

#[cfg(target_arch = "x86")]
impl CpuFeatures {
    /// Read leaf 1 of CPUID
    pub fn read() -> Self {
        // SAFETY: every processor Ember boots on implements CPUID leaf 1.
        #[allow(unused_unsafe)]
        let result = unsafe { core::arch::x86::__cpuid(1) };
        Self::from_bits_retain(result.edx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_bits() {
        assert_eq!(CpuFeatures::FPU.bits(), 1);
        assert_eq!(CpuFeatures::FXSR.bits(), 0x0100_0000);
        assert!(CpuFeatures::from_bits_retain(0x0100_0001).has_fxsr());
        assert!(!CpuFeatures::FPU.has_fxsr());
    }
}
