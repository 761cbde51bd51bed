//! # i386 Support
//!
//! Register layouts and privileged instruction wrappers for 32-bit x86.
//!
//! | Module          | Contents                                       |
//! |-----------------|------------------------------------------------|
//! | `control_regs`  | CR0 flags, `cli`/`sti`/`hlt`, EFLAGS           |
//! | `cpuid`         | Leaf 1 feature flags                           |
//! | `fpu`           | FPU register images, save/restore, self-test   |
//! | `frame`         | Interrupt entry register frame                 |
//! | `segmentation`  | Selectors, GDT entries, TSS, table builder     |
//! | `serial`        | 16550 UART (i386 only)                         |

pub mod control_regs;
pub mod cpuid;
pub mod fpu;
pub mod frame;
pub mod segmentation;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86")] {
        pub mod serial;

        use crate::hardware::Hardware;
        use control_regs::Cr0;
        use cpuid::CpuFeatures;
        use fpu::{FpuContext, FpuSaveFormat};

        /// The physical processor
        #[derive(Debug, Clone, Copy, Default)]
        pub struct X86Cpu;

        impl Hardware for X86Cpu {
            fn mask_interrupts(&self) {
                control_regs::cli();
            }

            unsafe fn unmask_interrupts(&self) {
                unsafe { control_regs::sti() };
            }

            fn interrupts_enabled(&self) -> bool {
                control_regs::interrupts_enabled()
            }

            fn halt(&self) -> ! {
                control_regs::halt_forever()
            }

            fn fpu_present(&self) -> bool {
                fpu::fpu_available()
            }

            fn extended_fpu_save(&self) -> bool {
                CpuFeatures::read().has_fxsr()
            }

            unsafe fn arm_fpu_monitor(&self) {
                unsafe { Cr0::update(|cr0| cr0.insert(Cr0::FPU_MONITOR)) };
            }

            unsafe fn disarm_fpu_monitor(&self) {
                unsafe { core::arch::asm!("clts", options(nomem, nostack, preserves_flags)) };
            }

            unsafe fn reset_fpu(&self) {
                unsafe { fpu::fninit() };
            }

            unsafe fn save_fpu(&self, format: FpuSaveFormat, area: &mut FpuContext) {
                match format {
                    FpuSaveFormat::Extended => unsafe { fpu::fxsave(area) },
                    FpuSaveFormat::Legacy => unsafe { fpu::fnsave(area) },
                }
            }

            unsafe fn restore_fpu(&self, format: FpuSaveFormat, area: &FpuContext) {
                match format {
                    FpuSaveFormat::Extended => unsafe { fpu::fxrstor(area) },
                    FpuSaveFormat::Legacy => unsafe { fpu::frstor(area) },
                }
            }
        }
    }
}
