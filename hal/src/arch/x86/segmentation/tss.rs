//! # Task State Segment
//!
//! The kernel uses a single 32-bit TSS, only for the ring 3 → ring 0 stack
//! switch. Hardware task switching is never used.
//!
//! ```text
//! Offset  Field
//! ──────────────────────────
//! 0x00    previous task link
//! 0x04    ESP0
//! 0x08    SS0
//! 0x0C    ESP1 / SS1
//! 0x14    ESP2 / SS2
//! 0x1C    CR3
//! 0x20    EIP, EFLAGS, general registers
//! 0x48    segment registers
//! 0x60    LDT selector
//! 0x64    trap flag / I/O map base
//! ```

use spin::Mutex;

use super::selectors::{SegmentSelector, KERNEL_DS};

/// Size of the TSS without an I/O permission bitmap
pub const TSS_SIZE: usize = 104;

/// 32-bit task state segment
#[allow(missing_docs)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStateSegment {
    pub previous_task: u32,
    pub esp0: u32,
    pub ss0: u32,
    pub esp1: u32,
    pub ss1: u32,
    pub esp2: u32,
    pub ss2: u32,
    pub cr3: u32,
    pub eip: u32,
    pub eflags: u32,
    pub eax: u32,
    pub ecx: u32,
    pub edx: u32,
    pub ebx: u32,
    pub esp: u32,
    pub ebp: u32,
    pub esi: u32,
    pub edi: u32,
    pub es: u32,
    pub cs: u32,
    pub ss: u32,
    pub ds: u32,
    pub fs: u32,
    pub gs: u32,
    pub ldt: u32,
    pub trap: u16,
    pub io_map_base: u16,
}

impl TaskStateSegment {
    /// An empty TSS with no I/O bitmap
    pub const fn new() -> Self {
        Self {
            previous_task: 0,
            esp0: 0,
            ss0: 0,
            esp1: 0,
            ss1: 0,
            esp2: 0,
            ss2: 0,
            cr3: 0,
            eip: 0,
            eflags: 0,
            eax: 0,
            ecx: 0,
            edx: 0,
            ebx: 0,
            esp: 0,
            ebp: 0,
            esi: 0,
            edi: 0,
            es: 0,
            cs: 0,
            ss: 0,
            ds: 0,
            fs: 0,
            gs: 0,
            ldt: 0,
            trap: 0,
            io_map_base: TSS_SIZE as u16,
        }
    }

    /// Set the stack used when an interrupt arrives from ring 3
    pub fn set_kernel_stack(&mut self, stack_top: u32) {
        self.set_kernel_stack_with_segment(stack_top, KERNEL_DS);
    }

    /// Set the ring 0 stack and its segment
    pub fn set_kernel_stack_with_segment(&mut self, stack_top: u32, segment: SegmentSelector) {
        self.esp0 = stack_top;
        self.ss0 = segment.raw() as u32;
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<TaskStateSegment>(), TSS_SIZE);

static TASK_STATE_SEGMENT: Mutex<TaskStateSegment> = Mutex::new(TaskStateSegment::new());

/// The kernel's task state segment
pub fn task_state_segment() -> &'static Mutex<TaskStateSegment> {
    &TASK_STATE_SEGMENT
}

/// Linear address of the kernel's task state segment
pub fn task_state_segment_address() -> usize {
    let tss = TASK_STATE_SEGMENT.lock();
    &*tss as *const TaskStateSegment as usize
}
