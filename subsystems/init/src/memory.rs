//! # Boot Memory
//!
//! Sizing physical memory from the boot loader's map and locating the
//! block the boot stub reserved for the bootstrap heap.

use core::ops::Range;

use ember_core::{ErrorKind, KernelResult};
use ember_multiboot::{BlockKind, BlockMapEntry, MemoryMapEntry};

/// End address of the highest-ending available region
///
/// Fails with `IllegalState` if no region is available.
pub fn physical_memory_size(memory_map: &[MemoryMapEntry]) -> KernelResult<u64> {
    match memory_map
        .iter()
        .filter(|entry| entry.is_available())
        .map(MemoryMapEntry::end)
        .max()
    {
        Some(end) => Ok(end),
        None => ember_core::kernel_bail!(
            ErrorKind::IllegalState,
            "no usable memory found",
            "{} memory map entries, none available",
            memory_map.len()
        ),
    }
}

/// Last byte address the 32-bit frame allocator manages for `size` bytes
pub fn last_frame_address(size: u64) -> u32 {
    size.clamp(1, 1 << 32).wrapping_sub(1) as u32
}

/// Virtual range of the bootstrap heap
///
/// The heap starts at the first block the boot stub reserved for it and
/// extends up to `heap_end`.
pub fn find_heap_block(block_map: &[BlockMapEntry], heap_end: u32) -> KernelResult<Range<u32>> {
    let Some(block) = block_map
        .iter()
        .take_while(|entry| !entry.is_terminator())
        .find(|entry| entry.kind() == Some(BlockKind::HeapReserved))
    else {
        ember_core::kernel_bail!(
            ErrorKind::IllegalState,
            "no 4 MiB block available for bootstrapping the kernel heap"
        );
    };

    ember_core::kernel_ensure!(
        block.virtual_start_address < heap_end,
        ErrorKind::IllegalState,
        "reserved heap block lies beyond the heap end",
        "block at {:#010x}, heap end {:#010x}",
        block.virtual_start_address,
        heap_end
    );

    Ok(block.virtual_start_address..heap_end)
}
