//! # Raw Multiboot Information
//!
//! The structure GRUB leaves in EBX, and a borrowed view over everything it
//! points to.
//!
//! ```text
//! Offset  Field              Valid if
//! ──────────────────────────────────────────
//! 0       flags              -
//! 4       mem_lower          MEMORY
//! 8       mem_upper          MEMORY
//! 12      boot_device        BOOT_DEVICE
//! 16      cmdline            CMDLINE
//! 20      mods_count         MODULES
//! 24      mods_addr          MODULES
//! 28      syms[4]            AOUT_SYMS | ELF_SECTIONS
//! 44      mmap_length        MEMORY_MAP
//! 48      mmap_addr          MEMORY_MAP
//! 52      drives_length      DRIVES
//! 56      drives_addr        DRIVES
//! 60      config_table       CONFIG_TABLE
//! 64      boot_loader_name   BOOT_LOADER_NAME
//! 68      apm_table          APM_TABLE
//! ```

use arrayvec::ArrayVec;

use crate::memory::BlockMapEntry;

/// Magic value in EAX when a Multiboot loader started the kernel
pub const BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

/// Maximum number of boot modules kept
pub const MAX_MODULES: usize = 16;

bitflags::bitflags! {
    /// Validity flags of [`RawMultibootInfo`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InfoFlags: u32 {
        /// `mem_lower` / `mem_upper`
        const MEMORY = 1 << 0;
        /// `boot_device`
        const BOOT_DEVICE = 1 << 1;
        /// `cmdline`
        const CMDLINE = 1 << 2;
        /// `mods_*`
        const MODULES = 1 << 3;
        /// a.out symbol table
        const AOUT_SYMS = 1 << 4;
        /// ELF section headers
        const ELF_SECTIONS = 1 << 5;
        /// `mmap_*`
        const MEMORY_MAP = 1 << 6;
        /// `drives_*`
        const DRIVES = 1 << 7;
        /// `config_table`
        const CONFIG_TABLE = 1 << 8;
        /// `boot_loader_name`
        const BOOT_LOADER_NAME = 1 << 9;
        /// `apm_table`
        const APM_TABLE = 1 << 10;
        /// VBE information
        const VBE = 1 << 11;
        /// Framebuffer information
        const FRAMEBUFFER = 1 << 12;
    }
}

/// Multiboot information structure
#[allow(missing_docs)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMultibootInfo {
    pub flags: u32,
    pub mem_lower: u32,
    pub mem_upper: u32,
    pub boot_device: u32,
    pub cmdline: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    pub syms: [u32; 4],
    pub mmap_length: u32,
    pub mmap_addr: u32,
    pub drives_length: u32,
    pub drives_addr: u32,
    pub config_table: u32,
    pub boot_loader_name: u32,
    pub apm_table: u32,
}

impl RawMultibootInfo {
    /// Decoded validity flags
    pub const fn flags(&self) -> InfoFlags {
        InfoFlags::from_bits_retain(self.flags)
    }
}

/// Module descriptor in the `mods_addr` array
#[allow(missing_docs)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawModule {
    pub start: u32,
    pub end: u32,
    pub string: u32,
    pub reserved: u32,
}

/// A boot module with its name resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSource<'a> {
    /// Physical start
    pub start: u32,
    /// Physical end (exclusive)
    pub end: u32,
    /// Raw name bytes, without the terminating NUL
    pub name: &'a [u8],
}

/// Borrowed view of everything the boot loader and boot stub handed over
#[derive(Debug, Clone, Default)]
pub struct BootInfoSource<'a> {
    /// The information structure itself
    pub info: RawMultibootInfo,
    /// `mmap_length` bytes of memory map records
    pub memory_map: &'a [u8],
    /// Boot stub block map, without its terminator
    pub block_map: &'a [BlockMapEntry],
    /// Command line bytes, without the terminating NUL
    pub command_line: Option<&'a [u8]>,
    /// Boot loader name bytes, without the terminating NUL
    pub boot_loader_name: Option<&'a [u8]>,
    /// Boot modules
    pub modules: ArrayVec<ModuleSource<'a>, MAX_MODULES>,
}

/// Length of a NUL-terminated string
///
/// # Safety
/// `ptr` must point to a readable NUL-terminated byte string.
unsafe fn c_str<'a>(ptr: *const u8) -> &'a [u8] {
    let mut length = 0;
    while unsafe { ptr.add(length).read() } != 0 {
        length += 1;
    }
    unsafe { core::slice::from_raw_parts(ptr, length) }
}

impl<'a> BootInfoSource<'a> {
    /// Build the view from the pointers handed over at kernel entry
    ///
    /// Physical addresses inside the structure are translated by adding
    /// `virtual_offset`.
    ///
    /// # Safety
    /// - `info` must point to a valid Multiboot information structure.
    /// - `block_map` must point to a table terminated by a zero `block_count`.
    /// - Every region the structure references must be mapped at
    ///   `physical + virtual_offset` for `'a`.
    pub unsafe fn from_raw(
        info: *const RawMultibootInfo,
        block_map: *const BlockMapEntry,
        virtual_offset: u32,
    ) -> Self {
        let info = unsafe { info.read() };
        unsafe {
            Self::from_info(info, block_map, |physical| {
                physical.wrapping_add(virtual_offset) as usize as *const u8
            })
        }
    }

    /// Build the view with an explicit address translation
    ///
    /// # Safety
    /// `translate` must turn every address the structure references into a
    /// pointer readable for `'a`; `block_map` as for [`BootInfoSource::from_raw`].
    pub unsafe fn from_info(
        info: RawMultibootInfo,
        block_map: *const BlockMapEntry,
        translate: impl Fn(u32) -> *const u8,
    ) -> Self {
        let flags = info.flags();

        let memory_map: &'a [u8] = if flags.contains(InfoFlags::MEMORY_MAP) {
            let start = translate(info.mmap_addr);
            unsafe { core::slice::from_raw_parts(start, info.mmap_length as usize) }
        } else {
            &[]
        };

        let mut block_count = 0;
        while !unsafe { block_map.add(block_count).read() }.is_terminator() {
            block_count += 1;
        }
        let block_map = unsafe { core::slice::from_raw_parts(block_map, block_count) };

        let command_line = if flags.contains(InfoFlags::CMDLINE) && info.cmdline != 0 {
            Some(unsafe { c_str(translate(info.cmdline)) })
        } else {
            None
        };

        let boot_loader_name =
            if flags.contains(InfoFlags::BOOT_LOADER_NAME) && info.boot_loader_name != 0 {
                Some(unsafe { c_str(translate(info.boot_loader_name)) })
            } else {
                None
            };

        let mut modules = ArrayVec::new();
        if flags.contains(InfoFlags::MODULES) {
            let raw = translate(info.mods_addr).cast::<RawModule>();
            let count = (info.mods_count as usize).min(MAX_MODULES);
            if count < info.mods_count as usize {
                log::warn!("Multiboot: keeping {} of {} modules", count, info.mods_count);
            }
            for index in 0..count {
                let module = unsafe { raw.add(index).read_unaligned() };
                let name: &'a [u8] = if module.string != 0 {
                    unsafe { c_str(translate(module.string)) }
                } else {
                    &[]
                };
                modules.push(ModuleSource {
                    start: module.start,
                    end: module.end,
                    name,
                });
            }
        }

        Self {
            info,
            memory_map,
            block_map,
            command_line,
            boot_loader_name,
            modules,
        }
    }
}
