//! Fixed Cortex-M system memory layout.
//!
//! Flash sits at address 0 and SRAM at `0x2000_0000`, followed directly by the 32 MiB SRAM
//! bit-band alias at `0x2200_0000`. SRAM is capped at 32 MiB so it can never run into the alias.
//! A 4 KiB RAM page is always present at `0xFFFF_F000`: returning from an exception makes the
//! core fetch from the `EXC_RETURN` magic address range, which must not land in unmapped space.

use cortexm_memory::{MapError, RegionDescriptor, SystemMemory};

use crate::capabilities::ResolvedCapabilities;

pub const FLASH_BASE: u64 = 0x0000_0000;
pub const SRAM_BASE: u64 = 0x2000_0000;
pub const BITBAND_OFFSET: u64 = 0x0200_0000;
pub const BITBAND_ALIAS_SIZE: u64 = 0x0200_0000;
pub const TRAMPOLINE_BASE: u64 = 0xFFFF_F000;
pub const TRAMPOLINE_SIZE: u64 = 0x1000;

/// 32 MiB; the SRAM bit-band alias starts right after.
pub const MAX_SRAM_SIZE_KB: u32 = 32 * 1024;

pub const FLASH_REGION: &str = "cortexm-mem-flash";
pub const SRAM_REGION: &str = "cortexm-mem-sram";
pub const BITBAND_REGION: &str = "cortexm-mem-sram-bitband";
pub const TRAMPOLINE_REGION: &str = "cortexm-mem-trampoline";

/// Base of the bit-band alias for the 32 MiB aligned window containing `address`.
pub fn bitband_alias_base(address: u64) -> u64 {
    (address & !(BITBAND_OFFSET - 1)) + BITBAND_OFFSET
}

/// Effective flash/SRAM sizes after applying overrides and caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    pub flash_size_kb: u32,
    pub sram_size_kb: u32,
}

impl MemoryLayout {
    /// Non-zero overrides win over the capability defaults; SRAM is then clamped to
    /// [`MAX_SRAM_SIZE_KB`].
    pub fn resolve(
        flash_override_kb: u32,
        sram_override_kb: u32,
        capabilities: &ResolvedCapabilities,
    ) -> Self {
        let flash_size_kb = match flash_override_kb {
            0 => capabilities.flash_size_kb,
            kb => kb,
        };
        let requested_sram_kb = match sram_override_kb {
            0 => capabilities.sram_size_kb,
            kb => kb,
        };
        let sram_size_kb = requested_sram_kb.min(MAX_SRAM_SIZE_KB);
        if sram_size_kb != requested_sram_kb {
            tracing::debug!(
                requested_kb = requested_sram_kb,
                clamped_kb = sram_size_kb,
                "clamped SRAM size below the bit-band alias"
            );
        }
        Self {
            flash_size_kb,
            sram_size_kb,
        }
    }

    pub fn flash_size_bytes(&self) -> u64 {
        u64::from(self.flash_size_kb) * 1024
    }

    pub fn sram_size_bytes(&self) -> u64 {
        u64::from(self.sram_size_kb) * 1024
    }
}

/// Regions installed by a memory-map build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMap {
    pub flash: RegionDescriptor,
    pub sram: RegionDescriptor,
    pub bitband: Option<RegionDescriptor>,
    pub trampoline: RegionDescriptor,
    /// Additional vendor specific regions (CCM RAM, backup SRAM, ...).
    pub extra: Vec<RegionDescriptor>,
}

impl MemoryMap {
    /// All regions in registration order.
    pub fn regions(&self) -> impl Iterator<Item = &RegionDescriptor> {
        [Some(&self.flash), Some(&self.sram), self.bitband.as_ref(), Some(&self.trampoline)]
            .into_iter()
            .flatten()
            .chain(self.extra.iter())
    }
}

/// Map flash, SRAM with its bit-band alias, and the trampoline page, in that order.
pub fn build_default_memory_map(
    layout: &MemoryLayout,
    memory: &mut SystemMemory,
) -> Result<MemoryMap, MapError> {
    let flash = memory.map_rom(FLASH_REGION, FLASH_BASE, layout.flash_size_bytes())?;
    let sram = memory.map_ram(SRAM_REGION, SRAM_BASE, layout.sram_size_bytes())?;
    let bitband = memory.map_bitband(
        BITBAND_REGION,
        bitband_alias_base(SRAM_BASE),
        BITBAND_ALIAS_SIZE,
        SRAM_BASE & !(BITBAND_OFFSET - 1),
    )?;
    let trampoline = memory.map_ram(TRAMPOLINE_REGION, TRAMPOLINE_BASE, TRAMPOLINE_SIZE)?;

    Ok(MemoryMap {
        flash,
        sram,
        bitband: Some(bitband),
        trampoline,
        extra: Vec::new(),
    })
}
