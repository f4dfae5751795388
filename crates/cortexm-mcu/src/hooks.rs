use std::path::Path;

use cortexm_memory::{MapError, SystemMemory};

use crate::image::{self, ImageError, StagedImage};
use crate::memory_map::{self, MemoryLayout, MemoryMap};

/// Construction steps a vendor MCU may replace.
///
/// Both methods have the generic Cortex-M behaviour as their default, so an implementation only
/// overrides what its part does differently (extra SRAM banks, a boot ROM, a different loader).
pub trait McuHooks {
    /// Install the device's memory regions into `memory`.
    fn build_memory_map(
        &self,
        layout: &MemoryLayout,
        memory: &mut SystemMemory,
    ) -> Result<MemoryMap, MapError> {
        memory_map::build_default_memory_map(layout, memory)
    }

    /// Stage the boot image found at `path`. `flash_size` bounds raw images.
    fn load_image(&self, path: &Path, flash_size: u64) -> Result<StagedImage, ImageError> {
        image::load_image(path, flash_size)
    }
}

/// A plain Cortex-M part with no vendor specific construction steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericCortexM;

impl McuHooks for GenericCortexM {}
