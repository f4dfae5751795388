//! Guest physical memory for Cortex-M MCU targets.
//!
//! [`SystemMemory`] is the 32-bit system address space that the MCU construction pipeline maps
//! flash, SRAM, the SRAM bit-band alias, and the exception-return trampoline page into. Region
//! contents are held in [`GuestMemory`] backends; bus masters go through [`MemoryBus`].
#![forbid(unsafe_code)]

mod bus;
mod phys;
mod system;

pub use bus::MemoryBus;
pub use phys::{DenseMemory, GuestMemory, GuestMemoryError, GuestMemoryResult};
pub use system::{
    MapError, RegionDescriptor, RegionKind, SystemMemory, ADDRESS_SPACE_SIZE,
    BITBAND_BYTES_PER_BIT,
};
