//! Construction pipeline for Cortex-M microcontroller targets.
//!
//! An [`Mcu`] is built from a model identifier (`"cortex-m4f"`, `"cortex-m3-r2p1"`, ...) and an
//! [`McuCapabilities`] template supplied by the board definition. Construction resolves the core
//! variant, creates the core, wires the NVIC to it, lays out flash/SRAM/bit-band/trampoline
//! memory, and stages the boot image. Vendor parts customize the memory map and image steps
//! through [`McuHooks`].
#![forbid(unsafe_code)]

pub mod capabilities;
pub mod clock;
pub mod config;
pub mod cpu;
mod error;
pub mod hooks;
pub mod image;
pub mod interrupts;
mod mcu;
pub mod memory_map;
pub mod trace;

pub use capabilities::{
    resolve, CoreCapabilities, CoreVariant, FpuKind, McuCapabilities, ResolvedCapabilities,
};
pub use clock::{CoreClock, DEFAULT_CORE_CLOCK_HZ};
pub use config::{LaunchMode, McuConfig};
pub use cpu::{CoreRegisters, CortexMCpu};
pub use error::McuError;
pub use hooks::{GenericCortexM, McuHooks};
pub use image::{load_image, ImageError, ImageFormat, ImageSegment, StagedImage};
pub use interrupts::{normalize_irq_count, DEFAULT_NUM_IRQ};
pub use mcu::{Mcu, McuLifecycle};
pub use memory_map::{MemoryLayout, MemoryMap};
pub use trace::Itm;
