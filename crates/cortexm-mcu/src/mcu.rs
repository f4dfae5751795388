use std::path::{Path, PathBuf};

use cortexm_interrupts::{NvicIrqInput, SharedNvic};
use cortexm_memory::SystemMemory;

use crate::capabilities::{self, McuCapabilities, ResolvedCapabilities};
use crate::clock::CoreClock;
use crate::config::McuConfig;
use crate::cpu::CortexMCpu;
use crate::hooks::{GenericCortexM, McuHooks};
use crate::image::StagedImage;
use crate::interrupts::construct_interrupt_controller;
use crate::memory_map::{MemoryLayout, MemoryMap};
use crate::trace::Itm;
use crate::McuError;

/// Placeholder model used in diagnostics when neither the configuration nor the template names
/// a core.
const UNKNOWN_MODEL: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McuLifecycle {
    /// Every component exists and is wired, but nothing has been realized.
    Constructed,
    /// Child devices are realized; the device may be reset.
    Realized,
    /// At least one reset completed; the core holds its reset register state.
    Running,
}

/// A Cortex-M microcontroller: core, NVIC, memory map and boot image.
///
/// Construction runs the whole pipeline in a fixed order (capabilities, CPU, interrupt
/// controller, memory map, image). The image is only staged at that point; it is written into
/// memory by [`Mcu::reset`], right before the core fetches its initial stack pointer and entry
/// point.
#[derive(Debug)]
pub struct Mcu {
    capabilities: ResolvedCapabilities,
    cpu_model: String,
    display_model: String,
    cpu: CortexMCpu,
    nvic: SharedNvic,
    irqs: Vec<NvicIrqInput>,
    itm: Option<Itm>,
    layout: MemoryLayout,
    memory: SystemMemory,
    memory_map: MemoryMap,
    image_path: Option<PathBuf>,
    image: Option<StagedImage>,
    clock: CoreClock,
    state: McuLifecycle,
}

impl Mcu {
    /// Build a generic Cortex-M device from `template`.
    pub fn new(cfg: McuConfig, template: &McuCapabilities) -> Result<Self, McuError> {
        Self::with_hooks(cfg, template, &GenericCortexM)
    }

    /// Build a device whose memory map and image loading steps come from `hooks`.
    pub fn with_hooks(
        cfg: McuConfig,
        template: &McuCapabilities,
        hooks: &dyn McuHooks,
    ) -> Result<Self, McuError> {
        let cpu_model = cfg
            .cpu_model
            .clone()
            .or_else(|| template.core.as_ref().and_then(|core| core.cpu_model.clone()))
            .unwrap_or_else(|| UNKNOWN_MODEL.to_string());

        let capabilities = capabilities::resolve(&cpu_model, template)?;
        let cpu = CortexMCpu::new(&cpu_model)?;
        let display_model = capabilities.display_model(cpu.midr());

        let wiring = construct_interrupt_controller(&capabilities, &cpu)?;

        let layout = MemoryLayout::resolve(cfg.flash_size_kb, cfg.sram_size_kb, &capabilities);
        let mut memory = SystemMemory::new();
        let memory_map = hooks.build_memory_map(&layout, &mut memory)?;

        let image_path = cfg.image_path().map(Path::to_path_buf);
        if image_path.is_none() && cfg.launch_mode.requires_image() {
            return Err(McuError::MissingImage);
        }

        tracing::info!(
            "Device: '{}' ({}{}{}), Flash: {} KB, RAM: {} KB.",
            capabilities.name,
            display_model,
            if capabilities.has_mpu { ", MPU" } else { "" },
            if capabilities.has_fpu { ", FPU" } else { "" },
            layout.flash_size_kb,
            layout.sram_size_kb,
        );

        let image = match &image_path {
            Some(path) => {
                tracing::info!("Image: '{}'.", path.display());
                let staged = hooks.load_image(path, layout.flash_size_bytes())?;
                tracing::debug!(
                    format = %staged.format,
                    entry = format_args!("{:#010x}", staged.entry),
                    size = staged.size,
                    "image staged"
                );
                Some(staged)
            }
            None => None,
        };

        Ok(Self {
            capabilities,
            cpu_model,
            display_model,
            cpu,
            nvic: wiring.nvic,
            irqs: wiring.irqs,
            itm: wiring.itm,
            layout,
            memory,
            memory_map,
            image_path,
            image,
            clock: CoreClock::default(),
            state: McuLifecycle::Constructed,
        })
    }

    /// Realize the NVIC and, when present, the ITM.
    pub fn realize(&mut self) {
        if self.state != McuLifecycle::Constructed {
            return;
        }
        self.nvic.borrow_mut().realize();
        if let Some(itm) = &mut self.itm {
            itm.realize();
        }
        self.state = McuLifecycle::Realized;
        tracing::info!("{} core initialised.", self.display_model);
    }

    /// Copy the staged image into memory and reset the core from the vector table.
    ///
    /// Repeated resets leave memory and registers in the same state.
    pub fn reset(&mut self) -> Result<(), McuError> {
        if self.state == McuLifecycle::Constructed {
            return Err(McuError::NotRealized);
        }
        tracing::info!("{} core reset.", self.display_model);

        self.nvic.borrow_mut().reset();
        if let Some(image) = &self.image {
            let stored = image.apply(&mut self.memory);
            if (stored as u64) < image.size {
                tracing::warn!(
                    stored,
                    size = image.size,
                    "image bytes outside mapped memory were dropped"
                );
            }
        }
        self.cpu.reset(&mut self.memory);
        self.state = McuLifecycle::Running;
        Ok(())
    }

    pub fn state(&self) -> McuLifecycle {
        self.state
    }

    pub fn capabilities(&self) -> &ResolvedCapabilities {
        &self.capabilities
    }

    pub fn cpu_model(&self) -> &str {
        &self.cpu_model
    }

    /// Core name with revision, e.g. `"Cortex-M3 r2p1"`.
    pub fn display_model(&self) -> &str {
        &self.display_model
    }

    pub fn cpu(&self) -> &CortexMCpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CortexMCpu {
        &mut self.cpu
    }

    pub fn nvic(&self) -> &SharedNvic {
        &self.nvic
    }

    /// Interrupt input lines, indexed by external interrupt number.
    pub fn irqs(&self) -> &[NvicIrqInput] {
        &self.irqs
    }

    pub fn irq(&self, n: u32) -> Option<&NvicIrqInput> {
        self.irqs.get(n as usize)
    }

    pub fn itm(&self) -> Option<&Itm> {
        self.itm.as_ref()
    }

    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    pub fn memory_map(&self) -> &MemoryMap {
        &self.memory_map
    }

    pub fn memory(&self) -> &SystemMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut SystemMemory {
        &mut self.memory
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn image(&self) -> Option<&StagedImage> {
        self.image.as_ref()
    }

    pub fn core_clock(&self) -> CoreClock {
        self.clock
    }

    /// Nanoseconds per core clock tick.
    pub fn clock_scale_ns(&self) -> u64 {
        self.clock.scale_ns()
    }

    /// Called by vendor clock controllers when firmware reprograms the core clock.
    pub fn set_core_clock_hz(&mut self, hz: u64) {
        self.clock = CoreClock::new(hz);
        tracing::debug!(
            hz = self.clock.hz(),
            scale_ns = self.clock.scale_ns(),
            "core clock changed"
        );
    }
}
