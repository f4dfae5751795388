//! Minimal Cortex-M core state: identification, the register file touched by reset, and the IRQ
//! input the NVIC drives. Instruction execution lives elsewhere.

use cortexm_interrupts::LevelIrqLine;
use cortexm_memory::MemoryBus;

use crate::capabilities::{CoreVariant, ModelIdentifier};
use crate::McuError;

/// Only ARM-designed cores are modelled.
pub const CPU_FAMILY: &str = "cortex";

const MIDR_VARIANT_SHIFT: u32 = 20;
const MIDR_REVISION_MASK: u32 = 0xF;
const MIDR_VARIANT_MASK: u32 = 0xF << MIDR_VARIANT_SHIFT;

/// Execution state bit of xPSR.
pub const XPSR_T: u32 = 1 << 24;

/// Reset value of the vector table offset register.
pub const VTOR_RESET: u32 = 0;

/// Identification register value of the default revision of each core.
fn default_midr(variant: CoreVariant) -> u32 {
    match variant {
        CoreVariant::M0 => 0x410C_C200,
        CoreVariant::M0Plus => 0x410C_C601,
        CoreVariant::M1 => 0x411C_C210,
        CoreVariant::M3 => 0x412F_C231,
        CoreVariant::M4 | CoreVariant::M4F => 0x410F_C241,
        CoreVariant::M7 | CoreVariant::M7F => 0x411F_C270,
    }
}

/// Parses an `rNpM` revision token into `(major, minor)` nibbles.
fn parse_revision(token: &str) -> Option<(u32, u32)> {
    let (major, minor) = token.strip_prefix('r')?.split_once('p')?;
    let major: u32 = major.parse().ok()?;
    let minor: u32 = minor.parse().ok()?;
    (major <= 0xF && minor <= 0xF).then_some((major, minor))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreRegisters {
    /// R0-R12.
    pub r: [u32; 13],
    pub msp: u32,
    pub psp: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
    pub primask: u32,
    pub control: u32,
}

#[derive(Debug, Clone)]
pub struct CortexMCpu {
    model: String,
    variant: CoreVariant,
    midr: u32,
    vtor: u32,
    regs: CoreRegisters,
    irq: LevelIrqLine,
}

impl CortexMCpu {
    /// Look up the CPU definition for `model` (`cortex-<variant>[-rNpM]`).
    pub fn new(model: &str) -> Result<Self, McuError> {
        let not_found = || McuError::CpuModelNotFound {
            model: model.to_string(),
        };
        let id = ModelIdentifier::parse(model);
        if id.family != CPU_FAMILY {
            return Err(not_found());
        }
        let variant = id
            .variant
            .and_then(CoreVariant::from_token)
            .ok_or_else(not_found)?;

        let mut midr = default_midr(variant);
        if let Some(token) = id.revision {
            let (major, minor) = parse_revision(token).ok_or_else(not_found)?;
            midr &= !(MIDR_VARIANT_MASK | MIDR_REVISION_MASK);
            midr |= (major << MIDR_VARIANT_SHIFT) | minor;
        }

        Ok(Self {
            model: model.to_string(),
            variant,
            midr,
            vtor: VTOR_RESET,
            regs: CoreRegisters::default(),
            irq: LevelIrqLine::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn variant(&self) -> CoreVariant {
        self.variant
    }

    pub fn midr(&self) -> u32 {
        self.midr
    }

    pub fn regs(&self) -> &CoreRegisters {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut CoreRegisters {
        &mut self.regs
    }

    /// Handle to the core's IRQ input; the interrupt controller output is connected here.
    pub fn irq_input(&self) -> LevelIrqLine {
        self.irq.clone()
    }

    pub fn irq_asserted(&self) -> bool {
        self.irq.level()
    }

    /// Architectural reset: clear the register file and fetch the initial main stack pointer and
    /// reset vector from the vector table.
    pub fn reset(&mut self, bus: &mut dyn MemoryBus) {
        self.vtor = VTOR_RESET;
        let table = u64::from(self.vtor);
        let msp = bus.read_u32(table);
        let reset_vector = bus.read_u32(table + 4);

        self.regs = CoreRegisters {
            msp: msp & !0x3,
            lr: 0xFFFF_FFFF,
            pc: reset_vector & !1,
            xpsr: if reset_vector & 1 != 0 { XPSR_T } else { 0 },
            ..CoreRegisters::default()
        };
        tracing::debug!(
            msp = format_args!("{:#010x}", self.regs.msp),
            pc = format_args!("{:#010x}", self.regs.pc),
            "cpu reset"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortexm_memory::SystemMemory;

    #[test]
    fn revision_token_overrides_midr_nibbles() {
        let cpu = CortexMCpu::new("cortex-m3-r1p2").unwrap();
        assert_eq!(cpu.midr(), 0x411F_C232);
        assert_eq!(CortexMCpu::new("cortex-m4f").unwrap().midr(), 0x410F_C241);
    }

    #[test]
    fn unknown_definitions_are_not_found() {
        for model in ["arm-m3", "cortex-m3-rXp1", "cortex-m3-r16p0", "cortex-m3-2p1", "cortex-m9"] {
            assert!(
                matches!(CortexMCpu::new(model), Err(McuError::CpuModelNotFound { .. })),
                "{model}"
            );
        }
    }

    #[test]
    fn reset_fetches_stack_pointer_and_thumb_entry() {
        let mut mem = SystemMemory::new();
        mem.map_ram("vectors", 0, 0x100).unwrap();
        mem.write_u32(0, 0x2000_5003);
        mem.write_u32(4, 0x0000_0141);

        let mut cpu = CortexMCpu::new("cortex-m0").unwrap();
        cpu.regs_mut().r[4] = 0x1234;
        cpu.reset(&mut mem);

        let regs = cpu.regs();
        assert_eq!(regs.msp, 0x2000_5000);
        assert_eq!(regs.pc, 0x0000_0140);
        assert_eq!(regs.xpsr, XPSR_T);
        assert_eq!(regs.r[4], 0);
    }
}
