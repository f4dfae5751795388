use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::irq::IrqLine;

/// Architectural upper bound on external interrupt lines (ARMv7-M).
pub const NVIC_MAX_IRQ: u32 = 496;

/// External interrupts are grouped in banks of 32 (one ISER/ICER/ISPR/ICPR word each).
pub const NVIC_IRQ_BANK: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NvicError {
    #[error("NVIC interrupt count {0} must be a non-zero multiple of 32 no larger than {max}", max = NVIC_MAX_IRQ)]
    InvalidIrqCount(u32),
}

/// Nested Vectored Interrupt Controller: enable/pending bookkeeping plus the single output line
/// towards the CPU core.
///
/// Priority arbitration and exception entry belong to the CPU model; this device only decides
/// whether *some* enabled interrupt is pending and drives its output accordingly.
pub struct Nvic {
    num_irq: u32,
    enabled: Vec<u32>,
    pending: Vec<u32>,
    levels: Vec<u32>,
    output: Option<Box<dyn IrqLine>>,
    output_level: bool,
    realized: bool,
}

pub type SharedNvic = Rc<RefCell<Nvic>>;

impl fmt::Debug for Nvic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nvic")
            .field("num_irq", &self.num_irq)
            .field("output_connected", &self.output.is_some())
            .field("output_level", &self.output_level)
            .field("realized", &self.realized)
            .finish()
    }
}

impl Nvic {
    pub fn new(num_irq: u32) -> Result<Self, NvicError> {
        if num_irq == 0 || num_irq % NVIC_IRQ_BANK != 0 || num_irq > NVIC_MAX_IRQ {
            return Err(NvicError::InvalidIrqCount(num_irq));
        }
        let banks = (num_irq / NVIC_IRQ_BANK) as usize;
        Ok(Self {
            num_irq,
            enabled: vec![0; banks],
            pending: vec![0; banks],
            levels: vec![0; banks],
            output: None,
            output_level: false,
            realized: false,
        })
    }

    pub fn into_shared(self) -> SharedNvic {
        Rc::new(RefCell::new(self))
    }

    pub fn num_irq(&self) -> u32 {
        self.num_irq
    }

    /// Connect the controller output (the CPU's IRQ input). Replaces any previous connection.
    pub fn connect_output(&mut self, line: Box<dyn IrqLine>) {
        line.set_level(self.output_level);
        self.output = Some(line);
    }

    pub fn is_output_connected(&self) -> bool {
        self.output.is_some()
    }

    pub fn output_level(&self) -> bool {
        self.output_level
    }

    pub fn realize(&mut self) {
        self.realized = true;
    }

    pub fn is_realized(&self) -> bool {
        self.realized
    }

    fn slot(&self, irq: u32) -> Option<(usize, u32)> {
        (irq < self.num_irq).then(|| ((irq / NVIC_IRQ_BANK) as usize, 1 << (irq % NVIC_IRQ_BANK)))
    }

    /// Drive input line `irq`. A rising level latches the interrupt as pending.
    pub fn set_irq_level(&mut self, irq: u32, level: bool) {
        let Some((bank, bit)) = self.slot(irq) else {
            tracing::warn!(irq, num_irq = self.num_irq, "ignoring out-of-range NVIC input");
            return;
        };
        let was_high = self.levels[bank] & bit != 0;
        if level {
            self.levels[bank] |= bit;
            if !was_high {
                self.pending[bank] |= bit;
            }
        } else {
            self.levels[bank] &= !bit;
        }
        self.update_output();
    }

    pub fn set_enabled(&mut self, irq: u32, enabled: bool) {
        if let Some((bank, bit)) = self.slot(irq) {
            if enabled {
                self.enabled[bank] |= bit;
            } else {
                self.enabled[bank] &= !bit;
            }
            self.update_output();
        }
    }

    pub fn is_enabled(&self, irq: u32) -> bool {
        self.slot(irq)
            .is_some_and(|(bank, bit)| self.enabled[bank] & bit != 0)
    }

    pub fn is_pending(&self, irq: u32) -> bool {
        self.slot(irq)
            .is_some_and(|(bank, bit)| self.pending[bank] & bit != 0)
    }

    /// Clear a pending interrupt; an input still held high re-pends immediately.
    pub fn clear_pending(&mut self, irq: u32) {
        if let Some((bank, bit)) = self.slot(irq) {
            self.pending[bank] &= !bit;
            self.pending[bank] |= self.levels[bank] & bit;
            self.update_output();
        }
    }

    /// Lowest-numbered interrupt that is both enabled and pending.
    pub fn next_pending(&self) -> Option<u32> {
        self.pending
            .iter()
            .zip(&self.enabled)
            .enumerate()
            .find_map(|(bank, (p, e))| {
                let active = p & e;
                (active != 0).then(|| bank as u32 * NVIC_IRQ_BANK + active.trailing_zeros())
            })
    }

    /// Disable every interrupt and drop latched requests. Input levels belong to the peripherals
    /// driving them, so a line still held high stays pending.
    pub fn reset(&mut self) {
        self.enabled.fill(0);
        self.pending.copy_from_slice(&self.levels);
        self.update_output();
    }

    fn update_output(&mut self) {
        let level = self.next_pending().is_some();
        if level != self.output_level {
            self.output_level = level;
            if let Some(output) = &self.output {
                output.set_level(level);
            }
        }
    }
}

/// Handle to one NVIC input line, handed to peripheral models so they can raise interrupts.
#[derive(Clone)]
pub struct NvicIrqInput {
    nvic: SharedNvic,
    irq: u32,
}

impl NvicIrqInput {
    pub fn irq(&self) -> u32 {
        self.irq
    }
}

impl fmt::Debug for NvicIrqInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NvicIrqInput").field("irq", &self.irq).finish()
    }
}

impl IrqLine for NvicIrqInput {
    fn set_level(&self, level: bool) {
        self.nvic.borrow_mut().set_irq_level(self.irq, level);
    }
}

/// Allocate one input handle per interrupt line, indexed by interrupt number.
pub fn irq_inputs(nvic: &SharedNvic) -> Vec<NvicIrqInput> {
    let num_irq = nvic.borrow().num_irq();
    (0..num_irq)
        .map(|irq| NvicIrqInput {
            nvic: Rc::clone(nvic),
            irq,
        })
        .collect()
}
