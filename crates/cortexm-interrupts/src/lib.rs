//! Interrupt plumbing for Cortex-M MCU targets.
//!
//! Devices signal interrupts through [`IrqLine`] handles. The [`Nvic`] latches rising inputs as
//! pending, tracks which interrupts firmware has enabled, and drives its single output line
//! (normally the core's [`LevelIrqLine`]) high while any enabled interrupt is pending.
//! [`irq_inputs`] hands out one [`NvicIrqInput`] per external interrupt for peripheral models.
#![forbid(unsafe_code)]

mod irq;
pub mod nvic;

pub use irq::{IrqLine, LevelIrqLine};
pub use nvic::{irq_inputs, Nvic, NvicError, NvicIrqInput, SharedNvic, NVIC_IRQ_BANK, NVIC_MAX_IRQ};
