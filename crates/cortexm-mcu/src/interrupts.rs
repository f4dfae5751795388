//! NVIC construction and wiring.

use cortexm_interrupts::{irq_inputs, Nvic, NvicIrqInput, SharedNvic, NVIC_IRQ_BANK};

use crate::capabilities::ResolvedCapabilities;
use crate::cpu::CortexMCpu;
use crate::trace::Itm;
use crate::McuError;

/// Interrupt count used when the part does not specify one.
pub const DEFAULT_NUM_IRQ: u32 = 256;

/// Round `requested` (0 = [`DEFAULT_NUM_IRQ`]) up to a whole NVIC bank, then cap it at the largest
/// whole bank that fits under `ceiling`.
pub fn normalize_irq_count(requested: u32, ceiling: u32) -> u32 {
    let requested = match requested {
        0 => DEFAULT_NUM_IRQ,
        n => n,
    };
    let rounded = requested.div_ceil(NVIC_IRQ_BANK).saturating_mul(NVIC_IRQ_BANK);
    rounded.min(ceiling - ceiling % NVIC_IRQ_BANK)
}

/// Interrupt plumbing produced for one device.
#[derive(Debug)]
pub struct InterruptWiring {
    pub nvic: SharedNvic,
    /// Input line `n` is external interrupt `n`.
    pub irqs: Vec<NvicIrqInput>,
    pub itm: Option<Itm>,
}

/// Build the NVIC for `capabilities`, drive `cpu`'s IRQ input from it, and hand out one input
/// line per external interrupt.
pub fn construct_interrupt_controller(
    capabilities: &ResolvedCapabilities,
    cpu: &CortexMCpu,
) -> Result<InterruptWiring, McuError> {
    let num_irq = normalize_irq_count(capabilities.core.num_irq, capabilities.max_irq);
    if num_irq != capabilities.core.num_irq {
        tracing::debug!(
            requested = capabilities.core.num_irq,
            num_irq,
            max = capabilities.max_irq,
            "normalized NVIC interrupt count"
        );
    }

    let mut nvic = Nvic::new(num_irq)?;
    nvic.connect_output(Box::new(cpu.irq_input()));
    let nvic = nvic.into_shared();
    let irqs = irq_inputs(&nvic);

    let itm = capabilities.core.has_itm.then(Itm::new);

    Ok(InterruptWiring { nvic, irqs, itm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{resolve, CoreCapabilities, McuCapabilities, CORTEX_M3_MAX_IRQ};
    use cortexm_interrupts::IrqLine;
    use proptest::prelude::*;

    fn caps(model: &str, num_irq: u32, has_itm: bool) -> ResolvedCapabilities {
        let template = McuCapabilities {
            name: "irq".into(),
            flash_size_kb: 16,
            sram_size_kb: 4,
            core: Some(CoreCapabilities {
                cpu_model: None,
                has_itm,
                num_irq,
            }),
        };
        resolve(model, &template).unwrap()
    }

    #[test]
    fn documented_counts() {
        assert_eq!(normalize_irq_count(0, CORTEX_M3_MAX_IRQ), 224);
        assert_eq!(normalize_irq_count(256, 240), 224);
        assert_eq!(normalize_irq_count(256, 496), 256);
        assert_eq!(normalize_irq_count(0, 496), 256);
        assert_eq!(normalize_irq_count(496, 496), 480);
        assert_eq!(normalize_irq_count(1, 496), 32);
        assert_eq!(normalize_irq_count(68, 240), 96);
        assert_eq!(normalize_irq_count(u32::MAX, 496), 480);
    }

    #[test]
    fn wiring_allocates_one_line_per_interrupt() {
        let caps = caps("cortex-m3", 68, true);
        let cpu = CortexMCpu::new("cortex-m3").unwrap();
        let wiring = construct_interrupt_controller(&caps, &cpu).unwrap();

        assert_eq!(wiring.nvic.borrow().num_irq(), 96);
        assert_eq!(wiring.irqs.len(), 96);
        for (n, line) in wiring.irqs.iter().enumerate() {
            assert_eq!(line.irq() as usize, n);
        }
        assert!(wiring.nvic.borrow().is_output_connected());
        assert!(wiring.itm.is_some());
    }

    #[test]
    fn enabled_interrupt_reaches_the_cpu() {
        let caps = caps("cortex-m4", 0, false);
        let cpu = CortexMCpu::new("cortex-m4").unwrap();
        let wiring = construct_interrupt_controller(&caps, &cpu).unwrap();
        assert!(wiring.itm.is_none());

        wiring.nvic.borrow_mut().set_enabled(37, true);
        wiring.irqs[37].raise();
        assert!(cpu.irq_asserted());

        wiring.irqs[37].lower();
        wiring.nvic.borrow_mut().clear_pending(37);
        assert!(!cpu.irq_asserted());
    }

    proptest! {
        #[test]
        fn normalized_count_is_a_bank_multiple_under_the_ceiling(
            requested in 0u32..=4096,
            ceiling in prop::sample::select(vec![240u32, 496]),
        ) {
            let n = normalize_irq_count(requested, ceiling);
            prop_assert_eq!(n % 32, 0);
            prop_assert!(n > 0);
            prop_assert!(n <= ceiling);

            let effective = if requested == 0 { DEFAULT_NUM_IRQ } else { requested };
            let rounded = effective.div_ceil(32) * 32;
            if rounded <= ceiling {
                prop_assert_eq!(n, rounded);
            }
        }
    }
}
