use cortexm_mcu::{CoreCapabilities, McuCapabilities};

/// A board the CLI knows how to build.
#[derive(Debug, Clone)]
pub struct MachineDef {
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: McuCapabilities,
}

fn def(
    name: &'static str,
    description: &'static str,
    cpu_model: &str,
    flash_size_kb: u32,
    sram_size_kb: u32,
    num_irq: u32,
    has_itm: bool,
) -> MachineDef {
    MachineDef {
        name,
        description,
        capabilities: McuCapabilities {
            name: name.to_string(),
            flash_size_kb,
            sram_size_kb,
            core: Some(CoreCapabilities {
                cpu_model: Some(cpu_model.to_string()),
                has_itm,
                num_irq,
            }),
        },
    }
}

pub fn builtin() -> Vec<MachineDef> {
    vec![
        def(
            "cortexm-generic",
            "Generic Cortex-M board; use --cpu to select the core",
            "cortex-m3",
            128,
            20,
            0,
            false,
        ),
        def(
            "lpc1114",
            "NXP LPC1114 (Cortex-M0, 32 KB flash, 4 KB RAM)",
            "cortex-m0",
            32,
            4,
            32,
            false,
        ),
        def(
            "stm32f103rb",
            "ST STM32F103RB (Cortex-M3, 128 KB flash, 20 KB RAM)",
            "cortex-m3",
            128,
            20,
            68,
            true,
        ),
        def(
            "stm32f407vg",
            "ST STM32F407VG (Cortex-M4F, 1 MB flash, 192 KB RAM)",
            "cortex-m4f",
            1024,
            192,
            82,
            true,
        ),
    ]
}

pub fn find(name: &str) -> Option<MachineDef> {
    builtin().into_iter().find(|m| m.name == name)
}

pub fn names() -> String {
    builtin()
        .iter()
        .map(|m| m.name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_resolvable() {
        let all = builtin();
        for m in &all {
            assert_eq!(find(m.name).unwrap().name, m.name);
            assert_eq!(all.iter().filter(|o| o.name == m.name).count(), 1);
        }
        assert!(find("stm32f999").is_none());
    }
}
