//! MCU capability templates and core-variant resolution.
//!
//! A machine definition supplies an [`McuCapabilities`] template describing a family of parts.
//! Templates are shared and never mutated: [`resolve`] clones the template into an owned
//! [`ResolvedCapabilities`] and pins the hard-wired properties of the selected core variant.

use std::fmt;

use crate::McuError;

/// Interrupt ceiling of the ARMv7-M Cortex-M3 NVIC.
pub const CORTEX_M3_MAX_IRQ: u32 = 240;
/// Architectural interrupt ceiling used by every other supported core.
pub const CORTEX_M_MAX_IRQ: u32 = 496;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpuKind {
    None,
    /// Single precision FPv4 with 16 double-word registers (Cortex-M4F).
    Fpv4SpD16,
    /// Single precision FPv5 with 16 double-word registers (Cortex-M7F).
    Fpv5SpD16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreVariant {
    M0,
    M0Plus,
    M1,
    M3,
    M4,
    M4F,
    M7,
    M7F,
}

/// Hard-wired properties of one core variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreVariantInfo {
    /// Middle token of the model identifier (`"m4f"` in `"cortex-m4f"`).
    pub token: &'static str,
    pub variant: CoreVariant,
    pub name: &'static str,
    pub has_mpu: bool,
    pub has_fpu: bool,
    pub fpu_kind: FpuKind,
    pub max_irq: u32,
}

const fn info(
    token: &'static str,
    variant: CoreVariant,
    name: &'static str,
    has_mpu: bool,
    fpu_kind: FpuKind,
    max_irq: u32,
) -> CoreVariantInfo {
    CoreVariantInfo {
        token,
        variant,
        name,
        has_mpu,
        has_fpu: !matches!(fpu_kind, FpuKind::None),
        fpu_kind,
        max_irq,
    }
}

/// Token → variant lookup table. The order matches [`CoreVariant`].
pub const CORE_VARIANTS: [CoreVariantInfo; 8] = [
    info("m0", CoreVariant::M0, "Cortex-M0", false, FpuKind::None, CORTEX_M_MAX_IRQ),
    info("m0p", CoreVariant::M0Plus, "Cortex-M0+", false, FpuKind::None, CORTEX_M_MAX_IRQ),
    info("m1", CoreVariant::M1, "Cortex-M1", false, FpuKind::None, CORTEX_M_MAX_IRQ),
    info("m3", CoreVariant::M3, "Cortex-M3", true, FpuKind::None, CORTEX_M3_MAX_IRQ),
    info("m4", CoreVariant::M4, "Cortex-M4", true, FpuKind::None, CORTEX_M_MAX_IRQ),
    info("m4f", CoreVariant::M4F, "Cortex-M4F", true, FpuKind::Fpv4SpD16, CORTEX_M_MAX_IRQ),
    info("m7", CoreVariant::M7, "Cortex-M7", true, FpuKind::None, CORTEX_M_MAX_IRQ),
    info("m7f", CoreVariant::M7F, "Cortex-M7F", true, FpuKind::Fpv5SpD16, CORTEX_M_MAX_IRQ),
];

impl CoreVariant {
    pub fn from_token(token: &str) -> Option<Self> {
        CORE_VARIANTS
            .iter()
            .find(|info| info.token == token)
            .map(|info| info.variant)
    }

    pub fn info(self) -> &'static CoreVariantInfo {
        &CORE_VARIANTS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn max_irq(self) -> u32 {
        self.info().max_irq
    }

    /// Comma separated list of accepted tokens, for diagnostics.
    pub fn supported_tokens() -> String {
        CORE_VARIANTS
            .iter()
            .map(|info| info.token)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for CoreVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `family-variant[-revision]` model identifier split into its tokens.
///
/// At most three tokens are produced; anything after the second dash belongs to the revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelIdentifier<'a> {
    pub family: &'a str,
    pub variant: Option<&'a str>,
    pub revision: Option<&'a str>,
}

impl<'a> ModelIdentifier<'a> {
    pub fn parse(model: &'a str) -> Self {
        let mut tokens = model.splitn(3, '-');
        Self {
            family: tokens.next().unwrap_or_default(),
            variant: tokens.next(),
            revision: tokens.next(),
        }
    }
}

/// Per-core part of a capability template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreCapabilities {
    /// Model used when the machine configuration does not name one (e.g. `"cortex-m3"`).
    pub cpu_model: Option<String>,
    /// Instantiate an Instrumentation Trace Macrocell.
    pub has_itm: bool,
    /// Number of external interrupts wired by the part; 0 selects the default.
    pub num_irq: u32,
}

/// Read-only description of an MCU family supplied by a machine definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McuCapabilities {
    pub name: String,
    pub flash_size_kb: u32,
    pub sram_size_kb: u32,
    pub core: Option<CoreCapabilities>,
}

/// The device-owned copy of a template after core-variant resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCapabilities {
    pub name: String,
    pub flash_size_kb: u32,
    pub sram_size_kb: u32,
    pub core: CoreCapabilities,
    pub variant: CoreVariant,
    pub has_mpu: bool,
    pub has_fpu: bool,
    pub fpu_kind: FpuKind,
    pub max_irq: u32,
}

impl ResolvedCapabilities {
    /// Human readable core name including the revision held by `midr`, e.g. `"Cortex-M3 r2p1"`.
    pub fn display_model(&self, midr: u32) -> String {
        let major = (midr >> 20) & 0xF;
        let minor = midr & 0xF;
        format!("{} r{major}p{minor}", self.variant.name())
    }
}

/// Select the core variant named by `model` and clone `template` into an owned copy.
pub fn resolve(model: &str, template: &McuCapabilities) -> Result<ResolvedCapabilities, McuError> {
    let id = ModelIdentifier::parse(model);
    let variant = id
        .variant
        .and_then(CoreVariant::from_token)
        .ok_or_else(|| McuError::UnsupportedModel {
            model: model.to_string(),
        })?;
    let info = variant.info();

    Ok(ResolvedCapabilities {
        name: template.name.clone(),
        flash_size_kb: template.flash_size_kb,
        sram_size_kb: template.sram_size_kb,
        core: template.core.clone().unwrap_or_default(),
        variant,
        has_mpu: info.has_mpu,
        has_fpu: info.has_fpu,
        fpu_kind: info.fpu_kind,
        max_irq: info.max_irq,
    })
}
