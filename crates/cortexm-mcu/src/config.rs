use std::path::{Path, PathBuf};

/// How the emulator process was started. Controls whether a boot image is mandatory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchMode {
    /// Normal run; the device must have something to execute.
    #[default]
    Standalone,
    /// A debugger will attach and download code itself.
    DebugAttach,
    /// Driven by a test harness that pokes the device directly.
    Test,
}

impl LaunchMode {
    pub fn requires_image(self) -> bool {
        matches!(self, LaunchMode::Standalone)
    }
}

/// Per-instance MCU configuration supplied by the machine front end.
///
/// Every field has a neutral default meaning "use what the capability template says".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McuConfig {
    /// Core model identifier, e.g. `"cortex-m3-r2p1"`.
    ///
    /// When unset, the template's `core.cpu_model` is used.
    pub cpu_model: Option<String>,
    /// SRAM size override in KiB. `0` keeps the template value.
    pub sram_size_kb: u32,
    /// Flash size override in KiB. `0` keeps the template value.
    pub flash_size_kb: u32,
    /// Boot image path (`--image`).
    pub image: Option<PathBuf>,
    /// Legacy boot image path (`--kernel`); ignored when `image` is set.
    pub kernel: Option<PathBuf>,
    pub launch_mode: LaunchMode,
}

impl McuConfig {
    /// The boot image to load, preferring `image` over `kernel`.
    pub fn image_path(&self) -> Option<&Path> {
        self.image.as_deref().or(self.kernel.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_takes_precedence_over_kernel() {
        let mut cfg = McuConfig {
            kernel: Some("kernel.elf".into()),
            ..McuConfig::default()
        };
        assert_eq!(cfg.image_path(), Some(Path::new("kernel.elf")));

        cfg.image = Some("image.bin".into());
        assert_eq!(cfg.image_path(), Some(Path::new("image.bin")));
    }

    #[test]
    fn only_standalone_runs_require_an_image() {
        assert!(LaunchMode::Standalone.requires_image());
        assert!(!LaunchMode::DebugAttach.requires_image());
        assert!(!LaunchMode::Test.requires_image());
    }
}
