#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cortexm_mcu::{CoreCapabilities, LaunchMode, McuCapabilities, McuConfig};

pub const EM_ARM: u16 = 40;
pub const EM_386: u16 = 3;

const EHDR_SIZE: usize = 52;
const PHDR_SIZE: usize = 32;
const PT_LOAD: u32 = 1;

/// One `PT_LOAD` program header of a synthetic ELF image.
pub struct Segment {
    pub paddr: u32,
    pub data: Vec<u8>,
    pub mem_size: u32,
}

impl Segment {
    pub fn new(paddr: u32, data: Vec<u8>) -> Self {
        let mem_size = data.len() as u32;
        Self {
            paddr,
            data,
            mem_size,
        }
    }

    pub fn with_bss(mut self, mem_size: u32) -> Self {
        self.mem_size = mem_size;
        self
    }
}

/// Minimal ELF32 little-endian executable: header, program headers, then segment payloads.
/// No section headers.
pub fn elf32(machine: u16, entry: u32, segments: &[Segment]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&[0x7F, b'E', b'L', b'F', 1, 1, 1, 0]);
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    out.extend_from_slice(&machine.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&entry.to_le_bytes());
    out.extend_from_slice(&(EHDR_SIZE as u32).to_le_bytes()); // e_phoff
    out.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
    out.extend_from_slice(&0x0500_0000u32.to_le_bytes()); // EABI5
    out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&(PHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&(segments.len() as u16).to_le_bytes());
    out.extend_from_slice(&40u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    assert_eq!(out.len(), EHDR_SIZE);

    let mut offset = EHDR_SIZE + PHDR_SIZE * segments.len();
    for seg in segments {
        for field in [
            PT_LOAD,
            offset as u32,
            seg.paddr,
            seg.paddr,
            seg.data.len() as u32,
            seg.mem_size,
            0x5, // R+X
            4,
        ] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        offset += seg.data.len();
    }
    for seg in segments {
        out.extend_from_slice(&seg.data);
    }
    out
}

/// A vector table: initial MSP followed by the reset handler address.
pub fn vector_table(msp: u32, reset: u32) -> Vec<u8> {
    let mut words = msp.to_le_bytes().to_vec();
    words.extend_from_slice(&reset.to_le_bytes());
    words
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("failed to write image");
    path
}

/// STM32F103-like part: Cortex-M3, 128 KiB flash, 20 KiB SRAM, 68 interrupts.
pub fn stm32f1_template() -> McuCapabilities {
    McuCapabilities {
        name: "STM32F103RB".into(),
        flash_size_kb: 128,
        sram_size_kb: 20,
        core: Some(CoreCapabilities {
            cpu_model: Some("cortex-m3".into()),
            has_itm: false,
            num_irq: 68,
        }),
    }
}

/// STM32F407-like part: Cortex-M4F with ITM.
pub fn stm32f4_template() -> McuCapabilities {
    McuCapabilities {
        name: "STM32F407VG".into(),
        flash_size_kb: 1024,
        sram_size_kb: 192,
        core: Some(CoreCapabilities {
            cpu_model: Some("cortex-m4f".into()),
            has_itm: true,
            num_irq: 82,
        }),
    }
}

/// Config for a harness-driven device with no boot image.
pub fn test_config() -> McuConfig {
    McuConfig {
        launch_mode: LaunchMode::Test,
        ..McuConfig::default()
    }
}

pub fn image_config(path: PathBuf) -> McuConfig {
    McuConfig {
        image: Some(path),
        ..McuConfig::default()
    }
}
