//! Boot image staging.
//!
//! Images are parsed up front and kept as a list of segments; nothing touches guest memory until
//! [`StagedImage::apply`] runs as part of device reset. An ELF executable is preferred, anything
//! else is treated as a flat binary placed at the start of flash.

use std::fmt;
use std::path::{Path, PathBuf};

use cortexm_memory::MemoryBus;
use goblin::elf::header::{EM_ARM, ET_EXEC};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use thiserror::Error;

use crate::memory_map::FLASH_BASE;

const ZERO_FILL_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("could not load image '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not load image '{}': {reason}", path.display())]
    LoadFailed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Elf,
    Raw,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Elf => "ELF",
            ImageFormat::Raw => "raw binary",
        })
    }
}

/// One contiguous chunk of the image. `mem_size` may exceed `data.len()`; the tail is zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSegment {
    pub load_addr: u64,
    pub data: Vec<u8>,
    pub mem_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub entry: u64,
    /// Bytes occupied in guest memory.
    pub size: u64,
    pub segments: Vec<ImageSegment>,
}

impl StagedImage {
    /// Lowest address written by the image.
    pub fn low_addr(&self) -> Option<u64> {
        self.segments.iter().map(|s| s.load_addr).min()
    }

    /// Copy every segment into guest memory, including read-only flash. Returns how many bytes
    /// were actually stored.
    pub fn apply(&self, bus: &mut dyn MemoryBus) -> usize {
        let zeros = [0u8; ZERO_FILL_CHUNK];
        let mut stored = 0;
        for segment in &self.segments {
            stored += bus.load_physical(segment.load_addr, &segment.data);

            let mut addr = segment.load_addr.saturating_add(segment.data.len() as u64);
            let mut remaining = segment.mem_size.saturating_sub(segment.data.len() as u64);
            while remaining > 0 {
                let chunk = remaining.min(ZERO_FILL_CHUNK as u64);
                stored += bus.load_physical(addr, &zeros[..chunk as usize]);
                addr = addr.saturating_add(chunk);
                remaining -= chunk;
            }
        }
        stored
    }
}

/// Stage the image at `path`, trying ELF first and falling back to a raw binary bounded by
/// `flash_size` bytes.
pub fn load_image(path: &Path, flash_size: u64) -> Result<StagedImage, ImageError> {
    let bytes = std::fs::read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let elf_reason = match stage_elf(path, &bytes) {
        Ok(image) => return Ok(image),
        Err(reason) => reason,
    };
    tracing::debug!(
        path = %path.display(),
        reason = %elf_reason,
        "not loadable as ELF, trying raw binary"
    );

    let len = bytes.len() as u64;
    if len > flash_size {
        return Err(ImageError::LoadFailed {
            path: path.to_path_buf(),
            reason: format!(
                "{elf_reason}; raw image of {len} bytes does not fit in {flash_size} bytes of flash"
            ),
        });
    }

    Ok(StagedImage {
        path: path.to_path_buf(),
        format: ImageFormat::Raw,
        entry: FLASH_BASE,
        size: len,
        segments: vec![ImageSegment {
            load_addr: FLASH_BASE,
            mem_size: len,
            data: bytes,
        }],
    })
}

fn stage_elf(path: &Path, bytes: &[u8]) -> Result<StagedImage, String> {
    let elf = Elf::parse(bytes).map_err(|err| format!("not an ELF file ({err})"))?;
    if elf.is_64 || !elf.little_endian || elf.header.e_machine != EM_ARM {
        return Err("ELF file is not a 32-bit little-endian ARM image".to_string());
    }
    if elf.header.e_type != ET_EXEC {
        return Err("ELF file is not an executable".to_string());
    }

    let mut segments = Vec::new();
    let mut size = 0u64;
    for ph in elf
        .program_headers
        .iter()
        .filter(|ph| ph.p_type == PT_LOAD && ph.p_memsz > 0)
    {
        let data = usize::try_from(ph.p_offset)
            .ok()
            .zip(usize::try_from(ph.p_filesz).ok())
            .and_then(|(start, len)| bytes.get(start..start.checked_add(len)?))
            .ok_or_else(|| format!("segment at {:#x} exceeds the file", ph.p_paddr))?;
        let mem_size = ph.p_memsz.max(ph.p_filesz);
        size += mem_size;
        segments.push(ImageSegment {
            load_addr: ph.p_paddr,
            data: data.to_vec(),
            mem_size,
        });
    }
    if segments.is_empty() {
        return Err("ELF file has no loadable segments".to_string());
    }

    Ok(StagedImage {
        path: path.to_path_buf(),
        format: ImageFormat::Elf,
        entry: elf.entry,
        size,
        segments,
    })
}
