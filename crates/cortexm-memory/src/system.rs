use core::fmt;

use crate::bus::MemoryBus;
use crate::phys::{DenseMemory, GuestMemory, GuestMemoryError};

/// Size of the 32-bit Cortex-M physical address space.
pub const ADDRESS_SPACE_SIZE: u64 = 1 << 32;

/// Bytes of alias window consumed by one bit of the target region (one 32-bit word per bit).
pub const BITBAND_BYTES_PER_BIT: u64 = 4;

/// How a mapped region is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Volatile read/write storage.
    Ram,
    /// Storage that the guest can only read; populated through [`MemoryBus::load_physical`].
    Rom,
    /// Derived bit-band view: each word of the window maps one bit of the region starting at
    /// `target_base`.
    BitBandAlias { target_base: u64 },
}

/// Descriptor of one region in the system address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDescriptor {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub read_only: bool,
    pub kind: RegionKind,
}

impl RegionDescriptor {
    /// Exclusive end address.
    pub fn end(&self) -> u64 {
        self.base + self.size
    }

    pub fn contains(&self, paddr: u64) -> bool {
        paddr >= self.base && paddr < self.end()
    }
}

/// Errors raised while adding a region to [`SystemMemory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    EmptyRegion {
        name: String,
        base: u64,
    },
    /// The region does not fit below [`ADDRESS_SPACE_SIZE`].
    OutOfAddressSpace {
        name: String,
        base: u64,
        size: u64,
    },
    Overlap {
        name: String,
        base: u64,
        end: u64,
        existing: String,
        existing_base: u64,
        existing_end: u64,
    },
    Allocation {
        name: String,
        source: GuestMemoryError,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::EmptyRegion { name, base } => {
                write!(f, "memory region '{name}' at 0x{base:08x} is empty")
            }
            MapError::OutOfAddressSpace { name, base, size } => write!(
                f,
                "memory region '{name}' (base=0x{base:08x} size=0x{size:x}) exceeds the 32-bit address space"
            ),
            MapError::Overlap {
                name,
                base,
                end,
                existing,
                existing_base,
                existing_end,
            } => write!(
                f,
                "memory region '{name}' [0x{base:08x}, 0x{end:08x}) overlaps '{existing}' [0x{existing_base:08x}, 0x{existing_end:08x})"
            ),
            MapError::Allocation { name, source } => {
                write!(f, "failed to allocate memory region '{name}': {source}")
            }
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Allocation { source, .. } => Some(source),
            _ => None,
        }
    }
}

enum Backing {
    Storage(DenseMemory),
    BitBand,
}

struct Region {
    desc: RegionDescriptor,
    backing: Backing,
}

/// The MCU's system address space.
///
/// Regions are kept sorted by base address and never overlap. Reads from holes return open-bus
/// `0xFF`; writes to holes are dropped.
#[derive(Default)]
pub struct SystemMemory {
    regions: Vec<Region>,
}

impl fmt::Debug for SystemMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.regions()).finish()
    }
}

impl SystemMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptors of every mapped region in address order.
    pub fn regions(&self) -> impl Iterator<Item = &RegionDescriptor> {
        self.regions.iter().map(|r| &r.desc)
    }

    pub fn region(&self, name: &str) -> Option<&RegionDescriptor> {
        self.regions().find(|r| r.name == name)
    }

    pub fn map_ram(
        &mut self,
        name: impl Into<String>,
        base: u64,
        size: u64,
    ) -> Result<RegionDescriptor, MapError> {
        self.map_storage(name.into(), base, size, RegionKind::Ram)
    }

    pub fn map_rom(
        &mut self,
        name: impl Into<String>,
        base: u64,
        size: u64,
    ) -> Result<RegionDescriptor, MapError> {
        self.map_storage(name.into(), base, size, RegionKind::Rom)
    }

    /// Map a bit-band alias window of `size` bytes at `base`, aliasing the bits of the region at
    /// `target_base`.
    pub fn map_bitband(
        &mut self,
        name: impl Into<String>,
        base: u64,
        size: u64,
        target_base: u64,
    ) -> Result<RegionDescriptor, MapError> {
        let desc = RegionDescriptor {
            name: name.into(),
            base,
            size,
            read_only: false,
            kind: RegionKind::BitBandAlias { target_base },
        };
        self.insert(desc, Backing::BitBand)
    }

    fn map_storage(
        &mut self,
        name: String,
        base: u64,
        size: u64,
        kind: RegionKind,
    ) -> Result<RegionDescriptor, MapError> {
        let desc = RegionDescriptor {
            name,
            base,
            size,
            read_only: kind == RegionKind::Rom,
            kind,
        };
        let idx = self.slot_for(&desc)?;
        let storage = DenseMemory::new(size).map_err(|source| MapError::Allocation {
            name: desc.name.clone(),
            source,
        })?;
        Ok(self.insert_at(idx, desc, Backing::Storage(storage)))
    }

    fn insert(
        &mut self,
        desc: RegionDescriptor,
        backing: Backing,
    ) -> Result<RegionDescriptor, MapError> {
        let idx = self.slot_for(&desc)?;
        Ok(self.insert_at(idx, desc, backing))
    }

    /// Validates `desc` against the address space and existing regions, returning its sorted
    /// insertion index. Runs before any backing store is allocated.
    fn slot_for(&self, desc: &RegionDescriptor) -> Result<usize, MapError> {
        if desc.size == 0 {
            return Err(MapError::EmptyRegion {
                name: desc.name.clone(),
                base: desc.base,
            });
        }
        let in_range = desc
            .base
            .checked_add(desc.size)
            .is_some_and(|end| end <= ADDRESS_SPACE_SIZE);
        if !in_range {
            return Err(MapError::OutOfAddressSpace {
                name: desc.name.clone(),
                base: desc.base,
                size: desc.size,
            });
        }

        let idx = self.regions.partition_point(|r| r.desc.base < desc.base);
        let neighbours = [idx.checked_sub(1), Some(idx)];
        for existing in neighbours.into_iter().flatten().filter_map(|i| self.regions.get(i)) {
            let e = &existing.desc;
            if desc.base < e.end() && e.base < desc.end() {
                return Err(MapError::Overlap {
                    name: desc.name.clone(),
                    base: desc.base,
                    end: desc.end(),
                    existing: e.name.clone(),
                    existing_base: e.base,
                    existing_end: e.end(),
                });
            }
        }
        Ok(idx)
    }

    fn insert_at(
        &mut self,
        idx: usize,
        desc: RegionDescriptor,
        backing: Backing,
    ) -> RegionDescriptor {
        tracing::debug!(
            region = %desc.name,
            base = format_args!("{:#010x}", desc.base),
            size = format_args!("{:#x}", desc.size),
            kind = ?desc.kind,
            "mapped memory region"
        );
        self.regions.insert(
            idx,
            Region {
                desc: desc.clone(),
                backing,
            },
        );
        desc
    }

    /// Snapshot of the bytes held by the named storage region.
    pub fn region_bytes(&self, name: &str) -> Option<&[u8]> {
        self.regions
            .iter()
            .find(|r| r.desc.name == name)
            .and_then(|r| match &r.backing {
                Backing::Storage(mem) => Some(mem.as_slice()),
                Backing::BitBand => None,
            })
    }

    fn region_index(&self, paddr: u64) -> Option<usize> {
        let idx = self.regions.partition_point(|r| r.desc.end() <= paddr);
        self.regions
            .get(idx)
            .filter(|r| r.desc.contains(paddr))
            .map(|_| idx)
    }

    /// Walks `[paddr, paddr + len)` and hands every mapped chunk to `visit` as
    /// `(region_index, offset_into_region, position_in_buffer, chunk_len)`.
    fn for_each_chunk(
        &self,
        paddr: u64,
        len: usize,
        mut visit: impl FnMut(usize, u64, usize, usize),
    ) {
        let mut pos = 0usize;
        while pos < len {
            let Some(addr) = paddr.checked_add(pos as u64) else {
                break;
            };
            if addr >= ADDRESS_SPACE_SIZE {
                break;
            }
            let remaining = (len - pos) as u64;
            match self.region_index(addr) {
                Some(idx) => {
                    let desc = &self.regions[idx].desc;
                    let chunk = remaining.min(desc.end() - addr) as usize;
                    visit(idx, addr - desc.base, pos, chunk);
                    pos += chunk;
                }
                None => {
                    // Skip the hole up to the next region (or the end of the access).
                    let next = self.regions.partition_point(|r| r.desc.base <= addr);
                    let gap_end = self
                        .regions
                        .get(next)
                        .map_or(ADDRESS_SPACE_SIZE, |r| r.desc.base);
                    pos += remaining.min(gap_end - addr) as usize;
                }
            }
        }
    }

    fn storage_read_byte(&self, paddr: u64) -> Option<u8> {
        let region = &self.regions[self.region_index(paddr)?];
        match &region.backing {
            Backing::Storage(mem) => mem.read_u8(paddr - region.desc.base).ok(),
            Backing::BitBand => None,
        }
    }

    fn storage_write_byte(&mut self, paddr: u64, value: u8) {
        let Some(idx) = self.region_index(paddr) else {
            return;
        };
        let region = &mut self.regions[idx];
        if let Backing::Storage(mem) = &mut region.backing {
            let _ = mem.write_u8(paddr - region.desc.base, value);
        }
    }

    fn bitband_target(target_base: u64, offset: u64) -> (u64, u8) {
        let bit_index = offset / BITBAND_BYTES_PER_BIT;
        (target_base + bit_index / 8, (bit_index % 8) as u8)
    }

    fn bitband_read(&self, target_base: u64, offset: u64) -> u8 {
        // Only the least significant byte of each alias word carries the bit.
        if offset % BITBAND_BYTES_PER_BIT != 0 {
            return 0;
        }
        let (addr, bit) = Self::bitband_target(target_base, offset);
        self.storage_read_byte(addr).map_or(0, |b| (b >> bit) & 1)
    }

    fn bitband_write(&mut self, target_base: u64, offset: u64, value: u8) {
        if offset % BITBAND_BYTES_PER_BIT != 0 {
            return;
        }
        let (addr, bit) = Self::bitband_target(target_base, offset);
        let Some(idx) = self.region_index(addr) else {
            return;
        };
        if self.regions[idx].desc.read_only {
            return;
        }
        let Some(current) = self.storage_read_byte(addr) else {
            return;
        };
        let updated = if value & 1 != 0 {
            current | (1 << bit)
        } else {
            current & !(1 << bit)
        };
        self.storage_write_byte(addr, updated);
    }

    fn write_impl(&mut self, paddr: u64, src: &[u8], force_rom: bool) -> usize {
        let mut chunks = Vec::new();
        self.for_each_chunk(paddr, src.len(), |idx, offset, pos, len| {
            chunks.push((idx, offset, pos, len));
        });

        let mut stored = 0usize;
        for (idx, offset, pos, len) in chunks {
            let data = &src[pos..pos + len];
            let kind = self.regions[idx].desc.kind;
            match kind {
                RegionKind::BitBandAlias { target_base } => {
                    if force_rom {
                        continue;
                    }
                    for (i, byte) in data.iter().enumerate() {
                        self.bitband_write(target_base, offset + i as u64, *byte);
                    }
                }
                RegionKind::Rom if !force_rom => {}
                RegionKind::Ram | RegionKind::Rom => {
                    if let Backing::Storage(mem) = &mut self.regions[idx].backing {
                        if mem.write_from(offset, data).is_ok() {
                            stored += len;
                        }
                    }
                }
            }
        }
        stored
    }
}

impl MemoryBus for SystemMemory {
    fn read_physical(&mut self, paddr: u64, dst: &mut [u8]) {
        // Open-bus default for holes.
        dst.fill(0xFF);

        let mut chunks = Vec::new();
        self.for_each_chunk(paddr, dst.len(), |idx, offset, pos, len| {
            chunks.push((idx, offset, pos, len));
        });

        for (idx, offset, pos, len) in chunks {
            let out = &mut dst[pos..pos + len];
            match (&self.regions[idx].backing, self.regions[idx].desc.kind) {
                (Backing::Storage(mem), _) => {
                    if mem.read_into(offset, out).is_err() {
                        out.fill(0xFF);
                    }
                }
                (Backing::BitBand, RegionKind::BitBandAlias { target_base }) => {
                    for (i, byte) in out.iter_mut().enumerate() {
                        *byte = self.bitband_read(target_base, offset + i as u64);
                    }
                }
                (Backing::BitBand, _) => {}
            }
        }
    }

    fn write_physical(&mut self, paddr: u64, src: &[u8]) {
        self.write_impl(paddr, src, false);
    }

    fn load_physical(&mut self, paddr: u64, src: &[u8]) -> usize {
        self.write_impl(paddr, src, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_regions_are_rejected() {
        let mut mem = SystemMemory::new();
        mem.map_ram("a", 0x1000, 0x1000).unwrap();

        let err = mem.map_ram("b", 0x1800, 0x1000).unwrap_err();
        assert!(matches!(err, MapError::Overlap { ref existing, .. } if existing == "a"));

        let err = mem.map_ram("c", 0x0800, 0x1000).unwrap_err();
        assert!(matches!(err, MapError::Overlap { .. }));

        // Touching but not overlapping is fine.
        mem.map_ram("d", 0x2000, 0x1000).unwrap();
        mem.map_ram("e", 0x0000, 0x1000).unwrap();
        let names: Vec<_> = mem.regions().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["e", "a", "d"]);
    }

    #[test]
    fn regions_must_fit_in_the_32_bit_space() {
        let mut mem = SystemMemory::new();
        mem.map_ram("top", 0xFFFF_F000, 0x1000).unwrap();
        let err = mem.map_ram("past", 0xFFFF_F000 + 0x1000, 0x10).unwrap_err();
        assert!(matches!(err, MapError::OutOfAddressSpace { .. }));
        assert!(matches!(
            mem.map_ram("empty", 0x100, 0).unwrap_err(),
            MapError::EmptyRegion { .. }
        ));
    }
}
