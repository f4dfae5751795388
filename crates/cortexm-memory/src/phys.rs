use core::fmt;

/// Errors returned by [`GuestMemory`] backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestMemoryError {
    /// The requested range lies outside the backing store.
    OutOfRange { offset: u64, len: usize, size: u64 },
    /// The requested size cannot be represented by the current platform's `usize`.
    SizeTooLarge { size: u64 },
}

impl fmt::Display for GuestMemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestMemoryError::OutOfRange { offset, len, size } => write!(
                f,
                "guest memory access out of range: offset=0x{offset:x} len={len} size=0x{size:x}"
            ),
            GuestMemoryError::SizeTooLarge { size } => {
                write!(f, "guest memory size {size} does not fit in usize")
            }
        }
    }
}

impl std::error::Error for GuestMemoryError {}

pub type GuestMemoryResult<T> = Result<T, GuestMemoryError>;

/// Backing storage for a single mapped region.
///
/// Offsets are region-relative; the system address space translates guest physical addresses
/// before calling into the backend.
pub trait GuestMemory {
    fn size(&self) -> u64;

    fn read_into(&self, offset: u64, dst: &mut [u8]) -> GuestMemoryResult<()>;

    fn write_from(&mut self, offset: u64, src: &[u8]) -> GuestMemoryResult<()>;

    fn read_u8(&self, offset: u64) -> GuestMemoryResult<u8> {
        let mut buf = [0u8; 1];
        self.read_into(offset, &mut buf)?;
        Ok(buf[0])
    }

    fn write_u8(&mut self, offset: u64, value: u8) -> GuestMemoryResult<()> {
        self.write_from(offset, &[value])
    }

    fn read_u32_le(&self, offset: u64) -> GuestMemoryResult<u32> {
        let mut buf = [0u8; 4];
        self.read_into(offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

/// Contiguous, zero-initialised backing store.
#[derive(Debug, Clone)]
pub struct DenseMemory {
    data: Box<[u8]>,
}

impl DenseMemory {
    pub fn new(size: u64) -> GuestMemoryResult<Self> {
        let len = usize::try_from(size).map_err(|_| GuestMemoryError::SizeTooLarge { size })?;
        Ok(Self {
            data: vec![0u8; len].into_boxed_slice(),
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn span(&self, offset: u64, len: usize) -> GuestMemoryResult<(usize, usize)> {
        let size = self.size();
        let out_of_range = GuestMemoryError::OutOfRange { offset, len, size };
        let end = offset.checked_add(len as u64).ok_or(out_of_range.clone())?;
        if end > size {
            return Err(out_of_range);
        }
        // Both ends are bounded by `data.len()`, which is a `usize`.
        Ok((offset as usize, end as usize))
    }
}

impl GuestMemory for DenseMemory {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_into(&self, offset: u64, dst: &mut [u8]) -> GuestMemoryResult<()> {
        let (start, end) = self.span(offset, dst.len())?;
        dst.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write_from(&mut self, offset: u64, src: &[u8]) -> GuestMemoryResult<()> {
        let (start, end) = self.span(offset, src.len())?;
        self.data[start..end].copy_from_slice(src);
        Ok(())
    }
}
