/// Guest physical memory access as seen by bus masters (CPU reset logic, image loaders).
///
/// Reads take `&mut self` so implementations may model side-effecting regions such as the
/// bit-band alias.
pub trait MemoryBus {
    fn read_physical(&mut self, paddr: u64, buf: &mut [u8]);

    /// Store through the normal access path. Writes to read-only regions are discarded.
    fn write_physical(&mut self, paddr: u64, buf: &[u8]);

    /// Store that also populates read-only (flash) regions, used when staging boot images.
    ///
    /// Returns how many bytes landed in backing storage; bytes that hit unmapped addresses or
    /// derived views are dropped.
    fn load_physical(&mut self, paddr: u64, buf: &[u8]) -> usize;

    /// Little-endian word read; the Cortex-M vector table and bit-band words are 32-bit.
    fn read_u32(&mut self, paddr: u64) -> u32 {
        let mut word = [0u8; 4];
        self.read_physical(paddr, &mut word);
        u32::from_le_bytes(word)
    }

    fn write_u32(&mut self, paddr: u64, val: u32) {
        self.write_physical(paddr, &val.to_le_bytes());
    }

    fn read_u8(&mut self, paddr: u64) -> u8 {
        let mut byte = [0u8; 1];
        self.read_physical(paddr, &mut byte);
        byte[0]
    }

    fn write_u8(&mut self, paddr: u64, val: u8) {
        self.write_physical(paddr, &[val]);
    }
}
