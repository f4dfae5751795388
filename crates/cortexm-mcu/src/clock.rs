/// Core clock assumed until a vendor clock controller programs the real one.
pub const DEFAULT_CORE_CLOCK_HZ: u64 = 8_000_000;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Core clock frequency and the derived tick period used by the SysTick model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreClock {
    hz: u64,
}

impl Default for CoreClock {
    fn default() -> Self {
        Self {
            hz: DEFAULT_CORE_CLOCK_HZ,
        }
    }
}

impl CoreClock {
    /// A zero frequency is treated as 1 Hz so the scale stays finite.
    pub fn new(hz: u64) -> Self {
        Self { hz: hz.max(1) }
    }

    pub fn hz(&self) -> u64 {
        self.hz
    }

    /// Nanoseconds per core clock tick.
    pub fn scale_ns(&self) -> u64 {
        NANOS_PER_SEC / self.hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clock_is_8mhz() {
        let clock = CoreClock::default();
        assert_eq!(clock.hz(), 8_000_000);
        assert_eq!(clock.scale_ns(), 125);
        assert_eq!(CoreClock::new(72_000_000).scale_ns(), 13);
        assert_eq!(CoreClock::new(0).scale_ns(), NANOS_PER_SEC);
    }
}
