/// Instrumentation Trace Macrocell.
///
/// Only the device lifecycle is modelled; stimulus port traffic is handled by the trace backend
/// of the surrounding emulator.
#[derive(Debug, Default)]
pub struct Itm {
    realized: bool,
}

impl Itm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realize(&mut self) {
        self.realized = true;
    }

    pub fn is_realized(&self) -> bool {
        self.realized
    }
}
