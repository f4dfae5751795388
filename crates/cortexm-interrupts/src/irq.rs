use std::cell::Cell;
use std::rc::Rc;

/// A level-triggered interrupt wire.
///
/// Handles are cheap to clone and may be held by several device models; driving the level is
/// always done through a shared reference.
pub trait IrqLine {
    fn set_level(&self, level: bool);

    fn raise(&self) {
        self.set_level(true);
    }

    fn lower(&self) {
        self.set_level(false);
    }
}

/// An [`IrqLine`] that simply latches its current level, used as the CPU's IRQ input.
#[derive(Debug, Clone, Default)]
pub struct LevelIrqLine(Rc<Cell<bool>>);

impl LevelIrqLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> bool {
        self.0.get()
    }
}

impl IrqLine for LevelIrqLine {
    fn set_level(&self, level: bool) {
        self.0.set(level);
    }
}
