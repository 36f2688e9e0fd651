use serde::{Deserialize, Serialize};

/// Capability mask read by the frame scheduler. A cleared bit skips that whole
/// update phase for the frame; the host toggles bits atomically between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemCaps(u16);

impl SystemCaps {
    pub const NONE: SystemCaps = SystemCaps(0);
    pub const INPUT: SystemCaps = SystemCaps(1 << 0);
    pub const SPEECH: SystemCaps = SystemCaps(1 << 1);
    pub const CURSOR: SystemCaps = SystemCaps(1 << 2);
    pub const MENUS: SystemCaps = SystemCaps(1 << 3);
    pub const INTERACTION: SystemCaps = SystemCaps(1 << 4);
    pub const SEQUENCES: SystemCaps = SystemCaps(1 << 5);
    pub const MOVEMENT: SystemCaps = SystemCaps(1 << 6);
    pub const CHARACTERS: SystemCaps = SystemCaps(1 << 7);
    pub const ALL: SystemCaps = SystemCaps(0xff);

    pub fn contains(self, other: SystemCaps) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: SystemCaps) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: SystemCaps) {
        self.0 &= !other.0;
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> SystemCaps {
        SystemCaps(bits & Self::ALL.0)
    }
}

impl Default for SystemCaps {
    fn default() -> Self {
        SystemCaps::ALL
    }
}
