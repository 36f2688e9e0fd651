use serde::{Deserialize, Serialize};

use crate::types::Pos;

/// Discrete pointer-button state for one frame. The host collapses raw device
/// events into this closed enumeration; the core never sees events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickKind {
    #[default]
    None,
    Single,
    Double,
    Held,
    Released,
}

impl ClickKind {
    pub fn is_press(self) -> bool {
        matches!(self, ClickKind::Single | ClickKind::Double)
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(ClickKind::None),
            "single" => Some(ClickKind::Single),
            "double" => Some(ClickKind::Double),
            "held" => Some(ClickKind::Held),
            "released" => Some(ClickKind::Released),
            _ => None,
        }
    }
}

/// Everything the dispatcher reads from input in one frame, sampled by the
/// host before the scheduler runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub pointer: Pos,
    pub primary: ClickKind,
    pub secondary: ClickKind,
    pub dragging: bool,
    pub skip: bool,
}

#[cfg(test)]
mod tests {
    use super::ClickKind;

    #[test]
    fn only_single_and_double_are_presses() {
        assert!(ClickKind::Single.is_press());
        assert!(ClickKind::Double.is_press());
        assert!(!ClickKind::Held.is_press());
        assert!(!ClickKind::Released.is_press());
        assert!(!ClickKind::None.is_press());
    }

    #[test]
    fn click_labels_parse() {
        assert_eq!(ClickKind::from_label("double"), Some(ClickKind::Double));
        assert_eq!(ClickKind::from_label("tap"), None);
    }
}
