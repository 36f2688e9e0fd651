use serde::{Deserialize, Serialize};

/// The single global mode that gates nearly every other subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Normal,
    Cutscene,
    Paused,
    DialogOptions,
}

impl GameMode {
    pub fn label(self) -> &'static str {
        match self {
            GameMode::Normal => "normal",
            GameMode::Cutscene => "cutscene",
            GameMode::Paused => "paused",
            GameMode::DialogOptions => "dialog_options",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(GameMode::Normal),
            "cutscene" => Some(GameMode::Cutscene),
            "paused" => Some(GameMode::Paused),
            "dialog_options" | "dialog" => Some(GameMode::DialogOptions),
            _ => None,
        }
    }
}

/// Owned mode container: current value, previous-frame snapshot, and the last
/// non-paused mode so a pause can be unwound.
///
/// Restoring after a pause recomputes the mode from current blocking
/// conditions instead of replaying the snapshot, because those conditions may
/// have changed while paused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeState {
    current: GameMode,
    previous: GameMode,
    last_non_paused: GameMode,
}

impl Default for ModeState {
    fn default() -> Self {
        ModeState {
            current: GameMode::Normal,
            previous: GameMode::Normal,
            last_non_paused: GameMode::Normal,
        }
    }
}

impl ModeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> GameMode {
        self.current
    }

    pub fn previous(&self) -> GameMode {
        self.previous
    }

    pub fn last_non_paused(&self) -> GameMode {
        self.last_non_paused
    }

    /// Sets the mode, updating the previous-mode snapshot. Returns the mode
    /// that was replaced, or `None` when the value did not change.
    pub fn set(&mut self, mode: GameMode) -> Option<GameMode> {
        if mode == self.current {
            return None;
        }
        let replaced = self.current;
        self.previous = replaced;
        self.current = mode;
        if mode != GameMode::Paused {
            self.last_non_paused = mode;
        }
        Some(replaced)
    }

    /// Leaves `Paused` by recomputing the correct mode from what is actually
    /// blocking right now. Never yields `Paused`.
    pub fn restore_after_pause(
        &mut self,
        blocking_sequence: bool,
        conversation_open: bool,
    ) -> GameMode {
        let mode = if blocking_sequence {
            GameMode::Cutscene
        } else if conversation_open {
            GameMode::DialogOptions
        } else {
            GameMode::Normal
        };
        self.set(mode);
        mode
    }
}
