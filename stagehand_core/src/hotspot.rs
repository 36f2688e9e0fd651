use serde::{Deserialize, Serialize};

use crate::types::{Pos, Rect};

/// How the player closes distance before a button's sequence runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    None,
    TurnToFace,
    WalkTo,
    WalkToMarker,
}

impl Approach {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Approach::None),
            "turn_to_face" | "face" => Some(Approach::TurnToFace),
            "walk_to" => Some(Approach::WalkTo),
            "walk_to_marker" | "marker" => Some(Approach::WalkToMarker),
            _ => None,
        }
    }
}

/// Reaction to a double-click on a hotspot the player is already walking
/// toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleClickReaction {
    Ignore,
    TriggersInstantly,
    ElevatesToRun,
}

impl DoubleClickReaction {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Some(DoubleClickReaction::Ignore),
            "instant" | "triggers_instantly" => Some(DoubleClickReaction::TriggersInstantly),
            "run" | "elevates_to_run" => Some(DoubleClickReaction::ElevatesToRun),
            _ => None,
        }
    }
}

/// Where an interaction's action sequence lives. All three variants are
/// consumed uniformly by the sequence-runner provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum SequenceSource {
    Scene(String),
    Asset(String),
    Callback(String),
}

impl SequenceSource {
    pub fn name(&self) -> &str {
        match self {
            SequenceSource::Scene(name)
            | SequenceSource::Asset(name)
            | SequenceSource::Callback(name) => name,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SequenceSource::Scene(name) => format!("scene:{name}"),
            SequenceSource::Asset(name) => format!("asset:{name}"),
            SequenceSource::Callback(name) => format!("callback:{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Use,
    Examine,
    Inventory,
}

impl InteractionKind {
    pub fn label(self) -> &'static str {
        match self {
            InteractionKind::Use => "use",
            InteractionKind::Examine => "examine",
            InteractionKind::Inventory => "inventory",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "use" => Some(InteractionKind::Use),
            "examine" | "look" => Some(InteractionKind::Examine),
            "inventory" => Some(InteractionKind::Inventory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseButton {
    pub icon: u32,
    pub enabled: bool,
    pub approach: Approach,
    pub face_after: bool,
    pub source: SequenceSource,
}

impl UseButton {
    pub fn new(icon: u32, approach: Approach, source: SequenceSource) -> Self {
        UseButton {
            icon,
            enabled: true,
            approach,
            face_after: false,
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamineButton {
    pub enabled: bool,
    pub approach: Approach,
    pub source: SequenceSource,
}

impl ExamineButton {
    pub fn new(approach: Approach, source: SequenceSource) -> Self {
        ExamineButton {
            enabled: true,
            approach,
            source,
        }
    }
}

/// An inventory-combine binding: runs when `item` is the selected inventory
/// item and the player clicks this hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryButton {
    pub item: String,
    pub enabled: bool,
    pub approach: Approach,
    pub source: SequenceSource,
}

impl InventoryButton {
    pub fn new(item: impl Into<String>, approach: Approach, source: SequenceSource) -> Self {
        InventoryButton {
            item: item.into(),
            enabled: true,
            approach,
            source,
        }
    }
}

/// An interactive world object. Owned by the scene registry; the dispatcher
/// only ever holds ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub id: String,
    pub label: String,
    pub enabled: bool,
    pub position: Pos,
    /// Screen-space pointer bounds, updated by the host as the camera moves.
    pub bounds: Option<Rect>,
    /// Optional walk-to marker; `Approach::WalkToMarker` falls back to
    /// `position` when absent.
    pub marker: Option<Pos>,
    pub use_buttons: Vec<UseButton>,
    pub examine: Option<ExamineButton>,
    pub inventory_buttons: Vec<InventoryButton>,
    pub double_click: DoubleClickReaction,
    /// Last-selected interaction-cycling index; -1 means none selected.
    pub remembered_index: i32,
}

impl Hotspot {
    pub fn new(id: impl Into<String>, label: impl Into<String>, position: Pos) -> Self {
        Hotspot {
            id: id.into(),
            label: label.into(),
            enabled: true,
            position,
            bounds: None,
            marker: None,
            use_buttons: Vec::new(),
            examine: None,
            inventory_buttons: Vec::new(),
            double_click: DoubleClickReaction::Ignore,
            remembered_index: -1,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_marker(mut self, marker: Pos) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn with_use(mut self, button: UseButton) -> Self {
        self.use_buttons.push(button);
        self
    }

    pub fn with_examine(mut self, button: ExamineButton) -> Self {
        self.examine = Some(button);
        self
    }

    pub fn with_inventory(mut self, button: InventoryButton) -> Self {
        self.inventory_buttons.push(button);
        self
    }

    pub fn with_double_click(mut self, reaction: DoubleClickReaction) -> Self {
        self.double_click = reaction;
        self
    }

    pub fn first_enabled_use(&self) -> Option<&UseButton> {
        self.use_buttons.iter().find(|button| button.enabled)
    }

    pub fn matching_inventory(&self, item: &str) -> Option<&InventoryButton> {
        self.inventory_buttons
            .iter()
            .find(|button| button.enabled && button.item == item)
    }

    pub fn has_inventory_match(&self, item: &str) -> bool {
        self.matching_inventory(item).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_enabled_use_skips_disabled_buttons() {
        let mut first = UseButton::new(1, Approach::None, SequenceSource::Scene("a".into()));
        first.enabled = false;
        let second = UseButton::new(2, Approach::None, SequenceSource::Scene("b".into()));
        let hotspot = Hotspot::new("door", "door", Pos::default())
            .with_use(first)
            .with_use(second);
        assert_eq!(hotspot.first_enabled_use().map(|b| b.icon), Some(2));
    }

    #[test]
    fn inventory_match_requires_enabled_button() {
        let mut button =
            InventoryButton::new("card", Approach::None, SequenceSource::Scene("swipe".into()));
        button.enabled = false;
        let hotspot = Hotspot::new("door", "door", Pos::default()).with_inventory(button);
        assert!(!hotspot.has_inventory_match("card"));
    }

    #[test]
    fn source_describe_carries_the_variant() {
        assert_eq!(
            SequenceSource::Asset("intro".into()).describe(),
            "asset:intro"
        );
        assert_eq!(SequenceSource::Callback("cb".into()).name(), "cb");
    }
}
