use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hotspot::{InteractionKind, InventoryButton, UseButton};

/// Whether cycling past the last enabled interaction wraps to the first or
/// clamps at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleBehavior {
    Wrap,
    Clamp,
}

impl CycleBehavior {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wrap" => Some(CycleBehavior::Wrap),
            "clamp" => Some(CycleBehavior::Clamp),
            _ => None,
        }
    }
}

/// One cyclable interaction: a position back into the owning button list plus
/// the icon/item identity the UI shows.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleEntry {
    pub kind: InteractionKind,
    pub position: usize,
    pub icon: Option<u32>,
    pub item: Option<String>,
}

/// The ordered cycling domain: enabled use buttons first, then enabled
/// inventory-combine buttons whose item is currently carried. Disabled
/// entries never appear, so an index into this list can never land on one.
pub fn enabled_entries(
    uses: &[UseButton],
    combos: &[InventoryButton],
    carried: &BTreeSet<String>,
) -> Vec<CycleEntry> {
    let mut entries = Vec::new();
    for (position, button) in uses.iter().enumerate() {
        if button.enabled {
            entries.push(CycleEntry {
                kind: InteractionKind::Use,
                position,
                icon: Some(button.icon),
                item: None,
            });
        }
    }
    for (position, button) in combos.iter().enumerate() {
        if button.enabled && carried.contains(&button.item) {
            entries.push(CycleEntry {
                kind: InteractionKind::Inventory,
                position,
                icon: None,
                item: Some(button.item.clone()),
            });
        }
    }
    entries
}

/// Advances a bounded cursor. `-1` means nothing selected; stepping forward
/// from it lands on the first entry, stepping back lands on the last (wrap)
/// or first (clamp).
pub fn advance(current: i32, len: usize, delta: i32, behavior: CycleBehavior) -> i32 {
    if len == 0 {
        return -1;
    }
    let len = len as i32;
    let next = if current < 0 {
        if delta >= 0 {
            0
        } else {
            len - 1
        }
    } else {
        current + delta
    };
    match behavior {
        CycleBehavior::Wrap => next.rem_euclid(len),
        CycleBehavior::Clamp => next.clamp(0, len - 1),
    }
}

/// Reset-to-first: index 0 when anything is cyclable, -1 otherwise.
pub fn reset_index(len: usize) -> i32 {
    if len == 0 {
        -1
    } else {
        0
    }
}
