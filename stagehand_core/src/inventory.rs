use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::hotspot::{InventoryButton, UseButton};

/// Authored definition of an inventory item. Items carry their own interaction
/// lists so cycling UIs can run over a hovered item exactly as over a hotspot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub label: String,
    pub use_buttons: Vec<UseButton>,
    pub inventory_buttons: Vec<InventoryButton>,
    pub remembered_index: i32,
}

impl ItemDef {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        ItemDef {
            id: id.into(),
            label: label.into(),
            use_buttons: Vec::new(),
            inventory_buttons: Vec::new(),
            remembered_index: -1,
        }
    }
}

/// Carried-item ledger plus the transient selected/hovered cursors the
/// dispatcher consults.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    defs: BTreeMap<String, ItemDef>,
    carried: BTreeSet<String>,
    selected: Option<String>,
    hovered: Option<String>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, def: ItemDef) {
        self.defs.insert(def.id.clone(), def);
    }

    /// Adds an item to the carried set, auto-defining unknown ids with a
    /// minimal definition.
    pub fn carry(&mut self, id: &str) -> bool {
        if !self.defs.contains_key(id) {
            self.defs.insert(id.to_string(), ItemDef::new(id, id));
        }
        self.carried.insert(id.to_string())
    }

    pub fn drop_item(&mut self, id: &str) -> bool {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
        self.carried.remove(id)
    }

    pub fn carried(&self) -> &BTreeSet<String> {
        &self.carried
    }

    pub fn is_carried(&self, id: &str) -> bool {
        self.carried.contains(id)
    }

    /// Selecting requires the item to be carried.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.carried.contains(id) {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_hovered(&mut self, id: Option<String>) {
        self.hovered = id;
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.defs.get(id)
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut ItemDef> {
        self.defs.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::InventoryLedger;

    #[test]
    fn select_requires_a_carried_item() {
        let mut ledger = InventoryLedger::new();
        assert!(!ledger.select("card"));
        ledger.carry("card");
        assert!(ledger.select("card"));
        assert_eq!(ledger.selected(), Some("card"));
    }

    #[test]
    fn dropping_the_selected_item_clears_the_selection() {
        let mut ledger = InventoryLedger::new();
        ledger.carry("card");
        ledger.select("card");
        assert!(ledger.drop_item("card"));
        assert_eq!(ledger.selected(), None);
        assert!(!ledger.is_carried("card"));
    }

    #[test]
    fn carrying_auto_defines_unknown_items() {
        let mut ledger = InventoryLedger::new();
        ledger.carry("rope");
        assert_eq!(ledger.item("rope").map(|d| d.label.as_str()), Some("rope"));
    }
}
