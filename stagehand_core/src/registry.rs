use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::hotspot::Hotspot;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterState {
    pub label: String,
    pub speaking: bool,
}

/// Per-scene ledger of the interactables the dispatcher queries each frame.
/// Registration and unregistration happen as objects enter and leave the
/// scene; `clear` empties everything on scene exit.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    hotspots: BTreeMap<String, Hotspot>,
    characters: BTreeMap<String, CharacterState>,
    cameras: BTreeSet<String>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the hotspot replaced an existing registration.
    pub fn register_hotspot(&mut self, hotspot: Hotspot) -> bool {
        self.hotspots.insert(hotspot.id.clone(), hotspot).is_some()
    }

    pub fn unregister_hotspot(&mut self, id: &str) -> Option<Hotspot> {
        self.hotspots.remove(id)
    }

    pub fn hotspot(&self, id: &str) -> Option<&Hotspot> {
        self.hotspots.get(id)
    }

    pub fn hotspot_mut(&mut self, id: &str) -> Option<&mut Hotspot> {
        self.hotspots.get_mut(id)
    }

    pub fn hotspots(&self) -> impl Iterator<Item = &Hotspot> {
        self.hotspots.values()
    }

    pub fn register_character(&mut self, id: impl Into<String>, label: impl Into<String>) {
        self.characters.insert(
            id.into(),
            CharacterState {
                label: label.into(),
                speaking: false,
            },
        );
    }

    pub fn character(&self, id: &str) -> Option<&CharacterState> {
        self.characters.get(id)
    }

    pub fn characters_mut(&mut self) -> impl Iterator<Item = (&String, &mut CharacterState)> {
        self.characters.iter_mut()
    }

    pub fn register_camera(&mut self, id: impl Into<String>) -> bool {
        self.cameras.insert(id.into())
    }

    pub fn cameras(&self) -> impl Iterator<Item = &String> {
        self.cameras.iter()
    }

    pub fn clear(&mut self) {
        self.hotspots.clear();
        self.characters.clear();
        self.cameras.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::SceneRegistry;
    use crate::hotspot::Hotspot;
    use crate::types::Pos;

    #[test]
    fn register_reports_replacement() {
        let mut registry = SceneRegistry::new();
        assert!(!registry.register_hotspot(Hotspot::new("door", "door", Pos::default())));
        assert!(registry.register_hotspot(Hotspot::new("door", "front door", Pos::default())));
        assert_eq!(registry.hotspot("door").map(|h| h.label.as_str()), Some("front door"));
    }

    #[test]
    fn clear_empties_every_collection() {
        let mut registry = SceneRegistry::new();
        registry.register_hotspot(Hotspot::new("door", "door", Pos::default()));
        registry.register_character("clerk", "Clerk");
        registry.register_camera("overhead");
        registry.clear();
        assert!(registry.hotspots().next().is_none());
        assert!(registry.character("clerk").is_none());
        assert!(registry.cameras().next().is_none());
    }
}
