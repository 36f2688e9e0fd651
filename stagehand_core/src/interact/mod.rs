//! Hotspot interaction dispatcher: per-frame candidate resolution,
//! edge-triggered selection, interaction commit with walk-then-interact
//! approaches, double-click handling, and interaction-index cycling.

pub mod approach;
pub mod cycling;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use approach::{ApproachPhase, ApproachSequence, ApproachTick, PendingInteraction};
pub use cycling::{CycleBehavior, CycleEntry};

use crate::hotspot::{Approach, DoubleClickReaction, Hotspot, InteractionKind, SequenceSource};
use crate::input::{ClickKind, InputSnapshot};
use crate::inventory::InventoryLedger;
use crate::mode::GameMode;
use crate::providers::{MenuHost, Navigator, SequenceTrigger, Services};
use crate::registry::SceneRegistry;
use crate::types::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMethod {
    /// Click commits the context-derived interaction directly.
    ContextSensitive,
    /// A verb is chosen first; clicking a hotspot runs that verb.
    ChooseInteractionThenHotspot,
    /// Clicking a hotspot opens its menu; the host commits explicitly.
    ChooseHotspotThenInteraction,
    /// The host script resolves and commits everything itself.
    CustomScript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotspotDetection {
    PointerOver,
    PlayerVicinity,
    CustomScript,
}

/// What the interaction index does when a hotspot is re-selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexRestore {
    RememberLast,
    ResetToFirst,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub method: InteractionMethod,
    pub detection: HotspotDetection,
    /// Candidates farther than this from the player are rejected; `0` turns
    /// the limit off.
    pub proximity_limit: f32,
    /// Within this distance of the approach target the interaction runs
    /// immediately, with no movement.
    pub arrive_radius: f32,
    /// Two primary single-clicks on the same hotspot within this many ticks
    /// count as a double-click.
    pub double_click_window: u32,
    pub cycle_behavior: CycleBehavior,
    pub index_restore: IndexRestore,
    /// With an inventory item selected, hide hotspots that expose no matching
    /// inventory button.
    pub auto_disable_without_match: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            method: InteractionMethod::ContextSensitive,
            detection: HotspotDetection::PointerOver,
            proximity_limit: 0.0,
            arrive_radius: 0.75,
            double_click_window: 12,
            cycle_behavior: CycleBehavior::Wrap,
            index_restore: IndexRestore::RememberLast,
            auto_disable_without_match: true,
        }
    }
}

/// Fallback sequences for interactions no button handles, consulted by icon,
/// then by inventory item, then globally.
#[derive(Debug, Default)]
pub struct UnhandledTable {
    by_icon: BTreeMap<u32, SequenceSource>,
    by_item: BTreeMap<String, SequenceSource>,
    global: Option<SequenceSource>,
}

impl UnhandledTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_icon_fallback(&mut self, icon: u32, source: SequenceSource) {
        self.by_icon.insert(icon, source);
    }

    pub fn set_item_fallback(&mut self, item: impl Into<String>, source: SequenceSource) {
        self.by_item.insert(item.into(), source);
    }

    pub fn set_global_fallback(&mut self, source: SequenceSource) {
        self.global = Some(source);
    }

    pub fn resolve(&self, icon: Option<u32>, item: Option<&str>) -> Option<&SequenceSource> {
        if let Some(source) = icon.and_then(|icon| self.by_icon.get(&icon)) {
            return Some(source);
        }
        if let Some(source) = item.and_then(|item| self.by_item.get(item)) {
            return Some(source);
        }
        self.global.as_ref()
    }
}

struct ResolvedButton {
    approach: Approach,
    face_after: bool,
    source: SequenceSource,
}

/// The interaction dispatcher. Holds only hotspot ids; the hotspots
/// themselves live in the scene registry.
#[derive(Default)]
pub struct InteractionRuntime {
    config: InteractionConfig,
    selected: Option<String>,
    /// Script-provided candidate, the top detection layer.
    manual: Option<String>,
    current_verb: Option<u32>,
    approach: ApproachSequence,
    last_click: Option<(u64, String)>,
}

impl InteractionRuntime {
    pub fn new(config: InteractionConfig) -> Self {
        InteractionRuntime {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut InteractionConfig {
        &mut self.config
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_manual_hotspot(&mut self, id: Option<String>) {
        self.manual = id;
    }

    pub fn set_current_verb(&mut self, icon: Option<u32>) {
        self.current_verb = icon;
    }

    pub fn is_approaching(&self) -> bool {
        self.approach.is_active()
    }

    /// Single per-frame entry point, run during the interaction phase while
    /// the game is in Normal mode.
    pub fn update_frame(
        &mut self,
        frame: u64,
        input: &InputSnapshot,
        mode: GameMode,
        registry: &mut SceneRegistry,
        inventory: &mut InventoryLedger,
        unhandled: &UnhandledTable,
        services: &mut Services<'_>,
    ) -> Vec<String> {
        let mut messages = Vec::new();
        if mode != GameMode::Normal {
            messages.extend(self.deselect(services.menu));
            return messages;
        }
        // an open interaction menu owns the pointer: clicks belong to the
        // menu and the current selection stays frozen as its target
        if services.menu.interaction_menu_open() {
            return messages;
        }
        if services.menu.pointer_over_ui() {
            messages.extend(self.deselect(services.menu));
            return messages;
        }

        let player = services.navigator.position();
        let candidate = self.resolve_candidate(input.pointer, player, registry, inventory);
        messages.extend(self.apply_selection(candidate.clone(), registry, inventory, services.menu));

        let double = self.detect_double_click(frame, input.primary, candidate.as_deref());
        if double {
            if let Some(id) = candidate.as_deref() {
                if self.approach.is_active_for(id) {
                    let id = id.to_string();
                    messages.extend(self.handle_double_click(&id, registry, services));
                    return messages;
                }
            }
        }

        if input.primary.is_press() {
            match candidate {
                Some(id) => match self.config.method {
                    InteractionMethod::ContextSensitive
                    | InteractionMethod::ChooseInteractionThenHotspot => {
                        if self.approach.is_active() && !self.approach.is_active_for(&id) {
                            messages.extend(self.approach.cancel(services.navigator));
                        }
                        let kind = match inventory.selected() {
                            Some(item)
                                if registry
                                    .hotspot(&id)
                                    .map_or(false, |hotspot| hotspot.has_inventory_match(item)) =>
                            {
                                InteractionKind::Inventory
                            }
                            _ => InteractionKind::Use,
                        };
                        messages.extend(self.run_interaction(
                            kind, &id, frame, registry, inventory, unhandled, services,
                        ));
                    }
                    InteractionMethod::ChooseHotspotThenInteraction => {
                        messages.push(format!("hotspot.menu {id}"));
                    }
                    InteractionMethod::CustomScript => {}
                },
                None => {
                    // miss-click: absorbed, but it still cancels a pending walk
                    messages.extend(self.approach.cancel(services.navigator));
                }
            }
        } else if input.secondary.is_press() && candidate.is_some() {
            messages.extend(self.set_next_interaction(registry, inventory));
        }
        messages
    }

    /// Commits an interaction on a hotspot: cancels any pending approach,
    /// resolves the button, walks over when required, and otherwise starts
    /// the sequence this tick. Falls back to the unhandled table before
    /// giving up.
    #[allow(clippy::too_many_arguments)]
    pub fn run_interaction(
        &mut self,
        kind: InteractionKind,
        hotspot_id: &str,
        frame: u64,
        registry: &SceneRegistry,
        inventory: &InventoryLedger,
        unhandled: &UnhandledTable,
        services: &mut Services<'_>,
    ) -> Vec<String> {
        let mut messages = Vec::new();
        messages.extend(self.approach.cancel(services.navigator));

        let Some(hotspot) = registry.hotspot(hotspot_id) else {
            log::warn!("interaction on unknown hotspot {hotspot_id}");
            return messages;
        };
        let Some(resolved) = self.resolve_button(kind, hotspot, inventory) else {
            let icon = self.current_verb;
            let item = if kind == InteractionKind::Inventory {
                inventory.selected()
            } else {
                None
            };
            if let Some(source) = unhandled.resolve(icon, item).cloned() {
                messages.push(format!("interact.unhandled {hotspot_id} {}", kind.label()));
                let trigger = SequenceTrigger::Unhandled {
                    label: format!("{hotspot_id} {}", kind.label()),
                };
                if services.runner.start(&source, trigger).is_some() {
                    messages.push(format!("sequence.start {}", source.describe()));
                }
            }
            return messages;
        };

        let target = match resolved.approach {
            Approach::WalkToMarker => hotspot.marker.unwrap_or(hotspot.position),
            _ => hotspot.position,
        };
        let double_click = hotspot.double_click;

        match resolved.approach {
            Approach::None => {
                messages.extend(self.start_sequence(hotspot_id, kind, resolved.source, services));
            }
            Approach::TurnToFace => {
                messages.push(format!("approach.face {hotspot_id}"));
                messages.extend(self.start_sequence(hotspot_id, kind, resolved.source, services));
            }
            Approach::WalkTo | Approach::WalkToMarker => {
                let player = services.navigator.position();
                if player.distance(target) <= self.config.arrive_radius {
                    if resolved.face_after {
                        messages.push(format!("approach.face {hotspot_id}"));
                    }
                    messages.extend(self.start_sequence(
                        hotspot_id,
                        kind,
                        resolved.source,
                        services,
                    ));
                } else {
                    let path = services.navigator.compute_path(player, target);
                    let waypoints = if path.is_empty() { vec![target] } else { path };
                    services
                        .navigator
                        .move_along(waypoints, crate::providers::Gait::Walk);
                    self.approach.start(
                        PendingInteraction {
                            hotspot: hotspot_id.to_string(),
                            kind,
                            source: resolved.source,
                            target,
                            face_after: resolved.face_after,
                            double_click,
                        },
                        frame,
                    );
                    messages.push(format!("approach.start {hotspot_id}"));
                }
            }
        }
        messages
    }

    /// Advances the approach state machine once; on arrival the pending
    /// interaction runs the same tick.
    pub fn tick_approach(&mut self, services: &mut Services<'_>) -> Vec<String> {
        let mut messages = Vec::new();
        match self.approach.tick(services.navigator) {
            ApproachTick::Idle | ApproachTick::InFlight => {}
            ApproachTick::Arrived(pending) => {
                messages.push(format!("approach.arrive {}", pending.hotspot));
                if pending.face_after {
                    messages.push(format!("approach.face {}", pending.hotspot));
                }
                messages.extend(self.start_sequence(
                    &pending.hotspot,
                    pending.kind,
                    pending.source,
                    services,
                ));
            }
        }
        messages
    }

    /// Forced cancellation: scene exits and scripted stops.
    pub fn stop_moving_to_hotspot(&mut self, navigator: &mut dyn Navigator) -> Vec<String> {
        self.last_click = None;
        self.approach.cancel(navigator).into_iter().collect()
    }

    pub fn deselect(&mut self, menu: &mut dyn MenuHost) -> Vec<String> {
        match self.selected.take() {
            Some(old) => {
                menu.set_hotspot_label(None);
                vec![format!("hotspot.deselect {old}")]
            }
            None => Vec::new(),
        }
    }

    pub fn set_next_interaction(
        &mut self,
        registry: &mut SceneRegistry,
        inventory: &mut InventoryLedger,
    ) -> Vec<String> {
        self.cycle(1, false, registry, inventory)
    }

    pub fn set_previous_interaction(
        &mut self,
        registry: &mut SceneRegistry,
        inventory: &mut InventoryLedger,
    ) -> Vec<String> {
        self.cycle(-1, false, registry, inventory)
    }

    pub fn reset_interaction_index(
        &mut self,
        registry: &mut SceneRegistry,
        inventory: &mut InventoryLedger,
    ) -> Vec<String> {
        self.cycle(0, true, registry, inventory)
    }

    /// The active hotspot wins; the hovered inventory item is only consulted
    /// when no hotspot is selected.
    fn cycle(
        &mut self,
        delta: i32,
        reset: bool,
        registry: &mut SceneRegistry,
        inventory: &mut InventoryLedger,
    ) -> Vec<String> {
        let carried = inventory.carried().clone();
        if let Some(id) = self.selected.clone() {
            if let Some(hotspot) = registry.hotspot_mut(&id) {
                let entries =
                    cycling::enabled_entries(&hotspot.use_buttons, &hotspot.inventory_buttons, &carried);
                let index = if reset {
                    cycling::reset_index(entries.len())
                } else {
                    cycling::advance(
                        hotspot.remembered_index,
                        entries.len(),
                        delta,
                        self.config.cycle_behavior,
                    )
                };
                hotspot.remembered_index = index;
                return vec![format!("cycle.index {id} {index}")];
            }
            return Vec::new();
        }
        if let Some(item_id) = inventory.hovered().map(str::to_string) {
            let behavior = self.config.cycle_behavior;
            if let Some(item) = inventory.item_mut(&item_id) {
                let entries =
                    cycling::enabled_entries(&item.use_buttons, &item.inventory_buttons, &carried);
                let index = if reset {
                    cycling::reset_index(entries.len())
                } else {
                    cycling::advance(item.remembered_index, entries.len(), delta, behavior)
                };
                item.remembered_index = index;
                return vec![format!("cycle.index {item_id} {index}")];
            }
        }
        Vec::new()
    }

    fn detect_double_click(
        &mut self,
        frame: u64,
        primary: ClickKind,
        candidate: Option<&str>,
    ) -> bool {
        match (primary, candidate) {
            (ClickKind::Double, Some(_)) => {
                self.last_click = None;
                true
            }
            (ClickKind::Single, Some(id)) => {
                let window = u64::from(self.config.double_click_window);
                let double = self
                    .last_click
                    .as_ref()
                    .map_or(false, |(at, last)| last == id && frame.saturating_sub(*at) <= window);
                self.last_click = if double {
                    None
                } else {
                    Some((frame, id.to_string()))
                };
                double
            }
            _ => {
                if primary.is_press() {
                    self.last_click = None;
                }
                false
            }
        }
    }

    fn handle_double_click(
        &mut self,
        id: &str,
        registry: &SceneRegistry,
        services: &mut Services<'_>,
    ) -> Vec<String> {
        let reaction = registry
            .hotspot(id)
            .map(|hotspot| hotspot.double_click)
            .unwrap_or(DoubleClickReaction::Ignore);
        match reaction {
            DoubleClickReaction::Ignore => Vec::new(),
            DoubleClickReaction::TriggersInstantly => {
                let Some(pending) = self.approach.snap(services.navigator) else {
                    return Vec::new();
                };
                let mut messages = vec![format!("approach.snap {}", pending.hotspot)];
                if pending.face_after {
                    messages.push(format!("approach.face {}", pending.hotspot));
                }
                messages.extend(self.start_sequence(
                    &pending.hotspot,
                    pending.kind,
                    pending.source,
                    services,
                ));
                messages
            }
            DoubleClickReaction::ElevatesToRun => {
                if self.approach.elevate(services.navigator) {
                    vec![format!("approach.run {id}")]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn start_sequence(
        &mut self,
        hotspot_id: &str,
        kind: InteractionKind,
        source: SequenceSource,
        services: &mut Services<'_>,
    ) -> Vec<String> {
        let trigger = SequenceTrigger::Hotspot {
            hotspot: hotspot_id.to_string(),
            interaction: kind,
        };
        match services.runner.start(&source, trigger) {
            Some(_) => vec![
                format!("interact.run {hotspot_id} {}", kind.label()),
                format!("sequence.start {}", source.describe()),
            ],
            None => {
                log::warn!(
                    "sequence runner refused {} for {hotspot_id}",
                    source.describe()
                );
                Vec::new()
            }
        }
    }

    /// Layered candidate resolution: the manual hotspot wins, then the
    /// configured detection. Candidates are rejected when disabled, out of
    /// the proximity limit, or filtered by the selected-item rule.
    fn resolve_candidate(
        &self,
        pointer: Pos,
        player: Pos,
        registry: &SceneRegistry,
        inventory: &InventoryLedger,
    ) -> Option<String> {
        let candidate = self.manual.clone().or_else(|| match self.config.detection {
            HotspotDetection::CustomScript => None,
            HotspotDetection::PlayerVicinity => registry
                .hotspots()
                .filter(|hotspot| hotspot.enabled)
                .map(|hotspot| (hotspot.position.distance(player), &hotspot.id))
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(_, id)| id.clone()),
            HotspotDetection::PointerOver => registry
                .hotspots()
                .filter(|hotspot| hotspot.enabled)
                .find(|hotspot| {
                    hotspot
                        .bounds
                        .map_or(false, |bounds| bounds.contains(pointer))
                })
                .map(|hotspot| hotspot.id.clone()),
        })?;

        let hotspot = registry.hotspot(&candidate)?;
        if !hotspot.enabled {
            return None;
        }
        if self.config.proximity_limit > 0.0
            && hotspot.position.distance(player) > self.config.proximity_limit
        {
            return None;
        }
        if self.config.auto_disable_without_match {
            if let Some(item) = inventory.selected() {
                if !hotspot.has_inventory_match(item) {
                    return None;
                }
            }
        }
        Some(candidate)
    }

    /// Edge-triggered: a change deselects the old hotspot before selecting
    /// the new one; re-resolving the same hotspot does nothing.
    fn apply_selection(
        &mut self,
        candidate: Option<String>,
        registry: &mut SceneRegistry,
        inventory: &InventoryLedger,
        menu: &mut dyn MenuHost,
    ) -> Vec<String> {
        if candidate == self.selected {
            return Vec::new();
        }
        let mut messages = self.deselect(menu);
        if let Some(id) = candidate {
            let carried = inventory.carried();
            if let Some(hotspot) = registry.hotspot_mut(&id) {
                let entries =
                    cycling::enabled_entries(&hotspot.use_buttons, &hotspot.inventory_buttons, carried);
                let keep = self.config.index_restore == IndexRestore::RememberLast
                    && hotspot.remembered_index >= 0
                    && (hotspot.remembered_index as usize) < entries.len();
                if !keep {
                    hotspot.remembered_index = cycling::reset_index(entries.len());
                }
                menu.set_hotspot_label(Some(&hotspot.label));
                messages.push(format!("hotspot.select {id}"));
                self.selected = Some(id);
            }
        }
        messages
    }

    fn resolve_button(
        &self,
        kind: InteractionKind,
        hotspot: &Hotspot,
        inventory: &InventoryLedger,
    ) -> Option<ResolvedButton> {
        match kind {
            InteractionKind::Use => {
                if self.config.method == InteractionMethod::ChooseInteractionThenHotspot {
                    if let Some(verb) = self.current_verb {
                        return hotspot
                            .use_buttons
                            .iter()
                            .find(|button| button.enabled && button.icon == verb)
                            .map(|button| ResolvedButton {
                                approach: button.approach,
                                face_after: button.face_after,
                                source: button.source.clone(),
                            });
                    }
                }
                if hotspot.remembered_index >= 0 {
                    let entries = cycling::enabled_entries(
                        &hotspot.use_buttons,
                        &hotspot.inventory_buttons,
                        inventory.carried(),
                    );
                    if let Some(entry) = entries.get(hotspot.remembered_index as usize) {
                        return match entry.kind {
                            InteractionKind::Use => {
                                hotspot.use_buttons.get(entry.position).map(|button| {
                                    ResolvedButton {
                                        approach: button.approach,
                                        face_after: button.face_after,
                                        source: button.source.clone(),
                                    }
                                })
                            }
                            _ => hotspot.inventory_buttons.get(entry.position).map(|button| {
                                ResolvedButton {
                                    approach: button.approach,
                                    face_after: false,
                                    source: button.source.clone(),
                                }
                            }),
                        };
                    }
                }
                hotspot.first_enabled_use().map(|button| ResolvedButton {
                    approach: button.approach,
                    face_after: button.face_after,
                    source: button.source.clone(),
                })
            }
            InteractionKind::Examine => hotspot
                .examine
                .as_ref()
                .filter(|button| button.enabled)
                .map(|button| ResolvedButton {
                    approach: button.approach,
                    face_after: false,
                    source: button.source.clone(),
                }),
            InteractionKind::Inventory => inventory
                .selected()
                .and_then(|item| hotspot.matching_inventory(item))
                .map(|button| ResolvedButton {
                    approach: button.approach,
                    face_after: false,
                    source: button.source.clone(),
                }),
        }
    }
}
