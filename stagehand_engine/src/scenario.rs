//! Scenario model: scene contents plus a scripted input timeline, parsed
//! from the `scenario` global of a Lua scenario file or built in Rust by the
//! built-in demo.

use anyhow::{bail, Context, Result};
use mlua::{Lua, Table, Value};
use stagehand_core::{
    AfterOption, Approach, ClickKind, Conversation, ConversationOption, ConversationTimeout,
    CycleBehavior, DoubleClickReaction, ExamineButton, GameContext, Hotspot, HotspotDetection,
    IndexRestore, InteractionConfig, InteractionMethod, InteractionRuntime, InventoryButton,
    ItemDef, Pos, Rect, SequenceSource, UnhandledTable, UseButton,
};

/// One scheduled action on the scripted timeline. `Input` feeds the frame's
/// input snapshot; the rest are host commands applied after the frame runs.
#[derive(Debug, Clone)]
pub enum TimelineStep {
    Input {
        frame: u64,
        pointer: Option<Pos>,
        primary: ClickKind,
        secondary: ClickKind,
        skip: bool,
    },
    ChooseSlot {
        frame: u64,
        slot: u32,
    },
    BeginConversation {
        frame: u64,
        conversation: String,
    },
    SelectItem {
        frame: u64,
        item: Option<String>,
    },
    Pause {
        frame: u64,
    },
    Resume {
        frame: u64,
    },
    SceneExit {
        frame: u64,
    },
}

impl TimelineStep {
    pub fn frame(&self) -> u64 {
        match self {
            TimelineStep::Input { frame, .. }
            | TimelineStep::ChooseSlot { frame, .. }
            | TimelineStep::BeginConversation { frame, .. }
            | TimelineStep::SelectItem { frame, .. }
            | TimelineStep::Pause { frame }
            | TimelineStep::Resume { frame }
            | TimelineStep::SceneExit { frame } => *frame,
        }
    }
}

pub struct ScenarioData {
    pub name: String,
    pub player: Pos,
    pub camera: Option<String>,
    pub config: InteractionConfig,
    pub hotspots: Vec<Hotspot>,
    pub items: Vec<ItemDef>,
    pub carried: Vec<String>,
    pub characters: Vec<(String, String)>,
    pub conversations: Vec<Conversation>,
    pub unhandled: UnhandledTable,
    pub timeline: Vec<TimelineStep>,
}

impl ScenarioData {
    /// Populates a fresh context with the scenario's scene contents.
    pub fn install(mut self, ctx: &mut GameContext) {
        ctx.interact = InteractionRuntime::new(self.config);
        for hotspot in self.hotspots.drain(..) {
            ctx.registry.register_hotspot(hotspot);
        }
        for item in self.items.drain(..) {
            ctx.inventory.define(item);
        }
        for id in &self.carried {
            if ctx.inventory.carry(id) {
                ctx.log_event(format!("inventory.add {id}"));
            }
        }
        for (id, label) in &self.characters {
            ctx.registry.register_character(id, label);
        }
        for conversation in self.conversations.drain(..) {
            ctx.conversations.register(conversation);
        }
        ctx.unhandled = self.unhandled;
        if let Some(camera) = &self.camera {
            ctx.registry.register_camera(camera);
            ctx.set_camera(camera.clone());
        }
    }
}

/// Reads the `scenario` global left behind by an executed scenario chunk.
pub fn parse(lua: &Lua) -> Result<ScenarioData> {
    let root: Table = lua
        .globals()
        .get("scenario")
        .context("no scenario table defined")?;

    let name: Option<String> = root.get("name")?;
    let player = match root.get::<_, Option<Table>>("player")? {
        Some(table) => parse_pos(&table).context("scenario.player")?,
        None => Pos::default(),
    };
    let camera: Option<String> = root.get("camera")?;

    let config = match root.get::<_, Option<Table>>("config")? {
        Some(table) => parse_config(&table).context("scenario.config")?,
        None => InteractionConfig::default(),
    };

    let mut hotspots = Vec::new();
    if let Some(table) = root.get::<_, Option<Table>>("hotspots")? {
        for (index, entry) in table.sequence_values::<Table>().enumerate() {
            let entry = entry?;
            let hotspot =
                parse_hotspot(&entry).with_context(|| format!("scenario.hotspots[{}]", index + 1))?;
            hotspots.push(hotspot);
        }
    }

    let mut items = Vec::new();
    if let Some(table) = root.get::<_, Option<Table>>("items")? {
        for (index, entry) in table.sequence_values::<Table>().enumerate() {
            let entry = entry?;
            let item =
                parse_item(&entry).with_context(|| format!("scenario.items[{}]", index + 1))?;
            items.push(item);
        }
    }

    let mut carried = Vec::new();
    if let Some(table) = root.get::<_, Option<Table>>("carried")? {
        for entry in table.sequence_values::<String>() {
            carried.push(entry?);
        }
    }

    let mut characters = Vec::new();
    if let Some(table) = root.get::<_, Option<Table>>("characters")? {
        for entry in table.sequence_values::<Table>() {
            let entry = entry?;
            let id: String = entry.get("id").context("character id")?;
            let label: String = entry.get::<_, Option<String>>("label")?.unwrap_or_else(|| id.clone());
            characters.push((id, label));
        }
    }

    let mut conversations = Vec::new();
    if let Some(table) = root.get::<_, Option<Table>>("conversations")? {
        for (index, entry) in table.sequence_values::<Table>().enumerate() {
            let entry = entry?;
            let conversation = parse_conversation(&entry)
                .with_context(|| format!("scenario.conversations[{}]", index + 1))?;
            conversations.push(conversation);
        }
    }

    let mut unhandled = UnhandledTable::new();
    if let Some(table) = root.get::<_, Option<Table>>("unhandled")? {
        if let Some(source) = table.get::<_, Option<String>>("global")? {
            unhandled.set_global_fallback(SequenceSource::Scene(source));
        }
        if let Some(icons) = table.get::<_, Option<Table>>("icons")? {
            for pair in icons.pairs::<u32, String>() {
                let (icon, source) = pair?;
                unhandled.set_icon_fallback(icon, SequenceSource::Scene(source));
            }
        }
        if let Some(per_item) = table.get::<_, Option<Table>>("items")? {
            for pair in per_item.pairs::<String, String>() {
                let (item, source) = pair?;
                unhandled.set_item_fallback(item, SequenceSource::Scene(source));
            }
        }
    }

    let mut timeline = Vec::new();
    if let Some(table) = root.get::<_, Option<Table>>("timeline")? {
        for (index, entry) in table.sequence_values::<Table>().enumerate() {
            let entry = entry?;
            parse_timeline_entry(&entry, &mut timeline)
                .with_context(|| format!("scenario.timeline[{}]", index + 1))?;
        }
    }
    timeline.sort_by_key(TimelineStep::frame);

    Ok(ScenarioData {
        name: name.unwrap_or_else(|| "scenario".to_string()),
        player,
        camera,
        config,
        hotspots,
        items,
        carried,
        characters,
        conversations,
        unhandled,
        timeline,
    })
}

fn parse_pos(table: &Table) -> Result<Pos> {
    let x: f32 = table.get("x").context("x")?;
    let y: f32 = table.get("y").context("y")?;
    Ok(Pos::new(x, y))
}

fn parse_rect(table: &Table) -> Result<Rect> {
    let x: f32 = table.get("x").context("x")?;
    let y: f32 = table.get("y").context("y")?;
    let w: f32 = table.get("w").context("w")?;
    let h: f32 = table.get("h").context("h")?;
    Ok(Rect::new(x, y, w, h))
}

fn parse_config(table: &Table) -> Result<InteractionConfig> {
    let mut config = InteractionConfig::default();
    if let Some(label) = table.get::<_, Option<String>>("method")? {
        config.method = match label.as_str() {
            "context_sensitive" => InteractionMethod::ContextSensitive,
            "choose_interaction_then_hotspot" => InteractionMethod::ChooseInteractionThenHotspot,
            "choose_hotspot_then_interaction" => InteractionMethod::ChooseHotspotThenInteraction,
            "custom_script" => InteractionMethod::CustomScript,
            other => bail!("unknown interaction method {other}"),
        };
    }
    if let Some(label) = table.get::<_, Option<String>>("detection")? {
        config.detection = match label.as_str() {
            "pointer_over" => HotspotDetection::PointerOver,
            "player_vicinity" => HotspotDetection::PlayerVicinity,
            "custom_script" => HotspotDetection::CustomScript,
            other => bail!("unknown hotspot detection {other}"),
        };
    }
    if let Some(limit) = table.get::<_, Option<f32>>("proximity_limit")? {
        config.proximity_limit = limit;
    }
    if let Some(radius) = table.get::<_, Option<f32>>("arrive_radius")? {
        config.arrive_radius = radius;
    }
    if let Some(window) = table.get::<_, Option<u32>>("double_click_window")? {
        config.double_click_window = window;
    }
    if let Some(label) = table.get::<_, Option<String>>("cycle")? {
        config.cycle_behavior = CycleBehavior::from_label(&label)
            .with_context(|| format!("unknown cycle behavior {label}"))?;
    }
    if let Some(label) = table.get::<_, Option<String>>("index_restore")? {
        config.index_restore = match label.as_str() {
            "remember" | "remember_last" => IndexRestore::RememberLast,
            "reset" | "reset_to_first" => IndexRestore::ResetToFirst,
            other => bail!("unknown index restore {other}"),
        };
    }
    if let Some(auto) = table.get::<_, Option<bool>>("auto_disable_without_match")? {
        config.auto_disable_without_match = auto;
    }
    Ok(config)
}

fn parse_approach(table: &Table) -> Result<Approach> {
    match table.get::<_, Option<String>>("approach")? {
        Some(label) => {
            Approach::from_label(&label).with_context(|| format!("unknown approach {label}"))
        }
        None => Ok(Approach::WalkTo),
    }
}

fn parse_source(table: &Table, key: &str) -> Result<SequenceSource> {
    let name: String = table
        .get::<_, Option<String>>(key)?
        .with_context(|| format!("missing {key}"))?;
    Ok(SequenceSource::Scene(name))
}

fn parse_hotspot(table: &Table) -> Result<Hotspot> {
    let id: String = table.get("id").context("hotspot id")?;
    let label: String = table
        .get::<_, Option<String>>("label")?
        .unwrap_or_else(|| id.clone());
    let position = parse_pos(table).context("hotspot position")?;
    let mut hotspot = Hotspot::new(id, label, position);

    if let Some(bounds) = table.get::<_, Option<Table>>("bounds")? {
        hotspot = hotspot.with_bounds(parse_rect(&bounds).context("hotspot bounds")?);
    }
    if let Some(marker) = table.get::<_, Option<Table>>("marker")? {
        hotspot = hotspot.with_marker(parse_pos(&marker).context("hotspot marker")?);
    }
    if let Some(label) = table.get::<_, Option<String>>("double_click")? {
        let reaction = DoubleClickReaction::from_label(&label)
            .with_context(|| format!("unknown double-click reaction {label}"))?;
        hotspot = hotspot.with_double_click(reaction);
    }
    if let Some(enabled) = table.get::<_, Option<bool>>("enabled")? {
        hotspot.enabled = enabled;
    }

    if let Some(buttons) = table.get::<_, Option<Table>>("use")? {
        for (index, entry) in buttons.sequence_values::<Table>().enumerate() {
            let entry = entry?;
            let icon: u32 = entry.get::<_, Option<u32>>("icon")?.unwrap_or(1);
            let approach = parse_approach(&entry)?;
            let source = parse_source(&entry, "sequence")
                .with_context(|| format!("use[{}]", index + 1))?;
            let mut button = UseButton::new(icon, approach, source);
            if let Some(face_after) = entry.get::<_, Option<bool>>("face_after")? {
                button.face_after = face_after;
            }
            if let Some(enabled) = entry.get::<_, Option<bool>>("enabled")? {
                button.enabled = enabled;
            }
            hotspot = hotspot.with_use(button);
        }
    }
    if let Some(entry) = table.get::<_, Option<Table>>("examine")? {
        let approach = parse_approach(&entry)?;
        let source = parse_source(&entry, "sequence").context("examine")?;
        hotspot = hotspot.with_examine(ExamineButton::new(approach, source));
    }
    if let Some(buttons) = table.get::<_, Option<Table>>("inventory")? {
        for (index, entry) in buttons.sequence_values::<Table>().enumerate() {
            let entry = entry?;
            let item: String = entry
                .get::<_, Option<String>>("item")?
                .with_context(|| format!("inventory[{}] item", index + 1))?;
            let approach = parse_approach(&entry)?;
            let source = parse_source(&entry, "sequence")
                .with_context(|| format!("inventory[{}]", index + 1))?;
            hotspot = hotspot.with_inventory(InventoryButton::new(item, approach, source));
        }
    }
    Ok(hotspot)
}

fn parse_item(table: &Table) -> Result<ItemDef> {
    let id: String = table.get("id").context("item id")?;
    let label: String = table
        .get::<_, Option<String>>("label")?
        .unwrap_or_else(|| id.clone());
    Ok(ItemDef::new(id, label))
}

fn parse_conversation(table: &Table) -> Result<Conversation> {
    let id: String = table.get("id").context("conversation id")?;
    let label: String = table
        .get::<_, Option<String>>("label")?
        .unwrap_or_else(|| id.clone());
    let mut conversation = Conversation::new(id, label);
    if table.get::<_, Option<bool>>("auto_play")?.unwrap_or(false) {
        conversation = conversation.with_auto_play();
    }
    if let Some(timeout) = table.get::<_, Option<Table>>("timeout")? {
        let ticks: u32 = timeout.get("ticks").context("timeout ticks")?;
        let default_option_index: i32 = timeout
            .get::<_, Option<i32>>("default_option")?
            .unwrap_or(-1);
        conversation = conversation.with_timeout(ConversationTimeout {
            ticks,
            default_option_index,
        });
    }

    let options: Table = table.get("options").context("conversation options")?;
    for (index, entry) in options.sequence_values::<Table>().enumerate() {
        let entry = entry?;
        let option = parse_option(&entry)
            .with_context(|| format!("options[{}]", index + 1))?;
        conversation = conversation.with_option(option);
    }
    Ok(conversation)
}

fn parse_option(table: &Table) -> Result<ConversationOption> {
    let id: u32 = table.get("id").context("option id")?;
    let label: String = table.get("label").context("option label")?;
    let source = parse_source(table, "sequence")?;
    let mut option = ConversationOption::new(id, label, source);
    if table.get::<_, Option<bool>>("locked")?.unwrap_or(false) {
        option = option.locked();
    }
    if let Some(enabled) = table.get::<_, Option<bool>>("enabled")? {
        option.enabled = enabled;
    }
    match table.get::<_, Option<Value>>("link")? {
        None => {}
        Some(Value::String(label)) => {
            option = option.with_link(match label.to_str()? {
                "end" => AfterOption::End,
                "return" => AfterOption::ReturnToSelf,
                other => bail!("unknown option link {other}"),
            });
        }
        Some(Value::Table(link)) => {
            let target: String = link.get("jump").context("link jump target")?;
            option = option.with_link(AfterOption::JumpTo(target));
        }
        Some(other) => bail!("unsupported option link type {}", other.type_name()),
    }
    Ok(option)
}

fn parse_click(table: &Table, key: &str) -> Result<ClickKind> {
    match table.get::<_, Option<String>>(key)? {
        Some(label) => {
            ClickKind::from_label(&label).with_context(|| format!("unknown click kind {label}"))
        }
        None => Ok(ClickKind::None),
    }
}

fn parse_timeline_entry(table: &Table, timeline: &mut Vec<TimelineStep>) -> Result<()> {
    let frame: u64 = table.get("frame").context("timeline frame")?;

    let pointer = match table.get::<_, Option<Table>>("pointer")? {
        Some(pos) => Some(parse_pos(&pos).context("timeline pointer")?),
        None => None,
    };
    let primary = parse_click(table, "click")?;
    let secondary = parse_click(table, "secondary")?;
    let skip = table.get::<_, Option<bool>>("skip")?.unwrap_or(false);
    if pointer.is_some() || primary != ClickKind::None || secondary != ClickKind::None || skip {
        timeline.push(TimelineStep::Input {
            frame,
            pointer,
            primary,
            secondary,
            skip,
        });
    }

    if let Some(slot) = table.get::<_, Option<u32>>("choose")? {
        timeline.push(TimelineStep::ChooseSlot { frame, slot });
    }
    if let Some(conversation) = table.get::<_, Option<String>>("begin_conversation")? {
        timeline.push(TimelineStep::BeginConversation { frame, conversation });
    }
    if let Some(item) = table.get::<_, Option<String>>("select_item")? {
        timeline.push(TimelineStep::SelectItem {
            frame,
            item: Some(item),
        });
    }
    if table.get::<_, Option<bool>>("deselect_item")?.unwrap_or(false) {
        timeline.push(TimelineStep::SelectItem { frame, item: None });
    }
    if table.get::<_, Option<bool>>("pause")?.unwrap_or(false) {
        timeline.push(TimelineStep::Pause { frame });
    }
    if table.get::<_, Option<bool>>("resume")?.unwrap_or(false) {
        timeline.push(TimelineStep::Resume { frame });
    }
    if table.get::<_, Option<bool>>("scene_exit")?.unwrap_or(false) {
        timeline.push(TimelineStep::SceneExit { frame });
    }
    Ok(())
}
