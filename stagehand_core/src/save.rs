//! Session snapshots: the runtime-mutable flags captured as a JSON blob and
//! re-applied onto a freshly loaded scene. Executing sequences are never
//! resumed; an open conversation is reopened at the choice prompt.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::GameContext;
use crate::mode::{GameMode, ModeState};
use crate::providers::Services;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot blob: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotFlags {
    pub enabled: bool,
    pub remembered_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionFlags {
    pub id: u32,
    pub enabled: bool,
    pub locked: bool,
    pub chosen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub mode: ModeState,
    pub caps: u16,
    pub carried: Vec<String>,
    pub selected_item: Option<String>,
    pub hotspots: BTreeMap<String, HotspotFlags>,
    pub conversations: BTreeMap<String, Vec<OptionFlags>>,
    pub active_conversation: Option<String>,
}

impl SessionSnapshot {
    pub fn capture(ctx: &GameContext) -> SessionSnapshot {
        let hotspots = ctx
            .registry
            .hotspots()
            .map(|hotspot| {
                (
                    hotspot.id.clone(),
                    HotspotFlags {
                        enabled: hotspot.enabled,
                        remembered_index: hotspot.remembered_index,
                    },
                )
            })
            .collect();
        let conversations = ctx
            .conversations
            .all()
            .map(|conversation| {
                let flags = conversation
                    .options
                    .iter()
                    .map(|option| OptionFlags {
                        id: option.id,
                        enabled: option.enabled,
                        locked: option.locked,
                        chosen: option.chosen,
                    })
                    .collect();
                (conversation.id.clone(), flags)
            })
            .collect();
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            mode: ctx.mode.clone(),
            caps: ctx.caps.bits(),
            carried: ctx.inventory.carried().iter().cloned().collect(),
            selected_item: ctx.inventory.selected().map(str::to_string),
            hotspots,
            conversations,
            active_conversation: ctx.conversations.active_id().map(str::to_string),
        }
    }

    pub fn to_blob(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_blob(blob: &str) -> Result<SessionSnapshot, SnapshotError> {
        let snapshot: SessionSnapshot = serde_json::from_str(blob)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Re-applies the captured flags. Ids the current scene does not know are
    /// warned about and discarded. An active conversation is reopened at the
    /// choice prompt; a captured Cutscene mode is recomputed away because the
    /// sequence that caused it is gone.
    pub fn apply(&self, ctx: &mut GameContext, services: &mut Services<'_>) {
        ctx.caps = crate::caps::SystemCaps::from_bits(self.caps);

        for id in ctx
            .inventory
            .carried()
            .iter()
            .cloned()
            .collect::<Vec<_>>()
        {
            ctx.inventory.drop_item(&id);
        }
        for id in &self.carried {
            ctx.inventory.carry(id);
        }
        match &self.selected_item {
            Some(item) => {
                if !ctx.inventory.select(item) {
                    log::warn!("snapshot selects {item}, which is not carried");
                }
            }
            None => ctx.inventory.deselect(),
        }

        for (id, flags) in &self.hotspots {
            match ctx.registry.hotspot_mut(id) {
                Some(hotspot) => {
                    hotspot.enabled = flags.enabled;
                    hotspot.remembered_index = flags.remembered_index;
                }
                None => log::warn!("snapshot references unknown hotspot {id}"),
            }
        }

        for (conversation, options) in &self.conversations {
            for flags in options {
                match ctx.conversations.option_mut(conversation, flags.id) {
                    Some(option) => {
                        option.enabled = flags.enabled;
                        option.locked = flags.locked;
                        option.chosen = flags.chosen;
                    }
                    None => {
                        log::warn!(
                            "snapshot references unknown option {} of {conversation}",
                            flags.id
                        )
                    }
                }
            }
        }

        ctx.log_event("snapshot.restore");
        ctx.mode = self.mode.clone();
        match &self.active_conversation {
            Some(id) => ctx.begin_conversation(id, services),
            None => {
                if ctx.mode.get() == GameMode::Cutscene {
                    ctx.recompute_mode(services.runner.any_blocking());
                }
            }
        }
    }
}
