//! Lua-backed sequence runner. Scenario action sequences are Lua functions
//! run as coroutines: one resume per queued-sequence phase, `stage.wait(n)`
//! yielding to spread work across frames. Every `stage.*` call maps to a
//! `SequenceEffect` that the core applies on the same tick.

use std::{cell::RefCell, collections::BTreeMap, fs, path::Path, rc::Rc};

use anyhow::{bail, Context, Result};
use mlua::{Function, Lua, MultiValue, RegistryKey, Table, Thread, ThreadStatus};
use stagehand_core::{GameMode, RunHandle, SequenceEffect, SequenceRunner, SequenceSource, SequenceTrigger};

use crate::cue::split_voice_cue;
use crate::scenario::{self, ScenarioData};

const PRELUDE: &str = r#"
function stage.wait(n)
    for _ = 1, (n or 1) do
        coroutine.yield()
    end
end
"#;

struct RunningSequence {
    thread: RegistryKey,
    label: String,
}

pub struct LuaSequenceRunner {
    lua: Lua,
    effects: Rc<RefCell<Vec<SequenceEffect>>>,
    sequences: BTreeMap<String, RegistryKey>,
    running: BTreeMap<u32, RunningSequence>,
    next_handle: u32,
}

impl LuaSequenceRunner {
    pub fn new() -> Result<Self> {
        let lua = Lua::new();
        let effects = Rc::new(RefCell::new(Vec::new()));
        install_stage_api(&lua, effects.clone()).context("installing the stage API")?;
        lua.load(PRELUDE)
            .set_name("stage prelude")
            .exec()
            .context("loading the stage prelude")?;
        Ok(LuaSequenceRunner {
            lua,
            effects,
            sequences: BTreeMap::new(),
            running: BTreeMap::new(),
            next_handle: 0,
        })
    }

    /// Executes a scenario file and registers its `sequences` functions.
    /// Returns the parsed scene/timeline data for the runtime to install.
    pub fn load_scenario(&mut self, path: &Path) -> Result<ScenarioData> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading scenario from {}", path.display()))?;
        self.lua
            .load(&source)
            .set_name(path.display().to_string())
            .exec()
            .with_context(|| format!("executing scenario {}", path.display()))?;

        let sequences: Table = self
            .lua
            .globals()
            .get("sequences")
            .with_context(|| format!("scenario {} defines no sequences table", path.display()))?;
        for pair in sequences.pairs::<String, Function>() {
            let (name, function) = pair.context("reading a sequences entry")?;
            let key = self
                .lua
                .create_registry_value(function)
                .with_context(|| format!("registering sequence {name}"))?;
            self.sequences.insert(name, key);
        }
        if self.sequences.is_empty() {
            bail!("scenario {} defines an empty sequences table", path.display());
        }

        scenario::parse(&self.lua)
            .with_context(|| format!("parsing scenario table from {}", path.display()))
    }
}

impl SequenceRunner for LuaSequenceRunner {
    fn start(&mut self, source: &SequenceSource, trigger: SequenceTrigger) -> Option<RunHandle> {
        let name = source.name();
        let Some(key) = self.sequences.get(name) else {
            log::warn!("no sequence named {name}");
            return None;
        };
        let function: Function = match self.lua.registry_value(key) {
            Ok(function) => function,
            Err(err) => {
                log::warn!("sequence {name} is unusable: {err}");
                return None;
            }
        };
        let thread = match self.lua.create_thread(function) {
            Ok(thread) => thread,
            Err(err) => {
                log::warn!("sequence {name} could not start: {err}");
                return None;
            }
        };
        log::debug!("sequence {name} started by {}", trigger.describe());

        self.next_handle += 1;
        let handle = RunHandle(self.next_handle);
        // first resume happens at start so same-tick effects land this frame
        if !resume_once(&thread, name) {
            let thread_key = match self.lua.create_registry_value(thread) {
                Ok(key) => key,
                Err(err) => {
                    log::warn!("sequence {name} could not be retained: {err}");
                    return Some(handle);
                }
            };
            self.running.insert(
                handle.0,
                RunningSequence {
                    thread: thread_key,
                    label: name.to_string(),
                },
            );
        }
        Some(handle)
    }

    fn is_running(&self, handle: RunHandle) -> bool {
        self.running.contains_key(&handle.0)
    }

    fn any_blocking(&self) -> bool {
        !self.running.is_empty()
    }

    fn tick(&mut self) -> Vec<SequenceEffect> {
        let handles: Vec<u32> = self.running.keys().copied().collect();
        let mut finished = Vec::new();
        for handle in handles {
            let Some(state) = self.running.get(&handle) else {
                continue;
            };
            let done = match self.lua.registry_value::<Thread>(&state.thread) {
                Ok(thread) => resume_once(&thread, &state.label),
                Err(err) => {
                    log::warn!("sequence {} lost its thread: {err}", state.label);
                    true
                }
            };
            if done {
                finished.push(handle);
            }
        }
        for handle in finished {
            if let Some(state) = self.running.remove(&handle) {
                if let Err(err) = self.lua.remove_registry_value(state.thread) {
                    log::warn!("sequence {} cleanup failed: {err}", state.label);
                }
            }
        }
        std::mem::take(&mut *self.effects.borrow_mut())
    }
}

/// Resumes a coroutine once; `true` when it has finished (or failed).
fn resume_once(thread: &Thread<'_>, label: &str) -> bool {
    if !matches!(thread.status(), ThreadStatus::Resumable) {
        return true;
    }
    match thread.resume::<_, MultiValue>(()) {
        Ok(_) => !matches!(thread.status(), ThreadStatus::Resumable),
        Err(err) => {
            log::warn!("sequence {label} failed: {err}");
            true
        }
    }
}

fn install_stage_api(lua: &Lua, effects: Rc<RefCell<Vec<SequenceEffect>>>) -> Result<()> {
    let stage = lua.create_table()?;

    let sink = effects.clone();
    stage.set(
        "say",
        lua.create_function(
            move |_, (speaker, text, opts): (Option<String>, String, Option<Table>)| {
                let (cue, rest) = split_voice_cue(&text).map_err(mlua::Error::external)?;
                let mut background = false;
                let mut prevent_skip = false;
                let mut ticks = 24u32;
                if let Some(opts) = opts {
                    background = opts.get::<_, Option<bool>>("background")?.unwrap_or(false);
                    prevent_skip = opts.get::<_, Option<bool>>("prevent_skip")?.unwrap_or(false);
                    ticks = opts.get::<_, Option<u32>>("ticks")?.unwrap_or(24);
                }
                sink.borrow_mut().push(SequenceEffect::Say {
                    speaker,
                    text: rest,
                    cue,
                    background,
                    prevent_skip,
                    ticks,
                });
                Ok(())
            },
        )?,
    )?;

    let sink = effects.clone();
    stage.set(
        "add_item",
        lua.create_function(move |_, item: String| {
            sink.borrow_mut().push(SequenceEffect::AddItem { item });
            Ok(())
        })?,
    )?;

    let sink = effects.clone();
    stage.set(
        "remove_item",
        lua.create_function(move |_, item: String| {
            sink.borrow_mut().push(SequenceEffect::RemoveItem { item });
            Ok(())
        })?,
    )?;

    let sink = effects.clone();
    stage.set(
        "select_item",
        lua.create_function(move |_, item: Option<String>| {
            sink.borrow_mut().push(SequenceEffect::SelectItem { item });
            Ok(())
        })?,
    )?;

    let sink = effects.clone();
    stage.set(
        "enable_hotspot",
        lua.create_function(move |_, (hotspot, enabled): (String, bool)| {
            sink.borrow_mut()
                .push(SequenceEffect::EnableHotspot { hotspot, enabled });
            Ok(())
        })?,
    )?;

    let sink = effects.clone();
    stage.set(
        "start_conversation",
        lua.create_function(move |_, conversation: String| {
            sink.borrow_mut()
                .push(SequenceEffect::StartConversation { conversation });
            Ok(())
        })?,
    )?;

    let sink = effects.clone();
    stage.set(
        "end_conversation",
        lua.create_function(move |_, ()| {
            sink.borrow_mut().push(SequenceEffect::EndConversation);
            Ok(())
        })?,
    )?;

    let sink = effects.clone();
    stage.set(
        "set_option_enabled",
        lua.create_function(
            move |_, (conversation, option, enabled): (String, u32, bool)| {
                sink.borrow_mut().push(SequenceEffect::SetOptionEnabled {
                    conversation,
                    option,
                    enabled,
                });
                Ok(())
            },
        )?,
    )?;

    let sink = effects.clone();
    stage.set(
        "set_option_locked",
        lua.create_function(
            move |_, (conversation, option, locked): (String, u32, bool)| {
                sink.borrow_mut().push(SequenceEffect::SetOptionLocked {
                    conversation,
                    option,
                    locked,
                });
                Ok(())
            },
        )?,
    )?;

    let sink = effects.clone();
    stage.set(
        "teleport",
        lua.create_function(move |_, (x, y): (f32, f32)| {
            sink.borrow_mut().push(SequenceEffect::TeleportPlayer { x, y });
            Ok(())
        })?,
    )?;

    let sink = effects;
    stage.set(
        "set_mode",
        lua.create_function(move |_, label: String| {
            let Some(mode) = GameMode::from_label(&label) else {
                return Err(mlua::Error::external(format!("unknown mode {label}")));
            };
            sink.borrow_mut().push(SequenceEffect::SetMode { mode });
            Ok(())
        })?,
    )?;

    lua.globals().set("stage", stage)?;
    Ok(())
}
