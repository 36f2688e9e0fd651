//! Built-in demo: a small office scene driven by a scripted runner, so the
//! binary exercises the full interaction/dialogue loop with no scenario file.

use std::collections::{BTreeMap, VecDeque};

use anyhow::Result;
use stagehand_core::{
    AfterOption, Approach, ClickKind, Conversation, ConversationOption, ConversationTimeout,
    DoubleClickReaction, ExamineButton, Hotspot, InteractionConfig, ItemDef, Pos, Rect, RunHandle,
    SequenceEffect, SequenceRunner, SequenceSource, SequenceTrigger, UnhandledTable, UseButton,
};

use crate::cue::split_voice_cue;
use crate::scenario::{ScenarioData, TimelineStep};

/// Sequence runner that replays pre-authored effect batches, one batch per
/// tick, mirroring how a coroutine would drip effects across frames.
pub struct ScriptedRunner {
    scripts: BTreeMap<String, Vec<Vec<SequenceEffect>>>,
    running: BTreeMap<u32, VecDeque<Vec<SequenceEffect>>>,
    next_handle: u32,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        ScriptedRunner {
            scripts: BTreeMap::new(),
            running: BTreeMap::new(),
            next_handle: 0,
        }
    }

    pub fn define(&mut self, name: impl Into<String>, batches: Vec<Vec<SequenceEffect>>) {
        self.scripts.insert(name.into(), batches);
    }
}

impl SequenceRunner for ScriptedRunner {
    fn start(&mut self, source: &SequenceSource, trigger: SequenceTrigger) -> Option<RunHandle> {
        let name = source.name();
        let Some(batches) = self.scripts.get(name) else {
            log::warn!("no scripted sequence named {name}");
            return None;
        };
        log::debug!("sequence {name} started by {}", trigger.describe());
        self.next_handle += 1;
        self.running
            .insert(self.next_handle, batches.iter().cloned().collect());
        Some(RunHandle(self.next_handle))
    }

    fn is_running(&self, handle: RunHandle) -> bool {
        self.running.contains_key(&handle.0)
    }

    fn any_blocking(&self) -> bool {
        !self.running.is_empty()
    }

    fn tick(&mut self) -> Vec<SequenceEffect> {
        let mut effects = Vec::new();
        let mut finished = Vec::new();
        for (handle, batches) in self.running.iter_mut() {
            if let Some(batch) = batches.pop_front() {
                effects.extend(batch);
            }
            if batches.is_empty() {
                finished.push(*handle);
            }
        }
        for handle in finished {
            self.running.remove(&handle);
        }
        effects
    }
}

fn say(speaker: Option<&str>, text: &str) -> Result<SequenceEffect> {
    let (cue, rest) = split_voice_cue(text)?;
    Ok(SequenceEffect::Say {
        speaker: speaker.map(str::to_string),
        text: rest,
        cue,
        background: false,
        prevent_skip: false,
        ticks: 24,
    })
}

fn scene(name: &str) -> SequenceSource {
    SequenceSource::Scene(name.to_string())
}

/// The office: a records terminal that hands out a keycard and opens a
/// clerk conversation, and a door across the room. The timeline walks the
/// player through both, lets the clerk conversation time out, and exits.
pub fn office() -> Result<(ScenarioData, ScriptedRunner)> {
    let mut runner = ScriptedRunner::new();
    runner.define(
        "use_terminal",
        vec![
            vec![say(Some("manny"), "/term001/ The records terminal hums to life.")?],
            vec![],
            vec![SequenceEffect::AddItem {
                item: "keycard".to_string(),
            }],
            vec![SequenceEffect::StartConversation {
                conversation: "clerk".to_string(),
            }],
        ],
    );
    runner.define(
        "examine_terminal",
        vec![vec![say(None, "A records terminal. It has seen better decades.")?]],
    );
    runner.define(
        "ask_vault",
        vec![
            vec![say(Some("clerk"), "/cl042/ The vault opens for donors only.")?],
            vec![],
        ],
    );
    runner.define(
        "hand_keycard",
        vec![
            vec![
                SequenceEffect::RemoveItem {
                    item: "keycard".to_string(),
                },
                say(Some("clerk"), "/cl051/ I'll take that.")?,
            ],
            vec![],
        ],
    );
    runner.define("leave", vec![vec![say(Some("clerk"), "/cl060/ Next!")?]]);
    runner.define(
        "open_door",
        vec![
            vec![say(None, "The door swings open.")?],
            vec![SequenceEffect::TeleportPlayer { x: -4.0, y: 3.0 }],
        ],
    );
    runner.define("shrug", vec![vec![say(Some("manny"), "That gets me nowhere.")?]]);

    let terminal = Hotspot::new("terminal", "Records Terminal", Pos::new(2.0, 0.0))
        .with_bounds(Rect::new(0.0, 0.0, 10.0, 10.0))
        .with_use(UseButton::new(1, Approach::WalkTo, scene("use_terminal")))
        .with_examine(ExamineButton::new(
            Approach::TurnToFace,
            scene("examine_terminal"),
        ))
        .with_double_click(DoubleClickReaction::TriggersInstantly);

    let door = Hotspot::new("door", "Office Door", Pos::new(-4.0, 3.0))
        .with_bounds(Rect::new(20.0, 0.0, 10.0, 10.0))
        .with_marker(Pos::new(-3.5, 3.0))
        .with_use(UseButton::new(
            1,
            Approach::WalkToMarker,
            scene("open_door"),
        ))
        .with_double_click(DoubleClickReaction::ElevatesToRun);

    let clerk = Conversation::new("clerk", "Records Clerk")
        .with_timeout(ConversationTimeout {
            ticks: 40,
            default_option_index: 2,
        })
        .with_option(
            ConversationOption::new(1, "Ask about the vault", scene("ask_vault"))
                .with_link(AfterOption::ReturnToSelf),
        )
        .with_option(ConversationOption::new(2, "Hand over the keycard", scene("hand_keycard")))
        .with_option(ConversationOption::new(3, "Leave", scene("leave")));

    let mut unhandled = UnhandledTable::new();
    unhandled.set_global_fallback(scene("shrug"));

    let timeline = vec![
        TimelineStep::Input {
            frame: 1,
            pointer: Some(Pos::new(5.0, 5.0)),
            primary: ClickKind::None,
            secondary: ClickKind::None,
            skip: false,
        },
        TimelineStep::Input {
            frame: 2,
            pointer: None,
            primary: ClickKind::Single,
            secondary: ClickKind::None,
            skip: false,
        },
        // second click inside the double-click window snaps to the terminal
        TimelineStep::Input {
            frame: 4,
            pointer: None,
            primary: ClickKind::Single,
            secondary: ClickKind::None,
            skip: false,
        },
        TimelineStep::ChooseSlot { frame: 12, slot: 0 },
        // the re-presented conversation is left to its deadline after this
        TimelineStep::Input {
            frame: 70,
            pointer: Some(Pos::new(25.0, 5.0)),
            primary: ClickKind::None,
            secondary: ClickKind::None,
            skip: false,
        },
        TimelineStep::Input {
            frame: 71,
            pointer: None,
            primary: ClickKind::Single,
            secondary: ClickKind::None,
            skip: false,
        },
        TimelineStep::Input {
            frame: 73,
            pointer: None,
            primary: ClickKind::Single,
            secondary: ClickKind::None,
            skip: false,
        },
        TimelineStep::SelectItem {
            frame: 120,
            item: Some("keycard".to_string()),
        },
        TimelineStep::SelectItem {
            frame: 122,
            item: None,
        },
        TimelineStep::Pause { frame: 150 },
        TimelineStep::Resume { frame: 152 },
        TimelineStep::SceneExit { frame: 200 },
    ];

    let data = ScenarioData {
        name: "office".to_string(),
        player: Pos::new(0.0, 0.0),
        camera: Some("office_overhead".to_string()),
        config: InteractionConfig::default(),
        hotspots: vec![terminal, door],
        items: vec![ItemDef::new("keycard", "Records Keycard")],
        carried: Vec::new(),
        characters: vec![
            ("manny".to_string(), "Manny".to_string()),
            ("clerk".to_string(), "Records Clerk".to_string()),
        ],
        conversations: vec![clerk],
        unhandled,
        timeline,
    };
    Ok((data, runner))
}
