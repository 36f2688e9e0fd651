use serde::{Deserialize, Serialize};

use crate::hotspot::{InteractionKind, SequenceSource};
use crate::mode::GameMode;
use crate::types::Pos;

/// Handle to a running action sequence, issued by the sequence runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunHandle(pub u32);

/// Handle to a playing voice line, issued by the speech-audio provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gait {
    Walk,
    Run,
}

/// What caused a sequence to start; carried for diagnostics and journaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SequenceTrigger {
    Hotspot {
        hotspot: String,
        interaction: InteractionKind,
    },
    ConversationOption {
        conversation: String,
        option: u32,
    },
    Unhandled {
        label: String,
    },
    Scripted,
}

impl SequenceTrigger {
    pub fn describe(&self) -> String {
        match self {
            SequenceTrigger::Hotspot {
                hotspot,
                interaction,
            } => format!("hotspot {hotspot} {}", interaction.label()),
            SequenceTrigger::ConversationOption {
                conversation,
                option,
            } => format!("conversation {conversation} option {option}"),
            SequenceTrigger::Unhandled { label } => format!("unhandled {label}"),
            SequenceTrigger::Scripted => "scripted".to_string(),
        }
    }
}

/// The typed command surface action sequences use to reach back into the
/// core. The runner returns a batch per tick; the context applies them in
/// order during the queued-sequence phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SequenceEffect {
    Say {
        speaker: Option<String>,
        text: String,
        cue: Option<String>,
        background: bool,
        prevent_skip: bool,
        ticks: u32,
    },
    StartConversation {
        conversation: String,
    },
    EndConversation,
    SetOptionEnabled {
        conversation: String,
        option: u32,
        enabled: bool,
    },
    SetOptionLocked {
        conversation: String,
        option: u32,
        locked: bool,
    },
    AddItem {
        item: String,
    },
    RemoveItem {
        item: String,
    },
    SelectItem {
        item: Option<String>,
    },
    EnableHotspot {
        hotspot: String,
        enabled: bool,
    },
    TeleportPlayer {
        x: f32,
        y: f32,
    },
    SetMode {
        mode: GameMode,
    },
}

/// Movement/navigation provider. An empty path from `compute_path` means
/// "move directly", not an error.
pub trait Navigator {
    fn compute_path(&self, from: Pos, to: Pos) -> Vec<Pos>;
    fn move_along(&mut self, waypoints: Vec<Pos>, gait: Gait);
    fn is_moving(&self) -> bool;
    fn teleport(&mut self, position: Pos);
    fn stop(&mut self);
    fn position(&self) -> Pos;
    fn tick(&mut self);
}

/// Action-execution provider. `start` is fire-and-forget; the core only polls
/// `is_running` to avoid concurrent re-trigger and `any_blocking` to gate the
/// global mode.
pub trait SequenceRunner {
    fn start(&mut self, source: &SequenceSource, trigger: SequenceTrigger) -> Option<RunHandle>;
    fn is_running(&self, handle: RunHandle) -> bool;
    fn any_blocking(&self) -> bool;
    fn tick(&mut self) -> Vec<SequenceEffect>;
}

/// Menu/UI provider: hover queries plus the label and option sinks.
pub trait MenuHost {
    fn pointer_over_ui(&self) -> bool;
    fn interaction_menu_open(&self) -> bool;
    fn set_hotspot_label(&mut self, label: Option<&str>);
    fn present_options(&mut self, options: &[(u32, String)]);
    fn clear_options(&mut self);
    fn set_interactive(&mut self, interactive: bool);
}

/// Speech-audio provider keyed by voice cue.
pub trait SpeechAudio {
    fn start_line(&mut self, cue: &str, speaker: Option<&str>) -> Option<AudioHandle>;
    fn stop(&mut self, handle: AudioHandle);
    fn is_playing(&self, handle: AudioHandle) -> bool;
    fn set_paused(&mut self, paused: bool);
}

/// The external collaborators handed to the scheduler each frame.
pub struct Services<'a> {
    pub navigator: &'a mut dyn Navigator,
    pub runner: &'a mut dyn SequenceRunner,
    pub menu: &'a mut dyn MenuHost,
    pub audio: &'a mut dyn SpeechAudio,
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::BTreeMap;
    use std::collections::VecDeque;

    use super::*;

    #[derive(Default)]
    pub(crate) struct FakeNavigator {
        pub(crate) position: Pos,
        pub(crate) target: Option<Pos>,
        pub(crate) gait: Option<Gait>,
        pub(crate) step: f32,
        pub(crate) teleports: Vec<Pos>,
        pub(crate) stops: u32,
    }

    impl FakeNavigator {
        pub(crate) fn at(position: Pos) -> Self {
            FakeNavigator {
                position,
                step: 0.5,
                ..Default::default()
            }
        }
    }

    impl Navigator for FakeNavigator {
        fn compute_path(&self, _from: Pos, _to: Pos) -> Vec<Pos> {
            Vec::new()
        }

        fn move_along(&mut self, waypoints: Vec<Pos>, gait: Gait) {
            self.target = waypoints.last().copied();
            self.gait = Some(gait);
        }

        fn is_moving(&self) -> bool {
            self.target.is_some()
        }

        fn teleport(&mut self, position: Pos) {
            self.position = position;
            self.target = None;
            self.teleports.push(position);
        }

        fn stop(&mut self) {
            self.target = None;
            self.stops += 1;
        }

        fn position(&self) -> Pos {
            self.position
        }

        fn tick(&mut self) {
            let Some(target) = self.target else {
                return;
            };
            let step = if self.gait == Some(Gait::Run) {
                self.step * 3.0
            } else {
                self.step
            };
            if self.position.distance(target) <= step {
                self.position = target;
                self.target = None;
            } else {
                let dx = target.x - self.position.x;
                let dy = target.y - self.position.y;
                let len = (dx * dx + dy * dy).sqrt();
                self.position.x += dx / len * step;
                self.position.y += dy / len * step;
            }
        }
    }

    struct FakeRun {
        blocking: bool,
        ticks_left: u32,
    }

    #[derive(Default)]
    pub(crate) struct FakeRunner {
        pub(crate) started: Vec<(SequenceSource, SequenceTrigger)>,
        pub(crate) refuse: bool,
        pub(crate) run_ticks: u32,
        pub(crate) queued_effects: VecDeque<Vec<SequenceEffect>>,
        running: BTreeMap<u32, FakeRun>,
        next: u32,
    }

    impl FakeRunner {
        pub(crate) fn new() -> Self {
            FakeRunner {
                run_ticks: 2,
                ..Default::default()
            }
        }
    }

    impl SequenceRunner for FakeRunner {
        fn start(&mut self, source: &SequenceSource, trigger: SequenceTrigger) -> Option<RunHandle> {
            self.started.push((source.clone(), trigger));
            if self.refuse {
                return None;
            }
            self.next += 1;
            self.running.insert(
                self.next,
                FakeRun {
                    blocking: true,
                    ticks_left: self.run_ticks,
                },
            );
            Some(RunHandle(self.next))
        }

        fn is_running(&self, handle: RunHandle) -> bool {
            self.running.contains_key(&handle.0)
        }

        fn any_blocking(&self) -> bool {
            self.running.values().any(|run| run.blocking)
        }

        fn tick(&mut self) -> Vec<SequenceEffect> {
            for run in self.running.values_mut() {
                run.ticks_left = run.ticks_left.saturating_sub(1);
            }
            self.running.retain(|_, run| run.ticks_left > 0);
            self.queued_effects.pop_front().unwrap_or_default()
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeMenu {
        pub(crate) over_ui: bool,
        pub(crate) menu_open: bool,
        pub(crate) labels: Vec<Option<String>>,
        pub(crate) presented: Vec<Vec<(u32, String)>>,
        pub(crate) cleared: u32,
        pub(crate) interactive: Vec<bool>,
    }

    impl MenuHost for FakeMenu {
        fn pointer_over_ui(&self) -> bool {
            self.over_ui
        }

        fn interaction_menu_open(&self) -> bool {
            self.menu_open
        }

        fn set_hotspot_label(&mut self, label: Option<&str>) {
            self.labels.push(label.map(|value| value.to_string()));
        }

        fn present_options(&mut self, options: &[(u32, String)]) {
            self.presented.push(options.to_vec());
        }

        fn clear_options(&mut self) {
            self.cleared += 1;
        }

        fn set_interactive(&mut self, interactive: bool) {
            self.interactive.push(interactive);
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeAudio {
        pub(crate) started: Vec<(String, Option<String>)>,
        pub(crate) stopped: Vec<AudioHandle>,
        pub(crate) paused: Vec<bool>,
        playing: std::cell::RefCell<std::collections::BTreeSet<u32>>,
        next: u32,
    }

    impl FakeAudio {
        pub(crate) fn finish(&mut self, handle: AudioHandle) {
            self.playing.borrow_mut().remove(&handle.0);
        }
    }

    impl SpeechAudio for FakeAudio {
        fn start_line(&mut self, cue: &str, speaker: Option<&str>) -> Option<AudioHandle> {
            self.next += 1;
            self.started
                .push((cue.to_string(), speaker.map(|value| value.to_string())));
            self.playing.borrow_mut().insert(self.next);
            Some(AudioHandle(self.next))
        }

        fn stop(&mut self, handle: AudioHandle) {
            self.playing.borrow_mut().remove(&handle.0);
            self.stopped.push(handle);
        }

        fn is_playing(&self, handle: AudioHandle) -> bool {
            self.playing.borrow().contains(&handle.0)
        }

        fn set_paused(&mut self, paused: bool) {
            self.paused.push(paused);
        }
    }

    pub(crate) fn services<'a>(
        navigator: &'a mut FakeNavigator,
        runner: &'a mut FakeRunner,
        menu: &'a mut FakeMenu,
        audio: &'a mut FakeAudio,
    ) -> Services<'a> {
        Services {
            navigator,
            runner,
            menu,
            audio,
        }
    }
}
