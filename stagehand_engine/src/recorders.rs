//! Recording providers: menu host and speech audio implementations whose
//! captured event streams serialize to JSON for regression assertions.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use serde::Serialize;
use stagehand_core::{AudioHandle, MenuHost, SpeechAudio};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuEvent {
    LabelSet { label: Option<String> },
    OptionsPresented { options: Vec<(u32, String)> },
    OptionsCleared,
    InteractiveSet { interactive: bool },
}

#[derive(Clone, Default)]
pub struct RecordingMenuHost {
    events: Rc<RefCell<Vec<MenuEvent>>>,
}

impl RecordingMenuHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MenuEvent> {
        self.events.borrow().clone()
    }
}

impl MenuHost for RecordingMenuHost {
    fn pointer_over_ui(&self) -> bool {
        false
    }

    fn interaction_menu_open(&self) -> bool {
        false
    }

    fn set_hotspot_label(&mut self, label: Option<&str>) {
        self.events.borrow_mut().push(MenuEvent::LabelSet {
            label: label.map(|value| value.to_string()),
        });
    }

    fn present_options(&mut self, options: &[(u32, String)]) {
        self.events.borrow_mut().push(MenuEvent::OptionsPresented {
            options: options.to_vec(),
        });
    }

    fn clear_options(&mut self) {
        self.events.borrow_mut().push(MenuEvent::OptionsCleared);
    }

    fn set_interactive(&mut self, interactive: bool) {
        self.events
            .borrow_mut()
            .push(MenuEvent::InteractiveSet { interactive });
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeechAudioEvent {
    LineStart {
        cue: String,
        speaker: Option<String>,
        handle: u32,
    },
    LineStop {
        handle: u32,
    },
    PauseSet {
        paused: bool,
    },
}

/// Each started line "plays" for a fixed number of completion polls, so cued
/// lines outlive their display ticks deterministically.
pub struct RecordingSpeechAudio {
    events: Rc<RefCell<Vec<SpeechAudioEvent>>>,
    playing: BTreeMap<u32, u32>,
    polls_per_line: u32,
    next_handle: u32,
}

impl RecordingSpeechAudio {
    pub fn new(polls_per_line: u32) -> Self {
        RecordingSpeechAudio {
            events: Rc::new(RefCell::new(Vec::new())),
            playing: BTreeMap::new(),
            polls_per_line,
            next_handle: 0,
        }
    }

    pub fn events(&self) -> Vec<SpeechAudioEvent> {
        self.events.borrow().clone()
    }
}

impl SpeechAudio for RecordingSpeechAudio {
    fn start_line(&mut self, cue: &str, speaker: Option<&str>) -> Option<AudioHandle> {
        self.next_handle += 1;
        let handle = self.next_handle;
        self.playing.insert(handle, self.polls_per_line);
        self.events.borrow_mut().push(SpeechAudioEvent::LineStart {
            cue: cue.to_string(),
            speaker: speaker.map(|value| value.to_string()),
            handle,
        });
        Some(AudioHandle(handle))
    }

    fn stop(&mut self, handle: AudioHandle) {
        if self.playing.remove(&handle.0).is_some() {
            self.events
                .borrow_mut()
                .push(SpeechAudioEvent::LineStop { handle: handle.0 });
        }
    }

    fn is_playing(&self, handle: AudioHandle) -> bool {
        self.playing.contains_key(&handle.0)
    }

    fn set_paused(&mut self, paused: bool) {
        self.events
            .borrow_mut()
            .push(SpeechAudioEvent::PauseSet { paused });
    }
}

impl RecordingSpeechAudio {
    /// Counts one completion poll against every live line; the speech phase
    /// calls this once per frame before polling.
    pub fn tick(&mut self) {
        let finished: Vec<u32> = self
            .playing
            .iter_mut()
            .filter_map(|(handle, remaining)| {
                *remaining = remaining.saturating_sub(1);
                (*remaining == 0).then_some(*handle)
            })
            .collect();
        for handle in finished {
            self.playing.remove(&handle);
        }
    }
}
