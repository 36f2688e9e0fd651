use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hotspot::SequenceSource;

/// What happens after a dialogue option's sequence finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "conversation", rename_all = "snake_case")]
pub enum AfterOption {
    End,
    ReturnToSelf,
    JumpTo(String),
}

/// One selectable dialogue line. Ids are assigned once at author time and
/// never reused; `chosen` is permanent for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationOption {
    pub id: u32,
    pub label: String,
    pub enabled: bool,
    pub locked: bool,
    pub chosen: bool,
    pub link: AfterOption,
    pub source: SequenceSource,
}

impl ConversationOption {
    pub fn new(id: u32, label: impl Into<String>, source: SequenceSource) -> Self {
        ConversationOption {
            id,
            label: label.into(),
            enabled: true,
            locked: false,
            chosen: false,
            link: AfterOption::End,
            source,
        }
    }

    pub fn with_link(mut self, link: AfterOption) -> Self {
        self.link = link;
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn showable(&self) -> bool {
        self.enabled && !self.locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversationTimeout {
    pub ticks: u32,
    /// Index into the full option list, not a displayed slot. Out of range or
    /// negative ends the conversation instead.
    pub default_option_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub label: String,
    pub options: Vec<ConversationOption>,
    pub auto_play_lone_option: bool,
    pub timeout: Option<ConversationTimeout>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Conversation {
            id: id.into(),
            label: label.into(),
            options: Vec::new(),
            auto_play_lone_option: false,
            timeout: None,
        }
    }

    pub fn with_option(mut self, option: ConversationOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_auto_play(mut self) -> Self {
        self.auto_play_lone_option = true;
        self
    }

    pub fn with_timeout(mut self, timeout: ConversationTimeout) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    Idle,
    Presenting,
    AwaitingChoice,
    Executing,
}

/// A committed option, handed to the caller to start its sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ChosenOption {
    pub conversation: String,
    pub id: u32,
    pub label: String,
    pub source: SequenceSource,
    pub link: AfterOption,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractOutcome {
    /// Unknown conversation id.
    Missing,
    /// No showable options; the conversation never opened.
    Ended,
    /// Exactly one showable option with auto-play configured.
    AutoPlay(ChosenOption),
    /// Options are on display; `deadline` is armed when timed.
    Present {
        slots: Vec<(u32, String)>,
        deadline: Option<u32>,
    },
}

/// The conversation/dialogue-option engine. At most one session is active;
/// starting a new one cancels any pending timeout from the previous session.
#[derive(Default)]
pub struct ConversationRuntime {
    conversations: BTreeMap<String, Conversation>,
    phase: ConversationPhase,
    active: Option<String>,
    deadline: Option<u32>,
    pending_link: Option<AfterOption>,
}

impl Default for ConversationPhase {
    fn default() -> Self {
        ConversationPhase::Idle
    }
}

impl ConversationRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, conversation: Conversation) {
        self.conversations
            .insert(conversation.id.clone(), conversation);
    }

    pub fn phase(&self) -> ConversationPhase {
        self.phase
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Awaiting a player choice (the state that maps to DialogOptions mode).
    pub fn is_awaiting(&self) -> bool {
        matches!(
            self.phase,
            ConversationPhase::Presenting | ConversationPhase::AwaitingChoice
        )
    }

    pub fn deadline(&self) -> Option<u32> {
        self.deadline
    }

    /// Opens a conversation. Any pending timeout from a previous session is
    /// cancelled before the new one is armed.
    pub fn begin(&mut self, id: &str) -> InteractOutcome {
        self.deadline = None;
        self.pending_link = None;
        self.phase = ConversationPhase::Presenting;

        let Some(conversation) = self.conversations.get(id) else {
            self.phase = ConversationPhase::Idle;
            self.active = None;
            return InteractOutcome::Missing;
        };

        let showable: Vec<u32> = conversation
            .options
            .iter()
            .filter(|option| option.showable())
            .map(|option| option.id)
            .collect();

        if showable.is_empty() {
            self.phase = ConversationPhase::Idle;
            self.active = None;
            return InteractOutcome::Ended;
        }

        let auto_play = conversation.auto_play_lone_option;
        if showable.len() == 1 && auto_play {
            let option_id = showable[0];
            self.active = Some(id.to_string());
            if let Some(chosen) = self.commit_option(option_id) {
                return InteractOutcome::AutoPlay(chosen);
            }
            self.phase = ConversationPhase::Idle;
            self.active = None;
            return InteractOutcome::Ended;
        }

        let slots: Vec<(u32, String)> = conversation
            .options
            .iter()
            .filter(|option| option.showable())
            .enumerate()
            .map(|(slot, option)| (slot as u32, option.label.clone()))
            .collect();
        let deadline = conversation.timeout.map(|timeout| timeout.ticks);

        self.active = Some(id.to_string());
        self.phase = ConversationPhase::AwaitingChoice;
        self.deadline = deadline;
        InteractOutcome::Present { slots, deadline }
    }

    /// Maps a displayed slot back to the underlying option, skipping hidden
    /// options so they never consume slot numbers.
    pub fn choose_slot(&mut self, slot: u32) -> Option<ChosenOption> {
        if self.phase != ConversationPhase::AwaitingChoice {
            return None;
        }
        let id = self.active.clone()?;
        let conversation = self.conversations.get(&id)?;
        let option_id = conversation
            .options
            .iter()
            .filter(|option| option.showable())
            .nth(slot as usize)
            .map(|option| option.id)?;
        self.commit_option(option_id)
    }

    /// Counts down the armed deadline once per tick; `true` on the tick the
    /// deadline elapses.
    pub fn tick_deadline(&mut self) -> bool {
        if self.phase != ConversationPhase::AwaitingChoice {
            return false;
        }
        match self.deadline {
            Some(remaining) if remaining <= 1 => {
                self.deadline = None;
                true
            }
            Some(remaining) => {
                self.deadline = Some(remaining - 1);
                false
            }
            None => false,
        }
    }

    /// Resolves the timed-out session: the configured default option if it is
    /// in range and currently showable, otherwise `None` (end conversation).
    pub fn timeout_selection(&mut self) -> Option<ChosenOption> {
        let id = self.active.clone()?;
        let conversation = self.conversations.get(&id)?;
        let index = conversation.timeout?.default_option_index;
        if index < 0 {
            return None;
        }
        let option = conversation.options.get(index as usize)?;
        if !option.showable() {
            return None;
        }
        let option_id = option.id;
        self.commit_option(option_id)
    }

    /// Called when the executing option's sequence has finished. Returns the
    /// stored link; `End` also closes the session.
    pub fn finish_execution(&mut self) -> AfterOption {
        let link = self.pending_link.take().unwrap_or(AfterOption::End);
        self.phase = ConversationPhase::Idle;
        if link == AfterOption::End {
            self.active = None;
        }
        link
    }

    /// External end: cancels the deadline and any pending link.
    pub fn end(&mut self) {
        self.phase = ConversationPhase::Idle;
        self.active = None;
        self.deadline = None;
        self.pending_link = None;
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn option_mut(&mut self, conversation: &str, option: u32) -> Option<&mut ConversationOption> {
        self.conversations
            .get_mut(conversation)?
            .options
            .iter_mut()
            .find(|candidate| candidate.id == option)
    }

    pub fn all(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values()
    }

    /// New-game reset: clears every chosen flag.
    pub fn reset_session_flags(&mut self) {
        for conversation in self.conversations.values_mut() {
            for option in &mut conversation.options {
                option.chosen = false;
            }
        }
    }

    fn commit_option(&mut self, option_id: u32) -> Option<ChosenOption> {
        let id = self.active.clone()?;
        let conversation = self.conversations.get_mut(&id)?;
        let option = conversation
            .options
            .iter_mut()
            .find(|candidate| candidate.id == option_id)?;
        option.chosen = true;
        let chosen = ChosenOption {
            conversation: id,
            id: option.id,
            label: option.label.clone(),
            source: option.source.clone(),
            link: option.link.clone(),
        };
        self.deadline = None;
        self.pending_link = Some(chosen.link.clone());
        self.phase = ConversationPhase::Executing;
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(name: &str) -> SequenceSource {
        SequenceSource::Scene(name.to_string())
    }

    fn sample() -> Conversation {
        Conversation::new("clerk", "Clerk")
            .with_option(
                ConversationOption::new(1, "Ask", scene("ask"))
                    .with_link(AfterOption::ReturnToSelf),
            )
            .with_option(ConversationOption::new(2, "Bye", scene("bye")))
    }

    #[test]
    fn slot_mapping_skips_hidden_options() {
        let mut runtime = ConversationRuntime::new();
        let conversation = Conversation::new("c", "c")
            .with_option(ConversationOption::new(1, "A", scene("a")).locked())
            .with_option(ConversationOption::new(2, "B", scene("b")))
            .with_option(ConversationOption::new(3, "C", scene("c")));
        runtime.register(conversation);

        match runtime.begin("c") {
            InteractOutcome::Present { slots, .. } => {
                assert_eq!(
                    slots,
                    vec![(0, "B".to_string()), (1, "C".to_string())]
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let chosen = runtime.choose_slot(0).expect("slot 0 maps to B");
        assert_eq!(chosen.id, 2);
    }

    #[test]
    fn slot_mapping_tracks_visibility_changes_between_calls() {
        let mut runtime = ConversationRuntime::new();
        let conversation = Conversation::new("c", "c")
            .with_option(ConversationOption::new(1, "A", scene("a")))
            .with_option(ConversationOption::new(2, "B", scene("b")));
        runtime.register(conversation);
        runtime.begin("c");
        runtime.option_mut("c", 1).unwrap().locked = true;
        // A is now hidden, so slot 0 maps to B
        let chosen = runtime.choose_slot(0).expect("slot 0 maps to B");
        assert_eq!(chosen.id, 2);
    }

    #[test]
    fn auto_play_skips_awaiting_choice() {
        let mut runtime = ConversationRuntime::new();
        let conversation = Conversation::new("c", "c")
            .with_auto_play()
            .with_option(ConversationOption::new(1, "A", scene("a")).locked())
            .with_option(ConversationOption::new(2, "B", scene("b")));
        runtime.register(conversation);
        match runtime.begin("c") {
            InteractOutcome::AutoPlay(chosen) => {
                assert_eq!(chosen.id, 2);
                assert_eq!(runtime.phase(), ConversationPhase::Executing);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn no_showable_options_ends_immediately() {
        let mut runtime = ConversationRuntime::new();
        let conversation = Conversation::new("c", "c")
            .with_option(ConversationOption::new(1, "A", scene("a")).locked());
        runtime.register(conversation);
        assert_eq!(runtime.begin("c"), InteractOutcome::Ended);
        assert_eq!(runtime.phase(), ConversationPhase::Idle);
        assert_eq!(runtime.active_id(), None);
    }

    #[test]
    fn second_begin_cancels_the_first_deadline() {
        let mut runtime = ConversationRuntime::new();
        runtime.register(sample().with_timeout(ConversationTimeout {
            ticks: 2,
            default_option_index: 1,
        }));
        runtime.begin("clerk");
        assert_eq!(runtime.deadline(), Some(2));
        runtime.tick_deadline();
        runtime.begin("clerk");
        // fresh deadline; the old countdown never fires mid-session
        assert_eq!(runtime.deadline(), Some(2));
        assert!(!runtime.tick_deadline());
        assert!(runtime.tick_deadline());
        assert!(!runtime.tick_deadline());
    }

    #[test]
    fn timeout_selection_respects_range_and_visibility() {
        let mut runtime = ConversationRuntime::new();
        runtime.register(sample().with_timeout(ConversationTimeout {
            ticks: 1,
            default_option_index: 5,
        }));
        runtime.begin("clerk");
        assert!(runtime.tick_deadline());
        assert_eq!(runtime.timeout_selection(), None);

        let mut runtime = ConversationRuntime::new();
        runtime.register(sample().with_timeout(ConversationTimeout {
            ticks: 1,
            default_option_index: 1,
        }));
        runtime.begin("clerk");
        assert!(runtime.tick_deadline());
        let chosen = runtime.timeout_selection().expect("default option fires");
        assert_eq!(chosen.id, 2);
    }

    #[test]
    fn choosing_marks_the_option_chosen_and_stores_the_link() {
        let mut runtime = ConversationRuntime::new();
        runtime.register(sample());
        runtime.begin("clerk");
        let chosen = runtime.choose_slot(0).expect("first slot");
        assert_eq!(chosen.link, AfterOption::ReturnToSelf);
        assert!(runtime.conversation("clerk").unwrap().options[0].chosen);
        assert_eq!(runtime.phase(), ConversationPhase::Executing);
        assert_eq!(runtime.finish_execution(), AfterOption::ReturnToSelf);
        // active survives a return-to-self link
        assert_eq!(runtime.active_id(), Some("clerk"));
    }

    #[test]
    fn finish_with_end_link_closes_the_session() {
        let mut runtime = ConversationRuntime::new();
        runtime.register(sample());
        runtime.begin("clerk");
        runtime.choose_slot(1).expect("second slot");
        assert_eq!(runtime.finish_execution(), AfterOption::End);
        assert_eq!(runtime.active_id(), None);
        assert_eq!(runtime.phase(), ConversationPhase::Idle);
    }

    #[test]
    fn choose_slot_outside_awaiting_choice_is_refused() {
        let mut runtime = ConversationRuntime::new();
        runtime.register(sample());
        assert!(runtime.choose_slot(0).is_none());
        runtime.begin("clerk");
        runtime.choose_slot(0);
        assert!(runtime.choose_slot(1).is_none());
    }
}
