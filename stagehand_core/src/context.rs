//! The owned aggregate of every runtime component plus the event journal.
//! Components return journal messages; the context is the single place that
//! appends them, so the journal reads as one ordered stream.

use crate::caps::SystemCaps;
use crate::conversation::{AfterOption, ChosenOption, ConversationPhase, ConversationRuntime, InteractOutcome};
use crate::input::InputSnapshot;
use crate::interact::{InteractionRuntime, UnhandledTable};
use crate::inventory::InventoryLedger;
use crate::mode::{GameMode, ModeState};
use crate::providers::{RunHandle, SequenceEffect, SequenceTrigger, Services};
use crate::registry::SceneRegistry;
use crate::speech::{SpeechHandle, SpeechRequest, SpeechRuntime};
use crate::types::Pos;

pub struct GameContext {
    pub mode: ModeState,
    pub caps: SystemCaps,
    pub registry: SceneRegistry,
    pub inventory: InventoryLedger,
    pub interact: InteractionRuntime,
    pub conversations: ConversationRuntime,
    pub speech: SpeechRuntime,
    pub unhandled: UnhandledTable,
    journal: Vec<String>,
    conversation_run: Option<RunHandle>,
    active_camera: Option<String>,
}

impl Default for GameContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GameContext {
    pub fn new() -> Self {
        GameContext {
            mode: ModeState::new(),
            caps: SystemCaps::default(),
            registry: SceneRegistry::new(),
            inventory: InventoryLedger::new(),
            interact: InteractionRuntime::default(),
            conversations: ConversationRuntime::new(),
            speech: SpeechRuntime::new(),
            unhandled: UnhandledTable::new(),
            journal: Vec::new(),
            conversation_run: None,
            active_camera: None,
        }
    }

    pub fn journal(&self) -> &[String] {
        &self.journal
    }

    pub fn log_event(&mut self, message: impl Into<String>) {
        self.journal.push(message.into());
    }

    fn log_all(&mut self, messages: Vec<String>) {
        self.journal.extend(messages);
    }

    pub fn set_mode(&mut self, mode: GameMode) {
        if let Some(replaced) = self.mode.set(mode) {
            self.log_event(format!(
                "mode.set {} (was {})",
                mode.label(),
                replaced.label()
            ));
        }
    }

    /// Recomputes the global mode from what is blocking right now. A pause is
    /// sticky: nothing short of an explicit resume leaves it.
    pub fn recompute_mode(&mut self, blocking_sequence: bool) {
        if self.mode.get() == GameMode::Paused {
            return;
        }
        let mode = if blocking_sequence {
            GameMode::Cutscene
        } else if self.conversations.is_awaiting() {
            GameMode::DialogOptions
        } else {
            GameMode::Normal
        };
        self.set_mode(mode);
    }

    pub fn pause(&mut self, services: &mut Services<'_>) {
        if self.mode.get() == GameMode::Paused {
            return;
        }
        self.set_mode(GameMode::Paused);
        services.audio.set_paused(true);
    }

    pub fn resume(&mut self, services: &mut Services<'_>) {
        if self.mode.get() != GameMode::Paused {
            return;
        }
        let restored = self
            .mode
            .restore_after_pause(services.runner.any_blocking(), self.conversations.is_awaiting());
        self.log_event(format!("mode.set {} (was paused)", restored.label()));
        services.audio.set_paused(false);
    }

    pub fn set_camera(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.active_camera.as_deref() == Some(id.as_str()) {
            return;
        }
        self.log_event(format!("camera.mode {id}"));
        self.active_camera = Some(id);
    }

    pub fn active_camera(&self) -> Option<&str> {
        self.active_camera.as_deref()
    }

    /// Mode-transition hook: re-aims the active camera for the new mode
    /// (cutscene framing vs free gameplay framing).
    pub fn refresh_camera(&mut self, mode: GameMode) {
        if let Some(camera) = self.active_camera.clone() {
            self.log_event(format!("camera.update {camera} {}", mode.label()));
        }
    }

    // --- speech ---------------------------------------------------------

    pub fn start_speech(
        &mut self,
        request: SpeechRequest,
        services: &mut Services<'_>,
    ) -> SpeechHandle {
        let (handle, messages) = self.speech.start_line(request, services.audio);
        self.log_all(messages);
        handle
    }

    pub fn advance_speech(&mut self, services: &mut Services<'_>) {
        let messages = self.speech.advance(services.audio);
        self.log_all(messages);
    }

    pub fn skip_speech(&mut self, services: &mut Services<'_>) -> bool {
        let (affected, messages) = self.speech.skip(services.audio);
        self.log_all(messages);
        affected
    }

    /// Keeps the per-character speaking flags in step with the live lines.
    pub fn tick_characters(&mut self) {
        for (id, character) in self.registry.characters_mut() {
            character.speaking = self.speech.is_speaking(id);
        }
    }

    // --- interaction ----------------------------------------------------

    pub fn interaction_frame(
        &mut self,
        frame: u64,
        input: &InputSnapshot,
        services: &mut Services<'_>,
    ) {
        let mode = self.mode.get();
        let messages = self.interact.update_frame(
            frame,
            input,
            mode,
            &mut self.registry,
            &mut self.inventory,
            &self.unhandled,
            services,
        );
        self.log_all(messages);
    }

    pub fn tick_approach(&mut self, services: &mut Services<'_>) {
        let messages = self.interact.tick_approach(services);
        let started = messages.iter().any(|line| line.starts_with("sequence.start"));
        self.log_all(messages);
        if started {
            self.recompute_mode(services.runner.any_blocking());
        }
    }

    // --- conversations --------------------------------------------------

    pub fn begin_conversation(&mut self, id: &str, services: &mut Services<'_>) {
        match self.conversations.begin(id) {
            InteractOutcome::Missing => {
                log::warn!("conversation {id} is not registered");
            }
            InteractOutcome::Ended => {
                self.log_event(format!("conversation.empty {id}"));
                self.recompute_mode(services.runner.any_blocking());
            }
            InteractOutcome::AutoPlay(chosen) => {
                self.log_event(format!("conversation.begin {id}"));
                self.execute_option(chosen, services);
            }
            InteractOutcome::Present { slots, deadline } => {
                self.log_event(format!("conversation.begin {id}"));
                self.log_event(format!("conversation.present {id} {}", slots.len()));
                if let Some(ticks) = deadline {
                    self.log_event(format!("conversation.deadline {id} {ticks}"));
                }
                services.menu.present_options(&slots);
                self.recompute_mode(services.runner.any_blocking());
            }
        }
    }

    pub fn choose_option(&mut self, slot: u32, services: &mut Services<'_>) {
        let Some(chosen) = self.conversations.choose_slot(slot) else {
            log::warn!("no conversation slot {slot} to choose");
            return;
        };
        self.execute_option(chosen, services);
    }

    fn execute_option(&mut self, chosen: ChosenOption, services: &mut Services<'_>) {
        self.log_event(format!(
            "conversation.option {} {}",
            chosen.conversation, chosen.id
        ));
        services.menu.clear_options();
        let trigger = SequenceTrigger::ConversationOption {
            conversation: chosen.conversation.clone(),
            option: chosen.id,
        };
        self.conversation_run = services.runner.start(&chosen.source, trigger);
        if let Some(_handle) = self.conversation_run {
            self.log_event(format!("sequence.start {}", chosen.source.describe()));
        } else {
            log::warn!(
                "sequence runner refused option {} of {}",
                chosen.id,
                chosen.conversation
            );
        }
        self.recompute_mode(services.runner.any_blocking());
    }

    pub fn end_conversation(&mut self, services: &mut Services<'_>) {
        if let Some(id) = self.conversations.active_id().map(str::to_string) {
            self.log_event(format!("conversation.end {id}"));
        }
        self.conversations.end();
        self.conversation_run = None;
        services.menu.clear_options();
        self.recompute_mode(services.runner.any_blocking());
    }

    /// Per-tick conversation progression: deadline countdown while awaiting a
    /// choice, and link resolution once the chosen option's sequence ends.
    fn tick_conversation(&mut self, services: &mut Services<'_>) {
        match self.conversations.phase() {
            ConversationPhase::AwaitingChoice => {
                if self.conversations.tick_deadline() {
                    let id = self
                        .conversations
                        .active_id()
                        .map(str::to_string)
                        .unwrap_or_default();
                    self.log_event(format!("conversation.timeout {id}"));
                    match self.conversations.timeout_selection() {
                        Some(chosen) => self.execute_option(chosen, services),
                        None => self.end_conversation(services),
                    }
                }
            }
            ConversationPhase::Executing => {
                let still_running = self
                    .conversation_run
                    .map_or(false, |handle| services.runner.is_running(handle));
                if still_running {
                    return;
                }
                self.conversation_run = None;
                let active = self.conversations.active_id().map(str::to_string);
                match self.conversations.finish_execution() {
                    AfterOption::End => {
                        if let Some(id) = active {
                            self.log_event(format!("conversation.end {id}"));
                        }
                        services.menu.clear_options();
                    }
                    AfterOption::ReturnToSelf => {
                        if let Some(id) = active {
                            self.begin_conversation(&id, services);
                        }
                    }
                    AfterOption::JumpTo(next) => {
                        self.begin_conversation(&next, services);
                    }
                }
            }
            ConversationPhase::Idle | ConversationPhase::Presenting => {}
        }
    }

    // --- sequences ------------------------------------------------------

    /// Queued-sequence phase: one runner tick, applied effects, conversation
    /// progression, then a mode recompute.
    pub fn tick_sequences(&mut self, services: &mut Services<'_>) {
        let effects = services.runner.tick();
        for effect in effects {
            self.apply_effect(effect, services);
        }
        self.tick_conversation(services);
        self.recompute_mode(services.runner.any_blocking());
    }

    fn apply_effect(&mut self, effect: SequenceEffect, services: &mut Services<'_>) {
        match effect {
            SequenceEffect::Say {
                speaker,
                text,
                cue,
                background,
                prevent_skip,
                ticks,
            } => {
                let mut request = SpeechRequest::new(speaker, text);
                request.cue = cue;
                request.background = background;
                request.prevent_skip = prevent_skip;
                request.ticks = ticks;
                self.start_speech(request, services);
            }
            SequenceEffect::StartConversation { conversation } => {
                self.begin_conversation(&conversation, services);
            }
            SequenceEffect::EndConversation => {
                self.end_conversation(services);
            }
            SequenceEffect::SetOptionEnabled {
                conversation,
                option,
                enabled,
            } => match self.conversations.option_mut(&conversation, option) {
                Some(target) => target.enabled = enabled,
                None => log::warn!("no option {option} in conversation {conversation}"),
            },
            SequenceEffect::SetOptionLocked {
                conversation,
                option,
                locked,
            } => match self.conversations.option_mut(&conversation, option) {
                Some(target) => target.locked = locked,
                None => log::warn!("no option {option} in conversation {conversation}"),
            },
            SequenceEffect::AddItem { item } => {
                self.inventory.carry(&item);
                self.log_event(format!("inventory.add {item}"));
            }
            SequenceEffect::RemoveItem { item } => {
                if self.inventory.drop_item(&item) {
                    self.log_event(format!("inventory.remove {item}"));
                } else {
                    log::warn!("dropping {item} that is not carried");
                }
            }
            SequenceEffect::SelectItem { item } => match item {
                Some(item) => {
                    if self.inventory.select(&item) {
                        self.log_event(format!("inventory.select {item}"));
                    } else {
                        log::warn!("selecting {item} that is not carried");
                    }
                }
                None => {
                    self.inventory.deselect();
                    self.log_event("inventory.deselect");
                }
            },
            SequenceEffect::EnableHotspot { hotspot, enabled } => {
                match self.registry.hotspot_mut(&hotspot) {
                    Some(target) => {
                        target.enabled = enabled;
                        self.log_event(format!("hotspot.enable {hotspot} {enabled}"));
                    }
                    None => log::warn!("no hotspot {hotspot} to enable"),
                }
            }
            SequenceEffect::TeleportPlayer { x, y } => {
                services.navigator.teleport(Pos::new(x, y));
                self.log_event(format!("player.teleport {x},{y}"));
            }
            SequenceEffect::SetMode { mode } => {
                self.set_mode(mode);
            }
        }
    }

    // --- scene lifecycle ------------------------------------------------

    /// Forced scene exit: cancels the approach, kills all speech, clears the
    /// selection, and empties the registry.
    pub fn on_scene_exit(&mut self, services: &mut Services<'_>) {
        let messages = self.interact.stop_moving_to_hotspot(services.navigator);
        self.log_all(messages);
        let (_, messages) = self.speech.kill_all(None, services.audio);
        self.log_all(messages);
        if self.conversations.active_id().is_some() {
            self.end_conversation(services);
        }
        let messages = self.interact.deselect(services.menu);
        self.log_all(messages);
        self.registry.clear();
        self.log_event("scene.exit");
    }

    pub fn conversation_run(&self) -> Option<RunHandle> {
        self.conversation_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, ConversationOption, ConversationTimeout};
    use crate::hotspot::{Hotspot, SequenceSource};
    use crate::providers::fakes::{services, FakeAudio, FakeMenu, FakeNavigator, FakeRunner};

    fn scene(name: &str) -> SequenceSource {
        SequenceSource::Scene(name.to_string())
    }

    struct Rig {
        navigator: FakeNavigator,
        runner: FakeRunner,
        menu: FakeMenu,
        audio: FakeAudio,
    }

    impl Rig {
        fn new() -> Self {
            Rig {
                navigator: FakeNavigator::at(Pos::default()),
                runner: FakeRunner::new(),
                menu: FakeMenu::default(),
                audio: FakeAudio::default(),
            }
        }

        fn services(&mut self) -> Services<'_> {
            services(&mut self.navigator, &mut self.runner, &mut self.menu, &mut self.audio)
        }
    }

    fn clerk() -> Conversation {
        Conversation::new("clerk", "Clerk")
            .with_option(
                ConversationOption::new(1, "Ask", scene("ask")).with_link(AfterOption::ReturnToSelf),
            )
            .with_option(ConversationOption::new(2, "Bye", scene("bye")))
    }

    #[test]
    fn beginning_a_conversation_presents_options_and_switches_mode() {
        let mut ctx = GameContext::new();
        ctx.conversations.register(clerk());
        let mut rig = Rig::new();
        ctx.begin_conversation("clerk", &mut rig.services());

        assert_eq!(ctx.mode.get(), GameMode::DialogOptions);
        assert_eq!(rig.menu.presented.len(), 1);
        assert!(ctx.journal().contains(&"conversation.present clerk 2".to_string()));
    }

    #[test]
    fn choosing_an_option_runs_its_sequence_then_the_link_reopens() {
        let mut ctx = GameContext::new();
        ctx.conversations.register(clerk());
        let mut rig = Rig::new();
        ctx.begin_conversation("clerk", &mut rig.services());
        ctx.choose_option(0, &mut rig.services());
        assert_eq!(ctx.mode.get(), GameMode::Cutscene);
        assert!(ctx.journal().contains(&"conversation.option clerk 1".to_string()));

        // two runner ticks finish the sequence; the link re-presents
        ctx.tick_sequences(&mut rig.services());
        ctx.tick_sequences(&mut rig.services());
        assert_eq!(ctx.mode.get(), GameMode::DialogOptions);
        assert_eq!(rig.menu.presented.len(), 2);
    }

    #[test]
    fn end_link_closes_the_conversation_and_restores_normal() {
        let mut ctx = GameContext::new();
        ctx.conversations.register(clerk());
        let mut rig = Rig::new();
        ctx.begin_conversation("clerk", &mut rig.services());
        ctx.choose_option(1, &mut rig.services());
        ctx.tick_sequences(&mut rig.services());
        ctx.tick_sequences(&mut rig.services());
        assert_eq!(ctx.mode.get(), GameMode::Normal);
        assert!(ctx.journal().contains(&"conversation.end clerk".to_string()));
        assert_eq!(ctx.conversations.active_id(), None);
    }

    #[test]
    fn deadline_fires_the_default_option_once() {
        let mut ctx = GameContext::new();
        ctx.conversations.register(clerk().with_timeout(ConversationTimeout {
            ticks: 2,
            default_option_index: 1,
        }));
        let mut rig = Rig::new();
        ctx.begin_conversation("clerk", &mut rig.services());
        ctx.tick_sequences(&mut rig.services());
        assert!(!ctx.journal().iter().any(|line| line.starts_with("conversation.timeout")));
        ctx.tick_sequences(&mut rig.services());
        assert!(ctx.journal().contains(&"conversation.timeout clerk".to_string()));
        assert!(ctx.journal().contains(&"conversation.option clerk 2".to_string()));
        let fired = ctx
            .journal()
            .iter()
            .filter(|line| line.starts_with("conversation.timeout"))
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn pause_is_sticky_until_resume_recomputes() {
        let mut ctx = GameContext::new();
        let mut rig = Rig::new();
        ctx.pause(&mut rig.services());
        assert_eq!(ctx.mode.get(), GameMode::Paused);
        assert_eq!(rig.audio.paused, vec![true]);
        // recompute must not leave the pause
        ctx.recompute_mode(true);
        assert_eq!(ctx.mode.get(), GameMode::Paused);
        ctx.resume(&mut rig.services());
        assert_eq!(ctx.mode.get(), GameMode::Normal);
        assert_eq!(rig.audio.paused, vec![true, false]);
    }

    #[test]
    fn say_effect_starts_a_speech_line() {
        let mut ctx = GameContext::new();
        ctx.registry.register_character("manny", "Manny");
        let mut rig = Rig::new();
        rig.runner.queued_effects.push_back(vec![SequenceEffect::Say {
            speaker: Some("manny".to_string()),
            text: "Hello".to_string(),
            cue: Some("moma112".to_string()),
            background: false,
            prevent_skip: false,
            ticks: 10,
        }]);
        ctx.tick_sequences(&mut rig.services());
        ctx.tick_characters();
        assert!(ctx.journal().contains(&"speech.begin manny Hello".to_string()));
        assert_eq!(rig.audio.started.len(), 1);
        assert!(ctx.registry.character("manny").map_or(false, |c| c.speaking));
    }

    #[test]
    fn inventory_effects_update_the_ledger_and_journal() {
        let mut ctx = GameContext::new();
        let mut rig = Rig::new();
        rig.runner.queued_effects.push_back(vec![
            SequenceEffect::AddItem { item: "card".to_string() },
            SequenceEffect::SelectItem { item: Some("card".to_string()) },
        ]);
        ctx.tick_sequences(&mut rig.services());
        assert!(ctx.inventory.is_carried("card"));
        assert_eq!(ctx.inventory.selected(), Some("card"));
        assert!(ctx.journal().contains(&"inventory.add card".to_string()));
        assert!(ctx.journal().contains(&"inventory.select card".to_string()));
    }

    #[test]
    fn scene_exit_clears_everything() {
        let mut ctx = GameContext::new();
        ctx.registry
            .register_hotspot(Hotspot::new("door", "Door", Pos::default()));
        let mut rig = Rig::new();
        ctx.start_speech(SpeechRequest::new(Some("manny".into()), "line"), &mut rig.services());
        ctx.on_scene_exit(&mut rig.services());
        assert!(ctx.registry.hotspots().next().is_none());
        assert!(ctx.speech.lines().is_empty());
        assert!(ctx.journal().contains(&"scene.exit".to_string()));
        assert!(ctx.journal().contains(&"speech.kill manny line".to_string()));
    }

    #[test]
    fn unknown_hotspot_enable_is_a_warning_not_a_change() {
        let mut ctx = GameContext::new();
        let mut rig = Rig::new();
        rig.runner.queued_effects.push_back(vec![SequenceEffect::EnableHotspot {
            hotspot: "ghost".to_string(),
            enabled: false,
        }]);
        ctx.tick_sequences(&mut rig.services());
        assert!(!ctx.journal().iter().any(|line| line.starts_with("hotspot.enable")));
    }
}
