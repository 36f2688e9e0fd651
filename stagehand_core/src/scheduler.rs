//! Fixed-order frame update. Each phase is gated by a capability bit; a
//! cleared bit skips the whole phase for the frame. Mode changes are detected
//! at the end of the frame and fire the one-shot hooks exactly once.

use crate::caps::SystemCaps;
use crate::context::GameContext;
use crate::input::InputSnapshot;
use crate::mode::GameMode;
use crate::providers::Services;

pub struct FrameScheduler {
    frame: u64,
    last_mode: GameMode,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        FrameScheduler {
            frame: 0,
            last_mode: GameMode::Normal,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn last_mode(&self) -> GameMode {
        self.last_mode
    }

    /// Runs one frame: speech, cursor upkeep, interaction, queued sequences,
    /// movement, characters, then mode-change detection.
    pub fn advance(
        &mut self,
        ctx: &mut GameContext,
        services: &mut Services<'_>,
        input: &InputSnapshot,
    ) {
        self.frame += 1;
        ctx.log_event(format!("frame.tick {}", self.frame));
        let caps = ctx.caps;

        // input sampling: with the bit cleared the pointer still hovers but
        // clicks and skips are blanked
        let input = if caps.contains(SystemCaps::INPUT) {
            input.clone()
        } else {
            InputSnapshot {
                pointer: input.pointer,
                ..Default::default()
            }
        };

        if caps.contains(SystemCaps::SPEECH) {
            if input.skip {
                ctx.skip_speech(services);
            }
            ctx.advance_speech(services);
        }

        // cursor/highlight upkeep: without it no hotspot highlight survives
        if !caps.contains(SystemCaps::CURSOR) {
            let messages = ctx.interact.deselect(services.menu);
            for message in messages {
                ctx.log_event(message);
            }
        }

        if caps.contains(SystemCaps::INTERACTION) {
            ctx.interaction_frame(self.frame, &input, services);
        }

        if caps.contains(SystemCaps::SEQUENCES) {
            ctx.tick_sequences(services);
        }

        if caps.contains(SystemCaps::MOVEMENT) {
            services.navigator.tick();
            ctx.tick_approach(services);
        }

        if caps.contains(SystemCaps::CHARACTERS) {
            ctx.tick_characters();
        }

        let mode = ctx.mode.get();
        if mode != self.last_mode {
            ctx.log_event(format!(
                "mode.change {} -> {}",
                self.last_mode.label(),
                mode.label()
            ));
            ctx.refresh_camera(mode);
            if caps.contains(SystemCaps::MENUS) {
                let interactive =
                    matches!(mode, GameMode::Normal | GameMode::DialogOptions);
                services.menu.set_interactive(interactive);
            }
            services.audio.set_paused(mode == GameMode::Paused);
            self.last_mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, ConversationOption};
    use crate::hotspot::{Approach, Hotspot, SequenceSource, UseButton};
    use crate::input::ClickKind;
    use crate::providers::fakes::{services, FakeAudio, FakeMenu, FakeNavigator, FakeRunner};
    use crate::types::{Pos, Rect};

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

    fn scene_door() -> Hotspot {
        Hotspot::new("door", "Door", Pos::new(0.0, 0.0))
            .with_bounds(Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_use(UseButton::new(
                1,
                Approach::None,
                SequenceSource::Scene("open".to_string()),
            ))
    }

    #[test]
    fn frames_count_and_journal_markers_appear() {
        let mut ctx = GameContext::new();
        let mut scheduler = FrameScheduler::new();
        let mut rig = Rig::new();
        scheduler.advance(&mut ctx, &mut rig.services(), &InputSnapshot::default());
        scheduler.advance(&mut ctx, &mut rig.services(), &InputSnapshot::default());
        assert_eq!(scheduler.frame(), 2);
        assert!(ctx.journal().contains(&"frame.tick 1".to_string()));
        assert!(ctx.journal().contains(&"frame.tick 2".to_string()));
    }

    #[test]
    fn cleared_input_bit_blanks_clicks() {
        let mut ctx = GameContext::new();
        ctx.registry.register_hotspot(scene_door());
        ctx.caps.remove(SystemCaps::INPUT);
        let mut scheduler = FrameScheduler::new();
        let mut rig = Rig::new();
        let click = InputSnapshot {
            pointer: Pos::new(5.0, 5.0),
            primary: ClickKind::Single,
            ..Default::default()
        };
        scheduler.advance(&mut ctx, &mut rig.services(), &click);
        // hover still selects, but the click never commits
        assert!(ctx.journal().contains(&"hotspot.select door".to_string()));
        assert!(rig.runner.started.is_empty());
    }

    #[test]
    fn cleared_interaction_bit_skips_the_whole_phase() {
        let mut ctx = GameContext::new();
        ctx.registry.register_hotspot(scene_door());
        ctx.caps.remove(SystemCaps::INTERACTION);
        let mut scheduler = FrameScheduler::new();
        let mut rig = Rig::new();
        let click = InputSnapshot {
            pointer: Pos::new(5.0, 5.0),
            primary: ClickKind::Single,
            ..Default::default()
        };
        scheduler.advance(&mut ctx, &mut rig.services(), &click);
        assert!(!ctx.journal().iter().any(|line| line.starts_with("hotspot.")));
    }

    #[test]
    fn mode_change_hooks_fire_once() {
        let mut ctx = GameContext::new();
        ctx.conversations.register(
            Conversation::new("talk", "Talk")
                .with_option(ConversationOption::new(
                    1,
                    "Hi",
                    SequenceSource::Scene("hi".to_string()),
                ))
                .with_option(ConversationOption::new(
                    2,
                    "Bye",
                    SequenceSource::Scene("bye".to_string()),
                )),
        );
        let mut scheduler = FrameScheduler::new();
        let mut rig = Rig::new();
        ctx.begin_conversation("talk", &mut rig.services());

        scheduler.advance(&mut ctx, &mut rig.services(), &InputSnapshot::default());
        scheduler.advance(&mut ctx, &mut rig.services(), &InputSnapshot::default());
        let changes = ctx
            .journal()
            .iter()
            .filter(|line| *line == "mode.change normal -> dialog_options")
            .count();
        assert_eq!(changes, 1);
        assert_eq!(rig.menu.interactive, vec![true]);
    }

    #[test]
    fn mode_change_reaims_the_active_camera() {
        let mut ctx = GameContext::new();
        ctx.registry.register_camera("dock_wide");
        ctx.set_camera("dock_wide");
        ctx.registry.register_hotspot(scene_door());
        let mut scheduler = FrameScheduler::new();
        let mut rig = Rig::new();
        let click = InputSnapshot {
            pointer: Pos::new(5.0, 5.0),
            primary: ClickKind::Single,
            ..Default::default()
        };
        scheduler.advance(&mut ctx, &mut rig.services(), &click);
        assert_eq!(ctx.mode.get(), GameMode::Cutscene);
        assert!(ctx
            .journal()
            .contains(&"camera.update dock_wide cutscene".to_string()));
        for _ in 0..4 {
            scheduler.advance(&mut ctx, &mut rig.services(), &InputSnapshot::default());
        }
        assert!(ctx
            .journal()
            .contains(&"camera.update dock_wide normal".to_string()));
        // a frame with no transition leaves the camera alone
        let updates = ctx
            .journal()
            .iter()
            .filter(|line| line.starts_with("camera.update"))
            .count();
        scheduler.advance(&mut ctx, &mut rig.services(), &InputSnapshot::default());
        assert_eq!(
            ctx.journal()
                .iter()
                .filter(|line| line.starts_with("camera.update"))
                .count(),
            updates
        );
    }

    #[test]
    fn interaction_click_drives_a_cutscene_and_back() {
        let mut ctx = GameContext::new();
        ctx.registry.register_hotspot(scene_door());
        let mut scheduler = FrameScheduler::new();
        let mut rig = Rig::new();
        let click = InputSnapshot {
            pointer: Pos::new(5.0, 5.0),
            primary: ClickKind::Single,
            ..Default::default()
        };
        scheduler.advance(&mut ctx, &mut rig.services(), &click);
        assert_eq!(ctx.mode.get(), GameMode::Cutscene);
        for _ in 0..4 {
            scheduler.advance(&mut ctx, &mut rig.services(), &InputSnapshot::default());
        }
        assert_eq!(ctx.mode.get(), GameMode::Normal);
        assert!(ctx
            .journal()
            .contains(&"mode.change cutscene -> normal".to_string()));
    }
}
