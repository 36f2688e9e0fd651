//! Drives the runtime for a fixed number of frames from a scripted timeline
//! and exports the journal, recorder streams, and final snapshot as JSON.

use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use stagehand_core::{
    FrameScheduler, GameContext, InputSnapshot, Pos, SequenceRunner, Services, SessionSnapshot,
};

use crate::cli::Args;
use crate::demo;
use crate::host::LuaSequenceRunner;
use crate::navigator::LineNavigator;
use crate::recorders::{RecordingMenuHost, RecordingSpeechAudio};
use crate::scenario::{ScenarioData, TimelineStep};

const AUDIO_POLLS_PER_LINE: u32 = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventLogEntry {
    pub sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    pub label: String,
}

#[derive(Debug, Serialize)]
struct EventLog {
    scenario: String,
    frames: u64,
    events: Vec<EventLogEntry>,
}

#[derive(Serialize)]
struct RecorderLog<T: Serialize> {
    scenario: String,
    events: Vec<T>,
}

pub fn execute(args: Args) -> Result<()> {
    let (scenario, mut runner): (ScenarioData, Box<dyn SequenceRunner>) =
        match args.scenario.as_ref() {
            Some(path) => {
                let mut host = LuaSequenceRunner::new().context("initialising the Lua host")?;
                let data = host.load_scenario(path)?;
                (data, Box::new(host))
            }
            None => {
                let (data, runner) = demo::office().context("building the built-in demo")?;
                (data, Box::new(runner))
            }
        };

    let scenario_name = scenario.name.clone();
    let player_start = scenario.player;
    let timeline = scenario.timeline.clone();

    let mut ctx = GameContext::new();
    scenario.install(&mut ctx);
    let mut navigator = LineNavigator::new(player_start);
    let mut menu = RecordingMenuHost::new();
    let mut audio = RecordingSpeechAudio::new(AUDIO_POLLS_PER_LINE);

    if let Some(path) = args.restore_snapshot.as_ref() {
        let blob = fs::read_to_string(path)
            .with_context(|| format!("reading snapshot from {}", path.display()))?;
        let snapshot = SessionSnapshot::from_blob(&blob)
            .with_context(|| format!("decoding snapshot from {}", path.display()))?;
        let mut services = Services {
            navigator: &mut navigator,
            runner: runner.as_mut(),
            menu: &mut menu,
            audio: &mut audio,
        };
        snapshot.apply(&mut ctx, &mut services);
        eprintln!("[stagehand] info: restored snapshot from {}", path.display());
    }

    let mut scheduler = FrameScheduler::new();
    let mut pointer = Pos::default();
    let mut printed = 0usize;
    for _ in 0..args.frames {
        let frame = scheduler.frame() + 1;
        let mut input = InputSnapshot::default();
        input.pointer = pointer;
        let mut commands = Vec::new();
        for step in timeline.iter().filter(|step| step.frame() == frame) {
            match step {
                TimelineStep::Input {
                    pointer: moved,
                    primary,
                    secondary,
                    skip,
                    ..
                } => {
                    if let Some(position) = moved {
                        pointer = *position;
                        input.pointer = *position;
                    }
                    input.primary = *primary;
                    input.secondary = *secondary;
                    input.skip = *skip;
                }
                other => commands.push(other.clone()),
            }
        }

        audio.tick();
        {
            let mut services = Services {
                navigator: &mut navigator,
                runner: runner.as_mut(),
                menu: &mut menu,
                audio: &mut audio,
            };
            scheduler.advance(&mut ctx, &mut services, &input);
            for command in commands {
                match command {
                    TimelineStep::ChooseSlot { slot, .. } => {
                        ctx.choose_option(slot, &mut services);
                    }
                    TimelineStep::BeginConversation { conversation, .. } => {
                        ctx.begin_conversation(&conversation, &mut services);
                    }
                    TimelineStep::SelectItem {
                        item: Some(item), ..
                    } => {
                        if ctx.inventory.select(&item) {
                            ctx.log_event(format!("inventory.select {item}"));
                        } else {
                            log::warn!("cannot select {item}: not carried");
                        }
                    }
                    TimelineStep::SelectItem { item: None, .. } => {
                        ctx.inventory.deselect();
                        ctx.log_event("inventory.deselect");
                    }
                    TimelineStep::Pause { .. } => ctx.pause(&mut services),
                    TimelineStep::Resume { .. } => ctx.resume(&mut services),
                    TimelineStep::SceneExit { .. } => ctx.on_scene_exit(&mut services),
                    TimelineStep::Input { .. } => {}
                }
            }
        }
        if args.verbose {
            for line in &ctx.journal()[printed..] {
                println!("[stagehand] {line}");
            }
            printed = ctx.journal().len();
        }
    }

    if let Some(path) = args.event_log_json.as_ref() {
        let log = EventLog {
            scenario: scenario_name.clone(),
            frames: args.frames,
            events: build_event_log(ctx.journal()),
        };
        let json = serde_json::to_string_pretty(&log).context("serialising the event log")?;
        fs::write(path, json)
            .with_context(|| format!("writing event log to {}", path.display()))?;
        println!("Saved event log to {}", path.display());
    }
    if let Some(path) = args.audio_log_json.as_ref() {
        let log = RecorderLog {
            scenario: scenario_name.clone(),
            events: audio.events(),
        };
        let json = serde_json::to_string_pretty(&log).context("serialising the audio log")?;
        fs::write(path, json)
            .with_context(|| format!("writing audio log to {}", path.display()))?;
        println!("Saved audio log to {}", path.display());
    }
    if let Some(path) = args.menu_log_json.as_ref() {
        let log = RecorderLog {
            scenario: scenario_name.clone(),
            events: menu.events(),
        };
        let json = serde_json::to_string_pretty(&log).context("serialising the menu log")?;
        fs::write(path, json)
            .with_context(|| format!("writing menu log to {}", path.display()))?;
        println!("Saved menu log to {}", path.display());
    }
    if let Some(path) = args.snapshot_json.as_ref() {
        let blob = SessionSnapshot::capture(&ctx)
            .to_blob()
            .context("serialising the session snapshot")?;
        fs::write(path, blob)
            .with_context(|| format!("writing snapshot to {}", path.display()))?;
        println!("Saved snapshot to {}", path.display());
    }

    println!(
        "Scenario {scenario_name}: ran {} frames, {} journal entries, final mode {}",
        args.frames,
        ctx.journal().len(),
        ctx.mode.get().label()
    );
    Ok(())
}

/// Folds the flat journal into per-frame entries. `frame.tick N` markers set
/// the frame for the entries that follow; entries recorded before the first
/// marker are backfilled with the first frame seen, and consecutive duplicate
/// labels collapse into one entry.
pub fn build_event_log(journal: &[String]) -> Vec<EventLogEntry> {
    let mut events: Vec<EventLogEntry> = Vec::new();
    let mut pending_without_frame: Vec<usize> = Vec::new();
    let mut last_frame: Option<u64> = None;
    let mut last_label: Option<&str> = None;
    let mut sequence = 0u32;

    for line in journal {
        if let Some(rest) = line.strip_prefix("frame.tick ") {
            if let Ok(frame) = rest.trim().parse::<u64>() {
                if last_frame.is_none() {
                    for index in pending_without_frame.drain(..) {
                        events[index].frame = Some(frame);
                    }
                }
                last_frame = Some(frame);
                last_label = None;
            }
            continue;
        }
        if last_label == Some(line.as_str()) {
            continue;
        }
        last_label = Some(line.as_str());
        sequence += 1;
        let index = events.len();
        events.push(EventLogEntry {
            sequence,
            frame: last_frame,
            label: line.clone(),
        });
        if last_frame.is_none() {
            pending_without_frame.push(index);
        }
    }

    let fallback = last_frame.or(Some(0));
    for index in pending_without_frame {
        events[index].frame = fallback;
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn entries_take_the_frame_of_the_preceding_marker() {
        let events = build_event_log(&journal(&[
            "frame.tick 1",
            "hotspot.select terminal",
            "frame.tick 2",
            "approach.start terminal",
        ]));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].frame, Some(1));
        assert_eq!(events[0].label, "hotspot.select terminal");
        assert_eq!(events[1].frame, Some(2));
        assert_eq!(events[1].sequence, 2);
    }

    #[test]
    fn entries_before_the_first_marker_are_backfilled() {
        let events = build_event_log(&journal(&[
            "camera.mode office_overhead",
            "frame.tick 1",
            "hotspot.select terminal",
        ]));
        assert_eq!(events[0].frame, Some(1));
        assert_eq!(events[0].label, "camera.mode office_overhead");
    }

    #[test]
    fn a_journal_with_no_markers_lands_on_frame_zero() {
        let events = build_event_log(&journal(&["camera.mode office_overhead"]));
        assert_eq!(events[0].frame, Some(0));
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let events = build_event_log(&journal(&[
            "frame.tick 1",
            "hotspot.select terminal",
            "hotspot.select terminal",
            "frame.tick 2",
            "hotspot.select terminal",
        ]));
        // the marker resets duplicate tracking, so frame 2 keeps its copy
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].frame, Some(2));
    }
}
