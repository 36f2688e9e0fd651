use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

/// Headless host that drives the interaction/dialogue runtime through a
/// scripted scenario and records JSON artefacts.
#[derive(Parser, Debug)]
#[command(
    about = "Headless scenario host for the interaction/dialogue runtime",
    version
)]
pub struct Args {
    /// Lua scenario file to load (default: the built-in office demo)
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, default_value_t = 240)]
    pub frames: u64,

    /// Print every journal entry as it is recorded
    #[arg(long)]
    pub verbose: bool,

    /// Path to write the event log JSON (journal entries keyed by frame)
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the speech-audio event log JSON
    #[arg(long)]
    pub audio_log_json: Option<PathBuf>,

    /// Path to write the menu-host event log JSON
    #[arg(long)]
    pub menu_log_json: Option<PathBuf>,

    /// Path to write the final session snapshot JSON
    #[arg(long)]
    pub snapshot_json: Option<PathBuf>,

    /// Session snapshot JSON to restore before the first frame
    #[arg(long)]
    pub restore_snapshot: Option<PathBuf>,
}

pub fn parse() -> Result<Args> {
    let args = Args::parse();
    if args.frames == 0 {
        bail!("--frames must be at least 1");
    }
    Ok(args)
}
