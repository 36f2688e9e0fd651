use anyhow::Result;

mod cli;
mod cue;
mod demo;
mod host;
mod navigator;
mod recorders;
mod runtime;
mod scenario;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::parse()?;
    runtime::execute(args)
}
