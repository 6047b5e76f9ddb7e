use anyhow::Context;
use clap::Args;
use prosthetic_runtime::TimingPolicy;
use std::path::PathBuf;

use super::render;
use crate::OutputFormat;
use crate::script::Script;
use crate::util::{CliResult, parse_timing_arg};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a JSON gesture script.
    pub script: PathBuf,
    /// Overrides `hand.timing` from the script (`<N>ms`, frame, minimal, instant, fastframe).
    #[arg(long = "timing", value_parser = parse_timing_arg)]
    pub timing: Option<TimingPolicy>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run(args: &RunArgs) -> CliResult<String> {
    let source = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;
    let mut script = Script::from_json(&source)?;
    if let Some(timing) = args.timing {
        script = script.with_timing(timing);
    }
    let summary = script.play()?;
    render(&summary, args.format)
}
