//! Command-line player for gesture scripts.
//!
//! Scripts are played against the in-memory mock host, so the output shows
//! exactly which events a hand would dispatch and when.

mod commands;
mod script;
mod util;

#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

pub use script::{FingerSpec, HostOptions, Script, Step};

#[derive(Parser)]
#[command(name = "prosthetic-hand", version, about = "Play synthetic touch, pointer and mouse gestures")]
struct Cli {
    /// Log filter, e.g. `debug` or `prosthetic_runtime=trace`. Defaults to `RUST_LOG`.
    #[arg(long = "log-level", global = true, value_parser = util::parse_log_filter)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a JSON gesture script.
    Run(commands::run::RunArgs),
    /// Play one of the built-in gestures.
    Demo(commands::demo::DemoArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let output = match &cli.command {
        Command::Run(args) => commands::run::run(args)?,
        Command::Demo(args) => commands::demo::run(args)?,
    };
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn init_tracing(level: Option<&str>) {
    let filter = level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
