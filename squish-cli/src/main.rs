// squish-cli/src/main.rs
//
// Command-line interface for squish. Parses arguments with clap, sets up
// env_logger, and dispatches to the command modules. Exit code is nonzero
// when a command fails outright; per-file failures inside a batch are
// reported in the summary instead.

use clap::{Parser, Subcommand};
use std::process;

mod commands;
mod output;
mod prefs;

#[derive(Parser, Debug)]
#[command(
    name = "squish",
    author,
    version,
    about = "Compress media files toward a target size",
    long_about = "Compresses images, video, and audio toward a target size in \
                  megabytes. Videos become mp4, images keep their format, and \
                  audio is re-encoded per-container."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress files toward the target size
    Compress(commands::compress::CompressArgs),
    /// Predict output sizes without compressing anything
    Estimate(commands::estimate::EstimateArgs),
    /// Show the media properties squish uses for planning
    Probe(commands::probe::ProbeArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match cli.command {
        Commands::Compress(args) => commands::compress::execute(args),
        Commands::Estimate(args) => commands::estimate::execute(args),
        Commands::Probe(args) => commands::probe::execute(args),
    };

    if let Err(e) = result {
        output::print_error(&e.to_string());
        process::exit(1);
    }
}
