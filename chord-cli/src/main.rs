//! # Chord CLI
//!
//! Command-line front end for `chord-core`: listen to the default input
//! device, or analyze a recorded WAV file.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chord-cli")]
#[command(author, version, about = "Live and recorded note/chord detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect notes and chords from the default input device
    Listen(commands::listen::ListenArgs),

    /// Detect the notes and chords of a WAV file
    Analyze(commands::analyze::AnalyzeArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Listen(args) => commands::listen::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
    }
}
