//! File analysis command.

use std::path::PathBuf;

use anyhow::Context;
use chord_core::decoder::load_wav;
use chord_core::sink::{LogSink, ResultSink};
use chord_core::{Analyzer, FileSummary};
use clap::Args;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Print the full summary, including every chunk, as JSON
    #[arg(long)]
    json: bool,

    /// JSON file overriding analysis constants
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let analyzer = Analyzer::new(config)?;
    let audio = load_wav(&args.input).with_context(|| format!("loading {}", args.input.display()))?;
    log::info!(
        "Loaded {} ({:.2}s, {} channel(s) at {} Hz)",
        args.input.display(),
        audio.duration_secs(),
        audio.channels,
        audio.sample_rate
    );

    let summary = analyzer.analyze_file_with(&audio.samples, audio.sample_rate, Some(&LogSink as &dyn ResultSink), None);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", report(&summary));
    }

    let name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::info!(
        "File Analysis: {} - Notes: {} - Chords: {}",
        name,
        summary.notes_label(),
        summary.chords_label()
    );
    Ok(())
}

fn report(summary: &FileSummary) -> String {
    if summary.is_empty() {
        return "Could not detect any chords in this audio file.".to_string();
    }
    format!(
        "Detected Notes: {}\nDetected Chords: {}",
        summary.notes_label(),
        summary.chords_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_has_a_friendly_report() {
        let summary = Analyzer::default().analyze_file(&vec![0.0; 44100], 44100);
        assert_eq!(report(&summary), "Could not detect any chords in this audio file.");
    }
}
