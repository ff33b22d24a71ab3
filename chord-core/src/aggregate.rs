//! # File-Mode Aggregation
//!
//! Splits a decoded waveform into overlapping windows, analyzes each window
//! statelessly and folds the per-window results into a [`FileSummary`].

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::chord::Chord;
use crate::config::AnalysisConfig;
use crate::pipeline::{AnalysisMode, Analyzer};
use crate::sink::ResultSink;
use crate::tuning::Note;
use crate::DetectionResult;

/// File-level outcome of a chunked analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    /// Union of the notes of every chunk, in ascending pitch order.
    pub notes: Vec<Note>,
    /// Significant chords, most frequent first.
    pub chords: Vec<Chord>,
    /// Every analyzed chunk in time order, including silent and failed ones.
    pub chunks: Vec<DetectionResult>,
    /// Number of chunks that reported at least one note.
    pub analyzed_chunks: usize,
    pub duration_secs: f64,
}

impl FileSummary {
    /// True when no chunk reported a note.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn notes_label(&self) -> String {
        self.notes.iter().map(Note::to_string).collect::<Vec<_>>().join(", ")
    }

    pub fn chords_label(&self) -> String {
        self.chords.iter().map(Chord::to_string).collect::<Vec<_>>().join(", ")
    }
}

/// Sample ranges of the analysis windows for a waveform of `len` samples.
///
/// Windows start every `chunk_hop_secs`; a window cut short by the end of
/// the waveform is kept only if it still spans `min_chunk_secs`.
pub fn chunk_windows(len: usize, sample_rate: u32, config: &AnalysisConfig) -> Vec<Range<usize>> {
    let rate = sample_rate as f32;
    let window = ((config.chunk_secs * rate).round() as usize).max(1);
    let hop = ((config.chunk_hop_secs * rate).round() as usize).max(1);
    let min_len = (config.min_chunk_secs * rate).round() as usize;

    (0..len)
        .step_by(hop)
        .map(|start| start..(start + window).min(len))
        .filter(|range| range.len() >= min_len.max(1))
        .collect()
}

/// Folds per-chunk results into a file summary.
///
/// Only chunks with notes contribute. A chord is significant when it is an
/// identified chord seen in more than `chord_significance` of those chunks;
/// at most `max_chords` of them are kept.
pub fn summarize(chunks: Vec<DetectionResult>, duration_secs: f64, config: &AnalysisConfig) -> FileSummary {
    let mut notes = BTreeSet::new();
    let mut counts: Vec<(Chord, usize)> = Vec::new();
    let mut analyzed = 0usize;

    for result in chunks.iter().filter(|r| r.has_notes()) {
        analyzed += 1;
        notes.extend(result.notes.iter().copied());
        if !result.chord.is_identified() {
            continue;
        }
        match counts.iter_mut().find(|(chord, _)| *chord == result.chord) {
            Some((_, count)) => *count += 1,
            None => counts.push((result.chord, 1)),
        }
    }

    // Stable: equally frequent chords stay in order of first appearance.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let chords = counts
        .into_iter()
        .filter(|&(_, count)| count as f32 / analyzed as f32 > config.chord_significance)
        .take(config.max_chords)
        .map(|(chord, _)| chord)
        .collect();

    FileSummary {
        notes: notes.into_iter().collect(),
        chords,
        chunks,
        analyzed_chunks: analyzed,
        duration_secs,
    }
}

impl Analyzer {
    /// Analyzes a whole mono waveform in overlapping windows.
    pub fn analyze_file(&self, samples: &[f32], sample_rate: u32) -> FileSummary {
        self.analyze_file_with(samples, sample_rate, None, None)
    }

    /// Like [`Analyzer::analyze_file`], reporting each chunk to `sink` and
    /// stopping at the next chunk boundary once `cancel` is set.
    pub fn analyze_file_with(
        &self,
        samples: &[f32],
        sample_rate: u32,
        sink: Option<&dyn ResultSink>,
        cancel: Option<&AtomicBool>,
    ) -> FileSummary {
        if sample_rate == 0 {
            log::error!("[FILE] Sample rate is zero, nothing analyzed");
            let failed = DetectionResult::failed("sample rate is zero").with_time_position(Some(0.0));
            if let Some(sink) = sink {
                sink.on_result(&failed);
            }
            return summarize(vec![failed], 0.0, self.config());
        }

        let duration_secs = samples.len() as f64 / sample_rate as f64;
        let windows = chunk_windows(samples.len(), sample_rate, self.config());
        log::info!(
            "[FILE] Analyzing {:.2}s of audio in {} windows at {} Hz",
            duration_secs,
            windows.len(),
            sample_rate
        );

        let mut chunks = Vec::with_capacity(windows.len());
        for window in windows {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                log::warn!("[FILE] Cancelled after {} chunks", chunks.len());
                break;
            }
            let time_position = window.start as f64 / sample_rate as f64;
            let result = self.analyze(
                &samples[window],
                sample_rate,
                AnalysisMode::FileChunk,
                Some(time_position),
            );
            if let Some(sink) = sink {
                sink.on_result(&result);
            }
            chunks.push(result);
        }

        let summary = summarize(chunks, duration_secs, self.config());
        log::info!(
            "[FILE] {} of {} chunks had notes - Notes: {} - Chords: {}",
            summary.analyzed_chunks,
            summary.chunks.len(),
            summary.notes_label(),
            summary.chords_label()
        );
        summary
    }
}
