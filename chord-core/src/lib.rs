// chord-core/src/lib.rs

//! The core logic for live and recorded note/chord detection.
//! This crate is responsible for audio capture, filtering, spectral and
//! YIN pitch detection, chord matching and temporal aggregation. It is
//! completely headless and contains no GUI code.
//!
//! The entry points are [`pipeline::Analyzer::analyze`] for single buffers
//! and [`pipeline::Analyzer::analyze_file`] for whole recordings.

pub mod aggregate;
pub mod audio;
pub mod buffer;
pub mod chord;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fft;
pub mod filter;
pub mod harmonics;
pub mod live;
pub mod peaks;
pub mod pipeline;
pub mod pitch;
pub mod sink;
pub mod stabilizer;
pub mod tuning;

use serde::Serialize;

pub use aggregate::FileSummary;
pub use chord::{Chord, ChordKind};
pub use config::{AnalysisConfig, CaptureConfig, FilterBand};
pub use error::{ChordError, Result};
pub use pipeline::{AnalysisMode, Analyzer};
pub use sink::ResultSink;
pub use stabilizer::DetectionHistory;
pub use tuning::{Note, PitchClass};

/// Represents the result of analyzing a single buffer or file chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Detected notes ordered by frequency, without duplicates.
    pub notes: Vec<Note>,
    /// The chord label or a sentinel outcome.
    pub chord: Chord,
    /// Confidence in percent (0-100); 0 exactly when `notes` is empty.
    pub confidence: f32,
    /// Start of the chunk within the file, in seconds (file mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_position: Option<f64>,
    /// Description of the fault when analysis failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResult {
    /// The result for a silent or low-signal buffer.
    pub fn silent() -> Self {
        Self {
            notes: Vec::new(),
            chord: Chord::NoNotes,
            confidence: 0.0,
            time_position: None,
            error: None,
        }
    }

    /// A well-formed result describing a failed analysis.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            notes: Vec::new(),
            chord: Chord::Error,
            confidence: 0.0,
            time_position: None,
            error: Some(message.into()),
        }
    }

    pub fn with_time_position(mut self, time_position: Option<f64>) -> Self {
        self.time_position = time_position;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Note labels joined with ", " for display.
    pub fn notes_label(&self) -> String {
        self.notes.iter().map(Note::to_string).collect::<Vec<_>>().join(", ")
    }
}
