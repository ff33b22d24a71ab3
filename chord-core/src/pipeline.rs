//! # Analysis Pipeline
//!
//! Runs one buffer through the full chain:
//!
//! 1. Silence gate on the raw buffer
//! 2. General band filter (40-3000 Hz), then the narrower analysis band (55-2500 Hz)
//! 3. Spectral peak picking
//! 4. Harmonic clustering and ranking of fundamentals
//! 5. YIN fallback when no fundamental was found (live mode only)
//! 6. Note mapping
//! 7. Temporal stabilization of notes and chord (live mode only)
//! 8. Chord identification
//!
//! [`Analyzer::analyze`] never fails and never panics past its boundary:
//! every fault becomes a result with the "Error" chord.

use std::panic::{self, AssertUnwindSafe};

use crate::buffer::SampleBuffer;
use crate::chord::{Chord, ChordIdentifier};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::filter::BandpassFilter;
use crate::harmonics;
use crate::peaks::{PeakDetection, PeakDetector};
use crate::pitch::{self, YinParams};
use crate::sink::ResultSink;
use crate::stabilizer::DetectionHistory;
use crate::tuning::Note;
use crate::DetectionResult;

/// How a buffer's result is handled.
pub enum AnalysisMode<'a> {
    /// Live capture: YIN fallback enabled, result stabilized against the
    /// session's history and delivered to the sink.
    Live {
        history: &'a mut DetectionHistory,
        sink: &'a dyn ResultSink,
    },
    /// One chunk of a file: stateless, the result is only returned.
    FileChunk,
}

impl AnalysisMode<'_> {
    fn is_live(&self) -> bool {
        matches!(self, AnalysisMode::Live { .. })
    }
}

/// The note/chord detector. Holds only immutable configuration, so one
/// analyzer can serve any number of threads and sessions.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    chords: ChordIdentifier,
}

impl Analyzer {
    /// Creates an analyzer after validating `config`.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let chords = ChordIdentifier::new(&config);
        Ok(Self { config, chords })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// A fresh stabilization history sized for this analyzer's configuration.
    pub fn new_history(&self) -> DetectionHistory {
        DetectionHistory::new(self.config.history_len)
    }

    /// Analyzes one mono buffer.
    ///
    /// Precondition faults, numeric failures and panics inside the pipeline
    /// are turned into a result carrying `error` and the "Error" chord. In
    /// live mode the result is also handed to the sink.
    pub fn analyze(
        &self,
        samples: &[f32],
        sample_rate: u32,
        mut mode: AnalysisMode<'_>,
        time_position: Option<f64>,
    ) -> DetectionResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_analyze(samples, sample_rate, &mut mode)));

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                log::error!("[PIPELINE] Analysis failed: {}", e);
                DetectionResult::failed(e.to_string())
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "analysis panicked".to_string());
                log::error!("[PIPELINE] Analysis panicked: {}", message);
                DetectionResult::failed(message)
            }
        }
        .with_time_position(time_position);

        if let AnalysisMode::Live { sink, .. } = mode {
            sink.on_result(&result);
        }
        result
    }

    /// Analyzes one mono buffer, surfacing precondition faults as errors.
    ///
    /// Live-mode state is updated, but the sink is not called.
    pub fn try_analyze(&self, samples: &[f32], sample_rate: u32, mode: &mut AnalysisMode<'_>) -> Result<DetectionResult> {
        let config = &self.config;
        let buffer = SampleBuffer::new(samples, sample_rate)?;
        let detector = PeakDetector::new(config);

        if detector.is_silent(buffer.samples()) {
            log::trace!("[PIPELINE] Buffer below noise threshold");
            return Ok(DetectionResult::silent());
        }

        let general = BandpassFilter::design(config.general_band, config.filter_order, sample_rate)?
            .apply(buffer.samples());
        let filtered = BandpassFilter::design(config.analysis_band, config.filter_order, sample_rate)?.apply(&general);

        let peaks = match detector.detect(&filtered, sample_rate) {
            PeakDetection::Silent => {
                log::trace!("[PIPELINE] Spectrum below noise threshold");
                return Ok(DetectionResult::silent());
            }
            PeakDetection::Peaks(peaks) => peaks,
        };

        let analysis = harmonics::cluster(&peaks, config);
        let mut fundamentals: Vec<f32> = analysis
            .top(config.max_fundamentals)
            .iter()
            .map(|f| f.frequency)
            .collect();
        fundamentals.sort_by(|a, b| a.total_cmp(b));

        let mut notes: Vec<Note> = Vec::with_capacity(fundamentals.len());
        for note in fundamentals.into_iter().filter_map(Note::from_frequency) {
            if !notes.contains(&note) {
                notes.push(note);
            }
        }
        let mut confidence = analysis.confidence;

        if notes.is_empty() && mode.is_live() {
            let params = YinParams {
                threshold: config.yin_threshold,
                min_frequency: config.yin_min_frequency,
                max_frequency: config.yin_max_frequency,
            };
            if let Some(note) = pitch::detect_pitch_yin(&filtered, sample_rate, &params).and_then(Note::from_frequency) {
                log::debug!("[PIPELINE] YIN fallback found {}", note);
                notes.push(note);
                confidence = config.yin_confidence;
            }
        }

        if let AnalysisMode::Live { history, .. } = mode {
            notes = history.stabilize_notes(notes);
        }

        let chord = match notes.as_slice() {
            [] => Chord::NoChord,
            [single] => Chord::SingleNote(single.pitch_class()),
            _ => {
                let chord = self.chords.identify_notes(&notes);
                match mode {
                    AnalysisMode::Live { history, .. } => history.stabilize_chord(chord),
                    AnalysisMode::FileChunk => chord,
                }
            }
        };

        if notes.is_empty() {
            confidence = 0.0;
        }

        log::debug!(
            "[PIPELINE] {} peaks, {} fundamentals -> [{}] {} ({:.0}%)",
            peaks.len(),
            analysis.ranked.len(),
            notes.iter().map(Note::to_string).collect::<Vec<_>>().join(", "),
            chord,
            confidence
        );

        Ok(DetectionResult {
            notes,
            chord,
            confidence: confidence.clamp(0.0, 100.0),
            time_position: None,
            error: None,
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        let config = AnalysisConfig::default();
        let chords = ChordIdentifier::new(&config);
        Self { config, chords }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterBand;
    use std::sync::Mutex;

    const SR: u32 = 44100;

    fn tone(freqs: &[(f32, f32)], len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / SR as f32;
                freqs
                    .iter()
                    .map(|&(f, a)| a * (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum()
            })
            .collect()
    }

    #[test]
    fn silence_yields_no_notes() {
        let analyzer = Analyzer::default();
        let result = analyzer.analyze(&[0.0; 2048], SR, AnalysisMode::FileChunk, None);
        assert_eq!(result, DetectionResult::silent());
        assert_eq!(result.chord.to_string(), "No notes");
    }

    #[test]
    fn empty_buffer_is_reported_not_thrown() {
        let analyzer = Analyzer::default();
        let result = analyzer.analyze(&[], SR, AnalysisMode::FileChunk, Some(2.0));
        assert!(result.is_error());
        assert_eq!(result.chord, Chord::Error);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.time_position, Some(2.0));
    }

    #[test]
    fn band_above_nyquist_is_a_precondition_fault() {
        let analyzer = Analyzer::default();
        // 3000 Hz is above Nyquist at 4 kHz.
        let signal = tone(&[(440.0, 0.5)], 2048);
        let mut mode = AnalysisMode::FileChunk;
        assert!(analyzer.try_analyze(&signal, 4000, &mut mode).is_err());
        assert!(analyzer.analyze(&signal, 4000, AnalysisMode::FileChunk, None).is_error());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = AnalysisConfig {
            analysis_band: FilterBand::new(2500.0, 55.0),
            ..Default::default()
        };
        assert!(Analyzer::new(config).is_err());
    }

    #[test]
    fn live_mode_emits_to_sink_and_file_mode_does_not() {
        let analyzer = Analyzer::default();
        let seen = Mutex::new(0usize);
        let sink = |_: &DetectionResult| *seen.lock().unwrap() += 1;
        let mut history = analyzer.new_history();
        let signal = tone(&[(440.0, 0.5)], 4096);

        analyzer.analyze(&signal, SR, AnalysisMode::FileChunk, None);
        assert_eq!(*seen.lock().unwrap(), 0);

        let result = analyzer.analyze(
            &signal,
            SR,
            AnalysisMode::Live {
                history: &mut history,
                sink: &sink,
            },
            None,
        );
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(result.notes_label(), "A4");
        assert_eq!(result.chord.to_string(), "A note");
    }

    #[test]
    fn silent_live_buffers_leave_history_untouched() {
        let analyzer = Analyzer::default();
        let sink = |_: &DetectionResult| {};
        let mut history = analyzer.new_history();
        analyzer.analyze(
            &[0.0; 2048],
            SR,
            AnalysisMode::Live {
                history: &mut history,
                sink: &sink,
            },
            None,
        );
        assert_eq!(history.note_frames().count(), 0);
    }
}
