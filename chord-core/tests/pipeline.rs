use std::f32::consts::PI;
use std::sync::Mutex;

use chord_core::{AnalysisMode, Analyzer, Chord, ChordKind, DetectionResult, PitchClass, ResultSink};

const SR: u32 = 44100;

fn tone(partials: &[(f32, f32)], len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / SR as f32;
            partials.iter().map(|&(f, a)| a * (2.0 * PI * f * t).sin()).sum()
        })
        .collect()
}

fn c_major_triad(len: usize) -> Vec<f32> {
    // Slightly sharp of equal temperament so refinement error cannot cross a note boundary.
    tone(&[(263.0, 0.3), (330.0, 0.3), (393.0, 0.3)], len)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn labels(result: &DetectionResult) -> Vec<String> {
    result.notes.iter().map(ToString::to_string).collect()
}

#[test]
fn pure_a4_is_detected() {
    init_logging();
    let analyzer = Analyzer::default();
    let result = analyzer.analyze(&tone(&[(440.0, 0.5)], 4096), SR, AnalysisMode::FileChunk, None);
    assert_eq!(labels(&result), ["A4"]);
    assert_eq!(result.chord, Chord::SingleNote(PitchClass::A));
    assert!(result.confidence >= 70.0);
    assert!(result.error.is_none());
}

#[test]
fn silence_is_not_an_error() {
    init_logging();
    let analyzer = Analyzer::default();
    let result = analyzer.analyze(&vec![0.0; 4096], SR, AnalysisMode::FileChunk, None);
    assert!(result.notes.is_empty());
    assert_eq!(result.chord.to_string(), "No notes");
    assert_eq!(result.confidence, 0.0);
    assert!(!result.is_error());
}

#[test]
fn harmonics_fold_into_their_fundamental() {
    init_logging();
    let analyzer = Analyzer::default();
    let signal = tone(&[(220.0, 1.0), (440.0, 0.5), (660.0, 0.33)], 8192);
    let result = analyzer.analyze(&signal, SR, AnalysisMode::FileChunk, None);
    assert_eq!(labels(&result), ["A3"]);
    assert_eq!(result.chord.to_string(), "A note");
}

#[test]
fn triad_is_named() {
    init_logging();
    let analyzer = Analyzer::default();
    let result = analyzer.analyze(&c_major_triad(8192), SR, AnalysisMode::FileChunk, None);
    assert_eq!(labels(&result), ["C4", "E4", "G4"]);
    assert_eq!(
        result.chord,
        Chord::Identified {
            root: PitchClass::C,
            kind: ChordKind::Major
        }
    );
    assert_eq!(result.chord.to_string(), "C Major");
}

#[test]
fn file_summary_collects_chunks() {
    init_logging();
    let analyzer = Analyzer::default();
    let summary = analyzer.analyze_file(&c_major_triad(SR as usize * 3), SR);

    assert_eq!(summary.chunks.len(), 6);
    let times: Vec<_> = summary.chunks.iter().map(|c| c.time_position).collect();
    assert_eq!(times[..3], [Some(0.0), Some(0.5), Some(1.0)]);
    assert_eq!(summary.notes_label(), "C4, E4, G4");
    assert_eq!(summary.chords_label(), "C Major");
    assert_eq!(summary.analyzed_chunks, 6);
}

#[test]
fn chunk_sink_sees_every_window() {
    init_logging();
    let analyzer = Analyzer::default();
    let seen = Mutex::new(0usize);
    let sink = |_: &DetectionResult| *seen.lock().unwrap() += 1;
    let summary = analyzer.analyze_file_with(&vec![0.0; SR as usize * 2], SR, Some(&sink as &dyn ResultSink), None);
    assert_eq!(*seen.lock().unwrap(), summary.chunks.len());
}

#[test]
fn steady_input_is_stable_in_live_mode() {
    init_logging();
    let analyzer = Analyzer::default();
    let mut history = analyzer.new_history();
    let sink = |_: &DetectionResult| {};
    let frame = c_major_triad(8192);

    for _ in 0..5 {
        let result = analyzer.analyze(
            &frame,
            SR,
            AnalysisMode::Live {
                history: &mut history,
                sink: &sink,
            },
            None,
        );
        assert_eq!(labels(&result), ["C4", "E4", "G4"]);
        assert_eq!(result.chord.to_string(), "C Major");
    }
    assert_eq!(history.note_frames().count(), 3);
}

#[test]
fn tone_above_the_analysis_band_falls_back_to_yin_in_live_mode_only() {
    init_logging();
    let analyzer = Analyzer::default();
    let signal = tone(&[(2800.0, 0.5)], 4096);

    let mut history = analyzer.new_history();
    let sink = |_: &DetectionResult| {};
    let live = analyzer.analyze(
        &signal,
        SR,
        AnalysisMode::Live {
            history: &mut history,
            sink: &sink,
        },
        None,
    );
    assert_eq!(labels(&live), ["F7"]);
    assert_eq!(live.chord.to_string(), "F note");
    assert_eq!(live.confidence, 70.0);

    let file = analyzer.analyze(&signal, SR, AnalysisMode::FileChunk, None);
    assert!(file.notes.is_empty());
    assert_eq!(file.chord.to_string(), "No chord detected");
    assert_eq!(file.confidence, 0.0);
    assert!(!file.is_error());
}

#[test]
fn sample_rate_too_low_for_the_bands_is_reported() {
    init_logging();
    let analyzer = Analyzer::default();
    let signal: Vec<f32> = (0..2048).map(|i| (2.0 * PI * 440.0 * i as f32 / 4000.0).sin()).collect();
    let result = analyzer.analyze(&signal, 4000, AnalysisMode::FileChunk, Some(0.0));
    assert_eq!(result.chord, Chord::Error);
    assert_eq!(result.chord.to_string(), "Error");
    assert!(result.notes.is_empty());
    assert!(result.error.as_deref().is_some_and(|e| e.contains("filter")));
}

#[test]
fn results_serialize_with_labels() {
    init_logging();
    let analyzer = Analyzer::default();
    let result = analyzer.analyze(&tone(&[(440.0, 0.5)], 4096), SR, AnalysisMode::FileChunk, Some(1.5));
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["notes"], serde_json::json!(["A4"]));
    assert_eq!(json["chord"], "A note");
    assert_eq!(json["time_position"], 1.5);
    assert!(json.get("error").is_none());
}
