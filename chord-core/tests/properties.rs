use chord_core::chord::identify_chord;
use chord_core::filter::bandpass;
use chord_core::tuning::midi_number;
use chord_core::{AnalysisMode, Analyzer, Chord, ChordKind, FilterBand, Note, PitchClass};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn doubling_frequency_raises_the_octave(freq in 30.0f32..2000.0) {
        let midi = midi_number(freq).unwrap();
        // Rounding ties at the quarter-tone may resolve either way.
        prop_assume!((midi.fract() - 0.5).abs() > 1e-3);
        let low = Note::from_frequency(freq).unwrap();
        let high = Note::from_frequency(freq * 2.0).unwrap();
        prop_assert_eq!(high.pitch_class(), low.pitch_class());
        prop_assert_eq!(high.octave(), low.octave() + 1);
    }

    #[test]
    fn equal_tempered_notes_round_trip(midi in 12i32..120) {
        let freq = 440.0 * 2f32.powf((midi - 69) as f32 / 12.0);
        let note = Note::from_frequency(freq).unwrap();
        prop_assert_eq!(note.midi(), midi);
        let parsed: Note = note.to_string().parse().unwrap();
        prop_assert_eq!(parsed, note);
    }

    #[test]
    fn filtering_preserves_length(signal in prop::collection::vec(-1.0f32..1.0, 1..4096)) {
        let out = bandpass(&signal, 44100, FilterBand::new(55.0, 2500.0), 5).unwrap();
        prop_assert_eq!(out.len(), signal.len());
        prop_assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn root_position_chords_are_recognized(root in 0usize..12, kind in 0usize..12) {
        let root = PitchClass::from_index(root);
        let kind = ChordKind::ALL[kind];
        let pitch_classes: Vec<_> = kind
            .intervals()
            .iter()
            .map(|i| PitchClass::from_index(root.index() + i))
            .collect();
        prop_assert_eq!(identify_chord(&pitch_classes), Chord::Identified { root, kind });
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn confidence_is_bounded(signal in prop::collection::vec(-1.0f32..1.0, 256..4096)) {
        let _ = env_logger::builder().is_test(true).try_init();
        let analyzer = Analyzer::default();
        let result = analyzer.analyze(&signal, 44100, AnalysisMode::FileChunk, None);
        prop_assert!((0.0..=100.0).contains(&result.confidence));
        if result.notes.is_empty() {
            prop_assert_eq!(result.confidence, 0.0);
        }
        let mut distinct = result.notes.clone();
        distinct.dedup();
        prop_assert_eq!(distinct.len(), result.notes.len());
    }
}
