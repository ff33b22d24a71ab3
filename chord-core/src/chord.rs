//! # Chord Identification Module
//!
//! Matches a set of pitch classes against a fixed table of chord templates.
//!
//! Every input pitch class is tried as the root. For each (root, template)
//! pair the score weighs how much of the template is present against how
//! much of the input the template explains. Pairs covering less than the
//! acceptance fraction of their template are rejected; the best score wins
//! and ties go to the pair found first (roots in input order, templates in
//! table order).

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::AnalysisConfig;
use crate::tuning::{Note, PitchClass};

/// Chord types recognised by the identifier, in matching order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordKind {
    Major,
    Minor,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Dominant7,
    Maj7,
    Minor7,
    HalfDiminished7,
    Sixth,
    Minor6,
}

impl ChordKind {
    /// Template table in matching order.
    pub const ALL: [ChordKind; 12] = [
        ChordKind::Major,
        ChordKind::Minor,
        ChordKind::Diminished,
        ChordKind::Augmented,
        ChordKind::Sus2,
        ChordKind::Sus4,
        ChordKind::Dominant7,
        ChordKind::Maj7,
        ChordKind::Minor7,
        ChordKind::HalfDiminished7,
        ChordKind::Sixth,
        ChordKind::Minor6,
    ];

    /// Root-relative semitones of the chord.
    pub fn intervals(self) -> &'static [usize] {
        match self {
            ChordKind::Major => &[0, 4, 7],
            ChordKind::Minor => &[0, 3, 7],
            ChordKind::Diminished => &[0, 3, 6],
            ChordKind::Augmented => &[0, 4, 8],
            ChordKind::Sus2 => &[0, 2, 7],
            ChordKind::Sus4 => &[0, 5, 7],
            ChordKind::Dominant7 => &[0, 4, 7, 10],
            ChordKind::Maj7 => &[0, 4, 7, 11],
            ChordKind::Minor7 => &[0, 3, 7, 10],
            ChordKind::HalfDiminished7 => &[0, 3, 6, 10],
            ChordKind::Sixth => &[0, 4, 7, 9],
            ChordKind::Minor6 => &[0, 3, 7, 9],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChordKind::Major => "Major",
            ChordKind::Minor => "Minor",
            ChordKind::Diminished => "Diminished",
            ChordKind::Augmented => "Augmented",
            ChordKind::Sus2 => "Sus2",
            ChordKind::Sus4 => "Sus4",
            ChordKind::Dominant7 => "Dominant7",
            ChordKind::Maj7 => "Maj7",
            ChordKind::Minor7 => "m7",
            ChordKind::HalfDiminished7 => "m7b5",
            ChordKind::Sixth => "6",
            ChordKind::Minor6 => "m6",
        }
    }
}

/// The chord label of a detection, or one of the sentinel outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chord {
    /// A matched template, e.g. "C Major".
    Identified { root: PitchClass, kind: ChordKind },
    /// Exactly one note was detected, e.g. "A note".
    SingleNote(PitchClass),
    /// Fewer than two distinct pitch classes to match.
    NoChord,
    /// Notes were present but no template was accepted.
    Unknown,
    /// The buffer was silent.
    NoNotes,
    /// Analysis of the buffer failed.
    Error,
}

impl Chord {
    pub fn is_identified(&self) -> bool {
        matches!(self, Chord::Identified { .. })
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chord::Identified { root, kind } => write!(f, "{} {}", root, kind.name()),
            Chord::SingleNote(pitch_class) => write!(f, "{pitch_class} note"),
            Chord::NoChord => f.write_str("No chord detected"),
            Chord::Unknown => f.write_str("Unknown chord"),
            Chord::NoNotes => f.write_str("No notes"),
            Chord::Error => f.write_str("Error"),
        }
    }
}

impl Serialize for Chord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Template matcher with configurable acceptance and score weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordIdentifier {
    acceptance: f32,
    pattern_weight: f32,
    coverage_weight: f32,
}

impl Default for ChordIdentifier {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl ChordIdentifier {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            acceptance: config.chord_acceptance,
            pattern_weight: config.pattern_weight,
            coverage_weight: config.coverage_weight,
        }
    }

    /// Identifies the chord formed by `pitch_classes` (duplicates allowed).
    pub fn identify(&self, pitch_classes: &[PitchClass]) -> Chord {
        let distinct: BTreeSet<PitchClass> = pitch_classes.iter().copied().collect();
        if distinct.len() < 2 {
            return Chord::NoChord;
        }

        let mut best: Option<(f32, Chord)> = None;
        for &root in pitch_classes {
            let normalized: BTreeSet<usize> = distinct.iter().map(|pc| pc.interval_from(root)).collect();
            for kind in ChordKind::ALL {
                let template = kind.intervals();
                let common = template.iter().filter(|i| normalized.contains(i)).count() as f32;
                let pattern_coverage = common / template.len() as f32;
                let chord_coverage = common / normalized.len() as f32;
                let score = pattern_coverage * self.pattern_weight + chord_coverage * self.coverage_weight;

                if pattern_coverage >= self.acceptance && best.is_none_or(|(best_score, _)| score > best_score) {
                    best = Some((score, Chord::Identified { root, kind }));
                }
            }
        }

        best.map_or(Chord::Unknown, |(_, chord)| chord)
    }

    /// Identifies the chord of a note set, ignoring octaves.
    pub fn identify_notes(&self, notes: &[Note]) -> Chord {
        let pitch_classes: Vec<PitchClass> = notes.iter().map(Note::pitch_class).collect();
        self.identify(&pitch_classes)
    }
}

/// Identifies a chord with the default template weights.
pub fn identify_chord(pitch_classes: &[PitchClass]) -> Chord {
    ChordIdentifier::default().identify(pitch_classes)
}
