//! # Musical Tuning Module
//!
//! Maps frequencies to note labels in twelve-tone equal temperament
//! (A4 = 440 Hz) and back.
//!
//! ## Features
//! - Frequency to MIDI number conversion
//! - Pitch class and octave derived together from one frequency
//! - Note label parsing ("A4", "C#3", "Bb2")
//! - Equal temperament frequency of a note for round-trip checks

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Chromatic note names starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference pitch of A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI number of A4.
const A4_MIDI: f64 = 69.0;

/// One of the twelve pitch classes, named with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order starting at C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class for a semitone index; wraps modulo 12.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Semitones above C (0-11).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.index()]
    }

    /// Interval in semitones from `root` up to `self`, modulo 12.
    pub fn interval_from(self, root: PitchClass) -> usize {
        (self.index() + 12 - root.index()) % 12
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name lookup covering sharp and flat spellings.
static PITCH_CLASS_MAP: Lazy<HashMap<&'static str, PitchClass>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, PitchClass> = NOTE_NAMES
        .iter()
        .enumerate()
        .map(|(i, &name)| (name, PitchClass::from_index(i)))
        .collect();
    for (flat, index) in [("Db", 1), ("Eb", 3), ("Gb", 6), ("Ab", 8), ("Bb", 10)] {
        map.insert(flat, PitchClass::from_index(index));
    }
    map
});

/// Error returned when a note or pitch class label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNoteError(pub String);

impl fmt::Display for ParseNoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized note label '{}'", self.0)
    }
}

impl std::error::Error for ParseNoteError {}

impl FromStr for PitchClass {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PITCH_CLASS_MAP
            .get(s.trim())
            .copied()
            .ok_or_else(|| ParseNoteError(s.to_string()))
    }
}

/// Converts a frequency to its (unrounded) MIDI number.
///
/// Returns `None` for non-positive or non-finite frequencies.
pub fn midi_number(frequency: f32) -> Option<f64> {
    if !(frequency > 0.0 && frequency.is_finite()) {
        return None;
    }
    Some(12.0 * (frequency as f64 / A4_FREQUENCY as f64).log2() + A4_MIDI)
}

/// A pitch class with its octave, e.g. "A4".
///
/// Notes are only created from a frequency or parsed from a label, so the
/// pitch class and octave always describe the same pitch. Two notes are
/// equal exactly when their labels are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note {
    octave: i32,
    pitch_class: PitchClass,
}

impl Note {
    /// Maps a frequency to the nearest note.
    ///
    /// The pitch class comes from the rounded MIDI number; the octave is
    /// `floor((midi - 12) / 12)` of the unrounded one. Frequencies `<= 0`
    /// have no note.
    pub fn from_frequency(frequency: f32) -> Option<Note> {
        let midi = midi_number(frequency)?;
        // Exact note frequencies stored as f32 land slightly off the integer.
        let midi = if (midi - midi.round()).abs() < 1e-4 {
            midi.round()
        } else {
            midi
        };
        let pitch_class = PitchClass::from_index((midi.round() as i64).rem_euclid(12) as usize);
        let octave = ((midi - 12.0) / 12.0).floor() as i32;
        Some(Note { octave, pitch_class })
    }

    pub fn pitch_class(&self) -> PitchClass {
        self.pitch_class
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// MIDI number of the note (C4 = 60).
    pub fn midi(&self) -> i32 {
        (self.octave + 1) * 12 + self.pitch_class.index() as i32
    }

    /// Equal temperament frequency of the note in Hz.
    pub fn frequency(&self) -> f32 {
        (A4_FREQUENCY as f64 * 2.0_f64.powf((self.midi() as f64 - A4_MIDI) / 12.0)) as f32
    }
}

/// Pure mapping from frequency to note; `None` means "no note".
pub fn frequency_to_note(frequency: f32) -> Option<Note> {
    Note::from_frequency(frequency)
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

impl FromStr for Note {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .ok_or_else(|| ParseNoteError(s.to_string()))?;
        let (name, octave) = s.split_at(split);
        let pitch_class = name.parse::<PitchClass>().map_err(|_| ParseNoteError(s.to_string()))?;
        let octave = octave.parse::<i32>().map_err(|_| ParseNoteError(s.to_string()))?;
        Ok(Note { octave, pitch_class })
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
