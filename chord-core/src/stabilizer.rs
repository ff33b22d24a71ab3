//! # Temporal Stabilizer
//!
//! Live-mode smoothing over the last few buffers. A note survives only if a
//! neighbouring buffer saw it too, and a chord label that recurs in the
//! recent history overrides a one-off reading.
//!
//! The history belongs to exactly one live session and is only touched by
//! the thread that analyzes that session's buffers.

use std::collections::VecDeque;

use crate::chord::Chord;
use crate::tuning::Note;

/// Occurrences needed before a chord label overrides the fresh one.
const CHORD_MAJORITY: usize = 2;

/// Bounded FIFO of recent note sets and chord decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionHistory {
    capacity: usize,
    notes: VecDeque<Vec<Note>>,
    chords: VecDeque<Chord>,
}

impl Default for DetectionHistory {
    fn default() -> Self {
        Self::new(3)
    }
}

impl DetectionHistory {
    /// Creates an empty history remembering `capacity` buffers (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            notes: VecDeque::with_capacity(capacity + 1),
            chords: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Note sets currently remembered, oldest first.
    pub fn note_frames(&self) -> impl Iterator<Item = &[Note]> {
        self.notes.iter().map(Vec::as_slice)
    }

    /// Chord decisions currently remembered, oldest first.
    pub fn chord_frames(&self) -> impl Iterator<Item = &Chord> {
        self.chords.iter()
    }

    /// Records `raw` and returns the notes confirmed by an earlier buffer.
    ///
    /// Filtering starts once two buffers are remembered. If it would drop
    /// every note, the raw set is returned unchanged.
    pub fn stabilize_notes(&mut self, raw: Vec<Note>) -> Vec<Note> {
        self.notes.push_back(raw.clone());
        if self.notes.len() > self.capacity {
            self.notes.pop_front();
        }
        if self.notes.len() < 2 {
            return raw;
        }

        let previous = self.notes.len() - 1;
        let stable: Vec<Note> = raw
            .iter()
            .copied()
            .filter(|note| self.notes.iter().take(previous).any(|frame| frame.contains(note)))
            .collect();

        if stable.is_empty() { raw } else { stable }
    }

    /// Records `raw` and returns the label that recurs in the history, if
    /// any, otherwise `raw` itself.
    pub fn stabilize_chord(&mut self, raw: Chord) -> Chord {
        self.chords.push_back(raw);
        if self.chords.len() > self.capacity {
            self.chords.pop_front();
        }

        let mut best: Option<(Chord, usize)> = None;
        for chord in &self.chords {
            let count = self.chords.iter().filter(|c| *c == chord).count();
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((*chord, count));
            }
        }

        match best {
            Some((chord, count)) if count >= CHORD_MAJORITY => chord,
            _ => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::ChordKind;
    use crate::tuning::PitchClass;

    fn notes(labels: &[&str]) -> Vec<Note> {
        labels.iter().map(|l| l.parse().unwrap()).collect()
    }

    fn major(root: PitchClass) -> Chord {
        Chord::Identified {
            root,
            kind: ChordKind::Major,
        }
    }

    #[test]
    fn first_buffer_passes_through() {
        let mut history = DetectionHistory::new(3);
        assert_eq!(history.stabilize_notes(notes(&["A4", "E5"])), notes(&["A4", "E5"]));
    }

    #[test]
    fn stable_input_is_reproduced() {
        let mut history = DetectionHistory::new(3);
        let frame = notes(&["C4", "E4", "G4"]);
        for _ in 0..5 {
            assert_eq!(history.stabilize_notes(frame.clone()), frame);
        }
    }

    #[test]
    fn transient_note_is_dropped() {
        let mut history = DetectionHistory::new(3);
        history.stabilize_notes(notes(&["C4", "E4"]));
        assert_eq!(history.stabilize_notes(notes(&["C4", "E4", "F#6"])), notes(&["C4", "E4"]));
    }

    #[test]
    fn over_filtering_falls_back_to_raw() {
        let mut history = DetectionHistory::new(3);
        history.stabilize_notes(notes(&["C4"]));
        assert_eq!(history.stabilize_notes(notes(&["D5"])), notes(&["D5"]));
    }

    #[test]
    fn history_is_bounded() {
        let mut history = DetectionHistory::new(3);
        history.stabilize_notes(notes(&["B2"]));
        for _ in 0..3 {
            history.stabilize_notes(notes(&["C4"]));
        }
        assert_eq!(history.note_frames().count(), 3);
        // B2 has been evicted, so it is no longer confirmed.
        assert_eq!(history.stabilize_notes(notes(&["B2", "C4"])), notes(&["C4"]));
    }

    #[test]
    fn recurring_chord_overrides_one_off() {
        let mut history = DetectionHistory::new(3);
        let c = major(PitchClass::C);
        let g = major(PitchClass::G);
        assert_eq!(history.stabilize_chord(c), c);
        assert_eq!(history.stabilize_chord(c), c);
        assert_eq!(history.stabilize_chord(g), c);
        // Once G dominates the window it takes over.
        assert_eq!(history.stabilize_chord(g), g);
        assert_eq!(history.chord_frames().count(), 3);
    }

    #[test]
    fn distinct_chords_keep_fresh_label() {
        let mut history = DetectionHistory::new(3);
        history.stabilize_chord(major(PitchClass::C));
        history.stabilize_chord(major(PitchClass::D));
        assert_eq!(history.stabilize_chord(major(PitchClass::E)), major(PitchClass::E));
    }
}
