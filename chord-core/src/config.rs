//! # Configuration Module
//!
//! Every empirically tuned constant of the pipeline lives here under a name,
//! with the calibrated value as its default. Configs serialize with serde so
//! a front-end can load a recalibrated set from disk.

use serde::{Deserialize, Serialize};

use crate::error::{ChordError, Result};

/// Cutoff pair for the bandpass stage, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterBand {
    pub low_hz: f32,
    pub high_hz: f32,
}

impl FilterBand {
    pub const fn new(low_hz: f32, high_hz: f32) -> Self {
        Self { low_hz, high_hz }
    }
}

/// Analysis configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Silence gating
    /// RMS below which the raw buffer counts as silence (default: 0.005).
    pub noise_threshold: f32,
    /// Spectra whose maximum is below `noise_threshold * silence_magnitude_factor`
    /// count as silence too (default: 3.0).
    pub silence_magnitude_factor: f32,

    // Filtering
    /// General-purpose band (default: 40 Hz to 3000 Hz).
    pub general_band: FilterBand,
    /// Band applied before spectral analysis (default: 55 Hz to 2500 Hz).
    pub analysis_band: FilterBand,
    /// Butterworth order of each band edge (default: 5).
    pub filter_order: usize,

    // Spectral peak picking
    /// Percentile of the magnitude spectrum used as the noise floor (default: 75).
    pub noise_floor_percentile: f32,
    /// Peaks must exceed `noise_floor * noise_floor_multiplier` (default: 8.0).
    pub noise_floor_multiplier: f32,
    /// Peaks must exceed `max_magnitude * max_magnitude_ratio` (default: 0.35).
    pub max_magnitude_ratio: f32,
    /// Minimum distance between two picked peaks, in Hz (default: 30).
    pub min_peak_separation_hz: f32,
    /// Peaks outside `[min_frequency, max_frequency]` are dropped.
    pub min_frequency: f32,
    pub max_frequency: f32,

    // Harmonic clustering
    /// Peaks weaker than this fraction of the strongest one are ignored (default: 0.15).
    pub min_relative_amplitude: f32,
    /// Allowed distance of a frequency ratio from an integer (default: 0.02).
    pub harmonic_tolerance: f32,
    /// Ratios at or below this never count as harmonics (default: 1.2).
    pub min_harmonic_ratio: f32,
    /// Prominence bonus for fundamentals with at least one harmonic (default: 0.3).
    pub harmonic_bonus: f32,
    /// Number of fundamentals reported as notes (default: 3).
    pub max_fundamentals: usize,
    /// Confidence reported when there are no more fundamentals than `max_fundamentals`.
    pub spectral_confidence: f32,

    // YIN fallback
    pub yin_threshold: f32,
    pub yin_min_frequency: f32,
    pub yin_max_frequency: f32,
    pub yin_confidence: f32,

    // Chord matching
    /// Minimum template coverage for a (root, template) pair (default: 0.7).
    pub chord_acceptance: f32,
    /// Weight of template coverage in the score (default: 0.7).
    pub pattern_weight: f32,
    /// Weight of input coverage in the score (default: 0.3).
    pub coverage_weight: f32,

    // Temporal stabilization
    /// Number of buffers remembered by the live stabilizer (default: 3).
    pub history_len: usize,

    // File mode
    pub chunk_secs: f32,
    pub chunk_hop_secs: f32,
    pub min_chunk_secs: f32,
    /// Chords seen in more than this fraction of chunks are significant (default: 0.05).
    pub chord_significance: f32,
    pub max_chords: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            noise_threshold: 0.005,
            silence_magnitude_factor: 3.0,
            general_band: FilterBand::new(40.0, 3000.0),
            analysis_band: FilterBand::new(55.0, 2500.0),
            filter_order: 5,
            noise_floor_percentile: 75.0,
            noise_floor_multiplier: 8.0,
            max_magnitude_ratio: 0.35,
            min_peak_separation_hz: 30.0,
            min_frequency: 55.0,
            max_frequency: 2500.0,
            min_relative_amplitude: 0.15,
            harmonic_tolerance: 0.02,
            min_harmonic_ratio: 1.2,
            harmonic_bonus: 0.3,
            max_fundamentals: 3,
            spectral_confidence: 90.0,
            yin_threshold: 0.15,
            yin_min_frequency: 40.0,
            yin_max_frequency: 3000.0,
            yin_confidence: 70.0,
            chord_acceptance: 0.7,
            pattern_weight: 0.7,
            coverage_weight: 0.3,
            history_len: 3,
            chunk_secs: 1.0,
            chunk_hop_secs: 0.5,
            min_chunk_secs: 0.5,
            chord_significance: 0.05,
            max_chords: 8,
        }
    }
}

impl AnalysisConfig {
    /// Checks the sample-rate independent consistency of the configuration.
    ///
    /// Band edges against Nyquist can only be checked once a buffer's sample
    /// rate is known; the filter design does that.
    pub fn validate(&self) -> Result<()> {
        for (name, band) in [("general_band", self.general_band), ("analysis_band", self.analysis_band)] {
            if !(band.low_hz > 0.0 && band.low_hz < band.high_hz) {
                return Err(ChordError::InvalidConfig(format!(
                    "{name}: low cutoff {} Hz must be positive and below high cutoff {} Hz",
                    band.low_hz, band.high_hz
                )));
            }
        }
        if self.filter_order == 0 {
            return Err(ChordError::InvalidConfig("filter_order must be at least 1".into()));
        }
        if !(0.0..=100.0).contains(&self.noise_floor_percentile) {
            return Err(ChordError::InvalidConfig(format!(
                "noise_floor_percentile {} is outside 0..=100",
                self.noise_floor_percentile
            )));
        }
        if self.min_frequency >= self.max_frequency {
            return Err(ChordError::InvalidConfig("min_frequency must be below max_frequency".into()));
        }
        if !(self.yin_min_frequency > 0.0 && self.yin_min_frequency < self.yin_max_frequency) {
            return Err(ChordError::InvalidConfig("YIN band must be positive and ordered".into()));
        }
        if self.max_fundamentals == 0 || self.history_len == 0 || self.max_chords == 0 {
            return Err(ChordError::InvalidConfig(
                "max_fundamentals, history_len and max_chords must be non-zero".into(),
            ));
        }
        if !(self.chunk_hop_secs > 0.0 && self.chunk_secs > 0.0 && self.min_chunk_secs <= self.chunk_secs) {
            return Err(ChordError::InvalidConfig(format!(
                "chunking {}s / hop {}s / min {}s is inconsistent",
                self.chunk_secs, self.chunk_hop_secs, self.min_chunk_secs
            )));
        }
        for (name, value) in [
            ("spectral_confidence", self.spectral_confidence),
            ("yin_confidence", self.yin_confidence),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ChordError::InvalidConfig(format!("{name} {value} is outside 0..=100")));
            }
        }
        Ok(())
    }
}

/// Settings for the live capture device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Samples per analyzed buffer.
    pub buffer_size: usize,
    /// Requested device sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            sample_rate: 44100,
        }
    }
}
