//! # Error Module
//!
//! Typed errors for the analysis core. Only precondition faults, decoding
//! problems and capture-stream faults are errors; silence and "no match"
//! outcomes are ordinary results carrying sentinel chord labels.

use thiserror::Error;

/// Errors that can occur while configuring or feeding the analysis pipeline.
#[derive(Debug, Error)]
pub enum ChordError {
    /// Bandpass cutoffs that cannot produce a valid filter at this sample rate.
    #[error("invalid filter design: {low_hz} Hz to {high_hz} Hz at {sample_rate} Hz sample rate")]
    FilterDesign {
        low_hz: f32,
        high_hz: f32,
        sample_rate: u32,
    },

    /// The buffer handed to the pipeline has an unusable shape or content.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),

    /// A configuration value is out of range or inconsistent with another.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The audio file could not be decoded.
    #[error("decoding error: {0}")]
    Decode(#[from] hound::Error),

    /// The capture stream reported a fault; the live session ends.
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChordError>;
