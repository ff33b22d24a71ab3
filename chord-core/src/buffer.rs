//! Sample buffers handed to the pipeline, and channel downmixing.

use crate::error::{ChordError, Result};

/// A validated mono buffer borrowed from the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleBuffer<'a> {
    samples: &'a [f32],
    sample_rate: u32,
}

impl<'a> SampleBuffer<'a> {
    /// Wraps `samples`, rejecting empty buffers, a zero sample rate and
    /// non-finite samples.
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(ChordError::InvalidBuffer("buffer is empty".into()));
        }
        if sample_rate == 0 {
            return Err(ChordError::InvalidBuffer("sample rate is zero".into()));
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(ChordError::InvalidBuffer(format!("non-finite sample at index {index}")));
        }
        Ok(Self { samples, sample_rate })
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Averages interleaved frames of `channels` samples down to mono.
///
/// Fails when `channels` is zero or does not divide the buffer length.
pub fn downmix(interleaved: &[f32], channels: usize) -> Result<Vec<f32>> {
    if channels == 0 {
        return Err(ChordError::InvalidBuffer("channel count is zero".into()));
    }
    if interleaved.len() % channels != 0 {
        return Err(ChordError::InvalidBuffer(format!(
            "{} samples do not split into {} channels",
            interleaved.len(),
            channels
        )));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect())
}
