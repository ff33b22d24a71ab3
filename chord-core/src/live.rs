//! # Live Analysis
//!
//! Device-independent half of live mode: device callbacks deliver
//! arbitrarily sized interleaved chunks, [`FrameAssembler`] cuts them into
//! fixed-size mono frames and [`LiveAnalyzer`] runs each frame through the
//! pipeline with the session's stabilization history.

use crate::buffer::downmix;
use crate::config::CaptureConfig;
use crate::error::{ChordError, Result};
use crate::pipeline::{AnalysisMode, Analyzer};
use crate::sink::ResultSink;
use crate::stabilizer::DetectionHistory;
use crate::DetectionResult;

/// Accumulates interleaved device samples into mono frames of a fixed size.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    frame_size: usize,
    channels: usize,
    pending: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(frame_size: usize, channels: usize) -> Result<Self> {
        if frame_size == 0 || channels == 0 {
            return Err(ChordError::InvalidBuffer(format!(
                "frame size {frame_size} and channel count {channels} must be non-zero"
            )));
        }
        Ok(Self {
            frame_size,
            channels,
            pending: Vec::with_capacity(frame_size * 2),
        })
    }

    /// Mono samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Appends `interleaved` and returns every frame that became complete.
    ///
    /// A trailing partial multi-channel frame is ignored.
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<Vec<f32>> {
        let whole = interleaved.len() - interleaved.len() % self.channels;
        match downmix(&interleaved[..whole], self.channels) {
            Ok(mono) => self.pending.extend_from_slice(&mono),
            Err(e) => log::warn!("[LIVE] Dropping device chunk: {}", e),
        }

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_size {
            frames.push(self.pending[..self.frame_size].to_vec());
            self.pending.drain(..self.frame_size);
        }
        frames
    }
}

/// One live session's analysis state: the shared analyzer, this session's
/// history and the sink its results go to.
pub struct LiveAnalyzer<S> {
    analyzer: Analyzer,
    history: DetectionHistory,
    sample_rate: u32,
    sink: S,
}

impl<S: ResultSink> LiveAnalyzer<S> {
    pub fn new(analyzer: Analyzer, sample_rate: u32, sink: S) -> Self {
        let history = analyzer.new_history();
        Self {
            analyzer,
            history,
            sample_rate,
            sink,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    /// Analyzes one frame; the result is stabilized and delivered to the sink.
    pub fn process_frame(&mut self, frame: &[f32]) -> DetectionResult {
        self.analyzer.analyze(
            frame,
            self.sample_rate,
            AnalysisMode::Live {
                history: &mut self.history,
                sink: &self.sink,
            },
            None,
        )
    }

    /// Reports a session-level fault through the sink.
    pub fn report_fault(&self, message: &str) {
        log::error!("[LIVE] {}", message);
        self.sink.on_result(&DetectionResult::failed(message));
    }
}

/// Builds the assembler and analyzer for a device stream with `channels`
/// interleaved channels at `sample_rate`.
pub fn session_parts<S: ResultSink>(
    analyzer: Analyzer,
    capture: &CaptureConfig,
    sample_rate: u32,
    channels: usize,
    sink: S,
) -> Result<(FrameAssembler, LiveAnalyzer<S>)> {
    let assembler = FrameAssembler::new(capture.buffer_size, channels)?;
    Ok((assembler, LiveAnalyzer::new(analyzer, sample_rate, sink)))
}
