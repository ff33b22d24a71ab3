//! # Result Sinks
//!
//! Consumers of [`DetectionResult`]s. Sinks are called on the analysis
//! thread once per buffer or chunk, so they must be cheap and must not
//! block for long.

use crossbeam_channel::Sender;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::DetectionResult;

/// Receives every result the pipeline produces.
pub trait ResultSink: Send + Sync {
    fn on_result(&self, result: &DetectionResult);
}

impl<F> ResultSink for F
where
    F: Fn(&DetectionResult) + Send + Sync,
{
    fn on_result(&self, result: &DetectionResult) {
        self(result)
    }
}

/// Formats a result as a single log line.
pub fn describe(result: &DetectionResult) -> String {
    let prefix = match result.time_position {
        Some(t) => format!("File Analysis at {t:.2}s"),
        None => "Live Detection".to_string(),
    };
    if let Some(error) = &result.error {
        format!("{prefix} - Error: {error}")
    } else if result.has_notes() {
        format!("{prefix} - Notes: {} - Chord: {}", result.notes_label(), result.chord)
    } else {
        format!("{prefix} - No notes detected")
    }
}

/// Writes every result to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn on_result(&self, result: &DetectionResult) {
        if result.is_error() {
            log::error!("{}", describe(result));
        } else {
            log::info!("{}", describe(result));
        }
    }
}

/// Forwards results over a channel, e.g. to a UI thread.
///
/// Results are dropped once the receiver has gone away.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<DetectionResult>,
}

impl ChannelSink {
    pub fn new(sender: Sender<DetectionResult>) -> Self {
        Self { sender }
    }
}

impl ResultSink for ChannelSink {
    fn on_result(&self, result: &DetectionResult) {
        if self.sender.try_send(result.clone()).is_err() {
            log::trace!("[SINK] Receiver unavailable, result dropped");
        }
    }
}

/// Passes on at most one result per interval; errors always pass.
#[derive(Debug)]
pub struct ThrottledSink<S> {
    inner: S,
    interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl<S: ResultSink> ThrottledSink<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_sent: Mutex::new(None),
        }
    }

    /// One result per second, like a human-readable activity log.
    pub fn per_second(inner: S) -> Self {
        Self::new(inner, Duration::from_secs(1))
    }
}

impl<S: ResultSink> ResultSink for ThrottledSink<S> {
    fn on_result(&self, result: &DetectionResult) {
        let now = Instant::now();
        let forward = {
            let mut last_sent = match self.last_sent.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let due = last_sent.is_none_or(|t| now.duration_since(t) >= self.interval);
            if due || result.is_error() {
                *last_sent = Some(now);
                true
            } else {
                false
            }
        };
        if forward {
            self.inner.on_result(result);
        }
    }
}
