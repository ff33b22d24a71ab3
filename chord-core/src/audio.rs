//! # Audio Capture Module
//!
//! Real-time capture from the default input device using CPAL. A session
//! owns one worker thread that opens the stream, receives assembled frames
//! from the device callback and runs them through a [`LiveAnalyzer`].
//!
//! Per-buffer analysis failures are reported and the session carries on.
//! A stream-level fault (device unplugged, driver error) is reported once
//! through the sink and ends the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::config::{AnalysisConfig, CaptureConfig};
use crate::error::ChordError;
use crate::live::{session_parts, LiveAnalyzer};
use crate::pipeline::Analyzer;
use crate::sink::ResultSink;

/// Frames that may wait for analysis before new ones are dropped.
const FRAME_QUEUE_LEN: usize = 8;

/// Handle to a running live session.
///
/// Dropping the handle stops the session.
pub struct LiveSession {
    sample_rate: u32,
    running: Arc<AtomicBool>,
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl LiveSession {
    /// The sample rate the device actually runs at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// False once the session was stopped or the stream failed.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops capture and waits for the worker to finish. Safe to call twice.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            log::debug!("[CAPTURE] Waiting for capture thread to finish...");
            if handle.join().is_err() {
                log::error!("[CAPTURE] Capture thread panicked");
            }
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Opens the default input device and starts analyzing it.
///
/// Returns once the stream is playing, or with the reason it could not be
/// opened. Results, including the final one of a failed stream, go to `sink`.
pub fn start_live_session<S>(config: AnalysisConfig, capture: CaptureConfig, sink: S) -> Result<LiveSession>
where
    S: ResultSink + 'static,
{
    let analyzer = Analyzer::new(config).context("invalid analysis configuration")?;
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<std::result::Result<u32, String>>(1);
    let running = Arc::new(AtomicBool::new(true));
    let worker_running = Arc::clone(&running);

    let thread_handle = thread::Builder::new()
        .name("chord-capture".into())
        .spawn(move || {
            log::debug!("[CAPTURE] Starting capture thread...");
            let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE_LEN);
            let (fault_tx, fault_rx) = crossbeam_channel::bounded::<String>(1);

            let (stream, mut live) = match open_stream(analyzer, &capture, sink, frame_tx, fault_tx) {
                Ok(parts) => parts,
                Err(e) => {
                    log::error!("[CAPTURE] Fatal error starting audio: {:#}", e);
                    worker_running.store(false, Ordering::SeqCst);
                    let _ = ready_tx.send(Err(format!("{e:#}")));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(live.sample_rate()));

            run_session(&mut live, &frame_rx, &fault_rx, &shutdown_rx, &worker_running);

            log::debug!("[CAPTURE] Stopping stream and exiting...");
            if let Err(e) = stream.pause() {
                log::warn!("[CAPTURE] Error pausing stream: {}", e);
            }
            drop(stream);
            worker_running.store(false, Ordering::SeqCst);
            log::info!("[CAPTURE] Capture thread finished");
        })
        .context("failed to spawn capture thread")?;

    let sample_rate = match ready_rx.recv() {
        Ok(Ok(rate)) => rate,
        Ok(Err(message)) => {
            let _ = thread_handle.join();
            return Err(anyhow!(message));
        }
        Err(_) => {
            let _ = thread_handle.join();
            return Err(anyhow!("capture thread exited before the stream started"));
        }
    };

    Ok(LiveSession {
        sample_rate,
        running,
        shutdown_tx,
        thread_handle: Some(thread_handle),
    })
}

fn run_session<S: ResultSink>(
    live: &mut LiveAnalyzer<S>,
    frame_rx: &Receiver<Vec<f32>>,
    fault_rx: &Receiver<String>,
    shutdown_rx: &Receiver<()>,
    running: &AtomicBool,
) {
    log::info!("[CAPTURE] Entering analysis loop at {} Hz", live.sample_rate());
    loop {
        crossbeam_channel::select! {
            recv(frame_rx) -> msg => match msg {
                Ok(frame) => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    live.process_frame(&frame);
                }
                Err(_) => {
                    live.report_fault("audio channel closed");
                    break;
                }
            },
            recv(fault_rx) -> msg => {
                let message = msg.unwrap_or_else(|_| "unknown stream failure".to_string());
                live.report_fault(&ChordError::Stream(message).to_string());
                break;
            },
            recv(shutdown_rx) -> _ => {
                log::debug!("[CAPTURE] Received shutdown signal");
                break;
            },
        }
    }
}

fn open_stream<S: ResultSink>(
    analyzer: Analyzer,
    capture: &CaptureConfig,
    sink: S,
    frame_tx: Sender<Vec<f32>>,
    fault_tx: Sender<String>,
) -> Result<(cpal::Stream, LiveAnalyzer<S>)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;
    log::info!("[CAPTURE] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = find_supported_config(configs, capture.sample_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = capture
        .sample_rate
        .clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
    let supported = supported.with_sample_rate(cpal::SampleRate(rate));
    let channels = supported.channels() as usize;
    let stream_config: cpal::StreamConfig = supported.into();
    log::info!("[CAPTURE] Selected {} Hz, {} channel(s)", rate, channels);

    let (mut assembler, live) = session_parts(analyzer, capture, rate, channels, sink)?;

    let err_fn = move |err: cpal::StreamError| {
        log::error!("[CAPTURE] An error occurred on the audio stream: {}", err);
        let _ = fault_tx.try_send(err.to_string());
    };

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            for frame in assembler.push(data) {
                if !forward_frame(&frame_tx, frame) {
                    return;
                }
            }
        },
        err_fn,
        Some(Duration::from_secs(1)),
    )?;

    stream.play()?;
    Ok((stream, live))
}

/// Hands a frame to the analysis thread without blocking the device callback.
///
/// A full queue means analysis is slower than real time: the frame is
/// dropped. Returns false once the analysis thread has gone away.
fn forward_frame(frame_tx: &Sender<Vec<f32>>, frame: Vec<f32>) -> bool {
    match frame_tx.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            log::warn!("[CAPTURE] Analysis overrun, dropping frame");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

/// Picks the f32 input configuration closest to `target_rate`, preferring
/// mono over multi-channel layouts.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = c.min_sample_rate().0.abs_diff(target_rate);
            let max_diff = c.max_sample_rate().0.abs_diff(target_rate);
            let in_range = (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate);
            let rate_diff = if in_range { 0 } else { min_diff.min(max_diff) };
            (rate_diff, c.channels() != 1)
        })
}
