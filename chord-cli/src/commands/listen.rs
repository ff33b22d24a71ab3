//! Live capture command.

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use chord_core::audio::start_live_session;
use chord_core::sink::{LogSink, ThrottledSink};
use chord_core::CaptureConfig;
use clap::Args;

#[derive(Args)]
pub struct ListenArgs {
    /// Samples per analyzed buffer
    #[arg(long, default_value = "1024")]
    buffer_size: usize,

    /// Requested device sample rate in Hz
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Stop after this many seconds instead of waiting for Enter
    #[arg(long)]
    seconds: Option<f64>,

    /// JSON file overriding analysis constants
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

pub fn run(args: ListenArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let capture = CaptureConfig {
        buffer_size: args.buffer_size,
        sample_rate: args.sample_rate,
    };
    anyhow::ensure!(capture.buffer_size > 0, "--buffer-size must be positive");

    let mut session = start_live_session(config, capture, ThrottledSink::per_second(LogSink))?;
    log::info!("Listening at {} Hz; press Enter to stop", session.sample_rate());

    let (enter_tx, enter_rx) = crossbeam_channel::bounded::<()>(1);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        let _ = enter_tx.send(());
    });

    let deadline = args.seconds.map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));
    loop {
        crossbeam_channel::select! {
            recv(enter_rx) -> _ => break,
            default(Duration::from_millis(100)) => {
                if !session.is_running() {
                    log::warn!("Capture ended on its own");
                    break;
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }
            },
        }
    }

    session.stop();
    log::info!("Stopped listening");
    Ok(())
}
