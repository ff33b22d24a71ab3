//! # Pitch Detection Module
//!
//! Time-domain fallback pitch estimation (YIN) and sub-bin refinement of
//! spectral peaks.
//!
//! ## Features
//! - YIN cumulative-mean-normalized difference function
//! - Absolute threshold with descent into the detected dip: the lag
//!   reported is the bottom of the first dip under the threshold, not the
//!   first lag that crosses it
//! - Parabolic interpolation for sub-sample accuracy
//! - Log-parabolic interpolation of FFT peak bins

/// Parameters of the YIN estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YinParams {
    /// Absolute threshold on the normalized difference (0.15 by default).
    pub threshold: f32,
    /// Lowest detectable frequency in Hz; sets the longest lag.
    pub min_frequency: f32,
    /// Highest detectable frequency in Hz; sets the shortest lag.
    pub max_frequency: f32,
}

impl Default for YinParams {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            min_frequency: 40.0,
            max_frequency: 3000.0,
        }
    }
}

/// Cumulative mean normalized difference function for lags `0..=tau_max`.
///
/// `d(tau)` sums squared differences over the valid overlap of the signal
/// with itself shifted by `tau`. `cmndf(0)` is 1 and so is any lag whose
/// running sum is still zero.
pub fn cmndf(signal: &[f32], tau_max: usize) -> Vec<f32> {
    let n = signal.len();
    let tau_max = tau_max.min(n.saturating_sub(1));
    let mut yin_buffer = vec![1.0_f32; tau_max + 1];

    let mut running_sum = 0.0_f64;
    for tau in 1..=tau_max {
        let diff: f64 = signal[..n - tau]
            .iter()
            .zip(&signal[tau..])
            .map(|(&a, &b)| {
                let delta = (a - b) as f64;
                delta * delta
            })
            .sum();
        running_sum += diff;
        yin_buffer[tau] = if running_sum > 0.0 {
            (diff * tau as f64 / running_sum) as f32
        } else {
            1.0
        };
    }
    yin_buffer
}

/// Estimates the fundamental frequency of `signal` with YIN.
///
/// Lags span `sample_rate / max_frequency ..= sample_rate / min_frequency`,
/// capped at half the buffer so every lag keeps at least half the samples
/// in its overlap. The first lag whose normalized difference drops below
/// the threshold marks the dip; the estimate is taken at the bottom of that
/// dip with parabolic interpolation.
///
/// # Returns
/// * `Some(frequency)` - Detected frequency in Hz
/// * `None` - No lag met the threshold
pub fn detect_pitch_yin(signal: &[f32], sample_rate: u32, params: &YinParams) -> Option<f32> {
    if sample_rate == 0 || params.min_frequency <= 0.0 || params.max_frequency <= params.min_frequency {
        return None;
    }
    let tau_min = ((sample_rate as f32 / params.max_frequency) as usize).max(2);
    let tau_max = ((sample_rate as f32 / params.min_frequency) as usize).min(signal.len() / 2);
    if tau_min + 1 >= tau_max {
        return None;
    }

    let yin_buffer = cmndf(signal, tau_max);

    let mut period = (tau_min..tau_max).find(|&tau| yin_buffer[tau] < params.threshold)?;
    while period + 1 < tau_max && yin_buffer[period + 1] < yin_buffer[period] {
        period += 1;
    }

    let y1 = yin_buffer[period - 1];
    let y2 = yin_buffer[period];
    let y3 = yin_buffer[period + 1];
    let curvature = y1 - 2.0 * y2 + y3;
    let period_float = if curvature.abs() > f32::EPSILON {
        period as f32 + (y1 - y3) / (2.0 * curvature)
    } else {
        period as f32
    };

    let frequency = sample_rate as f32 / period_float;
    (frequency.is_finite() && frequency > 0.0).then_some(frequency)
}

/// Refines the frequency of a spectral peak at `bin`.
///
/// Fits a parabola through the log magnitudes of the peak bin and its two
/// neighbours. Falls back to the bin centre at the spectrum edges or when
/// the fit is degenerate.
pub fn refine_from_spectrum(spectrum_magnitudes: &[f32], bin: usize, bin_width: f32) -> f32 {
    let rough_freq = bin as f32 * bin_width;
    if bin == 0 || bin + 1 >= spectrum_magnitudes.len() {
        return rough_freq;
    }

    let y1 = spectrum_magnitudes[bin - 1].ln();
    let y2 = spectrum_magnitudes[bin].ln();
    let y3 = spectrum_magnitudes[bin + 1].ln();

    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() {
        return rough_freq;
    }

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-6 {
        return rough_freq;
    }

    let peak_shift = ((y3 - y1) / (2.0 * denominator)).clamp(-0.5, 0.5);
    let final_freq = (bin as f32 + peak_shift) * bin_width;

    if final_freq.is_finite() && final_freq > 0.0 {
        final_freq
    } else {
        rough_freq
    }
}
