//! # Spectral Peak Detector
//!
//! Turns a filtered buffer into a ranked list of spectral peaks.
//!
//! The noise floor is a percentile of the magnitude spectrum, and a peak
//! has to clear both a floor-relative and a maximum-relative threshold.
//! Together they follow the signal level without any gain calibration.

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::fft::{self, Spectrum};
use crate::pitch;

/// A local maximum of the magnitude spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralPeak {
    /// Interpolated peak frequency in Hz.
    pub frequency: f32,
    /// Raw spectral magnitude at the peak bin.
    pub magnitude: f32,
    /// Magnitude relative to the strongest reported peak (0-1].
    pub amplitude: f32,
}

/// Outcome of peak detection for one buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum PeakDetection {
    /// The buffer carries no usable signal.
    Silent,
    /// Peaks in the musical range, strongest first. May be empty.
    Peaks(Vec<SpectralPeak>),
}

/// Root mean square of a buffer (0 for an empty buffer).
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Percentile with linear interpolation between order statistics.
///
/// `p` is in percent (0-100). Returns 0 for an empty slice.
pub fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f32;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Indices of local maxima of `x`. Flat tops report their middle sample;
/// the first and last samples never count.
fn local_maxima(x: &[f32]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if x.len() < 3 {
        return maxima;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Picks local maxima at or above `height`, then thins them so that no two
/// survivors are closer than `distance` bins, keeping the taller one.
///
/// The result is in ascending bin order.
pub fn find_peaks(x: &[f32], height: f32, distance: usize) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(x).into_iter().filter(|&i| x[i] >= height).collect();
    if distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut by_height: Vec<usize> = (0..candidates.len()).collect();
    by_height.sort_by(|&a, &b| x[candidates[b]].total_cmp(&x[candidates[a]]));

    let mut keep = vec![true; candidates.len()];
    for &idx in &by_height {
        if !keep[idx] {
            continue;
        }
        let bin = candidates[idx];
        for (other, &other_bin) in candidates.iter().enumerate() {
            if other != idx && keep[other] && bin.abs_diff(other_bin) < distance {
                keep[other] = false;
            }
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(bin, kept)| kept.then_some(bin))
        .collect()
}

/// Spectral peak picking driven by an [`AnalysisConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PeakDetector<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> PeakDetector<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Silence gate on the raw (unfiltered) buffer.
    pub fn is_silent(&self, raw: &[f32]) -> bool {
        rms(raw) < self.config.noise_threshold
    }

    /// Runs windowing, FFT and peak picking over a filtered buffer.
    pub fn detect(&self, filtered: &[f32], sample_rate: u32) -> PeakDetection {
        let spectrum = fft::magnitude_spectrum(filtered, sample_rate);
        self.detect_in_spectrum(&spectrum)
    }

    /// Peak picking over an already computed spectrum.
    pub fn detect_in_spectrum(&self, spectrum: &Spectrum) -> PeakDetection {
        let config = self.config;
        let max_magnitude = spectrum.max_magnitude();
        if spectrum.is_empty() || max_magnitude < config.noise_threshold * config.silence_magnitude_factor {
            return PeakDetection::Silent;
        }

        let noise_floor = percentile(&spectrum.magnitudes, config.noise_floor_percentile);
        let threshold = (noise_floor * config.noise_floor_multiplier).max(max_magnitude * config.max_magnitude_ratio);
        let distance = ((config.min_peak_separation_hz / spectrum.bin_width) as usize).max(1);

        let mut peaks: Vec<SpectralPeak> = find_peaks(&spectrum.magnitudes, threshold, distance)
            .into_iter()
            .map(|bin| SpectralPeak {
                frequency: pitch::refine_from_spectrum(&spectrum.magnitudes, bin, spectrum.bin_width),
                magnitude: spectrum.magnitudes[bin],
                amplitude: 0.0,
            })
            .filter(|peak| (config.min_frequency..=config.max_frequency).contains(&peak.frequency))
            .collect();

        peaks.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
        if let Some(strongest) = peaks.first().map(|p| p.magnitude) {
            for peak in &mut peaks {
                peak.amplitude = peak.magnitude / strongest;
            }
        }

        log::trace!(
            "[PEAKS] floor={noise_floor:.4} max={max_magnitude:.4} threshold={threshold:.4} distance={distance} peaks={}",
            peaks.len()
        );

        PeakDetection::Peaks(peaks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_constant_and_empty() {
        assert!((rms(&[0.5; 100]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 75.0), 4.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&[1.0, 2.0], 75.0) - 1.75).abs() < 1e-6);
    }

    #[test]
    fn local_maxima_handles_plateaus_and_edges() {
        let x = [5.0, 1.0, 3.0, 3.0, 3.0, 1.0, 2.0, 4.0];
        assert_eq!(local_maxima(&x), vec![3]);
    }

    #[test]
    fn find_peaks_applies_height_and_distance() {
        let x = [0.0, 5.0, 0.0, 4.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.5, 0.0];
        assert_eq!(find_peaks(&x, 1.0, 1), vec![1, 3, 7]);
        // The 4.0 peak is within 3 bins of the taller 5.0 peak.
        assert_eq!(find_peaks(&x, 1.0, 3), vec![1, 7]);
    }

    #[test]
    fn quiet_buffer_is_silent() {
        let config = AnalysisConfig::default();
        let detector = PeakDetector::new(&config);
        assert!(detector.is_silent(&[0.001; 2048]));
        assert!(!detector.is_silent(&[0.1; 2048]));
    }

    #[test]
    fn tone_produces_single_normalized_peak() {
        let config = AnalysisConfig::default();
        let detector = PeakDetector::new(&config);
        let sample_rate = 44100;
        let signal: Vec<f32> = (0..4096)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 330.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        let PeakDetection::Peaks(peaks) = detector.detect(&signal, sample_rate) else {
            panic!("tone reported as silence");
        };
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency - 330.0).abs() < 3.0, "got {}", peaks[0].frequency);
        assert_eq!(peaks[0].amplitude, 1.0);
    }

    #[test]
    fn out_of_range_tones_are_dropped() {
        let config = AnalysisConfig::default();
        let detector = PeakDetector::new(&config);
        let sample_rate = 44100;
        let signal: Vec<f32> = (0..4096)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 4000.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        assert_eq!(detector.detect(&signal, sample_rate), PeakDetection::Peaks(vec![]));
    }
}
