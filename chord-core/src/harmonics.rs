//! # Harmonic Clustering Module
//!
//! Groups spectral peaks into fundamentals and their overtones, then ranks
//! the fundamentals. Without this step the 2nd and 3rd partials of a single
//! string come out as separate notes.

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::peaks::SpectralPeak;

/// A peak accepted as a fundamental, with the peaks explained as its harmonics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalCandidate {
    pub frequency: f32,
    /// Normalized amplitude plus the harmonic bonus.
    pub prominence: f32,
    pub harmonics: Vec<Harmonic>,
}

/// A peak attached to a fundamental.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Harmonic {
    pub frequency: f32,
    pub amplitude: f32,
    /// Integer multiple of the fundamental.
    pub number: u32,
}

/// Ranked fundamentals for one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicAnalysis {
    /// All fundamentals, most prominent first.
    pub ranked: Vec<FundamentalCandidate>,
    /// Confidence (0-100) that the top fundamentals explain the spectrum.
    pub confidence: f32,
}

impl HarmonicAnalysis {
    /// The fundamentals reported as notes.
    pub fn top(&self, count: usize) -> &[FundamentalCandidate] {
        &self.ranked[..count.min(self.ranked.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Integer harmonic number of `frequency` over `fundamental`, if the ratio
/// is a near-exact multiple above `min_ratio`.
fn harmonic_number(frequency: f32, fundamental: f32, tolerance: f32, min_ratio: f32) -> Option<u32> {
    let ratio = frequency / fundamental;
    let nearest = ratio.round();
    ((ratio - nearest).abs() < tolerance && ratio > min_ratio).then_some(nearest as u32)
}

/// Clusters `peaks` (strongest first) into fundamentals and ranks them.
pub fn cluster(peaks: &[SpectralPeak], config: &AnalysisConfig) -> HarmonicAnalysis {
    let mut fundamentals: Vec<FundamentalCandidate> = Vec::new();

    for peak in peaks.iter().filter(|p| p.amplitude >= config.min_relative_amplitude) {
        let parent = fundamentals.iter().enumerate().find_map(|(index, fund)| {
            harmonic_number(peak.frequency, fund.frequency, config.harmonic_tolerance, config.min_harmonic_ratio)
                .map(|number| (index, number))
        });

        match parent {
            Some((index, number)) => fundamentals[index].harmonics.push(Harmonic {
                frequency: peak.frequency,
                amplitude: peak.amplitude,
                number,
            }),
            None => fundamentals.push(FundamentalCandidate {
                frequency: peak.frequency,
                prominence: peak.amplitude,
                harmonics: Vec::new(),
            }),
        }
    }

    for fund in &mut fundamentals {
        if !fund.harmonics.is_empty() {
            fund.prominence += config.harmonic_bonus;
        }
    }

    // Stable sort: equal prominence keeps amplitude order.
    fundamentals.sort_by(|a, b| b.prominence.total_cmp(&a.prominence));

    let confidence = if fundamentals.is_empty() {
        0.0
    } else if fundamentals.len() <= config.max_fundamentals {
        config.spectral_confidence
    } else {
        let top: f32 = fundamentals.iter().take(config.max_fundamentals).map(|f| f.prominence).sum();
        let all: f32 = fundamentals.iter().map(|f| f.prominence).sum();
        (top / all * 100.0).min(100.0)
    };

    HarmonicAnalysis {
        ranked: fundamentals,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(frequency: f32, amplitude: f32) -> SpectralPeak {
        SpectralPeak {
            frequency,
            magnitude: amplitude * 100.0,
            amplitude,
        }
    }

    #[test]
    fn harmonic_series_collapses_to_fundamental() {
        let config = AnalysisConfig::default();
        let peaks = [peak(220.0, 1.0), peak(440.5, 0.6), peak(659.0, 0.4)];
        let analysis = cluster(&peaks, &config);
        assert_eq!(analysis.ranked.len(), 1);
        let fund = &analysis.ranked[0];
        assert_eq!(fund.frequency, 220.0);
        assert_eq!(fund.harmonics.iter().map(|h| h.number).collect::<Vec<_>>(), vec![2, 3]);
        assert!((fund.prominence - 1.3).abs() < 1e-6);
        assert_eq!(analysis.confidence, 90.0);
    }

    #[test]
    fn weak_peaks_are_ignored() {
        let config = AnalysisConfig::default();
        let analysis = cluster(&[peak(300.0, 1.0), peak(500.0, 0.1)], &config);
        assert_eq!(analysis.ranked.len(), 1);
    }

    #[test]
    fn lower_peak_is_never_a_harmonic_of_a_higher_one() {
        let config = AnalysisConfig::default();
        let analysis = cluster(&[peak(440.0, 1.0), peak(220.0, 0.9)], &config);
        assert_eq!(analysis.ranked.len(), 2);
    }

    #[test]
    fn harmonic_support_outranks_raw_amplitude() {
        let config = AnalysisConfig::default();
        let peaks = [peak(500.0, 1.0), peak(196.0, 0.8), peak(392.0, 0.5)];
        let analysis = cluster(&peaks, &config);
        assert_eq!(analysis.ranked[0].frequency, 196.0);
        assert_eq!(analysis.ranked[1].frequency, 500.0);
    }

    #[test]
    fn confidence_reflects_share_of_top_three() {
        let config = AnalysisConfig::default();
        let peaks = [
            peak(200.0, 1.0),
            peak(310.0, 1.0),
            peak(530.0, 1.0),
            peak(770.0, 1.0),
        ];
        let analysis = cluster(&peaks, &config);
        assert_eq!(analysis.ranked.len(), 4);
        assert!((analysis.confidence - 75.0).abs() < 1e-4);
        assert_eq!(analysis.top(3).len(), 3);
    }

    #[test]
    fn empty_input_has_zero_confidence() {
        let analysis = cluster(&[], &AnalysisConfig::default());
        assert!(analysis.is_empty());
        assert_eq!(analysis.confidence, 0.0);
    }
}
