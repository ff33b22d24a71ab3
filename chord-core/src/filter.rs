//! # Bandpass Filter Module
//!
//! Butterworth band filtering applied to a whole buffer at once. The band is
//! built as a cascade of high-pass sections at the low edge followed by
//! low-pass sections at the high edge, each edge an `order`-pole Butterworth
//! response split into second-order sections (plus one first-order section
//! for odd orders).
//!
//! Coefficients follow the RBJ Audio EQ Cookbook, which is the bilinear
//! transform prewarped at the cutoff. State and coefficients are kept in
//! `f64`: at 55 Hz and 44.1 kHz the poles sit very close to the unit circle.

use std::f64::consts::PI;

use crate::config::FilterBand;
use crate::error::{ChordError, Result};

/// One IIR section in Direct Form I.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
/// First-order sections simply carry `b2 = a2 = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Section {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Section {
    /// Normalizes raw cookbook coefficients by `a0`.
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
        }
    }

    fn lowpass(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);
        Self::normalized(
            (1.0 - cos_omega) / 2.0,
            1.0 - cos_omega,
            (1.0 - cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    fn highpass(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);
        Self::normalized(
            (1.0 + cos_omega) / 2.0,
            -(1.0 + cos_omega),
            (1.0 + cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    fn first_order_lowpass(frequency: f64, sample_rate: f64) -> Self {
        let k = (PI * frequency / sample_rate).tan();
        Self::normalized(k, k, 0.0, 1.0 + k, k - 1.0, 0.0)
    }

    fn first_order_highpass(frequency: f64, sample_rate: f64) -> Self {
        let k = (PI * frequency / sample_rate).tan();
        Self::normalized(1.0, -1.0, 0.0, 1.0 + k, k - 1.0, 0.0)
    }

    /// Runs the section over `signal` in place, starting from rest.
    fn run(&self, signal: &mut [f64]) {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        for sample in signal.iter_mut() {
            let input = *sample;
            let output = self.b0 * input + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
            x2 = x1;
            x1 = input;
            y2 = y1;
            y1 = output;
            *sample = output;
        }
    }
}

/// Q factors of the second-order sections of an `order`-pole Butterworth response.
fn butterworth_q(order: usize) -> impl Iterator<Item = f64> {
    (0..order / 2).map(move |k| {
        let angle = (2 * k + 1) as f64 * PI / (2 * order) as f64;
        1.0 / (2.0 * angle.sin())
    })
}

/// A designed Butterworth band filter for one sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct BandpassFilter {
    sections: Vec<Section>,
}

impl BandpassFilter {
    /// Designs the filter.
    ///
    /// Fails with [`ChordError::FilterDesign`] when the cutoffs are not
    /// `0 < low < high < nyquist`. Such a band is a design fault of the
    /// caller and is never adjusted silently.
    pub fn design(band: FilterBand, order: usize, sample_rate: u32) -> Result<Self> {
        let nyquist = sample_rate as f32 / 2.0;
        let valid = band.low_hz > 0.0
            && band.high_hz < nyquist
            && band.low_hz < band.high_hz
            && band.low_hz.is_finite()
            && band.high_hz.is_finite();
        if !valid || order == 0 {
            return Err(ChordError::FilterDesign {
                low_hz: band.low_hz,
                high_hz: band.high_hz,
                sample_rate,
            });
        }

        let fs = sample_rate as f64;
        let low = band.low_hz as f64;
        let high = band.high_hz as f64;

        let mut sections = Vec::with_capacity(order + 2);
        for q in butterworth_q(order) {
            sections.push(Section::highpass(low, q, fs));
        }
        if order % 2 == 1 {
            sections.push(Section::first_order_highpass(low, fs));
        }
        for q in butterworth_q(order) {
            sections.push(Section::lowpass(high, q, fs));
        }
        if order % 2 == 1 {
            sections.push(Section::first_order_lowpass(high, fs));
        }

        Ok(Self { sections })
    }

    /// Filters a whole buffer causally from a zero initial state.
    ///
    /// The output has the same length as the input.
    pub fn apply(&self, input: &[f32]) -> Vec<f32> {
        let mut signal: Vec<f64> = input.iter().map(|&s| s as f64).collect();
        for section in &self.sections {
            section.run(&mut signal);
        }
        signal.into_iter().map(|s| s as f32).collect()
    }
}

/// Designs a filter for `band` and applies it to `input` in one step.
pub fn bandpass(input: &[f32], sample_rate: u32, band: FilterBand, order: usize) -> Result<Vec<f32>> {
    Ok(BandpassFilter::design(band, order, sample_rate)?.apply(input))
}
