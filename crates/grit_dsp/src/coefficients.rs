//! Biquad Coefficient Calculator
//!
//! Turns a human-facing [`FilterSpec`] into normalized biquad coefficients.
//! Based on the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook.
//!
//! This runs on the control thread. It never fails for slider-style input:
//! out-of-range frequency and Q are clamped, and only a non-positive sample
//! rate is rejected.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Q of a 2nd-order Butterworth section (1/sqrt(2))
pub const Q_BUTTERWORTH: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Smallest Q handed to the cookbook formulas
pub const MIN_Q: f64 = 1.0e-4;

/// Center frequencies at or above Nyquist are pulled down to this fraction of it
pub const NYQUIST_CLAMP: f64 = 0.999;

const MIN_FREQUENCY_HZ: f64 = 1.0e-3;

/// Magnitude floor for dB conversion (-240 dB)
const MAGNITUDE_FLOOR: f64 = 1.0e-12;

/// Filter response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
    Peaking,
    LowShelf,
    HighShelf,
    Allpass,
}

impl FilterType {
    /// Whether `gain_db` affects this shape
    pub fn uses_gain(self) -> bool {
        matches!(self, Self::Peaking | Self::LowShelf | Self::HighShelf)
    }
}

/// Filter parameters as a UI or preset would express them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub filter_type: FilterType,
    pub center_frequency_hz: f64,
    /// Resonance; for shelving types this is the shelf slope S
    pub q: f64,
    /// Only meaningful for peaking and shelving types
    #[serde(default)]
    pub gain_db: f64,
}

impl FilterSpec {
    pub fn new(filter_type: FilterType, center_frequency_hz: f64, q: f64) -> Self {
        Self {
            filter_type,
            center_frequency_hz,
            q,
            gain_db: 0.0,
        }
    }

    pub fn with_gain_db(self, gain_db: f64) -> Self {
        Self { gain_db, ..self }
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self::new(FilterType::Lowpass, 1000.0, Q_BUTTERWORTH)
    }
}

/// Normalized (a0 = 1) transfer-function coefficients of one biquad section
///
/// Immutable value type: a new spec always yields a new set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Passthrough section (y = x)
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Linear interpolation of all five coefficients, `t` in [0, 1]
    #[inline]
    pub fn lerp(&self, target: &Self, t: f64) -> Self {
        Self {
            b0: self.b0 + (target.b0 - self.b0) * t,
            b1: self.b1 + (target.b1 - self.b1) * t,
            b2: self.b2 + (target.b2 - self.b2) * t,
            a1: self.a1 + (target.a1 - self.a1) * t,
            a2: self.a2 + (target.a2 - self.a2) * t,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Magnitude response in dB at `freq_hz`
    ///
    /// Evaluates H(z) on the unit circle at z = e^(jω).
    pub fn magnitude_db(&self, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sample_rate_hz;
        let (sin1, cos1) = omega.sin_cos();
        let (sin2, cos2) = (2.0 * omega).sin_cos();

        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);

        let numerator = num_re.hypot(num_im);
        let denominator = den_re.hypot(den_im).max(MAGNITUDE_FLOOR);
        20.0 * (numerator / denominator).max(MAGNITUDE_FLOOR).log10()
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<BiquadCoefficients> for biquad::Coefficients<f64> {
    fn from(c: BiquadCoefficients) -> Self {
        biquad::Coefficients {
            a1: c.a1,
            a2: c.a2,
            b0: c.b0,
            b1: c.b1,
            b2: c.b2,
        }
    }
}

/// Compute biquad coefficients for `spec` at `sample_rate_hz`
///
/// Pure and deterministic: identical inputs give bit-identical output.
/// Frequency is clamped into (0, 0.999 × Nyquist) and Q to at least
/// [`MIN_Q`]. Gain is used as given.
///
/// # Errors
/// [`DspError::InvalidSpec`] when the sample rate is not a positive number.
pub fn compute(spec: FilterSpec, sample_rate_hz: f64) -> Result<BiquadCoefficients, DspError> {
    // `!(x > 0.0)` also rejects NaN
    if !(sample_rate_hz > 0.0) || !sample_rate_hz.is_finite() {
        return Err(DspError::InvalidSpec {
            sample_rate: sample_rate_hz,
        });
    }

    let nyquist = sample_rate_hz * 0.5;
    let frequency = clamp_frequency(spec.center_frequency_hz, nyquist);
    let q = if spec.q > MIN_Q { spec.q } else { MIN_Q };

    let omega = 2.0 * PI * frequency / sample_rate_hz;
    let (sin_w, cos_w) = omega.sin_cos();
    let alpha = sin_w / (2.0 * q);
    // Amplitude for peaking and shelving shapes
    let a = 10.0_f64.powf(spec.gain_db / 40.0);

    let (b0, b1, b2, a0, a1, a2) = match spec.filter_type {
        FilterType::Lowpass => {
            let b1 = 1.0 - cos_w;
            let b0 = b1 / 2.0;
            (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
        }
        FilterType::Highpass => {
            let b0 = (1.0 + cos_w) / 2.0;
            (b0, -(1.0 + cos_w), b0, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
        }
        // Constant 0 dB peak gain
        FilterType::Bandpass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha),
        FilterType::Notch => (1.0, -2.0 * cos_w, 1.0, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha),
        FilterType::Allpass => (
            1.0 - alpha,
            -2.0 * cos_w,
            1.0 + alpha,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        ),
        FilterType::Peaking => (
            1.0 + alpha * a,
            -2.0 * cos_w,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w,
            1.0 - alpha / a,
        ),
        FilterType::LowShelf => {
            let two_sqrt_a_alpha = 2.0 * a.sqrt() * shelf_alpha(sin_w, a, q);
            (
                a * ((a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                a * ((a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                (a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha,
            )
        }
        FilterType::HighShelf => {
            let two_sqrt_a_alpha = 2.0 * a.sqrt() * shelf_alpha(sin_w, a, q);
            (
                a * ((a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                a * ((a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                (a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha,
            )
        }
    };

    Ok(BiquadCoefficients {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
    })
}

/// Summed magnitude response (dB) of a cascade at `points` frequencies
/// spaced linearly from 0 Hz to Nyquist
///
/// Allocates; intended for drawing response curves on the control thread.
pub fn magnitude_response(
    cascade: &[BiquadCoefficients],
    sample_rate_hz: f64,
    points: usize,
) -> Vec<f64> {
    let nyquist = sample_rate_hz * 0.5;
    let step = if points > 1 {
        nyquist / (points - 1) as f64
    } else {
        0.0
    };

    (0..points)
        .map(|i| {
            let freq = step * i as f64;
            cascade
                .iter()
                .map(|section| section.magnitude_db(freq, sample_rate_hz))
                .sum()
        })
        .collect()
}

#[inline]
fn clamp_frequency(freq: f64, nyquist: f64) -> f64 {
    if freq >= nyquist {
        nyquist * NYQUIST_CLAMP
    } else if freq > MIN_FREQUENCY_HZ {
        freq
    } else {
        // Also catches NaN
        MIN_FREQUENCY_HZ
    }
}

/// Shelf alpha using the slope form, with S taken from Q
#[inline]
fn shelf_alpha(sin_w: f64, a: f64, slope: f64) -> f64 {
    let radicand = (a + 1.0 / a) * (1.0 / slope - 1.0) + 2.0;
    sin_w / 2.0 * radicand.max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use biquad::{ToHertz, Type};

    const FS: f64 = 48000.0;

    fn assert_rel_eq(actual: f64, expected: f64, tolerance: f64) {
        let scale = expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance * scale,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_compute_is_deterministic() {
        let types = [
            FilterType::Lowpass,
            FilterType::Highpass,
            FilterType::Bandpass,
            FilterType::Notch,
            FilterType::Peaking,
            FilterType::LowShelf,
            FilterType::HighShelf,
            FilterType::Allpass,
        ];
        for filter_type in types {
            let spec = FilterSpec::new(filter_type, 1234.5, 0.9).with_gain_db(4.5);
            let first = compute(spec, FS).unwrap();
            let second = compute(spec, FS).unwrap();
            assert_eq!(first.b0.to_bits(), second.b0.to_bits());
            assert_eq!(first.b1.to_bits(), second.b1.to_bits());
            assert_eq!(first.b2.to_bits(), second.b2.to_bits());
            assert_eq!(first.a1.to_bits(), second.a1.to_bits());
            assert_eq!(first.a2.to_bits(), second.a2.to_bits());
            assert!(first.is_finite(), "{filter_type:?} produced non-finite coefficients");
        }
    }

    #[test]
    fn test_butterworth_lowpass_at_quarter_rate() {
        // Cutoff = Nyquist / 2 puts omega at pi/2, so cos = 0 and sin = 1
        let spec = FilterSpec::new(FilterType::Lowpass, FS / 4.0, Q_BUTTERWORTH);
        let c = compute(spec, FS).unwrap();

        let sqrt2 = std::f64::consts::SQRT_2;
        let b0 = 1.0 / (2.0 + sqrt2);
        assert_rel_eq(c.b0, b0, 1e-9);
        assert_rel_eq(c.b1, 2.0 * b0, 1e-9);
        assert_rel_eq(c.b2, b0, 1e-9);
        assert!(c.a1.abs() < 1e-12, "a1 should vanish, got {}", c.a1);
        assert_rel_eq(c.a2, 3.0 - 2.0 * sqrt2, 1e-9);
    }

    #[test]
    fn test_matches_biquad_crate_reference() {
        let cases = [
            (FilterType::Lowpass, Type::LowPass),
            (FilterType::Highpass, Type::HighPass),
        ];
        for (ours, theirs) in cases {
            let c = compute(FilterSpec::new(ours, 2500.0, 0.8), FS).unwrap();
            let reference =
                biquad::Coefficients::<f64>::from_params(theirs, FS.hz(), 2500.0_f64.hz(), 0.8)
                    .unwrap();
            assert_rel_eq(c.b0, reference.b0, 1e-9);
            assert_rel_eq(c.b1, reference.b1, 1e-9);
            assert_rel_eq(c.b2, reference.b2, 1e-9);
            assert_rel_eq(c.a1, reference.a1, 1e-9);
            assert_rel_eq(c.a2, reference.a2, 1e-9);
        }
    }

    #[test]
    fn test_frequency_above_nyquist_is_clamped() {
        let clamped = compute(FilterSpec::new(FilterType::Lowpass, 30000.0, 1.0), FS).unwrap();
        let expected = compute(
            FilterSpec::new(FilterType::Lowpass, FS / 2.0 * NYQUIST_CLAMP, 1.0),
            FS,
        )
        .unwrap();
        assert_eq!(clamped, expected);
    }

    #[test]
    fn test_non_positive_q_is_clamped() {
        let zero_q = compute(FilterSpec::new(FilterType::Bandpass, 1000.0, 0.0), FS).unwrap();
        let negative_q = compute(FilterSpec::new(FilterType::Bandpass, 1000.0, -3.0), FS).unwrap();
        let min_q = compute(FilterSpec::new(FilterType::Bandpass, 1000.0, MIN_Q), FS).unwrap();
        assert_eq!(zero_q, min_q);
        assert_eq!(negative_q, min_q);
        assert!(zero_q.is_finite());
    }

    #[test]
    fn test_invalid_sample_rate() {
        let spec = FilterSpec::default();
        assert_eq!(
            compute(spec, 0.0),
            Err(DspError::InvalidSpec { sample_rate: 0.0 })
        );
        assert!(compute(spec, -44100.0).is_err());
        assert!(compute(spec, f64::NAN).is_err());
        assert!(compute(spec, f64::INFINITY).is_err());
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let c = compute(FilterSpec::new(FilterType::Lowpass, 1000.0, Q_BUTTERWORTH), FS).unwrap();
        assert!(c.magnitude_db(0.0, FS).abs() < 1e-9);
        // Butterworth is -3 dB at cutoff
        assert!((c.magnitude_db(1000.0, FS) + 3.0103).abs() < 0.01);
    }

    #[test]
    fn test_peaking_gain_at_center() {
        let spec = FilterSpec::new(FilterType::Peaking, 2000.0, 1.0).with_gain_db(6.0);
        let c = compute(spec, FS).unwrap();
        assert!((c.magnitude_db(2000.0, FS) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_shelves_with_zero_gain_are_flat() {
        for filter_type in [FilterType::LowShelf, FilterType::HighShelf] {
            let c = compute(FilterSpec::new(filter_type, 500.0, 1.0), FS).unwrap();
            for freq in [20.0, 500.0, 5000.0, 20000.0] {
                assert!(c.magnitude_db(freq, FS).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_low_shelf_boosts_lows() {
        let spec = FilterSpec::new(FilterType::LowShelf, 200.0, 1.0).with_gain_db(9.0);
        let c = compute(spec, FS).unwrap();
        assert!((c.magnitude_db(1.0, FS) - 9.0).abs() < 0.05);
        assert!(c.magnitude_db(15000.0, FS).abs() < 0.05);
    }

    #[test]
    fn test_magnitude_response_sums_sections() {
        let section =
            compute(FilterSpec::new(FilterType::Lowpass, 4000.0, Q_BUTTERWORTH), FS).unwrap();
        let single = magnitude_response(&[section], FS, 16);
        let double = magnitude_response(&[section, section], FS, 16);
        assert_eq!(single.len(), 16);
        for (one, two) in single.iter().zip(&double) {
            assert!((two - 2.0 * one).abs() < 1e-9);
        }
    }

    #[test]
    fn test_spec_serialization() {
        let spec = FilterSpec::new(FilterType::HighShelf, 8000.0, 0.7).with_gain_db(-3.0);
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("highShelf"));

        let parsed: FilterSpec =
            serde_json::from_str(r#"{"filterType":"notch","centerFrequencyHz":60.0,"q":30.0}"#)
                .unwrap();
        assert_eq!(parsed.filter_type, FilterType::Notch);
        assert_eq!(parsed.gain_db, 0.0);
    }
}
