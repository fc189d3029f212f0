//! Saturation Drive
//!
//! Pre-quantization drive for the crusher. The signal is amplified by
//! `1 + gain` and then passed through a tanh soft clipper, so hot input
//! bends smoothly towards ±1 instead of slamming into the quantizer rails.
//!
//! # Algorithm
//!
//! - `|x| ≤ knee`: linear
//! - `|x| > knee`: the excess over the knee is squashed with `tanh` into the
//!   remaining headroom, so the output approaches but never exceeds ±1.

/// Level where the soft clipper leaves the linear region
pub const SATURATION_KNEE: f32 = 0.5;

/// Drive `sample` by `1 + gain` and soft clip it
///
/// `gain ≤ 0` (or NaN) disables the stage and returns the input unchanged.
#[inline]
pub fn drive(sample: f32, gain: f32) -> f32 {
    if gain.is_nan() || gain <= 0.0 {
        return sample;
    }
    soft_clip(sample * (1.0 + gain), SATURATION_KNEE)
}

/// tanh soft clipper with a linear region below `knee`
#[inline]
pub fn soft_clip(sample: f32, knee: f32) -> f32 {
    let magnitude = sample.abs();
    if magnitude <= knee {
        return sample;
    }

    let headroom = (1.0 - knee).max(0.001);
    let excess = (magnitude - knee) / headroom;
    sample.signum() * (knee + headroom * excess.tanh())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_gain_is_passthrough() {
        for x in [-1.5_f32, -0.3, 0.0, 0.42, 2.0] {
            assert_eq!(drive(x, 0.0), x);
            assert_eq!(drive(x, -1.0), x);
            assert_eq!(drive(x, f32::NAN), x);
        }
    }

    #[test]
    fn test_below_knee_is_linear() {
        assert_eq!(soft_clip(0.25, SATURATION_KNEE), 0.25);
        assert_eq!(soft_clip(-0.5, SATURATION_KNEE), -0.5);
    }

    #[test]
    fn test_output_is_bounded() {
        for x in [0.6_f32, 1.0, 4.0, 100.0] {
            let y = drive(x, 3.0);
            assert!(y <= 1.0, "{x} -> {y}");
            assert!(y > SATURATION_KNEE);
        }
    }

    #[test]
    fn test_preserves_polarity_and_symmetry() {
        let pos = drive(0.8, 1.0);
        let neg = drive(-0.8, 1.0);
        assert!(pos > 0.0);
        assert!(neg < 0.0);
        assert!((pos + neg).abs() < 1e-6);
    }

    #[test]
    fn test_monotonic() {
        let mut previous = f32::NEG_INFINITY;
        for i in -200..=200 {
            let y = drive(i as f32 * 0.01, 2.0);
            assert!(y >= previous);
            previous = y;
        }
    }
}
