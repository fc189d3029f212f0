//! Parameter Snapshot
//!
//! Everything the render path needs from the control path, as one plain
//! `Copy` value so it can cross the bridge without heap data.

use grit_dsp::{BiquadCoefficients, CrushSpec};

/// Longest supported biquad cascade
pub const MAX_SECTIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    /// Strictly increasing per publish; 0 is the never-published initial value
    pub sequence: u64,
    /// Sample rate `coefficients` were computed for (0 = none)
    pub sample_rate_hz: f64,
    pub section_count: usize,
    pub coefficients: [BiquadCoefficients; MAX_SECTIONS],
    pub crush: CrushSpec,
    pub bypassed: bool,
    /// Use the installed inference capability for the crush stage
    pub inference_enabled: bool,
}

impl ParameterSnapshot {
    /// Passthrough cascade, default crush, no sample rate
    pub fn initial(section_count: usize) -> Self {
        Self {
            sequence: 0,
            sample_rate_hz: 0.0,
            section_count: section_count.min(MAX_SECTIONS),
            coefficients: [BiquadCoefficients::IDENTITY; MAX_SECTIONS],
            crush: CrushSpec::default(),
            bypassed: false,
            inference_enabled: false,
        }
    }

    /// Coefficients of the active sections
    pub fn cascade(&self) -> &[BiquadCoefficients] {
        &self.coefficients[..self.section_count.min(MAX_SECTIONS)]
    }

    /// Whether the cascade was computed for `sample_rate_hz`
    pub fn matches_sample_rate(&self, sample_rate_hz: f64) -> bool {
        self.sample_rate_hz > 0.0 && self.sample_rate_hz == sample_rate_hz
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self::initial(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot_is_passthrough() {
        let snapshot = ParameterSnapshot::initial(3);
        assert_eq!(snapshot.sequence, 0);
        assert_eq!(snapshot.cascade().len(), 3);
        assert!(snapshot
            .cascade()
            .iter()
            .all(|c| *c == BiquadCoefficients::IDENTITY));
        assert!(!snapshot.matches_sample_rate(0.0));
    }

    #[test]
    fn test_section_count_is_capped() {
        let snapshot = ParameterSnapshot::initial(MAX_SECTIONS + 4);
        assert_eq!(snapshot.cascade().len(), MAX_SECTIONS);
    }

    #[test]
    fn test_sample_rate_match() {
        let snapshot = ParameterSnapshot {
            sample_rate_hz: 48000.0,
            ..ParameterSnapshot::default()
        };
        assert!(snapshot.matches_sample_rate(48000.0));
        assert!(!snapshot.matches_sample_rate(44100.0));
    }
}
