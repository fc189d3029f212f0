//! Bit Crusher
//!
//! Lo-fi stage applied after the filter cascade:
//!
//! 1. optional saturation drive ([`crate::saturation::drive`])
//! 2. quantization to multiples of `2 / (2^bit_depth - 1)`, clamped to [-1, 1]
//! 3. zero-order hold for `sample_hold` frames
//! 4. dry/wet mix
//!
//! The grid is centred on zero, so silence stays silent at every depth. A
//! 1-bit crush has no room for a zero level and maps by sign to ±1.

use serde::{Deserialize, Serialize};

use crate::block::AudioBlockMut;
use crate::saturation;

pub const MIN_BIT_DEPTH: u32 = 1;
pub const MAX_BIT_DEPTH: u32 = 24;

/// Crush parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrushSpec {
    /// Quantizer resolution in bits (1..=24)
    pub bit_depth: u32,
    /// Frames each captured sample is held for (≥ 1, 1 = no decimation)
    pub sample_hold: u32,
    /// Wet amount, 0 = dry only, 1 = crushed only
    pub mix: f32,
    /// Pre-quantization drive, 0 = off
    pub saturation_gain: f32,
}

impl Default for CrushSpec {
    fn default() -> Self {
        Self {
            bit_depth: 8,
            sample_hold: 1,
            mix: 1.0,
            saturation_gain: 0.0,
        }
    }
}

impl CrushSpec {
    pub fn new(bit_depth: u32, sample_hold: u32, mix: f32) -> Self {
        Self {
            bit_depth,
            sample_hold,
            mix,
            saturation_gain: 0.0,
        }
    }

    pub fn with_saturation(self, saturation_gain: f32) -> Self {
        Self {
            saturation_gain,
            ..self
        }
    }

    /// Pull every field into its valid range; NaN mix/gain become 0
    pub fn clamped(self) -> Self {
        let finite_or_zero = |v: f32| if v.is_nan() { 0.0 } else { v };
        Self {
            bit_depth: self.bit_depth.clamp(MIN_BIT_DEPTH, MAX_BIT_DEPTH),
            sample_hold: self.sample_hold.max(1),
            mix: finite_or_zero(self.mix).clamp(0.0, 1.0),
            saturation_gain: finite_or_zero(self.saturation_gain).max(0.0),
        }
    }

    pub fn is_clamped(&self) -> bool {
        *self == self.clamped()
    }
}

/// Quantize one sample to the `bit_depth` grid over [-1, 1]
///
/// `bit_depth` must already be within [`MIN_BIT_DEPTH`, `MAX_BIT_DEPTH`].
#[inline]
pub fn quantize(sample: f32, bit_depth: u32) -> f32 {
    if bit_depth <= MIN_BIT_DEPTH {
        return if sample >= 0.0 { 1.0 } else { -1.0 };
    }
    let step = 2.0 / ((1_u32 << bit_depth) - 1) as f64;
    let x = f64::from(sample).clamp(-1.0, 1.0);
    let y = (x / step).round() * step;
    y.clamp(-1.0, 1.0) as f32
}

/// Stateful crusher: one hold register per channel plus a shared frame counter
///
/// # Real-time Safety
/// `process_in_place`, `set_spec` and `reset` never allocate.
#[derive(Debug, Clone, Default)]
pub struct CrusherKernel {
    spec: CrushSpec,
    held: Vec<f32>,
    /// Frames since the last capture, in `0..sample_hold`
    hold_counter: u32,
}

impl CrusherKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels(channel_count: usize) -> Self {
        let mut kernel = Self::new();
        kernel.configure(channel_count);
        kernel
    }

    /// Size the hold registers; clears hold state
    pub fn configure(&mut self, channel_count: usize) {
        self.held.clear();
        self.held.resize(channel_count, 0.0);
        self.hold_counter = 0;
    }

    pub fn channel_count(&self) -> usize {
        self.held.len()
    }

    /// Replace the parameters (clamped); hold registers are kept
    pub fn set_spec(&mut self, spec: CrushSpec) {
        self.spec = spec.clamped();
        if self.hold_counter >= self.spec.sample_hold {
            self.hold_counter = 0;
        }
    }

    pub fn spec(&self) -> CrushSpec {
        self.spec
    }

    pub fn reset(&mut self) {
        self.held.fill(0.0);
        self.hold_counter = 0;
    }

    /// Crush a block in place
    ///
    /// Channels beyond the configured count pass through untouched.
    pub fn process_in_place(&mut self, block: &mut AudioBlockMut<'_, '_>) {
        let frames = block.frames();
        let channels = block.channel_count().min(self.held.len());
        let CrushSpec {
            bit_depth,
            sample_hold,
            mix,
            saturation_gain,
        } = self.spec;
        let dry_gain = 1.0 - mix;

        for (channel, held) in self.held.iter_mut().enumerate().take(channels) {
            let mut counter = self.hold_counter;
            for sample in block.channel_mut(channel).iter_mut() {
                let dry = *sample;
                if counter == 0 {
                    *held = quantize(saturation::drive(dry, saturation_gain), bit_depth);
                }
                *sample = dry * dry_gain + *held * mix;

                counter += 1;
                if counter == sample_hold {
                    counter = 0;
                }
            }
        }

        self.hold_counter = ((self.hold_counter as usize + frames) % sample_hold as usize) as u32;
    }
}
