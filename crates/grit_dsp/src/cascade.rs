//! Biquad Filter Cascade
//!
//! Runs an ordered cascade of biquad sections over every channel of a block.
//! Each section uses transposed direct-form II:
//!
//! ```text
//! y   = b0·x + w1
//! w1' = b1·x − a1·y + w2
//! w2' = b2·x − a2·y
//! ```
//!
//! Processing nests section → channel → sample, so a section's recursion only
//! ever sees its own previous output. State lives in `f64` and survives
//! coefficient changes; coefficient changes are ramped linearly over
//! [`COEFF_RAMP_FRAMES`] frames to avoid zipper noise.

use crate::block::{AudioBlock, AudioBlockMut};
use crate::coefficients::BiquadCoefficients;
use crate::error::DspError;

/// Length of the linear coefficient ramp applied on every update
pub const COEFF_RAMP_FRAMES: usize = 32;

/// State magnitudes below this are flushed to zero
pub const DENORMAL_THRESHOLD: f64 = 1.0e-30;

#[inline(always)]
fn flush_denormal(value: f64) -> f64 {
    if value.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        value
    }
}

/// Delay registers of one (section, channel) pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SectionState {
    w1: f64,
    w2: f64,
}

impl SectionState {
    #[inline(always)]
    fn tick(&mut self, c: &BiquadCoefficients, input: f32) -> f32 {
        let x = f64::from(input);
        let y = c.b0 * x + self.w1;
        self.w1 = flush_denormal(c.b1 * x - c.a1 * y + self.w2);
        self.w2 = flush_denormal(c.b2 * x - c.a2 * y);
        y as f32
    }
}

/// Linear interpolation from the previously effective coefficients to a new target
#[derive(Debug, Clone, Copy)]
struct CoefficientRamp {
    start: BiquadCoefficients,
    target: BiquadCoefficients,
    /// Frames of the ramp already rendered
    position: usize,
}

impl CoefficientRamp {
    fn settled(coefficients: BiquadCoefficients) -> Self {
        Self {
            start: coefficients,
            target: coefficients,
            position: COEFF_RAMP_FRAMES,
        }
    }

    #[inline]
    fn is_settled(&self) -> bool {
        self.position >= COEFF_RAMP_FRAMES
    }

    /// Coefficients for the frame `offset` frames into the next block
    #[inline]
    fn at(&self, offset: usize) -> BiquadCoefficients {
        let position = self.position + offset;
        if position >= COEFF_RAMP_FRAMES {
            self.target
        } else {
            let t = (position + 1) as f64 / COEFF_RAMP_FRAMES as f64;
            self.start.lerp(&self.target, t)
        }
    }

    /// Coefficients used for the most recently rendered frame
    fn current(&self) -> BiquadCoefficients {
        if self.is_settled() {
            self.target
        } else {
            let t = self.position as f64 / COEFF_RAMP_FRAMES as f64;
            self.start.lerp(&self.target, t)
        }
    }

    fn retarget(&mut self, target: BiquadCoefficients) {
        self.start = self.current();
        self.target = target;
        self.position = 0;
    }

    fn advance(&mut self, frames: usize) {
        self.position = (self.position + frames).min(COEFF_RAMP_FRAMES);
    }
}

/// Stateful cascade of biquad sections
///
/// # Real-time Safety
/// `process` and `process_in_place` perform no allocation, locking or
/// syscalls. `configure` allocates and belongs on the control path.
#[derive(Debug, Clone, Default)]
pub struct BiquadFilterKernel {
    channel_count: usize,
    ramps: Vec<CoefficientRamp>,
    /// Section-major: `state[section * channel_count + channel]`
    state: Vec<SectionState>,
}

impl BiquadFilterKernel {
    /// Create an unconfigured kernel (no channels, no sections)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a kernel already sized for `channel_count × section_count`
    pub fn with_layout(channel_count: usize, section_count: usize) -> Self {
        let mut kernel = Self::new();
        kernel.configure(channel_count, section_count);
        kernel
    }

    /// Resize and zero all state, resetting every section to passthrough
    ///
    /// Drops any in-flight coefficient ramp.
    pub fn configure(&mut self, channel_count: usize, section_count: usize) {
        self.channel_count = channel_count;
        self.ramps.clear();
        self.ramps
            .resize(section_count, CoefficientRamp::settled(BiquadCoefficients::IDENTITY));
        self.state.clear();
        self.state
            .resize(channel_count * section_count, SectionState::default());
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn section_count(&self) -> usize {
        self.ramps.len()
    }

    /// Replace a section's coefficients, ramping from the current ones
    pub fn set_coefficients(
        &mut self,
        section: usize,
        coefficients: BiquadCoefficients,
    ) -> Result<(), DspError> {
        self.ramp_mut(section)?.retarget(coefficients);
        Ok(())
    }

    /// Replace a section's coefficients immediately, without a ramp
    ///
    /// Meant for setup before audio flows; mid-stream use may click.
    pub fn load_coefficients(
        &mut self,
        section: usize,
        coefficients: BiquadCoefficients,
    ) -> Result<(), DspError> {
        *self.ramp_mut(section)? = CoefficientRamp::settled(coefficients);
        Ok(())
    }

    /// Ramp each section towards the matching entry of `cascade`
    ///
    /// Sections beyond `cascade.len()` ramp to passthrough; surplus entries
    /// are ignored.
    pub fn set_cascade(&mut self, cascade: &[BiquadCoefficients]) {
        for (index, ramp) in self.ramps.iter_mut().enumerate() {
            ramp.retarget(cascade.get(index).copied().unwrap_or_default());
        }
    }

    /// Load `cascade` without ramping (see [`Self::load_coefficients`])
    pub fn load_cascade(&mut self, cascade: &[BiquadCoefficients]) {
        for (index, ramp) in self.ramps.iter_mut().enumerate() {
            *ramp = CoefficientRamp::settled(cascade.get(index).copied().unwrap_or_default());
        }
    }

    /// Target coefficients of a section
    pub fn coefficients(&self, section: usize) -> Option<BiquadCoefficients> {
        self.ramps.get(section).map(|ramp| ramp.target)
    }

    /// Whether any section is still interpolating
    pub fn is_ramping(&self) -> bool {
        self.ramps.iter().any(|ramp| !ramp.is_settled())
    }

    /// Delay registers `(w1, w2)` of a section/channel pair
    pub fn section_state(&self, section: usize, channel: usize) -> Option<(f64, f64)> {
        if channel >= self.channel_count {
            return None;
        }
        self.state
            .get(section * self.channel_count + channel)
            .map(|s| (s.w1, s.w2))
    }

    /// True if any delay register went to NaN or infinity
    pub fn has_non_finite_state(&self) -> bool {
        self.state
            .iter()
            .any(|s| !s.w1.is_finite() || !s.w2.is_finite())
    }

    /// Clear delay lines, keeping coefficients
    pub fn reset(&mut self) {
        self.state.fill(SectionState::default());
    }

    /// Filter `input` into `output`
    ///
    /// Equivalent to copying `input` into `output` and filtering in place.
    #[inline]
    pub fn process(&mut self, input: &AudioBlock<'_>, output: &mut AudioBlockMut<'_, '_>) {
        output.copy_from(input);
        self.process_in_place(output);
    }

    /// Filter a block in place
    ///
    /// Channels beyond the configured count pass through untouched.
    ///
    /// # Real-time Safety
    /// No allocations. O(sections × channels × frames).
    pub fn process_in_place(&mut self, block: &mut AudioBlockMut<'_, '_>) {
        let frames = block.frames();
        let channels = block.channel_count().min(self.channel_count);
        let stride = self.channel_count;

        for (section, ramp) in self.ramps.iter_mut().enumerate() {
            let states = &mut self.state[section * stride..(section + 1) * stride];

            for (channel, state) in states.iter_mut().enumerate().take(channels) {
                let samples = block.channel_mut(channel);

                if ramp.is_settled() {
                    let c = ramp.target;
                    for sample in samples.iter_mut() {
                        *sample = state.tick(&c, *sample);
                    }
                } else {
                    for (offset, sample) in samples.iter_mut().enumerate() {
                        let c = ramp.at(offset);
                        *sample = state.tick(&c, *sample);
                    }
                }
            }

            ramp.advance(frames);
        }
    }

    fn ramp_mut(&mut self, section: usize) -> Result<&mut CoefficientRamp, DspError> {
        let count = self.ramps.len();
        self.ramps
            .get_mut(section)
            .ok_or(DspError::InvalidSectionIndex {
                index: section,
                count,
            })
    }
}
