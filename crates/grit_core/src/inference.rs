//! Inference and Clock Capabilities
//!
//! The crush stage can hand the filtered block to an external numeric
//! transform (typically a neural network). The engine treats it as opaque
//! and potentially slow, so every call is timed against an injected
//! [`Clock`] and its result is discarded when it overruns.

use std::fmt;
use std::time::{Duration, Instant};

use grit_dsp::{AudioBlock, AudioBlockMut};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a model loaded by the host's inference runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModelHandle(pub u64);

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

/// Block-in, block-out transform run on the render thread
///
/// `output` has the same shape as `input`. Implementations should not
/// allocate or block; if they do anyway, the scheduler keeps the
/// arithmetic crusher's output for that block.
pub trait Inference: Send {
    fn infer(
        &mut self,
        input: &AudioBlock<'_>,
        output: &mut AudioBlockMut<'_, '_>,
        model: ModelHandle,
    );
}

impl<F> Inference for F
where
    F: FnMut(&AudioBlock<'_>, &mut AudioBlockMut<'_, '_>, ModelHandle) + Send,
{
    fn infer(
        &mut self,
        input: &AudioBlock<'_>,
        output: &mut AudioBlockMut<'_, '_>,
        model: ModelHandle,
    ) {
        self(input, output, model)
    }
}

/// Monotonic time source used to time inference
pub trait Clock: Send {
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<I: Inference>(inference: &mut I, input: &[f32], output: &mut [f32]) {
        let in_channels: [&[f32]; 1] = [input];
        let mut out_channels: [&mut [f32]; 1] = [output];
        inference.infer(
            &AudioBlock::new(&in_channels),
            &mut AudioBlockMut::new(&mut out_channels),
            ModelHandle(3),
        );
    }

    #[test]
    fn test_closure_is_inference() {
        let mut seen = None;
        let mut output = [0.0_f32; 3];
        {
            let mut invert =
                |input: &AudioBlock<'_>, output: &mut AudioBlockMut<'_, '_>, model: ModelHandle| {
                    seen = Some(model);
                    for (dst, src) in output.channel_mut(0).iter_mut().zip(input.channel(0)) {
                        *dst = -*src;
                    }
                };
            run(&mut invert, &[0.1, -0.2, 0.3], &mut output);
        }
        assert_eq!(output, [-0.1, 0.2, -0.3]);
        assert_eq!(seen, Some(ModelHandle(3)));
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_model_handle_display() {
        assert_eq!(ModelHandle(12).to_string(), "model#12");
    }
}
