//! Grit DSP - Filter and Crush Kernels
//!
//! This crate provides the signal processing half of Grit:
//! - RBJ cookbook coefficient calculation for eight biquad shapes
//! - A multi-section transposed direct-form II biquad cascade with
//!   click-free coefficient ramps
//! - A bit crusher (quantization, sample-and-hold, saturation drive, mix)
//! - Borrowed planar block views so hosts own every sample buffer
//!
//! # Architecture
//!
//! Coefficients are computed on the control thread and handed to the kernels
//! as plain `Copy` values. Kernel `process*` methods never allocate, lock or
//! block; only `configure` sizes internal state.

mod block;
mod cascade;
mod coefficients;
mod crusher;
mod error;
mod saturation;

pub use block::{AudioBlock, AudioBlockMut};
pub use cascade::{BiquadFilterKernel, COEFF_RAMP_FRAMES, DENORMAL_THRESHOLD};
pub use coefficients::{
    compute, magnitude_response, BiquadCoefficients, FilterSpec, FilterType, MIN_Q,
    NYQUIST_CLAMP, Q_BUTTERWORTH,
};
pub use crusher::{quantize, CrushSpec, CrusherKernel, MAX_BIT_DEPTH, MIN_BIT_DEPTH};
pub use error::DspError;
pub use saturation::{drive, soft_clip, SATURATION_KNEE};
