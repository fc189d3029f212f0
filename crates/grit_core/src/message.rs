//! Render Events
//!
//! Events flow from the render thread to the control thread over a
//! wait-free rtrb ring. They are plain `Copy` values; the render thread
//! never formats strings or logs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a scheduler entered the terminal `Faulted` state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FaultReason {
    #[error("Render block has {actual} channels, stream has {expected}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Render input has {input} frames but output has {output}")]
    FrameMismatch { input: usize, output: usize },

    #[error("Render block of {frames} frames exceeds the negotiated {max}")]
    BlockTooLarge { frames: usize, max: usize },

    #[error("Host audio driver failure (code {code})")]
    Driver { code: i32 },
}

/// Events sent from the render thread to the control thread
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RenderEvent {
    /// Inference overran its budget for this many blocks in a row
    InferenceDegraded { consecutive_misses: u64 },

    /// Inference met its budget again after a degradation
    InferenceRecovered { after_misses: u64 },

    /// Filter state went non-finite and was cleared
    FilterReset,

    /// A stop requested through a `StopHandle` took effect
    Stopped,

    /// The scheduler faulted
    Faulted(FaultReason),
}
