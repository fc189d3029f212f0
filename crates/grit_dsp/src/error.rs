//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Invalid filter spec: sample rate must be positive, got {sample_rate}Hz")]
    InvalidSpec { sample_rate: f64 },

    #[error("Invalid section index: {index} (cascade has {count} sections)")]
    InvalidSectionIndex { index: usize, count: usize },
}
