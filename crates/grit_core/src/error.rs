//! Engine Error Types

use thiserror::Error;

use crate::scheduler::SchedulerState;

/// Errors that can occur in the engine's control path
///
/// The render path never returns these; it degrades to silence, counters
/// or [`crate::RenderEvent`]s instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unsupported stream format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot {action} while {from:?}")]
    InvalidStateTransition {
        from: SchedulerState,
        action: &'static str,
    },

    #[error("Invalid engine configuration: {0}")]
    ConfigError(String),

    #[error("DSP error: {0}")]
    Dsp(#[from] grit_dsp::DspError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::UnsupportedFormat("Invalid channel count: 0".into());
        assert!(err.to_string().contains("channel count"));

        let err = EngineError::InvalidStateTransition {
            from: SchedulerState::Running,
            action: "configure",
        };
        let msg = err.to_string();
        assert!(msg.contains("configure"));
        assert!(msg.contains("Running"));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = grit_dsp::DspError::InvalidSpec { sample_rate: 0.0 };
        let engine_err: EngineError = dsp_err.into();
        assert!(matches!(engine_err, EngineError::Dsp(_)));
    }
}
