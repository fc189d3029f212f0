//! Grit Core - Real-time Effect Engine
//!
//! This crate wires the Grit DSP kernels into a real-time engine:
//! - A lock-free, latest-value-wins parameter bridge (control → render)
//! - A render scheduler with an explicit stream lifecycle
//! - Deadline-checked optional inference for the crush stage
//! - Wait-free render events back to the control thread
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Control Thread                         │
//! │   UI ──▶ Controller ──compute coefficients──▶ snapshot      │
//! └─────────────────────────────────────────────────────────────┘
//!            │ triple buffer                ▲ rtrb events
//!            ▼                              │ atomics
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Render Thread                          │
//! │   RenderScheduler: biquad cascade ──▶ crusher / inference   │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod bridge;
mod config;
mod controller;
mod error;
mod inference;
mod message;
mod scheduler;
mod shared;
mod snapshot;

use std::sync::Arc;

use rtrb::RingBuffer;
use tracing::info;

pub use bridge::{BridgePublisher, BridgeReceiver, ParameterBridge};
pub use config::{EngineConfig, StreamFormat, MAX_BLOCK_FRAMES, MAX_CHANNELS, MAX_SAMPLE_RATE};
pub use controller::Controller;
pub use error::{EngineError, EngineResult};
pub use inference::{Clock, Inference, ModelHandle, MonotonicClock};
pub use message::{FaultReason, RenderEvent};
pub use scheduler::{RenderScheduler, SchedulerState};
pub use shared::{SharedState, StopHandle};
pub use snapshot::{ParameterSnapshot, MAX_SECTIONS};

// Re-export DSP types for convenience
pub use grit_dsp::{AudioBlock, AudioBlockMut, CrushSpec, FilterSpec, FilterType};

/// Build a connected control/render pair
///
/// The [`Controller`] stays on the control thread; the [`RenderScheduler`]
/// is configured and started there, then moved to (or called from) the
/// render thread.
pub fn engine(config: EngineConfig) -> EngineResult<(Controller, RenderScheduler)> {
    config.validate().map_err(EngineError::ConfigError)?;

    let shared = Arc::new(SharedState::new());
    let (publisher, receiver) =
        ParameterBridge::new(ParameterSnapshot::initial(config.section_count)).split();
    let (producer, consumer) = RingBuffer::<RenderEvent>::new(config.event_capacity);

    let controller = Controller::new(&config, publisher, consumer, Arc::clone(&shared));
    let scheduler = RenderScheduler::new(&config, receiver, producer, shared);

    info!(
        sections = config.section_count,
        inference_budget = config.inference_budget,
        "Engine created"
    );
    Ok((controller, scheduler))
}
