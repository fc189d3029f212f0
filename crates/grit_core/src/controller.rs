//! Control-path API
//!
//! The [`Controller`] turns UI-level parameters into a [`ParameterSnapshot`]
//! and publishes it through the bridge. Coefficients are computed here, on
//! the calling thread, for the sample rate the scheduler was configured with.

use std::sync::Arc;

use rtrb::Consumer;
use tracing::{debug, warn};

use grit_dsp::{compute, magnitude_response, BiquadCoefficients, CrushSpec, DspError, FilterSpec};

use crate::bridge::BridgePublisher;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::message::RenderEvent;
use crate::scheduler::SchedulerState;
use crate::shared::{SharedState, StopHandle};
use crate::snapshot::{ParameterSnapshot, MAX_SECTIONS};

pub struct Controller {
    publisher: BridgePublisher<ParameterSnapshot>,
    events: Consumer<RenderEvent>,
    shared: Arc<SharedState>,
    section_count: usize,
    /// Specs behind the published coefficients, one per configured section
    filters: Vec<FilterSpec>,
    /// Last published value
    snapshot: ParameterSnapshot,
}

impl Controller {
    pub(crate) fn new(
        config: &EngineConfig,
        publisher: BridgePublisher<ParameterSnapshot>,
        events: Consumer<RenderEvent>,
        shared: Arc<SharedState>,
    ) -> Self {
        Self {
            publisher,
            events,
            shared,
            section_count: config.section_count.min(MAX_SECTIONS),
            filters: Vec::new(),
            snapshot: ParameterSnapshot::initial(config.section_count),
        }
    }

    /// Use `spec` for every section of the cascade
    ///
    /// The spec is kept even when the scheduler is not configured yet, so
    /// a later [`Self::refresh`] applies it.
    ///
    /// # Errors
    /// [`DspError::InvalidSpec`] (wrapped) before the first `configure`.
    pub fn set_filter(&mut self, spec: FilterSpec) -> EngineResult<()> {
        self.filters = vec![spec; self.section_count];
        self.publish_filters()
    }

    /// Set sections in order; sections past `specs.len()` become passthrough
    pub fn set_filter_cascade(&mut self, specs: &[FilterSpec]) -> EngineResult<()> {
        if specs.len() > self.section_count {
            return Err(DspError::InvalidSectionIndex {
                index: specs.len() - 1,
                count: self.section_count,
            }
            .into());
        }
        self.filters = specs.to_vec();
        self.publish_filters()
    }

    /// Replace the crush parameters; out-of-range values are clamped
    pub fn set_crush(&mut self, spec: CrushSpec) {
        let clamped = spec.clamped();
        if clamped != spec {
            warn!(requested = ?spec, applied = ?clamped, "Crush parameters clamped");
        }
        self.snapshot.crush = clamped;
        self.publish();
    }

    pub fn set_bypass(&mut self, bypassed: bool) {
        self.snapshot.bypassed = bypassed;
        self.publish();
    }

    /// Route the crush stage through the scheduler's inference capability
    pub fn set_inference_enabled(&mut self, enabled: bool) {
        self.snapshot.inference_enabled = enabled;
        self.publish();
    }

    /// Recompute every section for the current sample rate and publish
    ///
    /// Call after the scheduler is (re)configured.
    pub fn refresh(&mut self) -> EngineResult<()> {
        self.publish_filters()
    }

    /// Summed response of the published cascade in dB, 0 Hz to Nyquist
    pub fn magnitude_response(&self, points: usize) -> EngineResult<Vec<f64>> {
        let sample_rate = self.snapshot.sample_rate_hz;
        if !(sample_rate > 0.0) {
            return Err(DspError::InvalidSpec { sample_rate }.into());
        }
        Ok(magnitude_response(self.snapshot.cascade(), sample_rate, points))
    }

    /// Next event from the render thread, if any
    pub fn poll_event(&mut self) -> Option<RenderEvent> {
        self.events.pop().ok()
    }

    pub fn deadline_missed(&self) -> u64 {
        self.shared.deadline_missed()
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.shared.blocks_rendered()
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    /// Sample rate the scheduler is configured for (0.0 before `configure`)
    pub fn sample_rate(&self) -> f64 {
        self.shared.sample_rate()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.shared))
    }

    /// Last published snapshot
    pub fn snapshot(&self) -> &ParameterSnapshot {
        &self.snapshot
    }

    fn publish_filters(&mut self) -> EngineResult<()> {
        let sample_rate = self.shared.sample_rate();
        if !(sample_rate > 0.0) {
            return Err(DspError::InvalidSpec { sample_rate }.into());
        }

        let mut coefficients = [BiquadCoefficients::IDENTITY; MAX_SECTIONS];
        for (slot, spec) in coefficients.iter_mut().zip(&self.filters) {
            *slot = compute(*spec, sample_rate)?;
        }

        self.snapshot.coefficients = coefficients;
        self.snapshot.sample_rate_hz = sample_rate;
        self.publish();
        Ok(())
    }

    fn publish(&mut self) {
        self.snapshot.sequence += 1;
        self.publisher.publish(self.snapshot);
        debug!(sequence = self.snapshot.sequence, "Published parameter snapshot");
    }
}
