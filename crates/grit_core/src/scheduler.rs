//! Render Scheduler
//!
//! Owns the stream lifecycle and runs one pass of the effect pipeline per
//! render callback:
//!
//! ```text
//! try_take snapshot ─▶ biquad cascade ─▶ crusher ─▶ output
//!                                    └─▶ inference (timed, optional)
//! ```
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized ──configure──▶ Configured ──start──▶ Running ──stop──▶ Stopped
//!                                  ▲                                   │
//!                                  └────────────configure──────────────┤
//!                                                         start ◀──────┘
//! any ──fault──▶ Faulted (terminal)
//! ```
//!
//! # Real-time Safety
//! `render` never allocates, locks, blocks, logs or panics on malformed
//! blocks. Everything that allocates happens in `configure`.

use std::sync::Arc;
use std::time::Duration;

use rtrb::Producer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use grit_dsp::{AudioBlock, AudioBlockMut, BiquadFilterKernel, CrusherKernel};

use crate::bridge::BridgeReceiver;
use crate::config::{EngineConfig, StreamFormat, MAX_CHANNELS};
use crate::error::{EngineError, EngineResult};
use crate::inference::{Clock, Inference, ModelHandle, MonotonicClock};
use crate::message::{FaultReason, RenderEvent};
use crate::shared::{SharedState, StopHandle};
use crate::snapshot::ParameterSnapshot;

/// Lifecycle state of a [`RenderScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SchedulerState {
    Uninitialized = 0,
    Configured = 1,
    Running = 2,
    Stopped = 3,
    Faulted = 4,
}

impl SchedulerState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Configured,
            2 => Self::Running,
            3 => Self::Stopped,
            4 => Self::Faulted,
            _ => Self::Uninitialized,
        }
    }
}

struct InferenceSlot {
    inference: Box<dyn Inference>,
    model: ModelHandle,
}

/// Planar `channels × max_frames` buffers handed to the inference capability
#[derive(Default)]
struct InferenceScratch {
    input: Vec<f32>,
    output: Vec<f32>,
    stride: usize,
}

impl InferenceScratch {
    fn resize(&mut self, channels: usize, max_frames: usize) {
        self.stride = max_frames;
        self.input.clear();
        self.input.resize(channels * max_frames, 0.0);
        self.output.clear();
        self.output.resize(channels * max_frames, 0.0);
    }

    /// Run inference on a copy of `filtered`, returning how long it took
    fn run(
        &mut self,
        slot: &mut InferenceSlot,
        clock: &dyn Clock,
        filtered: &AudioBlockMut<'_, '_>,
    ) -> Duration {
        if self.stride == 0 {
            return Duration::ZERO;
        }
        let frames = filtered.frames().min(self.stride);
        let channels = filtered.channel_count().min(MAX_CHANNELS);

        for (channel, chunk) in self
            .input
            .chunks_exact_mut(self.stride)
            .take(channels)
            .enumerate()
        {
            chunk[..frames].copy_from_slice(&filtered.channel(channel)[..frames]);
        }

        let empty: &[f32] = &[];
        let mut inputs = [empty; MAX_CHANNELS];
        for (view, chunk) in inputs.iter_mut().zip(self.input.chunks_exact(self.stride)) {
            *view = &chunk[..frames];
        }
        let mut outputs: [&mut [f32]; MAX_CHANNELS] = Default::default();
        for (view, chunk) in outputs
            .iter_mut()
            .zip(self.output.chunks_exact_mut(self.stride))
        {
            let chunk = &mut chunk[..frames];
            chunk.fill(0.0);
            *view = chunk;
        }

        let input = AudioBlock::new(&inputs[..channels]);
        let mut output = AudioBlockMut::new(&mut outputs[..channels]);

        let started = clock.now();
        slot.inference.infer(&input, &mut output, slot.model);
        clock.now().saturating_sub(started)
    }

    /// Copy the last inference result into `block`
    fn write_to(&self, block: &mut AudioBlockMut<'_, '_>) {
        if self.stride == 0 {
            return;
        }
        let frames = block.frames().min(self.stride);
        let empty: &[f32] = &[];
        let mut views = [empty; MAX_CHANNELS];
        for (view, chunk) in views.iter_mut().zip(self.output.chunks_exact(self.stride)) {
            *view = &chunk[..frames];
        }
        block.copy_from_channels(&views[..block.channel_count().min(MAX_CHANNELS)]);
    }
}

/// Drives the filter and crush kernels from the host's render callback
///
/// Control methods (`configure`, `start`, `stop`, `fault`, `set_inference`)
/// belong to whichever thread owns the scheduler between callbacks;
/// `render` is the real-time entry point.
pub struct RenderScheduler {
    state: SchedulerState,
    format: StreamFormat,
    section_count: usize,
    inference_budget: f64,
    miss_warning_threshold: u64,

    filter: BiquadFilterKernel,
    crusher: CrusherKernel,

    receiver: BridgeReceiver<ParameterSnapshot>,
    /// Last accepted snapshot
    current: ParameterSnapshot,

    inference: Option<InferenceSlot>,
    clock: Box<dyn Clock>,
    scratch: InferenceScratch,
    consecutive_misses: u64,
    degraded: bool,

    events: Producer<RenderEvent>,
    shared: Arc<SharedState>,
}

impl RenderScheduler {
    pub(crate) fn new(
        config: &EngineConfig,
        receiver: BridgeReceiver<ParameterSnapshot>,
        events: Producer<RenderEvent>,
        shared: Arc<SharedState>,
    ) -> Self {
        Self {
            state: SchedulerState::Uninitialized,
            format: config.format,
            section_count: config.section_count,
            inference_budget: config.inference_budget,
            miss_warning_threshold: u64::from(config.miss_warning_threshold.max(1)),
            filter: BiquadFilterKernel::new(),
            crusher: CrusherKernel::new(),
            receiver,
            current: ParameterSnapshot::initial(config.section_count),
            inference: None,
            clock: Box::new(MonotonicClock::new()),
            scratch: InferenceScratch::default(),
            consecutive_misses: 0,
            degraded: false,
            events,
            shared,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Negotiated format, once configured
    pub fn format(&self) -> Option<StreamFormat> {
        match self.state {
            SchedulerState::Uninitialized => None,
            _ => Some(self.format),
        }
    }

    pub fn deadline_missed(&self) -> u64 {
        self.shared.deadline_missed()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.shared))
    }

    /// Last snapshot accepted from the control path
    pub fn current_snapshot(&self) -> &ParameterSnapshot {
        &self.current
    }

    pub fn filter(&self) -> &BiquadFilterKernel {
        &self.filter
    }

    pub fn crusher(&self) -> &CrusherKernel {
        &self.crusher
    }

    /// Install the inference capability used when a snapshot enables it
    pub fn set_inference(
        &mut self,
        inference: Box<dyn Inference>,
        model: ModelHandle,
    ) -> EngineResult<()> {
        if self.state == SchedulerState::Running {
            return Err(self.invalid("install inference"));
        }
        self.inference = Some(InferenceSlot { inference, model });
        info!(%model, "Inference capability installed");
        Ok(())
    }

    pub fn clear_inference(&mut self) -> EngineResult<()> {
        if self.state == SchedulerState::Running {
            return Err(self.invalid("remove inference"));
        }
        if self.inference.take().is_some() {
            info!("Inference capability removed");
        }
        Ok(())
    }

    /// Replace the clock used to time inference
    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    /// Negotiate a stream format and size every buffer for it
    ///
    /// Resets filter and hold state. The last accepted snapshot is loaded
    /// without a ramp when its coefficients match the new sample rate.
    pub fn configure(&mut self, format: StreamFormat) -> EngineResult<()> {
        if matches!(
            self.state,
            SchedulerState::Running | SchedulerState::Faulted
        ) {
            return Err(self.invalid("configure"));
        }
        if let Err(reason) = format.validate() {
            warn!(%reason, "Rejected stream format");
            return Err(EngineError::UnsupportedFormat(reason));
        }

        let channels = usize::from(format.channels);
        let sample_rate_hz = format.sample_rate_hz();

        self.filter.configure(channels, self.section_count);
        self.crusher.configure(channels);
        self.crusher.set_spec(self.current.crush);
        if self.current.matches_sample_rate(sample_rate_hz) {
            self.filter.load_cascade(self.current.cascade());
        }
        self.scratch.resize(channels, format.max_frames);

        self.format = format;
        self.shared.set_sample_rate(sample_rate_hz);
        self.transition(SchedulerState::Configured);

        info!(
            sample_rate = format.sample_rate,
            channels,
            max_frames = format.max_frames,
            latency_ms = format.latency_ms(),
            sections = self.section_count,
            "Render scheduler configured"
        );
        Ok(())
    }

    /// Begin rendering
    ///
    /// A snapshot waiting in the bridge is applied immediately, without a
    /// ramp. Restarting from `Stopped` clears filter and hold state.
    pub fn start(&mut self) -> EngineResult<()> {
        match self.state {
            SchedulerState::Configured => {}
            SchedulerState::Stopped => {
                self.filter.reset();
                self.crusher.reset();
            }
            _ => return Err(self.invalid("start")),
        }

        self.shared.clear_stop_request();
        self.consecutive_misses = 0;
        self.degraded = false;
        if let Some(snapshot) = self.receiver.try_take() {
            self.accept(snapshot, false);
        }

        self.transition(SchedulerState::Running);
        info!(sequence = self.current.sequence, "Render scheduler started");
        Ok(())
    }

    /// Stop rendering; subsequent callbacks output silence
    pub fn stop(&mut self) -> EngineResult<()> {
        match self.state {
            SchedulerState::Running => {
                self.transition(SchedulerState::Stopped);
                info!("Render scheduler stopped");
                Ok(())
            }
            SchedulerState::Stopped => Ok(()),
            _ => Err(self.invalid("stop")),
        }
    }

    /// Enter the terminal `Faulted` state on a fatal host condition
    pub fn fault(&mut self, reason: FaultReason) {
        if self.state == SchedulerState::Faulted {
            return;
        }
        warn!(%reason, from = ?self.state, "Render scheduler faulted");
        self.enter_fault(reason);
    }

    /// Render one block
    ///
    /// Writes silence unless running. A block that does not match the
    /// negotiated format faults the scheduler.
    ///
    /// # Real-time Safety
    /// No allocations, locks or logging.
    pub fn render(&mut self, input: &AudioBlock<'_>, output: &mut AudioBlockMut<'_, '_>) {
        if self.state == SchedulerState::Running && self.shared.take_stop_request() {
            self.transition(SchedulerState::Stopped);
            self.push_event(RenderEvent::Stopped);
        }

        if self.state != SchedulerState::Running {
            output.fill_silence();
            return;
        }

        if let Err(reason) = self.check_block(input, output) {
            self.enter_fault(reason);
            output.fill_silence();
            return;
        }

        if let Some(snapshot) = self.receiver.try_take() {
            self.accept(snapshot, true);
        }

        if self.current.bypassed {
            output.copy_from(input);
        } else {
            self.filter.process(input, output);
            if self.filter.has_non_finite_state() {
                self.filter.reset();
                output.fill_silence();
                self.push_event(RenderEvent::FilterReset);
            } else {
                self.crush(output);
            }
        }

        self.shared.record_block();
    }

    /// Arithmetic crush, replaced by inference output when it meets its budget
    fn crush(&mut self, block: &mut AudioBlockMut<'_, '_>) {
        // An empty block has a zero budget; nothing to time
        if block.frames() == 0 {
            return;
        }
        let slot = match self.inference.as_mut() {
            Some(slot) if self.current.inference_enabled => slot,
            _ => {
                self.crusher.process_in_place(block);
                return;
            }
        };

        let elapsed = self.scratch.run(slot, self.clock.as_ref(), block);
        self.crusher.process_in_place(block);

        let budget_secs =
            block.frames() as f64 / self.format.sample_rate_hz() * self.inference_budget;
        if elapsed.as_secs_f64() <= budget_secs {
            self.scratch.write_to(block);
            if self.degraded {
                self.degraded = false;
                self.push_event(RenderEvent::InferenceRecovered {
                    after_misses: self.consecutive_misses,
                });
            }
            self.consecutive_misses = 0;
        } else {
            self.shared.record_deadline_miss();
            self.consecutive_misses += 1;
            if self.consecutive_misses == self.miss_warning_threshold {
                self.degraded = true;
                self.push_event(RenderEvent::InferenceDegraded {
                    consecutive_misses: self.consecutive_misses,
                });
            }
        }
    }

    /// Take `snapshot` if it is newer than the current one
    ///
    /// Coefficients computed for another sample rate are ignored; the crush
    /// spec and flags still apply.
    fn accept(&mut self, snapshot: ParameterSnapshot, ramp: bool) {
        if snapshot.sequence <= self.current.sequence {
            return;
        }
        if snapshot.matches_sample_rate(self.format.sample_rate_hz()) {
            if ramp {
                self.filter.set_cascade(snapshot.cascade());
            } else {
                self.filter.load_cascade(snapshot.cascade());
            }
        }
        self.crusher.set_spec(snapshot.crush);
        self.current = snapshot;
    }

    fn check_block(
        &self,
        input: &AudioBlock<'_>,
        output: &AudioBlockMut<'_, '_>,
    ) -> Result<(), FaultReason> {
        let expected = usize::from(self.format.channels);
        for actual in [input.channel_count(), output.channel_count()] {
            if actual != expected {
                return Err(FaultReason::ChannelMismatch { expected, actual });
            }
        }
        if input.frames() != output.frames() {
            return Err(FaultReason::FrameMismatch {
                input: input.frames(),
                output: output.frames(),
            });
        }
        let frames = input.frames();
        if frames > self.format.max_frames {
            return Err(FaultReason::BlockTooLarge {
                frames,
                max: self.format.max_frames,
            });
        }
        Ok(())
    }

    fn enter_fault(&mut self, reason: FaultReason) {
        self.transition(SchedulerState::Faulted);
        self.push_event(RenderEvent::Faulted(reason));
    }

    fn push_event(&mut self, event: RenderEvent) {
        // Dropped when the control side is not draining
        let _ = self.events.push(event);
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Scheduler state change");
        }
        self.state = next;
        self.shared.set_state(next);
    }

    fn invalid(&self, action: &'static str) -> EngineError {
        EngineError::InvalidStateTransition {
            from: self.state,
            action,
        }
    }
}
