//! State shared between the render thread and everyone else
//!
//! All fields are atomics; floats are stored as their bit patterns since
//! there is no `AtomicF64`.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::scheduler::SchedulerState;

#[derive(Debug)]
pub struct SharedState {
    state: AtomicU8,
    /// Configured sample rate (f64 bits, 0.0 until configured)
    sample_rate_bits: AtomicU64,
    deadline_missed: AtomicU64,
    blocks_rendered: AtomicU64,
    stop_requested: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SchedulerState::Uninitialized as u8),
            sample_rate_bits: AtomicU64::new(0.0_f64.to_bits()),
            deadline_missed: AtomicU64::new(0),
            blocks_rendered: AtomicU64::new(0),
            stop_requested: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Configured sample rate, 0.0 before the first `configure`
    pub fn sample_rate(&self) -> f64 {
        f64::from_bits(self.sample_rate_bits.load(Ordering::Acquire))
    }

    pub(crate) fn set_sample_rate(&self, sample_rate_hz: f64) {
        self.sample_rate_bits
            .store(sample_rate_hz.to_bits(), Ordering::Release);
    }

    /// Blocks where inference overran its budget
    pub fn deadline_missed(&self) -> u64 {
        self.deadline_missed.load(Ordering::Relaxed)
    }

    pub(crate) fn record_deadline_miss(&self) {
        self.deadline_missed.fetch_add(1, Ordering::Relaxed);
    }

    /// Render callbacks that produced processed (non-silent) output
    pub fn blocks_rendered(&self) -> u64 {
        self.blocks_rendered.load(Ordering::Relaxed)
    }

    pub(crate) fn record_block(&self) {
        self.blocks_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Consume a pending stop request
    pub(crate) fn take_stop_request(&self) -> bool {
        self.stop_requested.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn clear_stop_request(&self) {
        self.stop_requested.store(false, Ordering::Release);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Asks a running scheduler to stop at its next render callback
///
/// Cloneable and usable from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shared: Arc<SharedState>,
}

impl StopHandle {
    pub(crate) fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    pub fn request_stop(&self) {
        self.shared.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let shared = SharedState::new();
        assert_eq!(shared.state(), SchedulerState::Uninitialized);
        assert_eq!(shared.sample_rate(), 0.0);
        assert_eq!(shared.deadline_missed(), 0);
        assert_eq!(shared.blocks_rendered(), 0);
    }

    #[test]
    fn test_sample_rate_round_trips_bits() {
        let shared = SharedState::new();
        shared.set_sample_rate(44100.0);
        assert_eq!(shared.sample_rate(), 44100.0);
    }

    #[test]
    fn test_stop_request_is_consumed_once() {
        let shared = Arc::new(SharedState::new());
        let handle = StopHandle::new(Arc::clone(&shared));
        handle.clone().request_stop();
        assert!(shared.take_stop_request());
        assert!(!shared.take_stop_request());
    }
}
