//! Simulated audio device
//!
//! Paces render callbacks with a crossbeam ticker at the real block rate and
//! feeds the scheduler a synthetic test signal, the way a driver callback
//! would. All buffers are allocated before the loop starts.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver};

use grit_core::{AudioBlock, AudioBlockMut, RenderScheduler, StreamFormat, MAX_CHANNELS};

/// Detuned sawtooth per channel, rich enough to hear both stages
struct TestSignal {
    phases: [f32; MAX_CHANNELS],
    increments: [f32; MAX_CHANNELS],
}

impl TestSignal {
    fn new(sample_rate: u32) -> Self {
        let mut increments = [0.0; MAX_CHANNELS];
        for (channel, increment) in increments.iter_mut().enumerate() {
            let freq = 110.0 * (1.0 + channel as f32 * 0.01);
            *increment = freq / sample_rate as f32;
        }
        Self {
            phases: [0.0; MAX_CHANNELS],
            increments,
        }
    }

    fn fill(&mut self, channel: usize, buffer: &mut [f32]) {
        let increment = self.increments[channel];
        let phase = &mut self.phases[channel];
        for sample in buffer.iter_mut() {
            *sample = (*phase * 2.0 - 1.0) * 0.8;
            *phase = (*phase + increment).fract();
        }
    }
}

/// Spawn the render thread; it runs until `stop` fires or disconnects
///
/// Returns the scheduler so the host can inspect it after shutdown.
pub fn spawn(
    mut scheduler: RenderScheduler,
    format: StreamFormat,
    stop: Receiver<()>,
) -> std::io::Result<JoinHandle<RenderScheduler>> {
    thread::Builder::new()
        .name("grit-render".into())
        .spawn(move || {
            let channels = usize::from(format.channels);
            let frames = format.max_frames;
            let period = Duration::from_secs_f64(frames as f64 / format.sample_rate_hz());
            let ticker = tick(period);

            let mut signal = TestSignal::new(format.sample_rate);
            let mut inputs = vec![vec![0.0_f32; frames]; channels];
            let mut outputs = vec![vec![0.0_f32; frames]; channels];

            loop {
                select! {
                    recv(ticker) -> _ => {
                        for (channel, buffer) in inputs.iter_mut().enumerate() {
                            signal.fill(channel, buffer);
                        }

                        let empty: &[f32] = &[];
                        let mut input_views = [empty; MAX_CHANNELS];
                        for (view, buffer) in input_views.iter_mut().zip(&inputs) {
                            *view = buffer.as_slice();
                        }
                        let mut output_views: [&mut [f32]; MAX_CHANNELS] = Default::default();
                        for (view, buffer) in output_views.iter_mut().zip(outputs.iter_mut()) {
                            *view = buffer.as_mut_slice();
                        }

                        scheduler.render(
                            &AudioBlock::new(&input_views[..channels]),
                            &mut AudioBlockMut::new(&mut output_views[..channels]),
                        );
                    }
                    recv(stop) -> _ => break,
                }
            }

            scheduler
        })
}
