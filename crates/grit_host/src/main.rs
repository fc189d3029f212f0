//! Grit simulated host
//!
//! Runs the engine end to end without an audio device: a paced render
//! thread plays the part of the driver callback while this thread acts as
//! the UI, sweeping the filter cutoff and draining render events.
//!
//! Usage: `grit [config.json] [--seconds N] [--inference]`

mod render_thread;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use grit_core::{
    engine, AudioBlock, AudioBlockMut, Controller, CrushSpec, EngineConfig, FilterSpec,
    FilterType, ModelHandle, RenderEvent,
};

/// How often the control thread touches the parameters
const CONTROL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct Options {
    config_path: Option<String>,
    seconds: f64,
    inference: bool,
}

impl Options {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            config_path: None,
            seconds: 2.0,
            inference: false,
        };
        let mut args = args.peekable();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--seconds" => {
                    let value = args.next().context("--seconds needs a value")?;
                    options.seconds = value
                        .parse()
                        .with_context(|| format!("Invalid duration: {value}"))?;
                }
                "--inference" => options.inference = true,
                flag if flag.starts_with("--") => bail!("Unknown option: {flag}"),
                path => options.config_path = Some(path.to_string()),
            }
        }
        Ok(options)
    }
}

#[derive(Debug, Serialize)]
struct RunSummary {
    blocks_rendered: u64,
    deadline_missed: u64,
    final_state: String,
    events: usize,
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read config {path}"))?;
    let config: EngineConfig =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config {path}"))?;
    Ok(config)
}

/// Stand-in for a neural crusher: a cubic waveshaper
fn waveshaper(input: &AudioBlock<'_>, output: &mut AudioBlockMut<'_, '_>, _model: ModelHandle) {
    for channel in 0..output.channel_count().min(input.channel_count()) {
        for (dst, src) in output.channel_mut(channel).iter_mut().zip(input.channel(channel)) {
            *dst = 1.5 * src - 0.5 * src * src * src;
        }
    }
}

/// Log and count everything the render thread reported
fn drain_events(controller: &mut Controller) -> usize {
    let mut count = 0;
    while let Some(event) = controller.poll_event() {
        count += 1;
        match event {
            RenderEvent::InferenceDegraded { consecutive_misses } => {
                warn!(consecutive_misses, "Inference degraded to arithmetic crusher")
            }
            RenderEvent::InferenceRecovered { after_misses } => {
                info!(after_misses, "Inference recovered")
            }
            RenderEvent::FilterReset => warn!("Filter state reset after numeric blow-up"),
            RenderEvent::Stopped => info!("Render thread acknowledged stop"),
            RenderEvent::Faulted(reason) => warn!(%reason, "Render scheduler faulted"),
        }
    }
    count
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grit_host=info,grit_core=info".into()),
        )
        .init();

    let options = Options::parse(std::env::args().skip(1))?;
    let config = load_config(options.config_path.as_deref())?;
    let format = config.format;
    info!(?format, sections = config.section_count, "Starting Grit host");

    let (mut controller, mut scheduler) = engine(config)?;
    scheduler.configure(format)?;
    if options.inference {
        scheduler.set_inference(Box::new(waveshaper), ModelHandle(1))?;
    }

    controller.set_filter(FilterSpec::new(FilterType::Lowpass, 400.0, 2.0))?;
    controller.set_crush(CrushSpec::new(6, 3, 0.8).with_saturation(1.0));
    controller.set_inference_enabled(options.inference);
    scheduler.start()?;

    let stop_handle = scheduler.stop_handle();
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    let render = render_thread::spawn(scheduler, format, stop_rx)
        .context("Failed to spawn render thread")?;

    // Exponential cutoff sweep 200 Hz → 8 kHz and back
    let steps =
        ((options.seconds * 1000.0) / CONTROL_INTERVAL.as_millis() as f64).max(1.0) as usize;
    let mut events = 0;
    for step in 0..steps {
        let position = step as f64 / steps as f64;
        let triangle = 1.0 - (2.0 * position - 1.0).abs();
        let cutoff = 200.0 * 40.0_f64.powf(triangle);
        controller.set_filter(FilterSpec::new(FilterType::Lowpass, cutoff, 2.0))?;

        events += drain_events(&mut controller);
        std::thread::sleep(CONTROL_INTERVAL);
    }

    stop_handle.request_stop();
    std::thread::sleep(CONTROL_INTERVAL);
    // Disconnecting the channel also ends the loop
    let _ = stop_tx.send(());
    let scheduler = render
        .join()
        .map_err(|_| anyhow::anyhow!("Render thread panicked"))?;
    events += drain_events(&mut controller);

    let response = controller.magnitude_response(8)?;
    info!(?response, "Final filter response (dB)");

    let summary = RunSummary {
        blocks_rendered: controller.blocks_rendered(),
        deadline_missed: controller.deadline_missed(),
        final_state: format!("{:?}", scheduler.state()),
        events,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
