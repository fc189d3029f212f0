//! Render path benchmarks
//!
//! Measures one full render callback and the parameter hand-off.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use grit_core::{
    engine, AudioBlock, AudioBlockMut, CrushSpec, EngineConfig, FilterSpec, FilterType,
    ParameterBridge, StreamFormat,
};

fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_scheduler");

    // Typical buffer sizes used in real-time audio
    for frames in [64, 128, 256, 512, 1024] {
        let format = StreamFormat {
            sample_rate: 48000,
            channels: 2,
            max_frames: frames,
        };
        let (mut controller, mut scheduler) = engine(EngineConfig {
            format,
            section_count: 4,
            ..EngineConfig::default()
        })
        .unwrap();
        scheduler.configure(format).unwrap();
        controller
            .set_filter(FilterSpec::new(FilterType::Peaking, 800.0, 1.0).with_gain_db(3.0))
            .unwrap();
        controller.set_crush(CrushSpec::new(8, 2, 0.7));
        scheduler.start().unwrap();

        let left: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.001).sin()).collect();
        let right: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.002).sin()).collect();
        let mut out_left = vec![0.0_f32; frames];
        let mut out_right = vec![0.0_f32; frames];

        group.throughput(Throughput::Elements(frames as u64 * 2));
        group.bench_function(format!("render_{}_frames", frames), |b| {
            b.iter(|| {
                let input: [&[f32]; 2] = [&left, &right];
                let mut output: [&mut [f32]; 2] = [&mut out_left, &mut out_right];
                scheduler.render(
                    black_box(&AudioBlock::new(&input)),
                    black_box(&mut AudioBlockMut::new(&mut output)),
                );
            })
        });
    }

    group.finish();
}

fn benchmark_bridge(c: &mut Criterion) {
    let (mut publisher, mut receiver) = ParameterBridge::new([0.0_f64; 48]).split();
    let mut value = 0.0;

    c.bench_function("bridge_publish_take", |b| {
        b.iter(|| {
            value += 1.0;
            publisher.publish(black_box([value; 48]));
            black_box(receiver.try_take());
        })
    });
}

criterion_group!(benches, benchmark_render, benchmark_bridge);
criterion_main!(benches);
