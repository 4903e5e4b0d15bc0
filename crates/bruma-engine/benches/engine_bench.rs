//! Criterion benchmarks for the mode engines and the director
//!
//! Run with: cargo bench -p bruma-engine
#![allow(missing_docs)]

use bruma_engine::engines::memory::MemoryEngine;
use bruma_engine::{Director, DirectorConfig, EngineConfig, Mode, ModeEngine, ParamMap};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK: usize = 256;

fn bench_memory_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("MemoryEngine");

    // Scheduler plus render at the densest setting the clamp allows.
    let mut engine = MemoryEngine::new(&EngineConfig::default(), SAMPLE_RATE, 1);
    engine.set_params(&ParamMap::new().with("density", 1.0));
    engine.start(0.0);

    let mut left = vec![0.0f32; BLOCK];
    let mut right = vec![0.0f32; BLOCK];
    let mut now = 0.0f64;
    // warm up so the ring is full and grains are flowing
    for _ in 0..400 {
        engine.control_tick(now);
        engine.render(&mut left, &mut right, now);
        now += BLOCK as f64 / f64::from(SAMPLE_RATE);
    }

    group.bench_function("control_tick_and_render_block", |b| {
        b.iter(|| {
            engine.control_tick(now);
            left.fill(0.0);
            right.fill(0.0);
            engine.render(&mut left, &mut right, now);
            now += BLOCK as f64 / f64::from(SAMPLE_RATE);
            black_box(left[0])
        });
    });

    group.finish();
}

fn bench_director(c: &mut Criterion) {
    let mut group = c.benchmark_group("Director");

    let mut director = Director::new(DirectorConfig::default(), EngineConfig::default(), SAMPLE_RATE, 1);
    director.switch_to(Mode::Khs);
    let mut left = vec![0.0f32; BLOCK];
    let mut right = vec![0.0f32; BLOCK];

    group.bench_function("process_block_steady_state", |b| {
        b.iter(|| {
            director.process_block(&mut left, &mut right);
            black_box(left[0])
        });
    });

    // worst case: a crossfade in flight on every measured block
    let mut switching = Director::new(DirectorConfig::default(), EngineConfig::default(), SAMPLE_RATE, 2);
    switching.switch_to(Mode::Drone);
    let mut flip = false;
    group.bench_function("process_block_during_crossfade", |b| {
        b.iter(|| {
            switching.switch_to(if flip { Mode::Drone } else { Mode::Generative });
            flip = !flip;
            switching.process_block(&mut left, &mut right);
            black_box(left[0])
        });
    });

    group.finish();
}

criterion_group!(benches, bench_memory_engine, bench_director);
criterion_main!(benches);
