//! Criterion benchmarks for bruma-core DSP primitives
//!
//! Run with: cargo bench -p bruma-core
#![allow(missing_docs)]

use bruma_core::{Biquad, Limiter, PinkNoise, RingBuffer, grain_window};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_grain_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("GrainPath");

    // The granular hot path: ring-buffer read + window evaluation per sample.
    let mut rb = RingBuffer::new((SAMPLE_RATE * 4.0) as usize);
    let mut pink = PinkNoise::new(1);
    for _ in 0..rb.capacity() {
        rb.push(pink.next());
    }

    let grain_len = (SAMPLE_RATE * 0.3) as usize;
    group.bench_function("windowed_read_grain", |b| {
        b.iter(|| {
            let mut acc = 0.0f32;
            for i in 0..grain_len {
                acc += rb.read_ago(black_box(grain_len - i)) * grain_window(i, grain_len);
            }
            black_box(acc)
        });
    });

    group.bench_function("ring_write_block", |b| {
        let input = generate_test_signal(1024);
        b.iter(|| {
            rb.extend(black_box(&input));
        });
    });

    group.finish();
}

fn bench_master_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("MasterChain");

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);
        group.bench_with_input(
            BenchmarkId::new("limiter_block", block_size),
            &block_size,
            |b, _| {
                let mut lim = Limiter::new(SAMPLE_RATE);
                let mut left = input.clone();
                let mut right = input.clone();
                b.iter(|| {
                    lim.process_block(black_box(&mut left), black_box(&mut right));
                });
            },
        );
    }

    group.bench_function("resonator_sample", |b| {
        let mut bq = Biquad::bandpass(440.0, 8.0, SAMPLE_RATE);
        b.iter(|| black_box(bq.process(black_box(0.3))));
    });

    group.finish();
}

criterion_group!(benches, bench_grain_path, bench_master_chain);
criterion_main!(benches);
