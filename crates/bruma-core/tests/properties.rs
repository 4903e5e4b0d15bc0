//! Property-based tests for bruma-core DSP primitives.
//!
//! Ring-buffer invariants, smoothing convergence, filter stability, and
//! limiter ceiling guarantees under randomized input.

use bruma_core::{
    Biquad, LinearSmoothedParam, Limiter, PinkNoise, RingBuffer, SmoothedParam, bandpass_coefficients,
    db_to_linear, grain_window, lowpass_coefficients,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The ring buffer write pointer stays inside [0, capacity) and the
    /// captured count is monotone, saturating at capacity, for any
    /// capacity and any write sequence.
    #[test]
    fn ring_buffer_invariants(
        capacity in 1usize..4096,
        writes in prop::collection::vec(-1.0f32..=1.0f32, 0..2048),
    ) {
        let mut rb = RingBuffer::new(capacity);
        let mut prev_captured = 0;
        for &s in &writes {
            rb.push(s);
            prop_assert!(rb.write_pos() < rb.capacity());
            prop_assert!(rb.captured() >= prev_captured);
            prop_assert!(rb.captured() <= rb.capacity());
            prev_captured = rb.captured();
        }
    }

    /// The most recent sample is always recoverable at age 0.
    #[test]
    fn ring_buffer_reads_back_latest(
        capacity in 2usize..512,
        writes in prop::collection::vec(-1.0f32..=1.0f32, 1..512),
    ) {
        let mut rb = RingBuffer::new(capacity);
        for &s in &writes {
            rb.push(s);
            prop_assert_eq!(rb.read_ago(0), s);
        }
    }

    /// Exponentially smoothed parameters converge to any target.
    #[test]
    fn smoothed_param_converges(
        initial in -10.0f32..10.0,
        target in -10.0f32..10.0,
    ) {
        let mut param = SmoothedParam::new(initial, 48000.0, 10.0);
        param.set_target(target);
        for _ in 0..20_000 {
            param.advance();
        }
        prop_assert!((param.get() - target).abs() < 1e-2);
    }

    /// Linear ramps land exactly on target after the configured duration.
    #[test]
    fn linear_param_lands_on_target(
        initial in -10.0f32..10.0,
        target in -10.0f32..10.0,
        time_ms in 1.0f32..500.0,
    ) {
        let mut param = LinearSmoothedParam::new(initial, 48000.0, time_ms);
        param.set_target(target);
        let samples = (time_ms / 1000.0 * 48000.0) as usize + 1;
        for _ in 0..samples {
            param.advance();
        }
        prop_assert!(param.is_settled());
        prop_assert_eq!(param.get(), target);
    }

    /// Lowpass and bandpass biquads stay finite for arbitrary valid
    /// tunings and bounded input.
    #[test]
    fn biquad_stability(
        freq in 20.0f32..20000.0,
        q in 0.5f32..12.0,
        bandpass in any::<bool>(),
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let sr = 48000.0;
        let mut bq = Biquad::new();
        let (b0, b1, b2, a0, a1, a2) = if bandpass {
            bandpass_coefficients(freq, q, sr)
        } else {
            lowpass_coefficients(freq, q, sr)
        };
        bq.set_coefficients(b0, b1, b2, a0, a1, a2);
        for &s in &input {
            prop_assert!(bq.process(s).is_finite());
        }
    }

    /// The limiter output never exceeds its ceiling, whatever the input.
    #[test]
    fn limiter_respects_ceiling(
        ceiling_db in -12.0f32..-0.1,
        input in prop::collection::vec(-2.0f32..=2.0, 256..1024),
    ) {
        let mut lim = Limiter::new(48000.0);
        lim.set_ceiling_db(ceiling_db);
        let ceiling = db_to_linear(ceiling_db);
        for &s in &input {
            let (l, r) = lim.process_stereo(s, -s);
            prop_assert!(l.abs() <= ceiling + 1e-5);
            prop_assert!(r.abs() <= ceiling + 1e-5);
        }
    }

    /// The grain window is bounded in [0, 1] everywhere.
    #[test]
    fn grain_window_bounded(
        length in 0usize..10_000,
        position in 0usize..12_000,
    ) {
        let w = grain_window(position, length);
        prop_assert!((0.0..=1.0).contains(&w));
    }

    /// Pink noise stays bounded over long runs for any seed.
    #[test]
    fn pink_noise_bounded(seed in any::<u32>()) {
        let mut pink = PinkNoise::new(seed);
        for _ in 0..10_000 {
            prop_assert!(pink.next().abs() < 1.5);
        }
    }
}
