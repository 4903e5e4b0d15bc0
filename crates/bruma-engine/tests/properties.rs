//! Property-based tests for the mode engines.
//!
//! Grain-rate clamping and hexagram line domains under randomized seeds
//! and parameter settings.

use bruma_engine::engines::memory::MemoryEngine;
use bruma_engine::engines::oracle::{cast_hexagram, cast_line};
use bruma_engine::{EngineConfig, ModeDetail, ModeEngine, ParamMap};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The grain rate stays in [3, 32] grains/s for any seed and any
    /// user density, audible input or not.
    #[test]
    fn grain_rate_stays_clamped(
        seed in 0u64..u64::MAX,
        density in 0.0f32..=1.0f32,
    ) {
        let mut engine = MemoryEngine::new(&EngineConfig::default(), 48000.0, seed);
        engine.set_params(&ParamMap::new().with("density", density));
        engine.start(0.0);

        let mut left = vec![0.0f32; 256];
        let mut right = vec![0.0f32; 256];
        let mut now = 0.0;
        for _ in 0..20 {
            engine.control_tick(now);
            left.fill(0.0);
            right.fill(0.0);
            engine.render(&mut left, &mut right, now);
            now += 256.0 / 48000.0;
        }

        match engine.diagnostics().detail {
            ModeDetail::Memory { target_rate, .. } => {
                prop_assert!(
                    (3.0..=32.0).contains(&target_rate),
                    "rate {} at density {}", target_rate, density,
                );
            }
            other => prop_assert!(false, "wrong detail: {:?}", other),
        }
    }

    /// Every hexagram line is one of 6, 7, 8, 9 regardless of seed.
    #[test]
    fn hexagram_lines_stay_in_domain(seed in 0u64..u64::MAX) {
        let mut rng = StdRng::seed_from_u64(seed);
        for line in cast_hexagram(&mut rng) {
            prop_assert!((6..=9).contains(&line), "line {}", line);
        }
        let line = cast_line(&mut rng);
        prop_assert!((6..=9).contains(&line));
    }
}
