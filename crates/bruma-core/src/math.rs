//! Mathematical utilities for real-time DSP.
//!
//! Allocation-free, `no_std`-friendly helpers shared by every engine:
//! level conversions, interpolation, and denormal protection.

use libm::{expf, logf};

/// Convert decibels to linear gain.
///
/// 0 dB → 1.0, −6.02 dB → 0.5, −60 dB → 0.001.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Inputs at or below zero are clamped so the result stays finite; the
/// effective floor is −200 dB, well under the −120 dB numerical-silence
/// floor used by the director's watchdog.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Linear interpolation between `a` and `b` by `t` in [0, 1].
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Flush denormal numbers to zero.
///
/// Denormals (below ~1e-38) cause 10-100x slowdowns on x86. Filter
/// feedback paths decay into this range, so every recursive state update
/// passes through here.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_round_trip() {
        for db in [-60.0, -12.0, -6.0, 0.0, 6.0] {
            let back = linear_to_db(db_to_linear(db));
            assert!((back - db).abs() < 0.01, "round trip failed for {db}: {back}");
        }
    }

    #[test]
    fn linear_to_db_floors_silence() {
        assert!(linear_to_db(0.0) <= -120.0);
        assert!(linear_to_db(-1.0).is_finite());
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp(2.0, 6.0, 0.5), 4.0);
    }

    #[test]
    fn flush_denormal_zeroes_tiny_values() {
        assert_eq!(flush_denormal(1e-30), 0.0);
        assert_eq!(flush_denormal(-1e-30), 0.0);
        assert_eq!(flush_denormal(0.5), 0.5);
    }
}
