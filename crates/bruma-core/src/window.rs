//! Raised-cosine grain window.
//!
//! Every grain the Memory engine plays is shaped by this window so grain
//! boundaries start and end at exactly zero — the difference between a
//! granular texture and a stream of clicks.

use core::f32::consts::PI;
use libm::cosf;

/// Evaluate the raised-cosine (Hann) window at `position` within a grain
/// of `length` samples. Returns 0.0 at both edges and 1.0 at the center;
/// positions outside the grain return 0.0.
#[inline]
pub fn grain_window(position: usize, length: usize) -> f32 {
    if length < 2 || position >= length {
        return 0.0;
    }
    let phase = position as f32 / (length - 1) as f32;
    0.5 * (1.0 - cosf(2.0 * PI * phase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_at_edges() {
        let len = 480;
        assert_eq!(grain_window(0, len), 0.0);
        assert!(grain_window(len - 1, len) < 1e-6);
    }

    #[test]
    fn unity_at_center() {
        let len = 481;
        assert!((grain_window(len / 2, len) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn symmetric() {
        let len = 100;
        for i in 0..len / 2 {
            let a = grain_window(i, len);
            let b = grain_window(len - 1 - i, len);
            assert!((a - b).abs() < 1e-5, "asymmetry at {i}: {a} vs {b}");
        }
    }

    #[test]
    fn out_of_range_is_zero() {
        assert_eq!(grain_window(200, 100), 0.0);
        assert_eq!(grain_window(0, 1), 0.0);
    }
}
