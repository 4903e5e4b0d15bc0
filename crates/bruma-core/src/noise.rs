//! White and pink noise sources.
//!
//! Noise carries a lot of weight in bruma: the master noise floor, every
//! engine's fallback bed, Environ's room excitation, and the Memory
//! engine's substitute writer when capture is denied. The generators are
//! seedable and deterministic (xorshift32 core) so engine behavior can be
//! reproduced exactly in tests, and stay dependency-free for `no_std`.

/// Uniform white noise in [-1, 1].
#[derive(Debug, Clone)]
pub struct WhiteNoise {
    state: u32,
}

impl WhiteNoise {
    /// Create from a seed. A zero seed is remapped — xorshift has a fixed
    /// point at zero.
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9e3779b9 } else { seed },
        }
    }

    /// Next sample in [-1, 1].
    #[inline]
    pub fn next(&mut self) -> f32 {
        // xorshift32 (Marsaglia)
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

/// Pink (1/f) noise via Paul Kellet's economy filter.
///
/// Three one-pole sections over a white source give a −3 dB/octave slope
/// accurate to ±0.5 dB across the audio band, which is all an ambience
/// bed needs.
#[derive(Debug, Clone)]
pub struct PinkNoise {
    white: WhiteNoise,
    b0: f32,
    b1: f32,
    b2: f32,
}

impl PinkNoise {
    /// Create from a seed.
    pub fn new(seed: u32) -> Self {
        Self {
            white: WhiteNoise::new(seed),
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
        }
    }

    /// Next sample, roughly in [-1, 1].
    #[inline]
    pub fn next(&mut self) -> f32 {
        let white = self.white.next();
        self.b0 = 0.99765 * self.b0 + white * 0.0990460;
        self.b1 = 0.96300 * self.b1 + white * 0.2965164;
        self.b2 = 0.57000 * self.b2 + white * 1.0526913;
        (self.b0 + self.b1 + self.b2 + white * 0.1848) * 0.25
    }
}
