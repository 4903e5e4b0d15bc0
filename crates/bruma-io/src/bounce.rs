//! Offline rendering to WAV.
//!
//! The bounce drives the director exactly like the live callback does,
//! block by block, so a rendered file reproduces what the speakers
//! would have played (given the same seed and no live capture).

use crate::Result;
use bruma_engine::Director;
use hound::{SampleFormat, WavWriter};
use std::path::Path;
use tracing::info;

/// Parameters for an offline render.
#[derive(Debug, Clone)]
pub struct BounceSpec {
    /// Length of the render in seconds.
    pub duration_secs: f64,
    /// Render block size in frames.
    pub block_frames: usize,
}

impl Default for BounceSpec {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            block_frames: 256,
        }
    }
}

/// Render the director offline into a 32-bit float stereo WAV file.
///
/// The director should already have a mode switched in; the bounce only
/// advances time.
pub fn bounce_to_wav<P: AsRef<Path>>(
    director: &mut Director,
    spec: &BounceSpec,
    path: P,
) -> Result<()> {
    let sample_rate = director.sample_rate();
    let wav_spec = hound::WavSpec {
        channels: 2,
        sample_rate: sample_rate as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path.as_ref(), wav_spec)?;

    let block = spec.block_frames.max(16);
    let total_frames = (spec.duration_secs * f64::from(sample_rate)) as u64;
    let mut left = vec![0.0f32; block];
    let mut right = vec![0.0f32; block];

    let mut rendered: u64 = 0;
    while rendered < total_frames {
        let frames = block.min((total_frames - rendered) as usize);
        director.process_block(&mut left[..frames], &mut right[..frames]);
        for i in 0..frames {
            writer.write_sample(left[i])?;
            writer.write_sample(right[i])?;
        }
        rendered += frames as u64;
    }

    writer.finalize()?;
    info!(
        path = %path.as_ref().display(),
        frames = total_frames,
        "bounce complete"
    );
    Ok(())
}
