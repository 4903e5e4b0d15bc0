//! Offline render command.

use clap::Args;
use std::path::PathBuf;

use bruma_engine::{Director, Mode};
use bruma_io::{BounceSpec, bounce_to_wav};

use super::common::{load_config, session_seed};

#[derive(Args)]
pub struct RenderArgs {
    /// Mode to render
    #[arg(short, long, default_value = "drone")]
    mode: Mode,

    /// Output WAV path
    #[arg(short, long)]
    out: PathBuf,

    /// Length of the render in seconds
    #[arg(short, long, default_value_t = 60.0)]
    duration: f64,

    /// Sample rate of the render
    #[arg(long, default_value_t = 48000)]
    sample_rate: u32,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the session's random schedules (reproducible renders)
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.duration > 0.0, "duration must be positive");
    let config = load_config(args.config.as_ref())?;

    let mut director = Director::new(
        config.director,
        config.engine,
        args.sample_rate as f32,
        session_seed(args.seed),
    );
    director.switch_to(args.mode);

    println!(
        "Rendering {:.1}s of '{}' at {} Hz to {}...",
        args.duration,
        args.mode,
        args.sample_rate,
        args.out.display()
    );

    let spec = BounceSpec {
        duration_secs: args.duration,
        block_frames: 256,
    };
    bounce_to_wav(&mut director, &spec, &args.out)?;

    let snapshot = director.snapshot();
    println!("Done (master {:.1} dBFS).", snapshot.master_level_db);
    Ok(())
}
