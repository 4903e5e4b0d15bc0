//! Live playback command.

use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use bruma_engine::{Director, Mode};
use bruma_io::{OutputSession, SessionConfig};

use super::common::{load_config, session_seed};

#[derive(Args)]
pub struct PlayArgs {
    /// Mode to play (drone, environ, memory, generative, oracle, khs)
    #[arg(short, long, default_value = "drone")]
    mode: Mode,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device name (partial match); default device if omitted
    #[arg(short, long)]
    output: Option<String>,

    /// Stop after this many seconds; run until Ctrl+C if omitted
    #[arg(short, long)]
    duration: Option<f64>,

    /// Do not open a microphone stream (memory mode falls back)
    #[arg(long)]
    no_capture: bool,

    /// Seed for the session's random schedules (reproducible runs)
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_ref())?;

    let session_config = SessionConfig {
        output_device: args.output,
        enable_capture: !args.no_capture,
        duration_secs: args.duration,
    };
    let mut session = OutputSession::new(session_config)?;
    let sample_rate = session.sample_rate()?;

    let mut director = Director::new(
        config.director,
        config.engine,
        sample_rate as f32,
        session_seed(args.seed),
    );
    if let Some(factory) = session.capture_factory() {
        director.set_capture_factory(factory);
    }
    director.switch_to(args.mode);
    let director = Arc::new(Mutex::new(director));

    println!("Playing mode '{}' at {} Hz. Press Ctrl+C to stop.", args.mode, sample_rate);

    let running = session.stop_flag();
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        running.store(false, Ordering::SeqCst);
    })?;

    session.run(Arc::clone(&director))?;

    if let Ok(director) = director.lock() {
        let snapshot = director.snapshot();
        println!(
            "Session ended after {:.1}s (master {:.1} dBFS).",
            snapshot.clock_secs, snapshot.master_level_db
        );
    }
    Ok(())
}
