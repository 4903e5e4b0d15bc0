//! Bruma CLI - drive the generative engine from the command line.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bruma")]
#[command(author, version, about = "Generative ambient sound engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a mode live through the default (or named) output device
    Play(commands::play::PlayArgs),

    /// Render a mode offline to a WAV file
    Render(commands::render::RenderArgs),

    /// List the available modes
    Modes,

    /// List audio devices
    Devices(commands::devices::DevicesArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Modes => commands::modes::run(),
        Commands::Devices(args) => commands::devices::run(args),
    }
}
