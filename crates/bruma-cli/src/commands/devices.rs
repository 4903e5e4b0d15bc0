//! Audio device listing command.

use clap::{Args, Subcommand};

use bruma_io::{default_devices, list_devices};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all available audio devices
    List,

    /// Show default device information
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = list_devices()?;
            if devices.is_empty() {
                println!("No audio devices found.");
                return Ok(());
            }

            println!("Available Audio Devices");
            println!("=======================\n");

            let inputs: Vec<_> = devices.iter().filter(|d| d.is_input).collect();
            if !inputs.is_empty() {
                println!("Input Devices:");
                for (idx, device) in inputs.iter().enumerate() {
                    let also = if device.is_output { " (also output)" } else { "" };
                    println!(
                        "  [{}] {} ({} Hz){}",
                        idx, device.name, device.default_sample_rate, also
                    );
                }
                println!();
            }

            let outputs: Vec<_> = devices.iter().filter(|d| d.is_output).collect();
            if !outputs.is_empty() {
                println!("Output Devices:");
                for (idx, device) in outputs.iter().enumerate() {
                    let also = if device.is_input { " (also input)" } else { "" };
                    println!(
                        "  [{}] {} ({} Hz){}",
                        idx, device.name, device.default_sample_rate, also
                    );
                }
                println!();
            }

            println!(
                "Total: {} input(s), {} output(s)",
                inputs.len(),
                outputs.len()
            );
            println!();
            println!("Tip: use a partial name with --output:");
            println!("  bruma play --mode drone --output \"USB\"");
        }
        DevicesCommand::Info => {
            let (input, output) = default_devices()?;
            match input {
                Some(device) => println!(
                    "Default input:  {} ({} Hz)",
                    device.name, device.default_sample_rate
                ),
                None => println!("Default input:  none (memory mode will fall back)"),
            }
            match output {
                Some(device) => println!(
                    "Default output: {} ({} Hz)",
                    device.name, device.default_sample_rate
                ),
                None => println!("Default output: none"),
            }
        }
    }
    Ok(())
}
