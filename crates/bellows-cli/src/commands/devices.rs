//! Audio device listing command.

use bellows_io::{default_output_device, list_devices};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all output devices
    List,

    /// Show the default output device
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = list_devices()?;
            if devices.is_empty() {
                println!("No audio output devices found.");
                return Ok(());
            }

            println!("Output Devices");
            println!("==============\n");
            for (idx, device) in devices.iter().enumerate() {
                let default = if device.is_default { " (default)" } else { "" };
                println!(
                    "  [{}] {} ({} ch, {} Hz){}",
                    idx, device.name, device.channels, device.default_sample_rate, default
                );
            }
            println!();
            println!("Tip: pass a partial name to play:");
            println!("  bellows play --device \"USB\"");
        }

        DevicesCommand::Info => match default_output_device()? {
            Some(device) => {
                println!("Default Output:");
                println!("  Name: {}", device.name);
                println!("  Channels: {}", device.channels);
                println!("  Sample Rate: {} Hz", device.default_sample_rate);
            }
            None => println!("Default Output: None"),
        },
    }

    Ok(())
}
