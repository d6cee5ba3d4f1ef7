//! Bellows CLI - play a laptop keyboard as a harmonium, pumped by the lid.

mod commands;
mod script;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bellows")]
#[command(author, version, about = "Lid-pumped laptop harmonium", long_about = None)]
struct Cli {
    /// Configuration file (default: the user config file, when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play live from the keyboard
    Play(commands::play::PlayArgs),

    /// Render a performance script to a WAV file
    Render(commands::render::RenderArgs),

    /// List scales and their key legends
    Scales(commands::scales::ScalesArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Show or write the effective configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log lines would tear the status line while playing.
    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Play(_), false) => "warn",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    let load_config = || commands::common::load_config(config_path);
    match cli.command {
        Commands::Play(args) => commands::play::run(args, &load_config()?),
        Commands::Render(args) => commands::render::run(args, &load_config()?),
        Commands::Scales(args) => commands::scales::run(args, &load_config()?),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Config(args) => commands::config::run(args, config_path),
    }
}
