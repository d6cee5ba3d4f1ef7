//! Show or write the effective configuration.

use super::common::load_config;
use anyhow::Context;
use bellows_config::paths::CONFIG_FILE_NAME;
use bellows_config::{InstrumentConfig, ensure_user_config_dir};
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the configuration instead of printing it
    /// (default target: the user config file)
    #[arg(long, value_name = "PATH")]
    write: Option<Option<PathBuf>>,

    /// Start from built-in defaults instead of the current config
    #[arg(long)]
    defaults: bool,

    /// Overwrite an existing file
    #[arg(short, long)]
    force: bool,
}

pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = if args.defaults {
        InstrumentConfig::default()
    } else {
        load_config(config_path)?
    };

    let Some(target) = args.write else {
        print!("{}", config.to_toml()?);
        return Ok(());
    };

    let target = match target {
        Some(path) => path,
        None => ensure_user_config_dir()?.join(CONFIG_FILE_NAME),
    };
    if target.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
    }
    config
        .save(&target)
        .with_context(|| format!("writing {}", target.display()))?;
    tracing::info!(path = %target.display(), "config written");
    println!("Wrote {}", target.display());
    Ok(())
}
