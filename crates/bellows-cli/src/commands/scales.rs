//! Scale listing with key legends.

use super::common::legend_line;
use bellows_config::{InstrumentConfig, NamingMode};
use bellows_platform::KeyLayout;
use clap::Args;

#[derive(Args)]
pub struct ScalesArgs {
    /// Show a single scale
    #[arg(value_name = "NAME")]
    name: Option<String>,

    /// Legend labels: western or sargam (default: from config)
    #[arg(short, long)]
    naming: Option<NamingMode>,
}

pub fn run(args: ScalesArgs, config: &InstrumentConfig) -> anyhow::Result<()> {
    let layout = KeyLayout::harmonium();
    let mut scales = config.scale_map(layout.len())?;
    let naming = args.naming.unwrap_or(config.keyboard.naming);

    let names: Vec<String> = match args.name {
        Some(name) => vec![name],
        None => scales.scale_names().map(str::to_string).collect(),
    };

    println!(
        "Scales (base octave {}, {} labels)",
        scales.base_octave(),
        naming
    );
    println!("==========================================\n");

    for name in &names {
        scales.select_scale(name)?;
        let scale = scales.active_scale();
        let intervals: Vec<String> = scale.intervals.iter().map(u8::to_string).collect();
        let marker = if *name == config.keyboard.scale {
            " (default)"
        } else {
            ""
        };
        println!("{name}{marker}  [{}]", intervals.join(" "));
        println!("  {}", legend_line(&scales, &layout, naming));
        println!();
    }

    println!("Total: {} scale(s)", names.len());
    Ok(())
}
