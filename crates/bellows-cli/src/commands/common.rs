//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use bellows_config::{InstrumentConfig, NamingMode, ScaleMap, default_config_path};
use bellows_platform::{InputRouter, KeyLayout};
use bellows_synth::{EngineControl, EngineSettings};
use std::path::Path;

/// Load and validate the configuration.
///
/// An explicit path must exist. Without one, the user config file is used
/// when present and built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<InstrumentConfig> {
    let config = match explicit {
        Some(path) => InstrumentConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                tracing::debug!(path = %path.display(), "using user config");
                InstrumentConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?
            } else {
                InstrumentConfig::default()
            }
        }
    };
    config
        .validate(KeyLayout::harmonium().len())
        .context("invalid configuration")?;
    Ok(config)
}

/// Engine settings for `config` at the stream's actual sample rate.
pub fn engine_settings(config: &InstrumentConfig, sample_rate: u32) -> EngineSettings {
    EngineSettings {
        sample_rate: sample_rate as f32,
        polyphony: config.engine.polyphony,
        fade_time_ms: config.engine.fade_time_ms,
        musette_cents: config.engine.musette_cents,
    }
}

/// Router over the harmonium layout with the configured scale selected.
pub fn build_router<E: EngineControl>(
    config: &InstrumentConfig,
    engine: E,
) -> anyhow::Result<InputRouter<E>> {
    let layout = KeyLayout::harmonium();
    let scales = config.scale_map(layout.len())?;
    Ok(InputRouter::new(layout, scales, engine))
}

/// One-line key legend: `a:C4 s:D4 d:E4 ...`.
pub fn legend_line(scales: &ScaleMap, layout: &KeyLayout, mode: NamingMode) -> String {
    scales
        .legend(mode)
        .iter()
        .filter_map(|entry| {
            let key = layout.key_at(entry.position)?.to_char()?;
            Some(format!("{key}:{}", entry.label))
        })
        .collect::<Vec<_>>()
        .join(" ")
}
