//! Offline render of a performance script to WAV.

use super::common::{build_router, engine_settings};
use crate::script::{Action, ScriptEvent, parse_script};
use anyhow::Context;
use bellows_config::InstrumentConfig;
use bellows_io::{WavSpec, write_wav};
use bellows_platform::{ControlLoop, InputRouter, InputSink, ManualSensor};
use bellows_synth::{BufferSink, VoiceEngine};
use clap::Args;
use std::path::PathBuf;

/// Longest performance `render` will produce, in milliseconds (one hour).
const MAX_RENDER_MS: u64 = 60 * 60 * 1000;

#[derive(Args)]
pub struct RenderArgs {
    /// Performance script (see `bellows render --help`)
    #[arg(short, long, value_name = "FILE")]
    script: PathBuf,

    /// Output WAV file
    #[arg(short, long, value_name = "FILE")]
    out: PathBuf,

    /// Time rendered after the last event, in milliseconds
    #[arg(long, default_value_t = 500)]
    tail_ms: u64,

    /// Lid angle before the first `angle` event, in degrees
    #[arg(long, default_value_t = 110.0)]
    angle: f64,

    /// Output bit depth (16, 24, or 32 for float)
    #[arg(long, default_value_t = 32, value_parser = parse_bits)]
    bits: u16,
}

fn parse_bits(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(bits @ (16 | 24 | 32)) => Ok(bits),
        _ => Err(format!("unsupported bit depth '{s}' (expected 16, 24 or 32)")),
    }
}

pub fn run(args: RenderArgs, config: &InstrumentConfig) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let events = parse_script(&text)?;
    tracing::info!(events = events.len(), "script loaded");

    let samples = render_events(&events, config, args.angle, args.tail_ms)?;

    let spec = WavSpec {
        channels: 1,
        sample_rate: config.engine.sample_rate,
        bits_per_sample: args.bits,
    };
    write_wav(&args.out, &samples, spec)?;

    let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    println!(
        "Rendered {:.2}s to {} (peak {:.1} dBFS)",
        samples.len() as f64 / f64::from(spec.sample_rate),
        args.out.display(),
        20.0 * peak.max(1e-10).log10()
    );
    Ok(())
}

/// Play `events` through a cooperatively ticked instrument.
///
/// The control loop and engine advance together at the sensor poll rate.
/// Events take effect on the first tick at or after their time.
pub fn render_events(
    events: &[ScriptEvent],
    config: &InstrumentConfig,
    initial_angle: f64,
    tail_ms: u64,
) -> anyhow::Result<Vec<f32>> {
    let poll_hz = f64::from(config.sensor.poll_hz);
    let dt = 1.0 / poll_hz;
    let engine = VoiceEngine::new(engine_settings(config, config.engine.sample_rate));
    let mut router = build_router(config, engine)?;
    let mut control = ControlLoop::from_config(ManualSensor::new(initial_angle), config);

    let end_ms = events
        .last()
        .map_or(0, |e| e.time_ms)
        .saturating_add(tail_ms);
    if end_ms > MAX_RENDER_MS {
        anyhow::bail!(
            "performance runs to {end_ms} ms, longer than the {MAX_RENDER_MS} ms limit"
        );
    }
    let ticks = (end_ms as f64 * poll_hz / 1000.0).floor() as u64 + 1;
    let mut sink = BufferSink::new();
    let mut pending = events.iter().peekable();

    for step in 0..ticks {
        let now = step as f64 * dt;
        let now_ms = now * 1000.0;
        while let Some(event) = pending.next_if(|e| e.time_ms as f64 <= now_ms + 1e-6) {
            apply(event, &mut router, &mut control)?;
        }
        control.tick(now, router.engine_mut());
        router.engine_mut().tick(dt, &mut sink);
    }

    router.engine_mut().stop();
    Ok(sink.into_samples())
}

fn apply(
    event: &ScriptEvent,
    router: &mut InputRouter<VoiceEngine>,
    control: &mut ControlLoop<ManualSensor>,
) -> anyhow::Result<()> {
    match &event.action {
        Action::KeyDown(key) => router.on_key_down(*key, false),
        Action::KeyUp(key) => router.on_key_up(*key),
        Action::Angle(degrees) => control.sampler_mut().sensor_mut().set_angle(*degrees),
        Action::Scale(name) => router
            .select_scale(name)
            .with_context(|| format!("script event at {} ms", event.time_ms))?,
        Action::AirPressure(enabled) => control.volume_mut().set_air_pressure_enabled(*enabled),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len().max(1) as f32).sqrt()
    }

    #[test]
    fn test_length_covers_script_and_tail() {
        let config = InstrumentConfig::default();
        let events = parse_script("0 down a\n1000 up a\n").unwrap();
        let samples = render_events(&events, &config, 110.0, 500).unwrap();
        // 91 ticks of 800 frames at 60 Hz / 48 kHz
        assert!(samples.len().abs_diff(91 * 800) <= 1, "{}", samples.len());
    }

    #[test]
    fn test_release_decays_to_silence() {
        let config = InstrumentConfig::default();
        let events = parse_script("0 down a\n0 down g\n500 up a\n500 up g\n").unwrap();
        let samples = render_events(&events, &config, 110.0, 500).unwrap();

        let held = &samples[4800..24000];
        assert!(rms(held) > 0.05, "held chord rms {}", rms(held));
        let tail = &samples[samples.len() - 4800..];
        assert!(tail.iter().all(|&s| s == 0.0), "tail should be silent");
    }

    #[test]
    fn test_closed_lid_is_silent() {
        let config = InstrumentConfig::default();
        let events = parse_script("0 down a\n500 up a\n").unwrap();
        let samples = render_events(&events, &config, 0.0, 0).unwrap();
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_pressure_off_plays_with_closed_lid() {
        let config = InstrumentConfig::default();
        let events = parse_script("0 pressure off\n0 down a\n500 up a\n").unwrap();
        let samples = render_events(&events, &config, 0.0, 0).unwrap();
        assert!(rms(&samples) > 0.01);
    }

    #[test]
    fn test_unknown_scale_fails() {
        let config = InstrumentConfig::default();
        let events = parse_script("100 scale Klingon\n").unwrap();
        let err = render_events(&events, &config, 110.0, 0).unwrap_err();
        assert!(format!("{err:#}").contains("100 ms"));
    }

    #[test]
    fn test_overlong_performance_rejected() {
        let config = InstrumentConfig::default();
        let events = parse_script(&format!("{} down a\n", u64::MAX)).unwrap();
        let err = render_events(&events, &config, 110.0, 500).unwrap_err();
        assert!(err.to_string().contains("limit"), "{err}");

        let events = parse_script("0 down a\n").unwrap();
        assert!(render_events(&events, &config, 110.0, u64::MAX).is_err());
    }

    #[test]
    fn test_parse_bits() {
        assert_eq!(parse_bits("24"), Ok(24));
        assert!(parse_bits("8").is_err());
        assert!(parse_bits("loud").is_err());
    }
}
