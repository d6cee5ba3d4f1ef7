//! Live performance: keys and lid in, audio out.

use super::common::{build_router, engine_settings, legend_line};
use bellows_config::InstrumentConfig;
use bellows_io::{AudioBackend, BackendStreamConfig, ChannelFanout, CpalBackend};
use bellows_platform::{
    AngleSensor, ControlLoop, ControlSnapshot, FileSensor, InputRouter, InputSink, KeyCode,
    ManualSensor, SensorError,
};
use bellows_synth::{DEFAULT_COMMAND_CAPACITY, EngineControl, VoiceEngine, realtime_engine};
use clap::Args;
use crossterm::event::{
    self, Event, KeyCode as TermKey, KeyEvent, KeyEventKind, KeyModifiers,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use std::io::{Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Degrees per arrow key press.
const NUDGE_DEGREES: f64 = 5.0;

#[derive(Args)]
pub struct PlayArgs {
    /// Output device (partial name match)
    #[arg(short, long)]
    device: Option<String>,

    /// Read the lid angle from this file instead of the arrow keys
    #[arg(long, value_name = "PATH")]
    sensor_file: Option<PathBuf>,

    /// Starting lid angle for the arrow-key sensor, in degrees
    #[arg(long, default_value_t = 90.0)]
    angle: f64,

    /// Output channel count
    #[arg(long, default_value_t = 2)]
    channels: u16,
}

/// Lid angle source chosen at startup.
#[derive(Debug)]
enum Lid {
    Simulated(ManualSensor),
    File(FileSensor),
}

impl Lid {
    fn nudge(&mut self, delta: f64) {
        if let Self::Simulated(sensor) = self {
            sensor.nudge(delta);
        }
    }
}

impl AngleSensor for Lid {
    fn read_angle_degrees(&mut self) -> Result<f64, SensorError> {
        match self {
            Self::Simulated(sensor) => sensor.read_angle_degrees(),
            Self::File(sensor) => sensor.read_angle_degrees(),
        }
    }
}

/// Raw terminal mode, restored on drop.
struct RawTerminal {
    reports_releases: bool,
}

impl RawTerminal {
    fn enter() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut guard = Self {
            reports_releases: false,
        };
        if matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            guard.reports_releases = true;
        }
        Ok(guard)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if self.reports_releases {
            let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
        println!();
    }
}

/// Synthesized key-up for terminals that only report presses.
///
/// Each press (or auto-repeat) holds the key open for `hold`; the key is
/// released once no press arrives within that time.
struct KeyGates {
    hold: Duration,
    open: Vec<(KeyCode, Instant)>,
}

impl KeyGates {
    fn new(hold: Duration) -> Self {
        Self {
            hold,
            open: Vec::new(),
        }
    }

    /// Returns `true` when the key was not already held.
    fn press(&mut self, key: KeyCode, now: Instant) -> bool {
        let deadline = now + self.hold;
        if let Some(gate) = self.open.iter_mut().find(|(k, _)| *k == key) {
            gate.1 = deadline;
            return false;
        }
        self.open.push((key, deadline));
        true
    }

    fn release(&mut self, key: KeyCode) {
        self.open.retain(|&(k, _)| k != key);
    }

    fn release_expired(&mut self, now: Instant, mut on_release: impl FnMut(KeyCode)) {
        self.open.retain(|&(key, deadline)| {
            if deadline <= now {
                on_release(key);
                false
            } else {
                true
            }
        });
    }
}

enum Flow {
    Continue,
    Quit,
}

pub fn run(args: PlayArgs, config: &InstrumentConfig) -> anyhow::Result<()> {
    let backend = CpalBackend::new();
    let stream_config = BackendStreamConfig {
        sample_rate: config.engine.sample_rate,
        buffer_size: config.engine.buffer_size,
        channels: args.channels,
        device_name: args.device.clone(),
    };
    let sample_rate = backend.actual_sample_rate(&stream_config);

    let engine = VoiceEngine::new(engine_settings(config, sample_rate));
    let (handle, mut realtime) = realtime_engine(engine, DEFAULT_COMMAND_CAPACITY);

    // Devices may deliver more frames than requested; fanout renders in passes.
    let max_frames = config.engine.buffer_size as usize;
    let mut fanout = ChannelFanout::new(
        move |mono: &mut [f32]| realtime.process(mono),
        args.channels,
        max_frames,
    );
    let stream = backend.build_output_stream(
        &stream_config,
        Box::new(move |data: &mut [f32]| fanout.process(data)),
        Box::new(|err: &str| tracing::error!(err, "audio stream error")),
    )?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut router = build_router(config, handle.clone())?;
    let lid = match &args.sensor_file {
        Some(path) => Lid::File(FileSensor::new(path)),
        None => Lid::Simulated(ManualSensor::new(args.angle)),
    };
    let mut control = ControlLoop::from_config(lid, config);
    let mut volume_handle = handle.clone();

    print_intro(&router, args.sensor_file.is_some());

    let term = RawTerminal::enter()?;
    let mut gates = (!term.reports_releases)
        .then(|| KeyGates::new(Duration::from_millis(config.keyboard.gate_ms)));

    let period = Duration::from_secs_f64(1.0 / f64::from(config.sensor.poll_hz));
    let start = Instant::now();
    let mut next_tick = start;

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= next_tick {
            if let Some(gates) = gates.as_mut() {
                gates.release_expired(now, |key| router.on_key_up(key));
            }
            let snapshot = control.tick(now.duration_since(start).as_secs_f64(), &mut volume_handle);
            draw_status(&router, &control, &snapshot)?;
            next_tick += period;
            if next_tick < now {
                next_tick = now + period;
            }
            continue;
        }

        if !event::poll(next_tick - now)? {
            continue;
        }
        if let Event::Key(key) = event::read()?
            && let Flow::Quit = handle_key(key, &mut router, &mut control, gates.as_mut(), now)
        {
            break;
        }
    }

    router.release_all();
    handle.stop();
    drop(stream);
    drop(term);

    tracing::info!(dropped = handle.dropped_commands(), "stopped");
    println!("Stopped.");
    Ok(())
}

fn handle_key<E: EngineControl>(
    event: KeyEvent,
    router: &mut InputRouter<E>,
    control: &mut ControlLoop<Lid>,
    gates: Option<&mut KeyGates>,
    now: Instant,
) -> Flow {
    let ctrl_c =
        event.code == TermKey::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL);
    if event.code == TermKey::Esc || ctrl_c {
        return Flow::Quit;
    }

    let pressed = matches!(event.kind, KeyEventKind::Press | KeyEventKind::Repeat);
    match event.code {
        TermKey::Up if pressed => control.sampler_mut().sensor_mut().nudge(NUDGE_DEGREES),
        TermKey::Down if pressed => control.sampler_mut().sensor_mut().nudge(-NUDGE_DEGREES),
        TermKey::Tab if event.kind == KeyEventKind::Press => {
            router.next_scale();
        }
        TermKey::Char('n') if event.kind == KeyEventKind::Press => {
            let mode = router.scale_map().naming_mode().toggled();
            router.set_naming_mode(mode);
        }
        TermKey::Char('b') if event.kind == KeyEventKind::Press => {
            let volume = control.volume_mut();
            let enabled = !volume.air_pressure_enabled();
            volume.set_air_pressure_enabled(enabled);
        }
        TermKey::Char(c) => {
            let Some(key) = KeyCode::from_char(c) else {
                return Flow::Continue;
            };
            match (event.kind, gates) {
                (KeyEventKind::Release, gates) => {
                    if let Some(gates) = gates {
                        gates.release(key);
                    }
                    router.on_key_up(key);
                }
                (kind, None) => router.on_key_down(key, kind == KeyEventKind::Repeat),
                (_, Some(gates)) => {
                    let fresh = gates.press(key, now);
                    router.on_key_down(key, !fresh);
                }
            }
        }
        _ => {}
    }
    Flow::Continue
}

fn print_intro<E: EngineControl>(router: &InputRouter<E>, file_sensor: bool) {
    let scales = router.scale_map();
    println!("bellows - {} scale", scales.active_name());
    println!(
        "  {}",
        legend_line(scales, router.layout(), scales.naming_mode())
    );
    println!();
    let lid = if file_sensor {
        "lid from sensor file"
    } else {
        "Up/Down: lid"
    };
    println!("  {lid} | Tab: scale | n: naming | b: air pressure | Esc: quit");
    println!();
}

fn draw_status<E: EngineControl>(
    router: &InputRouter<E>,
    control: &ControlLoop<Lid>,
    snapshot: &ControlSnapshot,
) -> std::io::Result<()> {
    let scales = router.scale_map();
    let mode = scales.naming_mode();
    let held: Vec<String> = router.held_notes().map(|n| scales.label(n, mode)).collect();
    let source = if control.volume().air_pressure_enabled() {
        "air"
    } else {
        "fixed"
    };
    let sensor = if snapshot.sensor_ok {
        ""
    } else {
        "  [sensor lost]"
    };

    let mut out = stdout();
    queue!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(format!(
            "{:<16} {:<7} lid {:>5.1}  {source} {:>3.0}%  vol {:>3.0}%{sensor}  {}",
            scales.active_name(),
            mode,
            snapshot.angle_degrees,
            snapshot.air_pressure * 100.0,
            snapshot.volume * 100.0,
            held.join(" ")
        ))
    )?;
    out.flush()
}
