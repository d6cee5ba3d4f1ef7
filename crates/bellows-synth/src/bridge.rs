//! Lock-free control ↔ audio thread communication.
//!
//! The audio thread owns the [`VoiceEngine`] inside a [`RealtimeEngine`].
//! Control threads talk to it through a cloneable [`EngineHandle`]:
//!
//! - note commands travel over a bounded `crossbeam-channel`; sends never
//!   block, and a full queue drops the command and counts it;
//! - master volume is a bit-cast f32 in an atomic;
//! - a shared running flag hard-mutes the engine once cleared.
//!
//! The audio side drains pending commands at the start of every buffer and
//! never takes a lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::engine::{EngineControl, VoiceEngine};
use crate::voice::MidiNote;

/// Default depth of the note command queue.
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// A command for the audio thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Start or resume a note.
    NoteOn(MidiNote),
    /// Release a note.
    NoteOff(MidiNote),
}

/// A thread-safe f32 in `[0, 1]` using bit-cast storage.
///
/// Control thread writes, audio thread reads. No locks, no allocations.
#[derive(Debug)]
pub struct AtomicVolume {
    value: AtomicU32,
}

impl AtomicVolume {
    /// Create with an initial value (clamped).
    pub fn new(initial: f32) -> Self {
        Self {
            value: AtomicU32::new(initial.clamp(0.0, 1.0).to_bits()),
        }
    }

    /// Store a new value. Non-finite values are ignored.
    #[inline]
    pub fn set(&self, v: f32) {
        if v.is_finite() {
            self.value
                .store(v.clamp(0.0, 1.0).to_bits(), Ordering::Release);
        }
    }

    /// Load the current value.
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }
}

#[derive(Debug)]
struct Shared {
    master_volume: AtomicVolume,
    running: AtomicBool,
    dropped: AtomicU64,
}

/// Control-thread side of the engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: Sender<EngineCommand>,
    shared: Arc<Shared>,
}

impl EngineHandle {
    /// Queue a command without blocking. Returns `false` if it was dropped.
    pub fn send(&self, command: EngineCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Hard-mute the engine. The audio thread silences all voices on its
    /// next buffer and outputs zeros from then on.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
    }

    /// Resume rendering after [`stop`](Self::stop).
    pub fn start(&self) {
        self.shared.running.store(true, Ordering::Release);
    }

    /// Whether the engine is rendering.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Master volume as last set from the control side.
    pub fn master_volume(&self) -> f32 {
        self.shared.master_volume.get()
    }

    /// Commands dropped because the queue was full or the engine was gone.
    pub fn dropped_commands(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl EngineControl for EngineHandle {
    fn note_on(&mut self, note: MidiNote) {
        self.send(EngineCommand::NoteOn(note));
    }

    fn note_off(&mut self, note: MidiNote) {
        self.send(EngineCommand::NoteOff(note));
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.shared.master_volume.set(volume);
    }
}

/// Audio-thread side of the engine.
#[derive(Debug)]
pub struct RealtimeEngine {
    engine: VoiceEngine,
    commands: Receiver<EngineCommand>,
    shared: Arc<Shared>,
}

impl RealtimeEngine {
    /// Render one output buffer.
    ///
    /// Applies queued commands and the latest master volume, then renders.
    /// Once the running flag is cleared the engine is hard-muted and the
    /// buffer is filled with silence.
    pub fn process(&mut self, out: &mut [f32]) {
        let running = self.shared.running.load(Ordering::Acquire);
        if running != self.engine.is_running() {
            if running {
                self.engine.start();
            } else {
                self.engine.stop();
            }
        }
        if !running {
            // Commands queued while stopped are stale.
            while self.commands.try_recv().is_ok() {}
            out.fill(0.0);
            return;
        }

        while let Ok(command) = self.commands.try_recv() {
            match command {
                EngineCommand::NoteOn(note) => self.engine.note_on(note),
                EngineCommand::NoteOff(note) => self.engine.note_off(note),
            }
        }
        self.engine
            .set_master_volume(self.shared.master_volume.get());
        self.engine.render(out);
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &VoiceEngine {
        &self.engine
    }
}

/// Split an engine into its control handle and audio-thread half.
///
/// # Example
///
/// ```rust
/// use bellows_synth::{EngineControl, EngineSettings, VoiceEngine, realtime_engine};
///
/// let (mut handle, mut rt) = realtime_engine(VoiceEngine::new(EngineSettings::default()), 64);
/// handle.note_on(60);
///
/// let mut buffer = [0.0f32; 256];
/// rt.process(&mut buffer);
/// assert_eq!(rt.engine().active_voice_count(), 1);
/// ```
pub fn realtime_engine(
    engine: VoiceEngine,
    command_capacity: usize,
) -> (EngineHandle, RealtimeEngine) {
    let (tx, rx) = bounded(command_capacity.max(1));
    let shared = Arc::new(Shared {
        master_volume: AtomicVolume::new(engine.master_volume()),
        running: AtomicBool::new(engine.is_running()),
        dropped: AtomicU64::new(0),
    });
    let handle = EngineHandle {
        commands: tx,
        shared: Arc::clone(&shared),
    };
    let realtime = RealtimeEngine {
        engine,
        commands: rx,
        shared,
    };
    (handle, realtime)
}
