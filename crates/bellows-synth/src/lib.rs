//! Bellows Synth - the harmonium voicing engine
//!
//! Turns note on/off commands and a master volume into a mono audio stream,
//! with click-free fades on every level change and bounded polyphony.
//!
//! # Core Components
//!
//! ## Tone
//!
//! - [`ReedOscillator`] - Additive free-reed tone with an optional detuned
//!   second reed
//! - [`FadeEnvelope`] / [`VoiceState`] - Constant-rate attack and release
//!
//! ## Voice Management
//!
//! - [`Voice`] - One reed plus its fade
//! - [`VoicePool`] - Fixed-capacity slots with oldest-first stealing
//! - [`VoiceEngine`] - Note lifecycle, mixing, master volume
//!
//! ```rust
//! use bellows_synth::{EngineSettings, VoiceEngine, VoiceState};
//!
//! let mut engine = VoiceEngine::new(EngineSettings::default());
//! engine.note_on(60);
//!
//! let mut buffer = [0.0f32; 1024];
//! engine.render(&mut buffer);
//! let voice = engine.voice_for(60).expect("note is sounding");
//! assert_eq!(voice.state(), VoiceState::Sustaining);
//! ```
//!
//! ## Threading
//!
//! - [`realtime_engine`] - Split an engine into an [`EngineHandle`] for
//!   control threads and a [`RealtimeEngine`] for the audio callback
//! - [`EngineControl`] - The command surface both halves share

pub mod bridge;
pub mod engine;
pub mod envelope;
pub mod oscillator;
pub mod voice;

pub use bridge::{
    AtomicVolume, DEFAULT_COMMAND_CAPACITY, EngineCommand, EngineHandle, RealtimeEngine,
    realtime_engine,
};
pub use engine::{
    BufferSink, DEFAULT_FADE_TIME_MS, DEFAULT_POLYPHONY, EngineControl, EngineSettings,
    MAX_TICK_SECONDS, NullSink, OutputSink, VOICE_GAIN, VoiceEngine,
};
pub use envelope::{FadeEnvelope, VoiceState};
pub use oscillator::{REED_HARMONICS, ReedOscillator};
pub use voice::{MAX_MIDI_NOTE, MidiNote, Voice, VoicePool};
