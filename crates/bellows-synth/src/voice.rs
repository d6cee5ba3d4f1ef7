//! Voices and the fixed-capacity voice pool.
//!
//! A [`Voice`] is one reed plus its fade envelope. The [`VoicePool`] owns
//! every voice slot for the lifetime of the engine: slots are allocated once
//! at construction and recycled, never created or freed on the audio path.
//!
//! ## Stealing
//!
//! When every slot is busy, [`VoicePool::allocate`] takes a voice in this
//! order of preference:
//!
//! 1. the oldest [`VoiceState::Releasing`] voice (already fading out),
//! 2. the oldest [`VoiceState::Sustaining`] voice,
//! 3. the oldest [`VoiceState::Attacking`] voice.
//!
//! "Oldest" is by note-on order, tracked with a monotonic age counter.

use bellows_core::midi_to_freq;

use crate::envelope::{FadeEnvelope, VoiceState};
use crate::oscillator::ReedOscillator;

/// MIDI note number in `[0, 127]`.
pub type MidiNote = u8;

/// Highest valid MIDI note.
pub const MAX_MIDI_NOTE: MidiNote = 127;

/// A single harmonium voice.
#[derive(Debug, Clone)]
pub struct Voice {
    note: MidiNote,
    osc: ReedOscillator,
    envelope: FadeEnvelope,
    age: u64,
}

impl Voice {
    /// Create an idle voice.
    pub fn new(sample_rate: f32, fade_time_ms: f32) -> Self {
        Self {
            note: 0,
            osc: ReedOscillator::new(sample_rate),
            envelope: FadeEnvelope::new(sample_rate, fade_time_ms),
            age: 0,
        }
    }

    /// Begin sounding `note` from silence with a fresh oscillator phase.
    pub fn start(&mut self, note: MidiNote, age: u64) {
        self.note = note;
        self.age = age;
        self.osc.set_frequency(midi_to_freq(f32::from(note)));
        self.osc.reset();
        self.envelope.trigger();
    }

    /// Fade out from the current level.
    pub fn release(&mut self) {
        self.envelope.gate_off();
    }

    /// Fade back in from the current level (same note pressed during release).
    pub fn resume(&mut self) {
        self.envelope.gate_on();
    }

    /// Silence immediately and return to the idle state.
    pub fn kill(&mut self) {
        self.envelope.kill();
    }

    /// Set the detune of the second reed.
    pub fn set_musette_cents(&mut self, cents: f32) {
        self.osc.set_musette_cents(cents);
    }

    /// Lifecycle stage.
    #[inline]
    pub fn state(&self) -> VoiceState {
        self.envelope.state()
    }

    /// Whether the voice is sounding or fading.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.envelope.state().is_active()
    }

    /// Note this voice was last started with.
    #[inline]
    pub fn note(&self) -> MidiNote {
        self.note
    }

    /// Current amplitude in `[0, 1]`.
    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.envelope.level()
    }

    /// Amplitude the fade is moving toward.
    #[inline]
    pub fn target_amplitude(&self) -> f32 {
        self.envelope.target()
    }

    /// Note-on order stamp.
    #[inline]
    pub fn age(&self) -> u64 {
        self.age
    }

    /// Render one sample. Idle voices return silence without touching
    /// oscillator state.
    #[inline]
    pub fn process(&mut self) -> f32 {
        if !self.is_active() {
            return 0.0;
        }
        let amp = self.envelope.advance();
        self.osc.advance() * amp
    }
}

/// Fixed-capacity set of voice slots.
#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Box<[Voice]>,
    /// Global voice age counter
    age_counter: u64,
}

impl VoicePool {
    /// Allocate `capacity` idle voices. A capacity of zero is raised to one.
    pub fn new(capacity: usize, sample_rate: f32, fade_time_ms: f32) -> Self {
        let voices = (0..capacity.max(1))
            .map(|_| Voice::new(sample_rate, fade_time_ms))
            .collect();
        Self {
            voices,
            age_counter: 0,
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Number of sounding or fading voices.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Number of idle slots.
    pub fn free_count(&self) -> usize {
        self.capacity() - self.active_count()
    }

    /// Index of the non-idle voice holding `note`, if any.
    pub fn find(&self, note: MidiNote) -> Option<usize> {
        self.voices
            .iter()
            .position(|v| v.is_active() && v.note() == note)
    }

    /// Pick a slot for a new note: a free one, else a stolen one.
    pub fn allocate(&self) -> usize {
        if let Some(free) = self.voices.iter().position(|v| !v.is_active()) {
            return free;
        }

        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| (steal_rank(v.state()), v.age()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Stamp for the next note-on.
    pub fn next_age(&mut self) -> u64 {
        self.age_counter += 1;
        self.age_counter
    }

    /// Silence every voice immediately.
    pub fn kill_all(&mut self) {
        for voice in &mut self.voices {
            voice.kill();
        }
    }

    /// Read access to all voices.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Mutable access to all voices.
    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }
}

/// Lower ranks are stolen first.
fn steal_rank(state: VoiceState) -> u8 {
    match state {
        VoiceState::Idle => 0,
        VoiceState::Releasing => 1,
        VoiceState::Sustaining => 2,
        VoiceState::Attacking => 3,
    }
}
