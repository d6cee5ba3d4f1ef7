//! The polyphonic voicing engine.
//!
//! [`VoiceEngine`] owns the [`VoicePool`] and turns note commands plus a
//! master volume into a mono sample stream. Every operation on it is a
//! total function: bad input is ignored, a full pool steals, and nothing
//! allocates after construction.
//!
//! Master volume changes are de-zippered per frame at the fade rate, so a
//! control loop running at 60 Hz never puts a step into the output.
//!
//! Two entry points render audio:
//!
//! - [`VoiceEngine::render`] fills a caller buffer, for audio callbacks.
//! - [`VoiceEngine::tick`] renders however many frames `delta_time` seconds
//!   is worth into an [`OutputSink`], for fixed-cadence loops. Fractional
//!   frames carry over to the next tick.
//!
//! # Example
//!
//! ```rust
//! use bellows_synth::{BufferSink, EngineSettings, VoiceEngine};
//!
//! let mut engine = VoiceEngine::new(EngineSettings::default());
//! let mut sink = BufferSink::new();
//!
//! engine.note_on(60);
//! engine.note_on(64);
//! engine.tick(0.1, &mut sink);
//! assert_eq!(engine.active_voice_count(), 2);
//!
//! engine.note_off(60);
//! engine.note_off(64);
//! engine.tick(0.1, &mut sink);
//! assert_eq!(engine.active_voice_count(), 0);
//! ```

use bellows_core::{SlewLimiter, soft_clip};

use crate::envelope::VoiceState;
use crate::voice::{MAX_MIDI_NOTE, MidiNote, Voice, VoicePool};

/// Time for a full 0 → 1 (or 1 → 0) fade, in milliseconds.
///
/// 20 ms gives a fade rate of 50 amplitude units per second.
pub const DEFAULT_FADE_TIME_MS: f32 = 20.0;

/// Default number of simultaneous voices.
pub const DEFAULT_POLYPHONY: usize = 8;

/// Per-voice gain before the master volume, leaving headroom for chords.
pub const VOICE_GAIN: f32 = 0.3;

/// Frames rendered per block by [`VoiceEngine::tick`].
const TICK_BLOCK: usize = 512;

/// Longest interval a single [`VoiceEngine::tick`] renders, in seconds.
pub const MAX_TICK_SECONDS: f64 = 10.0;

/// Destination for rendered mono audio.
pub trait OutputSink {
    /// Accept a block of mono frames.
    fn write(&mut self, frames: &[f32]);
}

/// Collects rendered audio in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    samples: Vec<f32>,
}

impl BufferSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Take ownership of the collected samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Discard collected samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl OutputSink for BufferSink {
    fn write(&mut self, frames: &[f32]) {
        self.samples.extend_from_slice(frames);
    }
}

/// Discards audio. Useful for driving the engine's state machine alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&mut self, _frames: &[f32]) {}
}

/// Command surface shared by the engine and its cross-thread handle.
pub trait EngineControl {
    /// Start (or keep) a note sounding.
    fn note_on(&mut self, note: MidiNote);
    /// Begin the release fade of a note.
    fn note_off(&mut self, note: MidiNote);
    /// Set the master volume in `[0, 1]`.
    fn set_master_volume(&mut self, volume: f32);
}

impl<T: EngineControl + ?Sized> EngineControl for &mut T {
    fn note_on(&mut self, note: MidiNote) {
        (**self).note_on(note);
    }

    fn note_off(&mut self, note: MidiNote) {
        (**self).note_off(note);
    }

    fn set_master_volume(&mut self, volume: f32) {
        (**self).set_master_volume(volume);
    }
}

/// Construction parameters for [`VoiceEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Output sample rate in Hz.
    pub sample_rate: f32,
    /// Number of voice slots.
    pub polyphony: usize,
    /// Full-scale fade time in milliseconds.
    pub fade_time_ms: f32,
    /// Detune of the second reed; zero for a single reed.
    pub musette_cents: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            polyphony: DEFAULT_POLYPHONY,
            fade_time_ms: DEFAULT_FADE_TIME_MS,
            musette_cents: 0.0,
        }
    }
}

/// Polyphonic harmonium engine.
#[derive(Debug, Clone)]
pub struct VoiceEngine {
    pool: VoicePool,
    /// Master gain, slewed per frame toward the requested volume
    master: SlewLimiter,
    sample_rate: f32,
    running: bool,
    /// Fractional frames owed to the next `tick`
    frame_remainder: f64,
    scratch: Vec<f32>,
}

impl VoiceEngine {
    /// Create a running engine with all voices idle and master volume 1.
    pub fn new(settings: EngineSettings) -> Self {
        let mut pool = VoicePool::new(
            settings.polyphony,
            settings.sample_rate,
            settings.fade_time_ms,
        );
        for voice in pool.voices_mut() {
            voice.set_musette_cents(settings.musette_cents);
        }
        Self {
            pool,
            master: SlewLimiter::from_time(
                1.0,
                1.0,
                settings.fade_time_ms,
                settings.sample_rate,
            ),
            sample_rate: settings.sample_rate,
            running: true,
            frame_remainder: 0.0,
            scratch: vec![0.0; TICK_BLOCK],
        }
    }

    /// Enable rendering.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Hard-mute: every voice goes idle at once and rendering stops.
    pub fn stop(&mut self) {
        self.running = false;
        self.pool.kill_all();
        self.master.set_immediate(self.master.target());
        self.frame_remainder = 0.0;
    }

    /// Whether the engine renders audio.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start sounding `note`.
    ///
    /// A note that is already attacking or sustaining is left alone. A note
    /// that is releasing fades back in on the same voice. Otherwise a voice
    /// is allocated, stealing one if the pool is full.
    pub fn note_on(&mut self, note: MidiNote) {
        if note > MAX_MIDI_NOTE {
            return;
        }
        if let Some(idx) = self.pool.find(note) {
            let voice = &mut self.pool.voices_mut()[idx];
            if voice.state() == VoiceState::Releasing {
                voice.resume();
            }
            return;
        }
        let idx = self.pool.allocate();
        let age = self.pool.next_age();
        self.pool.voices_mut()[idx].start(note, age);
    }

    /// Release `note`. No-op if it is not sounding or already releasing.
    pub fn note_off(&mut self, note: MidiNote) {
        if let Some(idx) = self.pool.find(note) {
            let voice = &mut self.pool.voices_mut()[idx];
            if voice.state() != VoiceState::Releasing {
                voice.release();
            }
        }
    }

    /// Set master volume, clamped to `[0, 1]`. Non-finite values are ignored.
    ///
    /// The output gain ramps to the new level at the fade rate. While no
    /// voice is audible the level applies at once.
    pub fn set_master_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        if self.is_silent() {
            self.master.set_immediate(volume);
        } else {
            self.master.set_target(volume);
        }
    }

    /// Requested master volume.
    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.master.target()
    }

    /// Gain currently applied to the mix, on its way to
    /// [`master_volume`](Self::master_volume).
    #[inline]
    pub fn master_gain(&self) -> f32 {
        self.master.get()
    }

    /// Largest change of [`master_gain`](Self::master_gain) per frame.
    pub fn max_gain_step(&self) -> f32 {
        self.master.rate() / self.sample_rate
    }

    fn is_silent(&self) -> bool {
        !self.running || self.pool.voices().iter().all(|v| v.amplitude() == 0.0)
    }

    /// Render `delta_time` seconds of audio into `sink`.
    ///
    /// Negative or non-finite intervals, and a stopped engine, render
    /// nothing. Intervals longer than [`MAX_TICK_SECONDS`] render that much.
    pub fn tick<S: OutputSink + ?Sized>(&mut self, delta_time: f64, sink: &mut S) {
        if !self.running || !delta_time.is_finite() || delta_time <= 0.0 {
            return;
        }
        let delta_time = delta_time.min(MAX_TICK_SECONDS);
        let exact = delta_time * f64::from(self.sample_rate) + self.frame_remainder;
        let frames = exact.floor();
        self.frame_remainder = exact - frames;

        let mut remaining = frames as usize;
        let mut scratch = core::mem::take(&mut self.scratch);
        while remaining > 0 {
            let n = remaining.min(scratch.len());
            self.render(&mut scratch[..n]);
            sink.write(&scratch[..n]);
            remaining -= n;
        }
        self.scratch = scratch;
    }

    /// Render exactly `out.len()` frames. A stopped engine writes silence.
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.running {
            out.fill(0.0);
            return;
        }
        for sample in out.iter_mut() {
            let mut mix = 0.0;
            for voice in self.pool.voices_mut() {
                mix += voice.process();
            }
            *sample = soft_clip(mix * VOICE_GAIN * self.master.advance());
        }
    }

    /// Number of voice slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Number of sounding or fading voices.
    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Number of idle voice slots.
    pub fn free_voice_count(&self) -> usize {
        self.pool.free_count()
    }

    /// The non-idle voice holding `note`, if any.
    pub fn voice_for(&self, note: MidiNote) -> Option<&Voice> {
        self.pool.find(note).map(|idx| &self.pool.voices()[idx])
    }

    /// All voice slots.
    pub fn voices(&self) -> &[Voice] {
        self.pool.voices()
    }

    /// Output sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl EngineControl for VoiceEngine {
    fn note_on(&mut self, note: MidiNote) {
        VoiceEngine::note_on(self, note);
    }

    fn note_off(&mut self, note: MidiNote) {
        VoiceEngine::note_off(self, note);
    }

    fn set_master_volume(&mut self, volume: f32) {
        VoiceEngine::set_master_volume(self, volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(polyphony: usize) -> VoiceEngine {
        VoiceEngine::new(EngineSettings {
            polyphony,
            ..EngineSettings::default()
        })
    }

    #[test]
    fn test_note_on_twice_single_voice() {
        let mut engine = engine(8);
        engine.note_on(60);
        engine.note_on(60);
        assert_eq!(engine.active_voice_count(), 1);
    }

    #[test]
    fn test_note_on_no_retrigger_while_held() {
        let mut engine = engine(8);
        engine.note_on(60);
        engine.tick(0.01, &mut NullSink);
        let before = engine.voice_for(60).map(Voice::amplitude);
        engine.note_on(60);
        let after = engine.voice_for(60).map(Voice::amplitude);
        assert_eq!(before, after, "Held note must not restart its fade");
    }

    #[test]
    fn test_note_on_during_release_resumes_same_voice() {
        let mut engine = engine(8);
        engine.note_on(60);
        engine.tick(0.05, &mut NullSink);
        engine.note_off(60);
        engine.tick(0.005, &mut NullSink);
        let level = engine.voice_for(60).map(Voice::amplitude).unwrap_or(0.0);
        assert!(level > 0.0);

        engine.note_on(60);
        assert_eq!(engine.active_voice_count(), 1);
        let voice = engine.voice_for(60).expect("voice should still hold 60");
        assert_eq!(voice.state(), VoiceState::Attacking);
        assert_eq!(voice.amplitude(), level, "Resume must not reset amplitude");
    }

    #[test]
    fn test_release_frees_voice() {
        let mut engine = engine(4);
        engine.note_on(60);
        engine.tick(0.05, &mut NullSink);
        engine.note_off(60);
        assert_eq!(
            engine.voice_for(60).map(Voice::state),
            Some(VoiceState::Releasing)
        );
        engine.tick(0.05, &mut NullSink);
        assert_eq!(engine.active_voice_count(), 0);
        assert_eq!(engine.free_voice_count(), 4);
    }

    #[test]
    fn test_note_off_unknown_is_noop() {
        let mut engine = engine(4);
        engine.note_off(99);
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn test_out_of_range_note_ignored() {
        let mut engine = engine(4);
        engine.note_on(200);
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn test_saturation_steals() {
        let mut engine = engine(4);
        for note in [60, 62, 64, 65, 67] {
            engine.note_on(note);
        }
        assert_eq!(engine.active_voice_count(), 4);
        assert!(engine.voice_for(60).is_none(), "Oldest note is evicted");
        assert!(engine.voice_for(67).is_some());
    }

    #[test]
    fn test_master_volume_clamped() {
        let mut engine = engine(4);
        engine.set_master_volume(1.7);
        assert_eq!(engine.master_volume(), 1.0);
        engine.set_master_volume(-0.2);
        assert_eq!(engine.master_volume(), 0.0);
        engine.set_master_volume(f32::NAN);
        assert_eq!(engine.master_volume(), 0.0);
    }

    #[test]
    fn test_zero_volume_is_silent() {
        let mut engine = engine(4);
        engine.note_on(60);
        engine.note_on(67);
        engine.set_master_volume(0.0);
        let mut sink = BufferSink::new();
        engine.tick(0.1, &mut sink);
        assert!(!sink.samples().is_empty());
        assert!(sink.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_volume_change_ramps_per_frame() {
        let mut engine = engine(4);
        engine.note_on(60);
        engine.tick(800.0 / 48000.0, &mut NullSink);
        let mut steady = engine.clone();

        engine.set_master_volume(1.0 / 6.0);
        assert_eq!(engine.master_volume(), 1.0 / 6.0);
        assert_eq!(engine.master_gain(), 1.0, "Gain moves only while rendering");

        let max_step = engine.max_gain_step() + 1e-6;
        let mut gains = vec![engine.master_gain()];
        let mut out = [0.0f32; 1];
        let mut reference = [0.0f32; 1];
        for i in 0..64 {
            engine.render(&mut out);
            steady.render(&mut reference);
            gains.push(engine.master_gain());
            let bound = (i + 1) as f32 * max_step * VOICE_GAIN * 2.0 + 1e-4;
            assert!(
                (out[0] - reference[0]).abs() <= bound,
                "Frame {i}: {} vs {}",
                out[0],
                reference[0]
            );
        }
        for pair in gains.windows(2) {
            assert!((pair[1] - pair[0]).abs() <= max_step, "Gain step {:?}", pair);
        }

        // 20 ms fade at 48 kHz
        engine.tick(0.02, &mut NullSink);
        assert_eq!(engine.master_gain(), 1.0 / 6.0);
    }

    #[test]
    fn test_volume_applies_at_once_when_silent() {
        let mut engine = engine(4);
        engine.set_master_volume(0.3);
        assert_eq!(engine.master_gain(), 0.3);

        engine.note_on(60);
        engine.set_master_volume(0.7);
        assert_eq!(engine.master_gain(), 0.7, "New voice is still at zero");
    }

    #[test]
    fn test_tick_frame_count_carries_remainder() {
        let mut engine = engine(4);
        let mut sink = BufferSink::new();
        // 60 Hz at 48 kHz = 800 frames per tick; 44.1 kHz would be 735
        for _ in 0..60 {
            engine.tick(1.0 / 60.0, &mut sink);
        }
        let frames = sink.samples().len() as i64;
        assert!((frames - 48000).abs() <= 1, "Got {} frames", frames);
    }

    #[test]
    fn test_tick_caps_huge_delta() {
        let mut engine = engine(4);
        engine.note_on(60);
        let mut sink = BufferSink::new();
        engine.tick(1e30, &mut sink);
        let expected = (MAX_TICK_SECONDS * 48000.0) as usize;
        assert!(sink.samples().len().abs_diff(expected) <= 1);
    }

    #[test]
    fn test_tick_ignores_bad_delta() {
        let mut engine = engine(4);
        let mut sink = BufferSink::new();
        engine.tick(-1.0, &mut sink);
        engine.tick(f64::NAN, &mut sink);
        assert!(sink.samples().is_empty());
    }

    #[test]
    fn test_stop_hard_mutes() {
        let mut engine = engine(4);
        engine.note_on(60);
        engine.tick(0.05, &mut NullSink);
        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.active_voice_count(), 0);

        let mut out = [1.0; 64];
        engine.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        engine.start();
        engine.note_on(64);
        engine.render(&mut out);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_output_bounded() {
        let mut engine = engine(8);
        for note in [48, 52, 55, 60, 64, 67, 72, 76] {
            engine.note_on(note);
        }
        let mut sink = BufferSink::new();
        engine.tick(0.2, &mut sink);
        assert!(sink.samples().iter().all(|s| s.abs() < 1.0));
    }
}
