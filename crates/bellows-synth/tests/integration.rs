//! Integration tests for bellows-synth.
//!
//! Drive the engine through whole note lifecycles the way the instrument
//! does: fixed-cadence ticks, overlapping chords, a saturated pool, and the
//! realtime split.

use bellows_synth::{
    BufferSink, EngineControl, EngineSettings, NullSink, VoiceEngine, VoiceState,
    realtime_engine,
};

const TICK: f64 = 1.0 / 60.0;

fn engine(polyphony: usize) -> VoiceEngine {
    VoiceEngine::new(EngineSettings {
        polyphony,
        ..EngineSettings::default()
    })
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn note_lifecycle_returns_voice_to_pool() {
    let mut engine = engine(8);
    engine.note_on(60);
    assert_eq!(engine.free_voice_count(), 7);

    for _ in 0..3 {
        engine.tick(TICK, &mut NullSink);
    }
    assert_eq!(
        engine.voice_for(60).map(|v| v.state()),
        Some(VoiceState::Sustaining)
    );

    engine.note_off(60);
    for _ in 0..3 {
        engine.tick(TICK, &mut NullSink);
    }
    assert_eq!(engine.active_voice_count(), 0);
    assert_eq!(engine.free_voice_count(), 8);
}

#[test]
fn attack_is_click_free() {
    let mut engine = engine(4);
    engine.note_on(57);
    let mut sink = BufferSink::new();
    engine.tick(0.002, &mut sink);
    // 2 ms into a 20 ms fade the level is ~0.1, so output stays small.
    let peak = sink.samples().iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak < 0.05, "Attack onset too loud: {}", peak);
}

#[test]
fn release_fades_to_silence() {
    let mut engine = engine(4);
    engine.note_on(60);
    engine.tick(0.1, &mut NullSink);
    engine.note_off(60);

    let mut sink = BufferSink::new();
    engine.tick(0.05, &mut sink);
    let samples = sink.samples();
    let head = rms(&samples[..240]);
    let tail = &samples[samples.len() - 240..];
    assert!(head > 0.0, "Release should start audible");
    assert!(tail.iter().all(|&s| s == 0.0), "Release should end silent");
}

// ---------------------------------------------------------------------------
// Chords and stealing
// ---------------------------------------------------------------------------

#[test]
fn chord_release_middle_note() {
    let mut engine = engine(8);
    for note in [60, 64, 67] {
        engine.note_on(note);
    }
    engine.tick(0.2, &mut NullSink);
    engine.note_off(64);
    engine.tick(TICK, &mut NullSink);

    assert_eq!(
        engine.voice_for(60).map(|v| v.state()),
        Some(VoiceState::Sustaining)
    );
    assert_eq!(
        engine.voice_for(67).map(|v| v.state()),
        Some(VoiceState::Sustaining)
    );
    let released = engine.voice_for(64).map(|v| v.state());
    assert!(
        matches!(released, None | Some(VoiceState::Releasing)),
        "64 should be releasing or idle, got {:?}",
        released
    );
}

#[test]
fn saturating_pool_keeps_capacity_active() {
    let mut engine = engine(8);
    for note in 60..69 {
        engine.note_on(note);
    }
    assert_eq!(engine.active_voice_count(), 8);
    assert!(engine.voice_for(60).is_none(), "Oldest note should be evicted");
    for note in 61..69 {
        assert!(engine.voice_for(note).is_some(), "Note {} missing", note);
    }
}

#[test]
fn stealing_prefers_releasing_voice() {
    let mut engine = engine(3);
    for note in [60, 64, 67] {
        engine.note_on(note);
    }
    engine.tick(0.1, &mut NullSink);
    engine.note_off(67);
    engine.note_on(72);

    assert!(engine.voice_for(60).is_some(), "Held notes survive");
    assert!(engine.voice_for(64).is_some(), "Held notes survive");
    assert!(engine.voice_for(67).is_none(), "Releasing voice was stolen");
    assert!(engine.voice_for(72).is_some());
}

#[test]
fn at_most_one_voice_per_note() {
    let mut engine = engine(8);
    for _ in 0..5 {
        engine.note_on(62);
        engine.tick(0.005, &mut NullSink);
        engine.note_off(62);
        engine.tick(0.005, &mut NullSink);
    }
    engine.note_on(62);
    let holders = engine
        .voices()
        .iter()
        .filter(|v| v.is_active() && v.note() == 62)
        .count();
    assert_eq!(holders, 1);
}

// ---------------------------------------------------------------------------
// Master volume
// ---------------------------------------------------------------------------

#[test]
fn zero_volume_silences_any_chord() {
    let mut engine = engine(8);
    for note in [48, 55, 60, 64, 67] {
        engine.note_on(note);
    }
    engine.tick(0.1, &mut NullSink);
    engine.set_master_volume(0.0);
    // Gain fades out over one fade time before the output is silent
    engine.tick(0.02, &mut NullSink);
    assert_eq!(engine.master_gain(), 0.0);
    let mut sink = BufferSink::new();
    for _ in 0..10 {
        engine.tick(TICK, &mut sink);
    }
    assert!(sink.samples().iter().all(|&s| s == 0.0));
}

#[test]
fn zero_volume_before_playing_is_silent_at_once() {
    let mut engine = engine(8);
    engine.set_master_volume(0.0);
    for note in [48, 55, 60, 64, 67] {
        engine.note_on(note);
    }
    let mut sink = BufferSink::new();
    engine.tick(TICK, &mut sink);
    assert!(sink.samples().iter().all(|&s| s == 0.0));
}

#[test]
fn volume_scales_output() {
    let mut loud = engine(4);
    let mut quiet = engine(4);
    quiet.set_master_volume(0.25);
    for e in [&mut loud, &mut quiet] {
        e.note_on(60);
        e.tick(0.1, &mut NullSink);
    }
    let mut a = BufferSink::new();
    let mut b = BufferSink::new();
    loud.tick(0.1, &mut a);
    quiet.tick(0.1, &mut b);
    assert!(rms(b.samples()) < rms(a.samples()) * 0.5);
}

// ---------------------------------------------------------------------------
// Realtime split
// ---------------------------------------------------------------------------

#[test]
fn realtime_matches_direct_engine() {
    let mut direct = engine(4);
    let (mut handle, mut rt) = realtime_engine(engine(4), 32);

    direct.note_on(60);
    direct.set_master_volume(0.5);
    handle.note_on(60);
    handle.set_master_volume(0.5);

    let mut a = [0.0f32; 512];
    let mut b = [0.0f32; 512];
    direct.render(&mut a);
    rt.process(&mut b);
    assert_eq!(a, b);
}
