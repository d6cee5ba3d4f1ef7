//! Criterion benchmarks for bellows-synth components
//!
//! Run with: cargo bench -p bellows-synth

use bellows_synth::{EngineSettings, ReedOscillator, VoiceEngine};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 512, 1024];

// ============================================================================
// Oscillator benchmarks
// ============================================================================

fn bench_reed(c: &mut Criterion) {
    let mut group = c.benchmark_group("ReedOscillator");

    for (name, musette) in [("Single", 0.0), ("Musette", 6.0)] {
        for &block_size in BLOCK_SIZES {
            let mut osc = ReedOscillator::new(SAMPLE_RATE);
            osc.set_frequency(220.0);
            osc.set_musette_cents(musette);

            group.bench_with_input(BenchmarkId::new(name, block_size), &block_size, |b, &size| {
                b.iter(|| {
                    let mut sum = 0.0f32;
                    for _ in 0..size {
                        sum += osc.advance();
                    }
                    black_box(sum)
                })
            });
        }
    }

    group.finish();
}

// ============================================================================
// Engine benchmarks
// ============================================================================

fn bench_engine_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("VoiceEngine");

    for voices in [1usize, 4, 8] {
        for &block_size in BLOCK_SIZES {
            let mut engine = VoiceEngine::new(EngineSettings {
                sample_rate: SAMPLE_RATE,
                ..EngineSettings::default()
            });
            for note in 0..voices {
                engine.note_on(48 + note as u8 * 3);
            }
            let mut buffer = vec![0.0f32; block_size];

            group.bench_with_input(
                BenchmarkId::new(format!("{}voices", voices), block_size),
                &block_size,
                |b, _| {
                    b.iter(|| {
                        engine.render(&mut buffer);
                        black_box(buffer[0])
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_note_churn(c: &mut Criterion) {
    c.bench_function("VoiceEngine/note_churn_stealing", |b| {
        let mut engine = VoiceEngine::new(EngineSettings::default());
        let mut note = 40u8;
        b.iter(|| {
            engine.note_on(black_box(note));
            engine.note_off(black_box(note.wrapping_sub(4)));
            note = if note >= 90 { 40 } else { note + 1 };
        })
    });
}

criterion_group!(benches, bench_reed, bench_engine_render, bench_note_churn);
criterion_main!(benches);
