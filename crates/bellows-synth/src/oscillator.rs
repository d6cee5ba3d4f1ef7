//! Free-reed tone generator.
//!
//! A harmonium reed is a bright, buzzy source: a strong fundamental with a
//! slowly falling series of harmonics. [`ReedOscillator`] builds that tone
//! additively from a fixed harmonic table on a single phase accumulator,
//! skipping partials that would fold back above Nyquist.
//!
//! An optional second reed, detuned by a few cents, models the "musette"
//! coupler of a real harmonium where two reed banks beat against each other.

use core::f32::consts::TAU;

use bellows_core::cents_to_ratio;
use libm::sinf;

/// Relative amplitudes of harmonics 1..=8.
pub const REED_HARMONICS: [f32; 8] = [1.0, 0.62, 0.46, 0.31, 0.22, 0.14, 0.09, 0.05];

/// Wrap phase into [0, 1).
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase - libm::floorf(phase);
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Additive reed oscillator.
///
/// # Example
///
/// ```rust
/// use bellows_synth::ReedOscillator;
///
/// let mut osc = ReedOscillator::new(48000.0);
/// osc.set_frequency(261.63);
/// let sample = osc.advance();
/// assert!(sample.abs() <= 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct ReedOscillator {
    sample_rate: f32,
    frequency: f32,
    phase: f32,
    phase_inc: f32,
    /// Second reed phase, used when `musette_cents != 0`
    musette_phase: f32,
    musette_inc: f32,
    musette_cents: f32,
    /// Number of harmonics below Nyquist
    partials: usize,
    /// Gain that keeps the harmonic sum within ±1
    norm: f32,
}

impl ReedOscillator {
    /// Create an oscillator at 440 Hz with a single reed.
    pub fn new(sample_rate: f32) -> Self {
        let mut osc = Self {
            sample_rate,
            frequency: 440.0,
            phase: 0.0,
            phase_inc: 0.0,
            musette_phase: 0.0,
            musette_inc: 0.0,
            musette_cents: 0.0,
            partials: REED_HARMONICS.len(),
            norm: 1.0,
        };
        osc.recalculate();
        osc
    }

    /// Set the pitch in Hz.
    pub fn set_frequency(&mut self, freq: f32) {
        self.frequency = freq;
        self.recalculate();
    }

    /// Detune of the second reed in cents. Zero disables it.
    pub fn set_musette_cents(&mut self, cents: f32) {
        self.musette_cents = cents;
        self.recalculate();
    }

    /// Current pitch in Hz.
    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Number of harmonics being synthesized at the current pitch.
    #[inline]
    pub fn partials(&self) -> usize {
        self.partials
    }

    /// Restart both reeds at phase zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.musette_phase = 0.0;
    }

    /// Generate one sample and advance the phase.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let mut out = self.reed(self.phase);
        self.phase = wrap_phase(self.phase + self.phase_inc);

        if self.musette_cents != 0.0 {
            out = 0.5 * (out + self.reed(self.musette_phase));
            self.musette_phase = wrap_phase(self.musette_phase + self.musette_inc);
        }
        out
    }

    #[inline]
    fn reed(&self, phase: f32) -> f32 {
        let mut sum = 0.0;
        for (k, weight) in REED_HARMONICS.iter().take(self.partials).enumerate() {
            sum += weight * sinf(TAU * (k + 1) as f32 * phase);
        }
        sum * self.norm
    }

    fn recalculate(&mut self) {
        self.phase_inc = self.frequency / self.sample_rate;
        self.musette_inc = self.phase_inc * cents_to_ratio(self.musette_cents);

        let nyquist = self.sample_rate * 0.5;
        let top = self.frequency.max(self.frequency * cents_to_ratio(self.musette_cents));
        self.partials = REED_HARMONICS
            .iter()
            .enumerate()
            .take_while(|(k, _)| (*k + 1) as f32 * top < nyquist)
            .count()
            .max(1);
        let total: f32 = REED_HARMONICS.iter().take(self.partials).sum();
        self.norm = 1.0 / total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_bounded() {
        let mut osc = ReedOscillator::new(48000.0);
        osc.set_frequency(220.0);
        for _ in 0..4800 {
            let s = osc.advance();
            assert!(s.abs() <= 1.0 + 1e-5, "Sample out of range: {}", s);
        }
    }

    #[test]
    fn test_partials_stop_below_nyquist() {
        let mut osc = ReedOscillator::new(48000.0);
        osc.set_frequency(100.0);
        assert_eq!(osc.partials(), REED_HARMONICS.len());
        osc.set_frequency(5000.0);
        assert_eq!(osc.partials(), 4, "5 kHz * 5 = 25 kHz is past Nyquist");
        osc.set_frequency(30000.0);
        assert_eq!(osc.partials(), 1, "Always keep the fundamental");
    }

    #[test]
    fn test_periodic_at_pitch() {
        // 480 Hz at 48 kHz has a period of exactly 100 samples
        let mut osc = ReedOscillator::new(48000.0);
        osc.set_frequency(480.0);
        let first: Vec<f32> = (0..100).map(|_| osc.advance()).collect();
        let second: Vec<f32> = (0..100).map(|_| osc.advance()).collect();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-3, "Not periodic: {} vs {}", a, b);
        }
    }

    #[test]
    fn test_musette_changes_tone() {
        let mut single = ReedOscillator::new(48000.0);
        let mut double = ReedOscillator::new(48000.0);
        single.set_frequency(220.0);
        double.set_frequency(220.0);
        double.set_musette_cents(8.0);
        let diff: f32 = (0..4800)
            .map(|_| (single.advance() - double.advance()).abs())
            .sum();
        assert!(diff > 1.0, "Detuned second reed should beat against the first");
    }

    #[test]
    fn test_reset_restarts_phase() {
        let mut osc = ReedOscillator::new(48000.0);
        let a = osc.advance();
        osc.advance();
        osc.reset();
        assert_eq!(osc.advance(), a);
    }
}
