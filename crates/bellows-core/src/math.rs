//! Mathematical utility functions.
//!
//! # Pitch
//!
//! - [`midi_to_freq`] - Equal-tempered MIDI note to Hz (A4 = 440 Hz)
//! - [`cents_to_ratio`] - Detune amount to frequency ratio
//!
//! # Ranges
//!
//! - [`clamp`] / [`clamp01`] - Value limiting
//! - [`normalize`] - Map a value inside `[lo, hi]` onto `[0, 1]`
//!
//! # Output
//!
//! - [`soft_clip`] - Smooth saturation keeping the mix inside (-1, 1)

use libm::{powf, tanhf};

/// Convert a MIDI note number to frequency in Hz.
///
/// Standard tuning: A4 (MIDI note 69) = 440 Hz.
///
/// # Example
/// ```rust
/// use bellows_core::midi_to_freq;
///
/// assert!((midi_to_freq(60.0) - 261.63).abs() < 0.01);
/// ```
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * powf(2.0, (note - 69.0) / 12.0)
}

/// Convert a cents offset to a frequency ratio.
///
/// 100 cents = 1 semitone, 1200 cents = 1 octave.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    powf(2.0, cents / 1200.0)
}

/// Soft clip using hyperbolic tangent.
///
/// Transparent near zero, approaches ±1 asymptotically for dense chords.
///
/// # Returns
/// Soft-clipped output in range (-1, 1)
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Clamp value to range.
#[inline]
pub fn clamp(x: f32, min: f32, max: f32) -> f32 {
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

/// Clamp value to `[0, 1]`. NaN maps to 0.
#[inline]
pub fn clamp01(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { clamp(x, 0.0, 1.0) }
}

/// Map `x` from `[lo, hi]` onto `[0, 1]`, clamping outside the range.
///
/// A degenerate range (`hi <= lo`) acts as a step at `lo`.
///
/// # Example
/// ```rust
/// use bellows_core::normalize;
///
/// assert_eq!(normalize(60.0, 10.0, 110.0), 0.5);
/// assert_eq!(normalize(200.0, 10.0, 110.0), 1.0);
/// ```
#[inline]
pub fn normalize(x: f32, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        return if x >= lo { 1.0 } else { 0.0 };
    }
    clamp01((x - lo) / (hi - lo))
}
