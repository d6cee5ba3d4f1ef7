//! Bellows Core - realtime-safe primitives for the bellows harmonium
//!
//! Everything in this crate is allocation-free and safe to call from an
//! audio callback.
//!
//! # Parameter Smoothing
//!
//! - [`SlewLimiter`] - Constant-rate ramps. Drives note fades and the
//!   master volume so every level change is click-free.
//! - [`SmoothedParam`] - Exponential smoothing (RC-like response) with a
//!   per-sample and a variable-interval entry point, used to de-noise the
//!   lid angle sensor.
//!
//! # Utilities
//!
//! - Pitch: [`midi_to_freq`], [`cents_to_ratio`]
//! - Ranges: [`clamp`], [`clamp01`], [`normalize`]
//! - Output safety: [`soft_clip`]
//!
//! # Example
//!
//! ```rust
//! use bellows_core::{SlewLimiter, midi_to_freq};
//!
//! // A 20 ms full-scale fade at 48 kHz
//! let mut fade = SlewLimiter::new(0.0, 50.0, 48000.0);
//! fade.set_target(1.0);
//! for _ in 0..960 {
//!     fade.advance();
//! }
//! assert!(fade.is_settled());
//! assert!((midi_to_freq(69.0) - 440.0).abs() < 0.01);
//! ```

pub mod math;
pub mod param;

pub use math::{cents_to_ratio, clamp, clamp01, midi_to_freq, normalize, soft_clip};
pub use param::{SlewLimiter, SmoothedParam};
