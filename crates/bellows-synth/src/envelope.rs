//! Linear fade envelope for harmonium voices.
//!
//! A reed either speaks or it doesn't: there is no decay stage and no
//! velocity. The envelope ramps toward full level on key-down and toward
//! silence on key-up, always at the same constant rate, so a key released
//! halfway through its attack fades out from wherever it got to.

use bellows_core::SlewLimiter;

/// Lifecycle stage of a voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VoiceState {
    /// Silent and available for allocation.
    #[default]
    Idle,
    /// Fading in toward full level.
    Attacking,
    /// Holding full level while the key is down.
    Sustaining,
    /// Fading out toward silence after key-up.
    Releasing,
}

impl VoiceState {
    /// Whether the voice is producing (or fading) sound.
    #[inline]
    pub fn is_active(self) -> bool {
        self != Self::Idle
    }
}

/// Constant-rate attack/release envelope.
///
/// # Example
///
/// ```rust
/// use bellows_synth::{FadeEnvelope, VoiceState};
///
/// // 20 ms fades at 48 kHz
/// let mut env = FadeEnvelope::new(48000.0, 20.0);
/// env.gate_on();
/// for _ in 0..960 {
///     env.advance();
/// }
/// assert_eq!(env.state(), VoiceState::Sustaining);
///
/// env.gate_off();
/// for _ in 0..960 {
///     env.advance();
/// }
/// assert_eq!(env.state(), VoiceState::Idle);
/// ```
#[derive(Debug, Clone)]
pub struct FadeEnvelope {
    state: VoiceState,
    level: SlewLimiter,
}

impl FadeEnvelope {
    /// Create an idle envelope whose full-scale fade takes `fade_time_ms`.
    pub fn new(sample_rate: f32, fade_time_ms: f32) -> Self {
        Self {
            state: VoiceState::Idle,
            level: SlewLimiter::from_time(0.0, 1.0, fade_time_ms, sample_rate),
        }
    }

    /// Start a fresh attack from silence.
    pub fn trigger(&mut self) {
        self.level.set_immediate(0.0);
        self.gate_on();
    }

    /// Fade toward full level from the current level.
    ///
    /// A releasing envelope resumes its attack without a jump.
    pub fn gate_on(&mut self) {
        self.level.set_target(1.0);
        self.state = VoiceState::Attacking;
    }

    /// Fade toward silence from the current level.
    pub fn gate_off(&mut self) {
        if self.state == VoiceState::Idle {
            return;
        }
        self.level.set_target(0.0);
        self.state = VoiceState::Releasing;
    }

    /// Drop to silence immediately.
    pub fn kill(&mut self) {
        self.level.set_immediate(0.0);
        self.state = VoiceState::Idle;
    }

    /// Advance one sample and return the level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.state {
            VoiceState::Idle => 0.0,
            VoiceState::Sustaining => self.level.get(),
            VoiceState::Attacking => {
                let level = self.level.advance();
                if self.level.is_settled() {
                    self.state = VoiceState::Sustaining;
                }
                level
            }
            VoiceState::Releasing => {
                let level = self.level.advance();
                if self.level.is_settled() {
                    self.state = VoiceState::Idle;
                }
                level
            }
        }
    }

    /// Current stage.
    #[inline]
    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Current level in `[0, 1]`.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level.get()
    }

    /// Level the envelope is moving toward.
    #[inline]
    pub fn target(&self) -> f32 {
        self.level.target()
    }

    /// Fade rate in level units per second.
    #[inline]
    pub fn rate(&self) -> f32 {
        self.level.rate()
    }
}
