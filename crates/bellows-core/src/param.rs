//! Parameter smoothing for click-free level changes.
//!
//! Two shapes of smoothing are provided:
//!
//! - **Linear ([`SlewLimiter`])**: constant rate of change expressed in
//!   units per second. A full 0 → 1 change always takes the same time, no
//!   matter where the previous change left off. Used for note fades and the
//!   master volume.
//! - **Exponential ([`SmoothedParam`])**: one-pole lowpass with a time
//!   constant. Used to de-noise control signals such as the lid angle.
//!
//! Both can be advanced one sample at a time (audio rate) or by an
//! arbitrary elapsed time (control rate).
//!
//! ## Usage
//!
//! ```rust
//! use bellows_core::SmoothedParam;
//!
//! let mut angle = SmoothedParam::with_config(0.0, 60.0, 50.0);
//! angle.set_target(90.0);
//! let first = angle.advance_by(1.0 / 60.0);
//! assert!(first > 0.0 && first < 90.0);
//! ```

use libm::expf;

/// A value that moves toward its target at a constant rate.
///
/// The rate is given in units per second and converted to a per-sample step
/// from the sample rate. Arrival is exact: the final step clamps onto the
/// target, so the value never overshoots.
#[derive(Debug, Clone)]
pub struct SlewLimiter {
    /// Current value
    current: f32,
    /// Target value
    target: f32,
    /// Maximum change per second
    rate_per_sec: f32,
    /// Maximum change per sample
    step: f32,
    /// Sample rate in Hz
    sample_rate: f32,
}

impl SlewLimiter {
    /// Create a slew limiter resting at `initial`.
    ///
    /// # Arguments
    /// * `initial` - Initial value (also the initial target)
    /// * `rate_per_sec` - Maximum change per second (must be > 0)
    /// * `sample_rate` - Sample rate in Hz, used by [`advance`](Self::advance)
    pub fn new(initial: f32, rate_per_sec: f32, sample_rate: f32) -> Self {
        let mut slew = Self {
            current: initial,
            target: initial,
            rate_per_sec,
            step: 0.0,
            sample_rate,
        };
        slew.recalculate_step();
        slew
    }

    /// Create a slew limiter whose rate covers `range` in `time_ms`.
    ///
    /// `from_time(0.0, 1.0, 20.0, 48000.0)` fades 0 → 1 in 20 ms.
    pub fn from_time(initial: f32, range: f32, time_ms: f32, sample_rate: f32) -> Self {
        let rate = if time_ms > 0.0 {
            range / (time_ms / 1000.0)
        } else {
            f32::INFINITY
        };
        Self::new(initial, rate, sample_rate)
    }

    /// Set the value to move toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set value and target immediately (no ramp).
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Change the rate in units per second.
    pub fn set_rate(&mut self, rate_per_sec: f32) {
        self.rate_per_sec = rate_per_sec;
        self.recalculate_step();
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_step();
    }

    /// Advance by one sample and return the new value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.move_by(self.step)
    }

    /// Advance by `elapsed_secs` of wall time and return the new value.
    ///
    /// Negative or non-finite intervals leave the value unchanged.
    #[inline]
    pub fn advance_by(&mut self, elapsed_secs: f32) -> f32 {
        if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return self.current;
        }
        self.move_by(self.rate_per_sec * elapsed_secs)
    }

    /// Get the current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Get the target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Rate in units per second.
    #[inline]
    pub fn rate(&self) -> f32 {
        self.rate_per_sec
    }

    /// Check if the value has arrived at its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    #[inline]
    fn move_by(&mut self, max_delta: f32) -> f32 {
        let diff = self.target - self.current;
        if diff.abs() <= max_delta {
            self.current = self.target;
        } else if diff > 0.0 {
            self.current += max_delta;
        } else {
            self.current -= max_delta;
        }
        self.current
    }

    fn recalculate_step(&mut self) {
        self.step = if self.sample_rate > 0.0 {
            self.rate_per_sec / self.sample_rate
        } else {
            f32::INFINITY
        };
    }
}

/// A parameter with exponential (one-pole) smoothing.
///
/// `advance` steps one sample at the configured sample rate;
/// `advance_by` steps an arbitrary interval, which suits control loops whose
/// tick period jitters.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    /// Current smoothed value
    current: f32,
    /// Target value we're smoothing towards
    target: f32,
    /// Per-sample smoothing coefficient (0 = frozen, 1 = instant)
    coeff: f32,
    /// Sample rate in Hz
    sample_rate: f32,
    /// Time constant in milliseconds
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Create a new smoothed parameter with no smoothing (instant changes).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 48000.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Create a smoothed parameter with full configuration.
    ///
    /// # Arguments
    /// * `initial` - Initial parameter value
    /// * `sample_rate` - Rate at which [`advance`](Self::advance) is called, in Hz
    /// * `smoothing_time_ms` - Time constant in milliseconds
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.coeff = param.coeff_for(1.0 / sample_rate);
        param
    }

    /// Set the target value.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set target and immediately snap to it.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Set the time constant in milliseconds.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms;
        self.coeff = self.coeff_for(1.0 / self.sample_rate);
    }

    /// Get the next smoothed value (advances by one sample).
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Advance by `elapsed_secs` of wall time.
    ///
    /// Non-positive or non-finite intervals leave the value unchanged.
    pub fn advance_by(&mut self, elapsed_secs: f32) -> f32 {
        if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return self.current;
        }
        let coeff = self.coeff_for(elapsed_secs);
        self.current += coeff * (self.target - self.current);
        self.current
    }

    /// Get the current smoothed value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Get the target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Check if the parameter has reached its target (within epsilon).
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// `coeff = 1 - exp(-dt / tau)`; an interval of one time constant covers
    /// ~63.2% of the distance to the target.
    fn coeff_for(&self, elapsed_secs: f32) -> f32 {
        if self.smoothing_time_ms <= 0.0 || !elapsed_secs.is_finite() {
            return 1.0;
        }
        let tau = self.smoothing_time_ms / 1000.0;
        1.0 - expf(-elapsed_secs / tau)
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slew_exact_time() {
        let mut slew = SlewLimiter::from_time(0.0, 1.0, 20.0, 48000.0);
        slew.set_target(1.0);
        // 20ms at 48kHz = 960 samples
        for _ in 0..950 {
            slew.advance();
        }
        assert!(!slew.is_settled(), "Should still be ramping before 20ms");
        for _ in 0..12 {
            slew.advance();
        }
        assert!(slew.is_settled(), "Should arrive at 20ms");
        assert_eq!(slew.get(), 1.0);
    }

    #[test]
    fn slew_constant_rate_from_midpoint() {
        let mut slew = SlewLimiter::new(0.5, 50.0, 48000.0);
        slew.set_target(0.0);
        // Half scale at 50/s takes 10ms
        for _ in 0..480 {
            slew.advance();
        }
        assert!(slew.get().abs() < 1e-4, "Got {}", slew.get());
    }

    #[test]
    fn slew_never_overshoots() {
        let mut slew = SlewLimiter::new(0.0, 1000.0, 100.0);
        slew.set_target(0.3);
        assert_eq!(slew.advance(), 0.3);
        assert_eq!(slew.advance(), 0.3);
    }

    #[test]
    fn slew_advance_by_limits_jump() {
        let mut slew = SlewLimiter::new(1.0, 50.0, 48000.0);
        slew.set_target(0.0);
        let value = slew.advance_by(1.0 / 60.0);
        let max_step = 50.0 / 60.0;
        assert!(
            (1.0 - value - max_step).abs() < 1e-5,
            "One control tick should move exactly rate*dt, moved {}",
            1.0 - value
        );
    }

    #[test]
    fn slew_ignores_bad_interval() {
        let mut slew = SlewLimiter::new(0.2, 50.0, 48000.0);
        slew.set_target(1.0);
        assert_eq!(slew.advance_by(-1.0), 0.2);
        assert_eq!(slew.advance_by(f32::NAN), 0.2);
    }

    #[test]
    fn smoothed_param_instant_when_no_smoothing() {
        let mut param = SmoothedParam::new(1.0);
        param.set_target(0.5);
        let val = param.advance();
        assert!((val - 0.5).abs() < 1e-6, "Should snap instantly");
    }

    #[test]
    fn smoothed_param_one_time_constant() {
        let mut param = SmoothedParam::with_config(0.0, 60.0, 100.0);
        param.set_target(1.0);
        let val = param.advance_by(0.1);
        let expected = 1.0 - expf(-1.0);
        assert!(
            (val - expected).abs() < 1e-4,
            "After one time constant, expected ~{}, got {}",
            expected,
            val
        );
    }

    #[test]
    fn smoothed_param_interval_independent() {
        // Two half steps land where one full step does.
        let mut a = SmoothedParam::with_config(0.0, 60.0, 40.0);
        let mut b = a.clone();
        a.set_target(90.0);
        b.set_target(90.0);
        a.advance_by(0.02);
        b.advance_by(0.01);
        b.advance_by(0.01);
        assert!((a.get() - b.get()).abs() < 1e-3);
    }
}
