//! Master volume selection and slew limiting.

use bellows_core::{SlewLimiter, clamp01};

/// Chooses between air pressure and a fixed volume, and limits how fast
/// the master volume may move.
///
/// The output never changes by more than `fade rate * dt` per update, so
/// flipping the air-pressure toggle, or a sudden jump in the sensor,
/// ramps instead of clicking.
///
/// # Example
///
/// ```rust
/// use bellows_platform::VolumeController;
///
/// // 20 ms full-scale fades
/// let mut volume = VolumeController::new(true, 0.8, 20.0);
/// let v = volume.update(1.0, 0.005);
/// assert!((v - 0.25).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct VolumeController {
    air_pressure_enabled: bool,
    default_volume: f32,
    slew: SlewLimiter,
}

impl VolumeController {
    /// Create a controller starting from silence.
    ///
    /// # Arguments
    /// * `air_pressure_enabled` - Follow the sensor (`true`) or `default_volume`
    /// * `default_volume` - Volume used when air pressure is off
    /// * `fade_time_ms` - Time for a full-scale volume change
    pub fn new(air_pressure_enabled: bool, default_volume: f32, fade_time_ms: f32) -> Self {
        Self {
            air_pressure_enabled,
            default_volume: clamp01(default_volume),
            // Only `advance_by` is used, so the sample rate is irrelevant.
            slew: SlewLimiter::from_time(0.0, 1.0, fade_time_ms, 1.0),
        }
    }

    /// Move toward the current target by at most one update's worth.
    ///
    /// `air_pressure` is ignored while the toggle is off.
    pub fn update(&mut self, air_pressure: f32, dt: f32) -> f32 {
        let target = if self.air_pressure_enabled {
            clamp01(air_pressure)
        } else {
            self.default_volume
        };
        self.slew.set_target(target);
        self.slew.advance_by(dt)
    }

    /// Switch between sensor-driven and fixed volume.
    pub fn set_air_pressure_enabled(&mut self, enabled: bool) {
        if enabled != self.air_pressure_enabled {
            tracing::info!(enabled, "air pressure toggled");
        }
        self.air_pressure_enabled = enabled;
    }

    /// Whether volume follows the sensor.
    #[inline]
    pub fn air_pressure_enabled(&self) -> bool {
        self.air_pressure_enabled
    }

    /// Latest output.
    #[inline]
    pub fn volume(&self) -> f32 {
        self.slew.get()
    }

    /// Largest change one update of length `dt` may make.
    #[inline]
    pub fn max_step(&self, dt: f32) -> f32 {
        self.slew.rate() * dt
    }
}
