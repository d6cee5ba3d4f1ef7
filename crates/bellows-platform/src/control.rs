//! One step of the sensor → volume control loop.

use bellows_config::InstrumentConfig;
use bellows_synth::EngineControl;

use crate::sensor::{AngleSensor, SensorSampler};
use crate::volume::VolumeController;

/// What one control tick observed and applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    /// Lid angle in degrees (last good reading).
    pub angle_degrees: f64,
    /// Derived air pressure.
    pub air_pressure: f32,
    /// Master volume sent to the engine.
    pub volume: f32,
    /// False while the sensor is failing.
    pub sensor_ok: bool,
}

/// Samples the lid and drives the engine's master volume.
///
/// Call [`tick`](Self::tick) at the configured poll rate from the control
/// thread. Works with any [`EngineControl`], so the same loop drives an
/// engine directly (offline) or through a realtime handle.
#[derive(Debug)]
pub struct ControlLoop<S> {
    sampler: SensorSampler<S>,
    volume: VolumeController,
    last_tick: Option<f64>,
}

impl<S: AngleSensor> ControlLoop<S> {
    /// Create a loop from its parts.
    pub fn new(sampler: SensorSampler<S>, volume: VolumeController) -> Self {
        Self {
            sampler,
            volume,
            last_tick: None,
        }
    }

    /// Create a loop configured from `config`.
    pub fn from_config(sensor: S, config: &InstrumentConfig) -> Self {
        Self::new(
            SensorSampler::new(sensor, &config.sensor),
            VolumeController::new(
                config.air_pressure_enabled,
                config.default_volume,
                config.engine.fade_time_ms,
            ),
        )
    }

    /// Sample the sensor at `now` (seconds) and push the resulting volume.
    pub fn tick<E: EngineControl + ?Sized>(&mut self, now: f64, engine: &mut E) -> ControlSnapshot {
        let dt = self
            .last_tick
            .map(|t| now - t)
            .filter(|dt| dt.is_finite() && *dt > 0.0)
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        let angle_degrees = self.sampler.sample(now);
        let air_pressure = self.sampler.air_pressure();
        let volume = self.volume.update(air_pressure, dt as f32);
        engine.set_master_volume(volume);

        ControlSnapshot {
            angle_degrees,
            air_pressure,
            volume,
            sensor_ok: self.sampler.consecutive_failures() == 0,
        }
    }

    /// The sensor sampler.
    pub fn sampler(&self) -> &SensorSampler<S> {
        &self.sampler
    }

    /// Mutable access to the sensor sampler.
    pub fn sampler_mut(&mut self) -> &mut SensorSampler<S> {
        &mut self.sampler
    }

    /// The volume controller.
    pub fn volume(&self) -> &VolumeController {
        &self.volume
    }

    /// Mutable access to the volume controller.
    pub fn volume_mut(&mut self) -> &mut VolumeController {
        &mut self.volume
    }
}
