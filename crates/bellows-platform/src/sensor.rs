//! Lid angle sampling and the angle → air pressure mapping.
//!
//! [`SensorSampler`] polls an [`AngleSensor`] once per control tick. Each
//! good reading is clamped to the hinge's physical range, smoothed, and
//! turned into an air pressure in `[0, 1]` by the configured
//! [`PressureCurve`]. A failed reading never propagates: the sampler holds
//! the last good angle and pressure and logs the outage once.

use std::path::PathBuf;

use bellows_config::{PressureCurve, SensorConfig};
use bellows_core::{SmoothedParam, clamp01, normalize};
use thiserror::Error;

/// Smallest reportable lid angle in degrees (closed).
pub const MIN_ANGLE_DEGREES: f64 = 0.0;

/// Largest reportable lid angle in degrees (flat open).
pub const MAX_ANGLE_DEGREES: f64 = 180.0;

/// Errors from an angle sensor.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The sensor is not present or not responding
    #[error("sensor unavailable: {0}")]
    Unavailable(String),

    /// The sensor returned a value that is not an angle
    #[error("invalid sensor reading: {0}")]
    InvalidReading(f64),

    /// Failed to read a sensor file
    #[error("failed to read sensor file '{path}': {source}")]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A source of lid hinge angles.
pub trait AngleSensor {
    /// Read the current angle in degrees. Must not block for long.
    fn read_angle_degrees(&mut self) -> Result<f64, SensorError>;
}

impl<S: AngleSensor + ?Sized> AngleSensor for Box<S> {
    fn read_angle_degrees(&mut self) -> Result<f64, SensorError> {
        (**self).read_angle_degrees()
    }
}

/// Latest sampler output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorState {
    /// Last good reading, clamped to the physical range.
    pub last_angle_degrees: f64,
    /// Time of the last poll, in seconds on the caller's clock.
    pub last_sample_timestamp: Option<f64>,
    /// Derived pressure in `[0, 1]`.
    pub air_pressure: f32,
}

/// Polls an angle sensor and derives air pressure.
///
/// # Example
///
/// ```rust
/// use bellows_config::SensorConfig;
/// use bellows_platform::{ManualSensor, SensorSampler};
///
/// let mut sampler = SensorSampler::new(ManualSensor::new(60.0), &SensorConfig::default());
/// let angle = sampler.sample(0.0);
/// assert_eq!(angle, 60.0);
/// // Default curve: 10° → 0, 110° → 1
/// assert!((sampler.air_pressure() - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug)]
pub struct SensorSampler<S> {
    sensor: S,
    curve: PressureCurve,
    smoother: SmoothedParam,
    state: SensorState,
    /// Smoothed angle at the previous good reading, for the bellows curve
    previous_angle: Option<f32>,
    consecutive_failures: u32,
}

impl<S: AngleSensor> SensorSampler<S> {
    /// Create a sampler with the given curve and smoothing.
    pub fn new(sensor: S, config: &SensorConfig) -> Self {
        Self {
            sensor,
            curve: config.curve,
            smoother: SmoothedParam::with_config(0.0, config.poll_hz, config.smoothing_ms),
            state: SensorState::default(),
            previous_angle: None,
            consecutive_failures: 0,
        }
    }

    /// Poll once at time `now` (seconds) and return the clamped angle.
    ///
    /// On failure the previous angle and pressure are kept and returned.
    pub fn sample(&mut self, now: f64) -> f64 {
        let elapsed = self
            .state
            .last_sample_timestamp
            .map(|t| now - t)
            .filter(|dt| dt.is_finite() && *dt > 0.0)
            .unwrap_or(0.0) as f32;
        self.state.last_sample_timestamp = Some(now);

        let reading = self.sensor.read_angle_degrees().and_then(|angle| {
            if angle.is_finite() {
                Ok(angle)
            } else {
                Err(SensorError::InvalidReading(angle))
            }
        });

        match reading {
            Ok(angle) => {
                if self.consecutive_failures > 0 {
                    tracing::info!(
                        failed_polls = self.consecutive_failures,
                        "lid sensor recovered"
                    );
                    self.consecutive_failures = 0;
                }
                let clamped = angle.clamp(MIN_ANGLE_DEGREES, MAX_ANGLE_DEGREES);
                self.state.last_angle_degrees = clamped;
                self.update_pressure(clamped as f32, elapsed);
            }
            Err(error) => {
                if self.consecutive_failures == 0 {
                    tracing::warn!(%error, "lid sensor unavailable, holding last value");
                }
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            }
        }
        self.state.last_angle_degrees
    }

    fn update_pressure(&mut self, angle: f32, elapsed: f32) {
        let smoothed = match self.previous_angle {
            None => {
                self.smoother.set_immediate(angle);
                angle
            }
            Some(_) => {
                self.smoother.set_target(angle);
                self.smoother.advance_by(elapsed)
            }
        };

        self.state.air_pressure = match self.curve {
            PressureCurve::Angle {
                closed_degrees,
                open_degrees,
                exponent,
            } => {
                let opening = normalize(smoothed, closed_degrees, open_degrees);
                clamp01(libm::powf(opening, exponent))
            }
            PressureCurve::Bellows { gain, leak_per_sec } => {
                let travel = self.previous_angle.map_or(0.0, |prev| (smoothed - prev).abs());
                clamp01(self.state.air_pressure + gain * travel - leak_per_sec * elapsed)
            }
        };
        self.previous_angle = Some(smoothed);
    }

    /// Latest state.
    pub fn state(&self) -> &SensorState {
        &self.state
    }

    /// Latest air pressure in `[0, 1]`.
    #[inline]
    pub fn air_pressure(&self) -> f32 {
        self.state.air_pressure
    }

    /// Polls failed in a row; zero while the sensor is healthy.
    #[inline]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// The wrapped sensor.
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Mutable access to the wrapped sensor.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

/// A sensor whose angle is set by hand: keyboard nudges, scripted
/// performances, tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualSensor {
    angle: f64,
    failing: bool,
}

impl ManualSensor {
    /// Create a sensor reporting `angle` degrees.
    pub fn new(angle: f64) -> Self {
        Self {
            angle,
            failing: false,
        }
    }

    /// Set the reported angle.
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    /// Move the angle by `delta` degrees, staying inside the physical range.
    pub fn nudge(&mut self, delta: f64) -> f64 {
        self.angle = (self.angle + delta).clamp(MIN_ANGLE_DEGREES, MAX_ANGLE_DEGREES);
        self.angle
    }

    /// Current angle.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Make every read fail (or succeed again).
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl AngleSensor for ManualSensor {
    fn read_angle_degrees(&mut self) -> Result<f64, SensorError> {
        if self.failing {
            Err(SensorError::Unavailable("sensor disabled".to_string()))
        } else {
            Ok(self.angle)
        }
    }
}

/// Reads the angle from a text file on every poll.
///
/// Lets an external hinge driver publish readings by rewriting a file
/// (or a sysfs/procfs node) containing a number of degrees.
#[derive(Debug, Clone)]
pub struct FileSensor {
    path: PathBuf,
}

impl FileSensor {
    /// Create a sensor reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File being read.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl AngleSensor for FileSensor {
    fn read_angle_degrees(&mut self) -> Result<f64, SensorError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| SensorError::Io {
            path: self.path.clone(),
            source,
        })?;
        text.trim()
            .parse::<f64>()
            .map_err(|e| SensorError::Unavailable(format!("unparsable reading: {e}")))
    }
}
