//! Bellows Platform - the instrument's input layer
//!
//! Everything between the outside world and the voicing engine: keyboard
//! events, the lid angle sensor, and master volume control.
//!
//! # Keyboard
//!
//! - [`KeyCode`] - Physical key identified by virtual key code
//! - [`KeyLayout`] - Key → position table ([`KeyLayout::harmonium`] by default)
//! - [`InputSink`] - Receiver of raw key-down / key-up events
//! - [`InputRouter`] - Resolves keys through the active scale and issues
//!   note commands
//!
//! # Lid Sensor
//!
//! - [`AngleSensor`] - Collaborator trait for anything that reports an angle
//! - [`SensorSampler`] - Polls, clamps, smooths, derives air pressure
//! - [`ManualSensor`] / [`FileSensor`] - Bundled sensor sources
//!
//! # Volume
//!
//! - [`VolumeController`] - Air pressure or fixed volume, slew limited
//! - [`ControlLoop`] - One timer tick: sample, update volume, push to engine
//!
//! # Example
//!
//! ```rust
//! use bellows_config::InstrumentConfig;
//! use bellows_platform::{ControlLoop, InputRouter, InputSink, KeyCode, KeyLayout, ManualSensor};
//! use bellows_synth::{EngineSettings, NullSink, VoiceEngine};
//!
//! let config = InstrumentConfig::default();
//! let layout = KeyLayout::harmonium();
//! let scales = config.scale_map(layout.len()).unwrap();
//! let mut router = InputRouter::new(layout, scales, VoiceEngine::new(EngineSettings::default()));
//! let mut control = ControlLoop::from_config(ManualSensor::new(90.0), &config);
//!
//! router.on_key_down(KeyCode::from_char('a').unwrap(), false);
//! for i in 0..6 {
//!     let t = f64::from(i) / 60.0;
//!     control.tick(t, router.engine_mut());
//!     router.engine_mut().tick(1.0 / 60.0, &mut NullSink);
//! }
//! assert!(router.engine().master_volume() > 0.0);
//! ```

pub mod control;
pub mod keys;
pub mod router;
pub mod sensor;
pub mod volume;

pub use control::{ControlLoop, ControlSnapshot};
pub use keys::{KeyCode, KeyLayout, vk};
pub use router::{InputRouter, InputSink};
pub use sensor::{
    AngleSensor, FileSensor, MAX_ANGLE_DEGREES, MIN_ANGLE_DEGREES, ManualSensor, SensorError,
    SensorSampler, SensorState,
};
pub use volume::VolumeController;
