//! Scales, key naming, and instrument configuration for bellows.
//!
//! # Features
//!
//! - **Scales**: [`ScaleDefinition`] patterns expanded by [`ScaleMap`] into
//!   one MIDI note per playable key
//! - **Naming**: Western or Sargam labels via [`NamingMode`]
//! - **Configuration**: [`InstrumentConfig`] loaded from and saved to TOML
//! - **Paths**: Platform-specific config directory
//!
//! # Example
//!
//! ```rust
//! use bellows_config::{InstrumentConfig, NamingMode};
//!
//! let config = InstrumentConfig::from_toml(
//!     r#"
//! [keyboard]
//! scale = "Kafi"
//! naming = "sargam"
//! "#,
//! )
//! .unwrap();
//! config.validate(11).unwrap();
//!
//! let map = config.scale_map(11).unwrap();
//! let legend = map.legend(NamingMode::Sargam);
//! assert_eq!(legend[2].label, "ga");
//! ```

mod error;
mod instrument;
mod scale;

/// Platform-specific configuration paths.
pub mod paths;

/// Scales bundled with the library.
pub mod factory_scales;

pub use error::ConfigError;
pub use factory_scales::{DEFAULT_SCALE, factory_scales};
pub use instrument::{EngineConfig, InstrumentConfig, KeyboardConfig, PressureCurve, SensorConfig};
pub use paths::{default_config_path, ensure_user_config_dir, user_config_dir};
pub use scale::{LegendEntry, MAX_BASE_OCTAVE, MAX_NOTE, NamingMode, ScaleDefinition, ScaleMap};
