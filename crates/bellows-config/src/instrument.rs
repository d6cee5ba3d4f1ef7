//! Instrument configuration file format.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::factory_scales::{DEFAULT_SCALE, factory_scales};
use crate::scale::{MAX_BASE_OCTAVE, MAX_NOTE, NamingMode, ScaleDefinition, ScaleMap};

/// Complete instrument configuration.
///
/// Every field has a default, so a partial (or empty) file is valid.
///
/// # TOML Format
///
/// ```toml
/// air_pressure_enabled = true
/// default_volume = 1.0
///
/// [engine]
/// sample_rate = 48000
/// buffer_size = 512
/// polyphony = 8
/// fade_time_ms = 20.0
/// musette_cents = 0.0
///
/// [keyboard]
/// scale = "Major"
/// base_octave = 4
/// naming = "western"
/// gate_ms = 350
///
/// [sensor]
/// poll_hz = 60.0
/// smoothing_ms = 40.0
///
/// [sensor.curve]
/// mode = "angle"
/// closed_degrees = 10.0
/// open_degrees = 110.0
/// exponent = 1.0
///
/// [[scales]]
/// name = "Hirajoshi"
/// intervals = [2, 1, 4, 1, 4]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Drive master volume from the lid angle; otherwise use `default_volume`.
    pub air_pressure_enabled: bool,
    /// Master volume when air pressure is disabled.
    pub default_volume: f32,
    /// Voicing engine and audio stream.
    pub engine: EngineConfig,
    /// Scale selection and key handling.
    pub keyboard: KeyboardConfig,
    /// Lid sensor polling and pressure mapping.
    pub sensor: SensorConfig,
    /// User scales, registered after the factory scales.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scales: Vec<ScaleDefinition>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            air_pressure_enabled: true,
            default_volume: 1.0,
            engine: EngineConfig::default(),
            keyboard: KeyboardConfig::default(),
            sensor: SensorConfig::default(),
            scales: Vec::new(),
        }
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Requested device buffer size in frames.
    pub buffer_size: u32,
    /// Simultaneous voices.
    pub polyphony: usize,
    /// Full-scale fade time in milliseconds (attack and release).
    pub fade_time_ms: f32,
    /// Detune of the second reed bank in cents; 0 disables it.
    pub musette_cents: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            polyphony: 8,
            fade_time_ms: 20.0,
            musette_cents: 0.0,
        }
    }
}

/// `[keyboard]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Scale active at startup.
    pub scale: String,
    /// Octave of the first key (4 puts it on middle C).
    pub base_octave: u8,
    /// Label convention for the key legend.
    pub naming: NamingMode,
    /// Hold time before a synthesized key-up, for terminals that cannot
    /// report key releases.
    pub gate_ms: u64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE.to_string(),
            base_octave: 4,
            naming: NamingMode::Western,
            gate_ms: 350,
        }
    }
}

/// `[sensor]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Control loop rate in Hz.
    pub poll_hz: f32,
    /// Angle smoothing time constant in milliseconds.
    pub smoothing_ms: f32,
    /// Angle → air pressure mapping.
    pub curve: PressureCurve,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            poll_hz: 60.0,
            smoothing_ms: 40.0,
            curve: PressureCurve::default(),
        }
    }
}

/// How lid motion becomes air pressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PressureCurve {
    /// Pressure follows the opening angle: 0 at `closed_degrees`, 1 at
    /// `open_degrees`, shaped by `exponent`.
    Angle {
        /// Angle giving zero pressure.
        closed_degrees: f32,
        /// Angle giving full pressure.
        open_degrees: f32,
        /// Curve shape; 1.0 is linear.
        exponent: f32,
    },
    /// Pressure is pumped by moving the lid and leaks away over time, like
    /// working a real bellows.
    Bellows {
        /// Pressure gained per degree of lid travel.
        gain: f32,
        /// Pressure lost per second.
        leak_per_sec: f32,
    },
}

impl Default for PressureCurve {
    fn default() -> Self {
        Self::Angle {
            closed_degrees: 10.0,
            open_degrees: 110.0,
            exponent: 1.0,
        }
    }
}

impl InstrumentConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Factory scales followed by user scales.
    pub fn all_scales(&self) -> Vec<ScaleDefinition> {
        let mut scales = factory_scales();
        scales.extend(self.scales.iter().cloned());
        scales
    }

    /// Build the scale map for a keyboard of `key_count` keys, with the
    /// configured scale, octave and naming mode selected.
    pub fn scale_map(&self, key_count: usize) -> Result<ScaleMap, ConfigError> {
        let mut map = ScaleMap::new(self.all_scales(), key_count, self.keyboard.base_octave)?;
        map.select_scale(&self.keyboard.scale)?;
        map.set_naming_mode(self.keyboard.naming);
        Ok(map)
    }

    /// Check every value is in range and the configured scale exists.
    ///
    /// `key_count` is the size of the keyboard the scales are laid over;
    /// every key of every scale must stay within MIDI range.
    pub fn validate(&self, key_count: usize) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(ConfigError::invalid_value(
                "default_volume",
                "must be between 0.0 and 1.0",
            ));
        }

        let engine = &self.engine;
        if !(8_000..=192_000).contains(&engine.sample_rate) {
            return Err(ConfigError::invalid_value(
                "engine.sample_rate",
                "must be between 8000 and 192000",
            ));
        }
        if !(16..=8192).contains(&engine.buffer_size) {
            return Err(ConfigError::invalid_value(
                "engine.buffer_size",
                "must be between 16 and 8192",
            ));
        }
        if !(1..=64).contains(&engine.polyphony) {
            return Err(ConfigError::invalid_value(
                "engine.polyphony",
                "must be between 1 and 64",
            ));
        }
        if !(5.0..=50.0).contains(&engine.fade_time_ms) {
            return Err(ConfigError::invalid_value(
                "engine.fade_time_ms",
                "must be between 5 and 50",
            ));
        }
        if !(-50.0..=50.0).contains(&engine.musette_cents) {
            return Err(ConfigError::invalid_value(
                "engine.musette_cents",
                "must be between -50 and 50",
            ));
        }

        if self.keyboard.base_octave > MAX_BASE_OCTAVE {
            return Err(ConfigError::invalid_value(
                "keyboard.base_octave",
                format!("must be at most {MAX_BASE_OCTAVE}"),
            ));
        }

        let sensor = &self.sensor;
        if !(1.0..=1000.0).contains(&sensor.poll_hz) {
            return Err(ConfigError::invalid_value(
                "sensor.poll_hz",
                "must be between 1 and 1000",
            ));
        }
        if !(0.0..=2000.0).contains(&sensor.smoothing_ms) {
            return Err(ConfigError::invalid_value(
                "sensor.smoothing_ms",
                "must be between 0 and 2000",
            ));
        }
        match sensor.curve {
            PressureCurve::Angle {
                closed_degrees,
                open_degrees,
                exponent,
            } => {
                if !(0.0..=180.0).contains(&closed_degrees)
                    || !(0.0..=180.0).contains(&open_degrees)
                    || closed_degrees >= open_degrees
                {
                    return Err(ConfigError::invalid_value(
                        "sensor.curve",
                        "need 0 <= closed_degrees < open_degrees <= 180",
                    ));
                }
                if !(exponent > 0.0 && exponent.is_finite()) {
                    return Err(ConfigError::invalid_value(
                        "sensor.curve.exponent",
                        "must be positive",
                    ));
                }
            }
            PressureCurve::Bellows { gain, leak_per_sec } => {
                if !(gain > 0.0 && gain.is_finite()) {
                    return Err(ConfigError::invalid_value(
                        "sensor.curve.gain",
                        "must be positive",
                    ));
                }
                if !(leak_per_sec >= 0.0 && leak_per_sec.is_finite()) {
                    return Err(ConfigError::invalid_value(
                        "sensor.curve.leak_per_sec",
                        "must not be negative",
                    ));
                }
            }
        }

        // Builds the map, which checks every scale and that the selection exists.
        let map = self.scale_map(key_count)?;
        let octave = self.keyboard.base_octave;
        if let Some(scale) = map
            .scales()
            .iter()
            .find(|s| s.highest_note(octave, key_count) > MAX_NOTE)
        {
            return Err(ConfigError::invalid_value(
                "keyboard.base_octave",
                format!(
                    "octave {octave} puts the top key of '{}' above MIDI {MAX_NOTE}",
                    scale.name
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Keys on the harmonium layout.
    const KEYS: usize = 20;

    #[test]
    fn test_default_is_valid() {
        InstrumentConfig::default().validate(KEYS).unwrap();
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = InstrumentConfig::from_toml("").unwrap();
        assert_eq!(config, InstrumentConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = InstrumentConfig::from_toml(
            r#"
air_pressure_enabled = false

[keyboard]
scale = "Yaman"
naming = "sargam"
"#,
        )
        .unwrap();
        assert!(!config.air_pressure_enabled);
        assert_eq!(config.keyboard.scale, "Yaman");
        assert_eq!(config.keyboard.naming, NamingMode::Sargam);
        assert_eq!(config.keyboard.base_octave, 4);
        assert_eq!(config.engine.polyphony, 8);
    }

    #[test]
    fn test_bellows_curve_parses() {
        let config = InstrumentConfig::from_toml(
            r#"
[sensor.curve]
mode = "bellows"
gain = 0.02
leak_per_sec = 0.3
"#,
        )
        .unwrap();
        assert_eq!(
            config.sensor.curve,
            PressureCurve::Bellows {
                gain: 0.02,
                leak_per_sec: 0.3
            }
        );
        config.validate(KEYS).unwrap();
    }

    #[test]
    fn test_to_toml_round_trip() {
        let mut config = InstrumentConfig::default();
        config.scales.push(ScaleDefinition::new("Hirajoshi", 4, vec![2, 1, 4, 1, 4]));
        config.keyboard.scale = "Hirajoshi".to_string();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[engine]"));
        let parsed = InstrumentConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
        parsed.validate(KEYS).unwrap();
    }

    #[test]
    fn test_unknown_scale_rejected() {
        let mut config = InstrumentConfig::default();
        config.keyboard.scale = "Nonexistent".to_string();
        assert!(matches!(
            config.validate(KEYS),
            Err(ConfigError::InvalidScaleName(_))
        ));
    }

    #[test]
    fn test_user_scale_shadowing_factory_rejected() {
        let mut config = InstrumentConfig::default();
        config
            .scales
            .push(ScaleDefinition::new("Major", 0, vec![2, 2, 1, 2, 2, 2, 1]));
        assert!(matches!(
            config.validate(KEYS),
            Err(ConfigError::DuplicateScale(_))
        ));
    }

    #[test]
    fn test_range_checks() {
        let mut config = InstrumentConfig::default();
        config.engine.polyphony = 0;
        assert!(config.validate(KEYS).is_err());

        let mut config = InstrumentConfig::default();
        config.engine.fade_time_ms = 200.0;
        assert!(config.validate(KEYS).is_err());

        let mut config = InstrumentConfig::default();
        config.sensor.curve = PressureCurve::Angle {
            closed_degrees: 90.0,
            open_degrees: 30.0,
            exponent: 1.0,
        };
        assert!(config.validate(KEYS).is_err());

        let mut config = InstrumentConfig::default();
        config.default_volume = f32::NAN;
        assert!(config.validate(KEYS).is_err());
    }

    #[test]
    fn test_base_octave_must_keep_keys_in_range() {
        let mut config = InstrumentConfig::default();
        config.keyboard.base_octave = 8;
        let err = config.validate(KEYS).unwrap_err();
        assert!(
            matches!(&err, ConfigError::InvalidValue { field, .. } if field == "keyboard.base_octave"),
            "{err}"
        );

        // Major reaches MIDI 117 from octave 6, but the pentatonic scales
        // climb further over 20 keys.
        config.keyboard.base_octave = 6;
        let err = config.validate(KEYS).unwrap_err();
        assert!(err.to_string().contains("Pentatonic"), "{err}");

        config.keyboard.base_octave = 5;
        config.validate(KEYS).unwrap();
        let map = config.scale_map(KEYS).unwrap();
        assert!(map.notes().windows(2).all(|w| w[0] < w[1]), "No key collapses onto 127");

        // A short keyboard leaves room for a higher octave.
        config.keyboard.base_octave = 8;
        config.validate(7).unwrap();
    }

    #[test]
    fn test_scale_map_applies_keyboard_section() {
        let mut config = InstrumentConfig::default();
        config.keyboard.scale = "Bhairav".to_string();
        config.keyboard.base_octave = 3;
        config.keyboard.naming = NamingMode::Sargam;
        let map = config.scale_map(11).unwrap();
        assert_eq!(map.active_name(), "Bhairav");
        assert_eq!(map.note_for_position(0), Some(48));
        assert_eq!(map.naming_mode(), NamingMode::Sargam);
    }
}
