//! Scale definitions and the key-position → MIDI note lookup.
//!
//! A [`ScaleDefinition`] is one octave of semitone steps. Expanded from a
//! base octave it yields one MIDI note per playable key, with degrees past
//! the end of the pattern continuing into the next octave. Key position N
//! is always scale degree N, so every scale expands to the same length and
//! switching scales never moves a key to a different degree.
//!
//! [`ScaleMap`] holds the registered scales, the active selection and its
//! cached expansion. Lookups on it are pure and allocation-free.
//!
//! # Example
//!
//! ```rust
//! use bellows_config::{NamingMode, ScaleMap, factory_scales};
//!
//! let mut map = ScaleMap::new(factory_scales(), 11, 4).unwrap();
//! assert_eq!(map.note_for_position(0), Some(60));
//! assert_eq!(map.note_for_position(2), Some(64));
//!
//! map.select_scale("Bhairav").unwrap();
//! assert_eq!(map.note_for_position(1), Some(61));
//! assert_eq!(map.label(61, NamingMode::Sargam), "re");
//! assert_eq!(map.label(61, NamingMode::Western), "C#4");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Highest valid MIDI note.
pub const MAX_NOTE: u32 = 127;

/// Highest accepted base octave (C8 = MIDI 108).
pub const MAX_BASE_OCTAVE: u8 = 8;

const WESTERN_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Swaras by semitone above Sa. Lowercase marks komal (flat) notes and
/// shuddha ma; `Ma` is tivra (sharp) Ma.
const SARGAM_NAMES: [&str; 12] = [
    "Sa", "re", "Re", "ga", "Ga", "ma", "Ma", "Pa", "dha", "Dha", "ni", "Ni",
];

/// Display convention for note labels. Never affects pitch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// Letter names with octave numbers: `C4`, `F#3`.
    #[default]
    Western,
    /// Hindustani swaras relative to the scale's tonic: `Sa`, `re`, `Pa'`.
    Sargam,
}

impl NamingMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            Self::Western => Self::Sargam,
            Self::Sargam => Self::Western,
        }
    }
}

impl fmt::Display for NamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Western => f.pad("western"),
            Self::Sargam => f.pad("sargam"),
        }
    }
}

impl FromStr for NamingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "western" => Ok(Self::Western),
            "sargam" => Ok(Self::Sargam),
            _ => Err(ConfigError::invalid_value(
                "naming",
                format!("'{s}' is not one of: western, sargam"),
            )),
        }
    }
}

/// One octave of a scale.
///
/// # TOML Format
///
/// ```toml
/// [[scales]]
/// name = "Hirajoshi"
/// root_offset = 4      # rooted on E
/// intervals = [2, 1, 4, 1, 4]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDefinition {
    /// Display and lookup name.
    pub name: String,
    /// Semitones above C of the tonic, `0..12`.
    #[serde(default)]
    pub root_offset: u8,
    /// Semitone steps between consecutive degrees; must sum to 12.
    pub intervals: Vec<u8>,
}

impl ScaleDefinition {
    /// Create a scale definition.
    pub fn new(name: impl Into<String>, root_offset: u8, intervals: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            root_offset,
            intervals,
        }
    }

    /// Check the definition is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid_scale(&self.name, "name is empty"));
        }
        if self.root_offset >= 12 {
            return Err(ConfigError::invalid_scale(
                &self.name,
                format!("root_offset {} must be below 12", self.root_offset),
            ));
        }
        if self.intervals.is_empty() {
            return Err(ConfigError::invalid_scale(&self.name, "no intervals"));
        }
        if self.intervals.contains(&0) {
            return Err(ConfigError::invalid_scale(
                &self.name,
                "intervals must be positive",
            ));
        }
        let sum: u32 = self.intervals.iter().map(|&i| u32::from(i)).sum();
        if sum != 12 {
            return Err(ConfigError::invalid_scale(
                &self.name,
                format!("intervals sum to {sum}, expected 12"),
            ));
        }
        Ok(())
    }

    /// Number of degrees per octave.
    #[inline]
    pub fn degrees(&self) -> usize {
        self.intervals.len()
    }

    /// Semitones above the tonic of scale degree `degree`, counting on into
    /// higher octaves.
    pub fn degree_offset(&self, degree: usize) -> u32 {
        let len = self.intervals.len();
        if len == 0 {
            return 0;
        }
        let octaves = (degree / len) as u32;
        let within: u32 = self.intervals[..degree % len]
            .iter()
            .map(|&i| u32::from(i))
            .sum();
        octaves * 12 + within
    }

    /// MIDI note of the tonic at `base_octave` (octave 4 holds middle C).
    pub fn tonic(&self, base_octave: u8) -> u32 {
        12 * (u32::from(base_octave) + 1) + u32::from(self.root_offset)
    }

    /// Unclamped note of the last of `key_count` keys from `base_octave`.
    pub fn highest_note(&self, base_octave: u8, key_count: usize) -> u32 {
        self.tonic(base_octave) + self.degree_offset(key_count.saturating_sub(1))
    }
}

/// One row of a key legend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    /// Key position.
    pub position: usize,
    /// MIDI note the key plays.
    pub note: u8,
    /// Display label in the requested naming mode.
    pub label: String,
}

/// Registered scales plus the active selection.
#[derive(Debug, Clone)]
pub struct ScaleMap {
    scales: Vec<ScaleDefinition>,
    active: usize,
    base_octave: u8,
    key_count: usize,
    naming: NamingMode,
    /// Expansion of the active scale
    notes: Vec<u8>,
}

impl ScaleMap {
    /// Build a map over `scales` for a keyboard with `key_count` keys.
    ///
    /// The first scale becomes active. Every scale is validated and names
    /// must be unique.
    pub fn new(
        scales: Vec<ScaleDefinition>,
        key_count: usize,
        base_octave: u8,
    ) -> Result<Self, ConfigError> {
        if scales.is_empty() {
            return Err(ConfigError::invalid_value("scales", "no scales registered"));
        }
        check_base_octave(base_octave)?;
        for (i, scale) in scales.iter().enumerate() {
            scale.validate()?;
            if scales[..i].iter().any(|s| s.name == scale.name) {
                return Err(ConfigError::DuplicateScale(scale.name.clone()));
            }
        }
        let mut map = Self {
            scales,
            active: 0,
            base_octave,
            key_count,
            naming: NamingMode::default(),
            notes: Vec::with_capacity(key_count),
        };
        map.refresh();
        Ok(map)
    }

    /// Expand `scale_name` from `base_octave` into one note per key.
    ///
    /// Notes that would pass MIDI 127 are clamped to 127.
    pub fn expand(&self, scale_name: &str, base_octave: u8) -> Result<Vec<u8>, ConfigError> {
        let scale = self.find(scale_name)?;
        Ok(expand_scale(scale, base_octave, self.key_count))
    }

    /// Make `name` the active scale.
    ///
    /// Only future lookups change; notes already sounding are untouched.
    pub fn select_scale(&mut self, name: &str) -> Result<(), ConfigError> {
        let idx = self
            .scales
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ConfigError::InvalidScaleName(name.to_string()))?;
        self.active = idx;
        self.refresh();
        Ok(())
    }

    /// Activate the next registered scale, wrapping around. Returns its name.
    pub fn select_next(&mut self) -> &str {
        self.active = (self.active + 1) % self.scales.len();
        self.refresh();
        &self.scales[self.active].name
    }

    /// MIDI note played by key `position` in the active scale.
    #[inline]
    pub fn note_for_position(&self, position: usize) -> Option<u8> {
        self.notes.get(position).copied()
    }

    /// Expansion of the active scale.
    pub fn notes(&self) -> &[u8] {
        &self.notes
    }

    /// The active scale.
    pub fn active_scale(&self) -> &ScaleDefinition {
        &self.scales[self.active]
    }

    /// Name of the active scale.
    pub fn active_name(&self) -> &str {
        &self.scales[self.active].name
    }

    /// Registered scales in order.
    pub fn scales(&self) -> &[ScaleDefinition] {
        &self.scales
    }

    /// Registered scale names in order.
    pub fn scale_names(&self) -> impl Iterator<Item = &str> {
        self.scales.iter().map(|s| s.name.as_str())
    }

    /// Number of keys every scale expands to.
    #[inline]
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Current base octave.
    #[inline]
    pub fn base_octave(&self) -> u8 {
        self.base_octave
    }

    /// Naming mode used by [`legend`](Self::legend) callers by default.
    #[inline]
    pub fn naming_mode(&self) -> NamingMode {
        self.naming
    }

    /// Change the default naming mode. Labels only; pitches are unaffected.
    pub fn set_naming_mode(&mut self, mode: NamingMode) {
        self.naming = mode;
    }

    /// Label `note` in `mode`.
    ///
    /// Sargam labels are relative to the active scale's tonic at the base
    /// octave: `.Pa` is below it, `Sa'` an octave above.
    pub fn label(&self, note: u8, mode: NamingMode) -> String {
        match mode {
            NamingMode::Western => western_label(note),
            NamingMode::Sargam => {
                let tonic = self.active_scale().tonic(self.base_octave) as i32;
                sargam_label(i32::from(note) - tonic)
            }
        }
    }

    /// Key-by-key legend of the active scale.
    pub fn legend(&self, mode: NamingMode) -> Vec<LegendEntry> {
        self.notes
            .iter()
            .enumerate()
            .map(|(position, &note)| LegendEntry {
                position,
                note,
                label: self.label(note, mode),
            })
            .collect()
    }

    fn find(&self, name: &str) -> Result<&ScaleDefinition, ConfigError> {
        self.scales
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::InvalidScaleName(name.to_string()))
    }

    fn refresh(&mut self) {
        self.notes = expand_scale(&self.scales[self.active], self.base_octave, self.key_count);
    }
}

fn check_base_octave(base_octave: u8) -> Result<(), ConfigError> {
    if base_octave > MAX_BASE_OCTAVE {
        return Err(ConfigError::invalid_value(
            "keyboard.base_octave",
            format!("{base_octave} is above {MAX_BASE_OCTAVE}"),
        ));
    }
    Ok(())
}

fn expand_scale(scale: &ScaleDefinition, base_octave: u8, key_count: usize) -> Vec<u8> {
    let tonic = scale.tonic(base_octave);
    (0..key_count)
        .map(|degree| (tonic + scale.degree_offset(degree)).min(MAX_NOTE) as u8)
        .collect()
}

fn western_label(note: u8) -> String {
    let octave = i32::from(note) / 12 - 1;
    format!("{}{}", WESTERN_NAMES[usize::from(note % 12)], octave)
}

fn sargam_label(semitones_from_sa: i32) -> String {
    let octave = semitones_from_sa.div_euclid(12);
    let swara = SARGAM_NAMES[semitones_from_sa.rem_euclid(12) as usize];
    let mut label = String::with_capacity(swara.len() + 3);
    for _ in octave..0 {
        label.push('.');
    }
    label.push_str(swara);
    for _ in 0..octave {
        label.push('\'');
    }
    label
}
