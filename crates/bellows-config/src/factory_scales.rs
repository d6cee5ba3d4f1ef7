//! Scales bundled with bellows.
//!
//! Western modes plus a handful of Hindustani thaats, the latter being the
//! harmonium's home repertoire. All scales are rooted on C; the root can be
//! moved per scale in user configuration.

use crate::scale::ScaleDefinition;

/// Name of the scale selected when nothing else is configured.
pub const DEFAULT_SCALE: &str = "Major";

const FACTORY: &[(&str, &[u8])] = &[
    ("Major", &[2, 2, 1, 2, 2, 2, 1]),
    ("Natural Minor", &[2, 1, 2, 2, 1, 2, 2]),
    ("Harmonic Minor", &[2, 1, 2, 2, 1, 3, 1]),
    ("Dorian", &[2, 1, 2, 2, 2, 1, 2]),
    ("Mixolydian", &[2, 2, 1, 2, 2, 1, 2]),
    ("Major Pentatonic", &[2, 2, 3, 2, 3]),
    ("Minor Pentatonic", &[3, 2, 2, 3, 2]),
    ("Blues", &[3, 2, 1, 1, 3, 2]),
    // Sa re Ga ma Pa dha Ni
    ("Bhairav", &[1, 3, 1, 2, 1, 3, 1]),
    // Sa Re Ga Ma(tivra) Pa Dha Ni
    ("Yaman", &[2, 2, 2, 1, 2, 2, 1]),
    // Sa Re ga ma Pa Dha ni
    ("Kafi", &[2, 1, 2, 2, 2, 1, 2]),
    // Sa re ga ma Pa dha ni
    ("Bhairavi", &[1, 2, 2, 2, 1, 2, 2]),
    ("Chromatic", &[1; 12]),
];

/// All factory scales in display order, rooted on C.
pub fn factory_scales() -> Vec<ScaleDefinition> {
    FACTORY
        .iter()
        .map(|(name, intervals)| ScaleDefinition::new(*name, 0, intervals.to_vec()))
        .collect()
}
