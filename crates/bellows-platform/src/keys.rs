//! Key codes and the key → position layout.
//!
//! [`KeyCode`] carries a platform virtual key code. Codes follow the macOS
//! ANSI virtual key table, which is layout-independent: the code names a
//! physical key position, not the character printed on it.
//!
//! [`KeyLayout`] assigns playable keys to positions 0, 1, 2, ... in order.

/// macOS ANSI virtual key codes for the keys bellows uses.
pub mod vk {
    /// A
    pub const A: u16 = 0x00;
    /// S
    pub const S: u16 = 0x01;
    /// D
    pub const D: u16 = 0x02;
    /// F
    pub const F: u16 = 0x03;
    /// H
    pub const H: u16 = 0x04;
    /// G
    pub const G: u16 = 0x05;
    /// Z
    pub const Z: u16 = 0x06;
    /// X
    pub const X: u16 = 0x07;
    /// C
    pub const C: u16 = 0x08;
    /// V
    pub const V: u16 = 0x09;
    /// B
    pub const B: u16 = 0x0B;
    /// Q
    pub const Q: u16 = 0x0C;
    /// W
    pub const W: u16 = 0x0D;
    /// E
    pub const E: u16 = 0x0E;
    /// R
    pub const R: u16 = 0x0F;
    /// Y
    pub const Y: u16 = 0x10;
    /// T
    pub const T: u16 = 0x11;
    /// O
    pub const O: u16 = 0x1F;
    /// U
    pub const U: u16 = 0x20;
    /// I
    pub const I: u16 = 0x22;
    /// P
    pub const P: u16 = 0x23;
    /// L
    pub const L: u16 = 0x25;
    /// J
    pub const J: u16 = 0x26;
    /// '
    pub const QUOTE: u16 = 0x27;
    /// K
    pub const K: u16 = 0x28;
    /// ;
    pub const SEMICOLON: u16 = 0x29;
    /// N
    pub const N: u16 = 0x2D;
    /// M
    pub const M: u16 = 0x2E;
}

const CHAR_TABLE: &[(char, u16)] = &[
    ('a', vk::A),
    ('s', vk::S),
    ('d', vk::D),
    ('f', vk::F),
    ('h', vk::H),
    ('g', vk::G),
    ('z', vk::Z),
    ('x', vk::X),
    ('c', vk::C),
    ('v', vk::V),
    ('b', vk::B),
    ('q', vk::Q),
    ('w', vk::W),
    ('e', vk::E),
    ('r', vk::R),
    ('y', vk::Y),
    ('t', vk::T),
    ('o', vk::O),
    ('u', vk::U),
    ('i', vk::I),
    ('p', vk::P),
    ('l', vk::L),
    ('j', vk::J),
    ('\'', vk::QUOTE),
    ('k', vk::K),
    (';', vk::SEMICOLON),
    ('n', vk::N),
    ('m', vk::M),
];

/// A physical key, identified by its virtual key code.
///
/// # Example
///
/// ```rust
/// use bellows_platform::KeyCode;
///
/// let a = KeyCode::from_char('A').unwrap();
/// assert_eq!(a.raw(), 0x00);
/// assert_eq!(a.to_char(), Some('a'));
/// assert!(KeyCode::from_char('7').is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(u16);

impl KeyCode {
    /// Creates a key code from a raw virtual key code.
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw virtual key code.
    #[inline]
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Key code for the key that types `c` (case-insensitive), if known.
    pub fn from_char(c: char) -> Option<Self> {
        let c = c.to_ascii_lowercase();
        CHAR_TABLE
            .iter()
            .find(|(ch, _)| *ch == c)
            .map(|&(_, code)| Self(code))
    }

    /// Character printed on this key, if known.
    pub fn to_char(self) -> Option<char> {
        CHAR_TABLE
            .iter()
            .find(|(_, code)| *code == self.0)
            .map(|&(ch, _)| ch)
    }
}

/// Ordered mapping from keys to key positions.
///
/// # Example
///
/// ```rust
/// use bellows_platform::{KeyCode, KeyLayout};
///
/// let layout = KeyLayout::harmonium();
/// assert_eq!(layout.position_of(KeyCode::from_char('a').unwrap()), Some(0));
/// assert_eq!(layout.position_of(KeyCode::from_char('d').unwrap()), Some(2));
/// assert_eq!(layout.position_of(KeyCode::from_char('z').unwrap()), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyLayout {
    keys: Vec<KeyCode>,
}

impl KeyLayout {
    /// Creates an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Home row `a s d f g h j k l ; '` then top row `w e r t y u i o p`.
    pub fn harmonium() -> Self {
        Self::from_chars("asdfghjkl;'wertyuiop")
    }

    /// Builds a layout from the characters of `chars`, in order.
    ///
    /// Unknown and repeated characters are skipped.
    pub fn from_chars(chars: &str) -> Self {
        let mut layout = Self::new();
        for code in chars.chars().filter_map(KeyCode::from_char) {
            layout.push(code);
        }
        layout
    }

    /// Appends a key at the next position.
    ///
    /// Returns `false` if the key is already in the layout.
    pub fn push(&mut self, key: KeyCode) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Position of `key`, or `None` if it is not playable.
    #[inline]
    pub fn position_of(&self, key: KeyCode) -> Option<usize> {
        self.keys.iter().position(|&k| k == key)
    }

    /// Key at `position`.
    #[inline]
    pub fn key_at(&self, position: usize) -> Option<KeyCode> {
        self.keys.get(position).copied()
    }

    /// Number of playable keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no keys are playable.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Playable keys in position order.
    pub fn keys(&self) -> &[KeyCode] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmonium_layout() {
        let layout = KeyLayout::harmonium();
        assert_eq!(layout.len(), 20);
        assert_eq!(layout.key_at(0), KeyCode::from_char('a'));
        assert_eq!(layout.key_at(9), KeyCode::from_char(';'));
        assert_eq!(layout.key_at(10), KeyCode::from_char('\''));
        assert_eq!(layout.key_at(11), KeyCode::from_char('w'));
        assert_eq!(layout.key_at(20), None);
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut layout = KeyLayout::new();
        let a = KeyCode::from_raw(vk::A);
        assert!(layout.push(a));
        assert!(!layout.push(a));
        assert_eq!(layout.len(), 1);
    }

    #[test]
    fn test_from_chars_skips_unknown() {
        let layout = KeyLayout::from_chars("a1sa");
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn test_char_round_trip() {
        for &(ch, code) in CHAR_TABLE {
            assert_eq!(KeyCode::from_char(ch), Some(KeyCode::from_raw(code)));
            assert_eq!(KeyCode::from_raw(code).to_char(), Some(ch));
        }
    }
}
