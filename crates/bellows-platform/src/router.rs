//! Key events to engine note commands.

use bellows_config::{ConfigError, NamingMode, ScaleMap};
use bellows_synth::{EngineControl, MidiNote};

use crate::keys::{KeyCode, KeyLayout};

/// Receiver of raw keyboard events.
pub trait InputSink {
    /// A key went down. `is_repeat` is set for OS auto-repeat events.
    fn on_key_down(&mut self, key: KeyCode, is_repeat: bool);
    /// A key came up.
    fn on_key_up(&mut self, key: KeyCode);
}

/// Routes key events through the layout and active scale to an engine.
///
/// Each held key remembers the note it started, so releasing a key after a
/// scale change releases the right note.
///
/// # Example
///
/// ```rust
/// use bellows_config::InstrumentConfig;
/// use bellows_platform::{InputRouter, InputSink, KeyCode, KeyLayout};
/// use bellows_synth::{EngineSettings, VoiceEngine};
///
/// let layout = KeyLayout::harmonium();
/// let scales = InstrumentConfig::default().scale_map(layout.len()).unwrap();
/// let mut router = InputRouter::new(layout, scales, VoiceEngine::new(EngineSettings::default()));
///
/// let d = KeyCode::from_char('d').unwrap();
/// router.on_key_down(d, false);
/// assert!(router.engine().voice_for(64).is_some());
/// ```
#[derive(Debug)]
pub struct InputRouter<E> {
    layout: KeyLayout,
    scales: ScaleMap,
    engine: E,
    held: Vec<(KeyCode, MidiNote)>,
}

impl<E: EngineControl> InputRouter<E> {
    /// Creates a router.
    pub fn new(layout: KeyLayout, scales: ScaleMap, engine: E) -> Self {
        let held = Vec::with_capacity(layout.len());
        Self {
            layout,
            scales,
            engine,
            held,
        }
    }

    /// Switches the active scale. Held notes keep sounding.
    pub fn select_scale(&mut self, name: &str) -> Result<(), ConfigError> {
        self.scales.select_scale(name)?;
        tracing::info!(scale = name, "scale changed");
        Ok(())
    }

    /// Activates the next scale and returns its name.
    pub fn next_scale(&mut self) -> &str {
        let name = self.scales.select_next();
        tracing::info!(scale = name, "scale changed");
        name
    }

    /// Changes the label convention.
    pub fn set_naming_mode(&mut self, mode: NamingMode) {
        self.scales.set_naming_mode(mode);
    }

    /// Releases every held key.
    pub fn release_all(&mut self) {
        for (_, note) in self.held.drain(..) {
            self.engine.note_off(note);
        }
    }

    /// Notes currently held down, in press order.
    pub fn held_notes(&self) -> impl Iterator<Item = MidiNote> + '_ {
        self.held.iter().map(|&(_, note)| note)
    }

    /// Whether `key` is currently held.
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.iter().any(|&(k, _)| k == key)
    }

    /// The scale map.
    pub fn scale_map(&self) -> &ScaleMap {
        &self.scales
    }

    /// The key layout.
    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// The engine receiving commands.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the engine.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn resolve(&self, key: KeyCode) -> Option<MidiNote> {
        let position = self.layout.position_of(key)?;
        self.scales.note_for_position(position)
    }
}

impl<E: EngineControl> InputSink for InputRouter<E> {
    fn on_key_down(&mut self, key: KeyCode, is_repeat: bool) {
        if is_repeat || self.is_held(key) {
            return;
        }
        let Some(note) = self.resolve(key) else {
            return;
        };
        tracing::debug!(key = key.raw(), note, "key down");
        self.held.push((key, note));
        self.engine.note_on(note);
    }

    fn on_key_up(&mut self, key: KeyCode) {
        let note = match self.held.iter().position(|&(k, _)| k == key) {
            Some(idx) => self.held.swap_remove(idx).1,
            None => match self.resolve(key) {
                Some(note) => note,
                None => return,
            },
        };
        // Two keys can resolve to the same note at the top of the MIDI range.
        if self.held.iter().any(|&(_, n)| n == note) {
            return;
        }
        tracing::debug!(key = key.raw(), note, "key up");
        self.engine.note_off(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bellows_config::InstrumentConfig;

    /// Records commands instead of sounding them.
    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<(&'static str, MidiNote)>,
    }

    impl EngineControl for Recorder {
        fn note_on(&mut self, note: MidiNote) {
            self.events.push(("on", note));
        }

        fn note_off(&mut self, note: MidiNote) {
            self.events.push(("off", note));
        }

        fn set_master_volume(&mut self, _volume: f32) {}
    }

    fn router() -> InputRouter<Recorder> {
        let layout = KeyLayout::harmonium();
        let scales = InstrumentConfig::default().scale_map(layout.len()).unwrap();
        InputRouter::new(layout, scales, Recorder::default())
    }

    fn key(c: char) -> KeyCode {
        KeyCode::from_char(c).unwrap()
    }

    #[test]
    fn test_key_down_up() {
        let mut router = router();
        router.on_key_down(key('a'), false);
        router.on_key_up(key('a'));
        assert_eq!(router.engine().events, vec![("on", 60), ("off", 60)]);
    }

    #[test]
    fn test_repeat_ignored() {
        let mut router = router();
        router.on_key_down(key('s'), false);
        router.on_key_down(key('s'), true);
        router.on_key_down(key('s'), true);
        assert_eq!(router.engine().events, vec![("on", 62)]);
    }

    #[test]
    fn test_second_down_without_repeat_flag_ignored() {
        let mut router = router();
        router.on_key_down(key('s'), false);
        router.on_key_down(key('s'), false);
        assert_eq!(router.engine().events.len(), 1);
    }

    #[test]
    fn test_unmapped_key_ignored() {
        let mut router = router();
        router.on_key_down(key('z'), false);
        router.on_key_up(key('z'));
        router.on_key_down(KeyCode::from_raw(0x7F), false);
        assert!(router.engine().events.is_empty());
    }

    #[test]
    fn test_scale_change_releases_original_note() {
        let mut router = router();
        router.on_key_down(key('f'), false); // Major degree 3 = F4
        router.select_scale("Bhairav").unwrap();
        router.on_key_up(key('f'));
        router.on_key_down(key('s'), false); // Bhairav degree 1 = Db4
        assert_eq!(
            router.engine().events,
            vec![("on", 65), ("off", 65), ("on", 61)]
        );
    }

    #[test]
    fn test_invalid_scale_keeps_current() {
        let mut router = router();
        assert!(router.select_scale("Nope").is_err());
        assert_eq!(router.scale_map().active_name(), "Major");
    }

    #[test]
    fn test_release_all() {
        let mut router = router();
        router.on_key_down(key('a'), false);
        router.on_key_down(key('d'), false);
        router.release_all();
        assert_eq!(router.held_notes().count(), 0);
        let offs: Vec<_> = router
            .engine()
            .events
            .iter()
            .filter(|(kind, _)| *kind == "off")
            .map(|&(_, n)| n)
            .collect();
        assert_eq!(offs, vec![60, 64]);
    }

    #[test]
    fn test_key_up_without_down_releases_resolved_note() {
        let mut router = router();
        router.on_key_up(key('a'));
        assert_eq!(router.engine().events, vec![("off", 60)]);
    }
}
