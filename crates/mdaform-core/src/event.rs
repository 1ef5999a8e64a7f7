#![forbid(unsafe_code)]

//! Canonical key event types.
//!
//! Record editors only care about keyboard chords (save, save-and-close), so
//! this module keeps a small, host-independent key model. Hosts translate
//! their native events into [`KeyEvent`] before dispatching them.
//!
//! # Design Notes
//!
//! - `KeyEventKind` defaults to `Press` when the host cannot distinguish kinds
//! - `Modifiers` use bitflags for easy combination
//! - "Primary" means Ctrl on most platforms and Cmd (Super) on macOS; both are
//!   accepted wherever a chord is specified as Ctrl/Cmd
//! - With the `crossterm` feature, crossterm key events map directly

use std::fmt;

use bitflags::bitflags;

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// The type of key event (press, repeat, or release).
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Create a new key event with default modifiers and Press kind.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Check if this is a specific character key (case-sensitive).
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// Check if this is a character key, ignoring ASCII case.
    #[must_use]
    pub fn is_char_ignore_case(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch.eq_ignore_ascii_case(&c))
    }

    /// Check if Ctrl modifier is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Check if Alt modifier is held.
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Check if Shift modifier is held.
    ///
    /// Only the SHIFT bit counts. An uppercase letter alone may come from
    /// Caps Lock.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Check if Super/Meta/Cmd modifier is held.
    #[must_use]
    pub const fn super_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SUPER)
    }

    /// Check if the platform primary modifier (Ctrl or Cmd) is held.
    #[must_use]
    pub const fn primary(&self) -> bool {
        self.modifiers.intersects(Modifiers::CTRL.union(Modifiers::SUPER))
    }

    /// Whether this event should trigger commands (press or auto-repeat).
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        matches!(self.kind, KeyEventKind::Press | KeyEventKind::Repeat)
    }

    /// Convert a crossterm key event into a [`KeyEvent`].
    ///
    /// Returns `None` for keys without an mdaform equivalent.
    #[cfg(feature = "crossterm")]
    #[must_use]
    pub fn from_crossterm(event: crossterm::event::KeyEvent) -> Option<Self> {
        crossterm_compat::map_key_event(event)
    }
}

/// Key codes for keyboard events.
///
/// Chords are letters, so every non-character key collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key.
    Char(char),
    /// Any key without a character (arrows, Enter, function keys, ...).
    Other,
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,
    /// Key is being held (repeat event).
    Repeat,
    /// Key was released.
    Release,
}

bitflags! {
    /// Modifier keys that can be held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// A chord bound to a command: a letter plus the primary modifier, and
/// optionally Shift.
///
/// Matching is case-insensitive on the letter and treats Ctrl and Cmd as
/// interchangeable. Alt must not be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    /// Letter of the chord (stored lowercase).
    pub letter: char,
    /// Whether Shift must be held.
    pub shift: bool,
}

impl KeyChord {
    /// Primary+letter.
    #[must_use]
    pub const fn primary(letter: char) -> Self {
        Self {
            letter: letter.to_ascii_lowercase(),
            shift: false,
        }
    }

    /// Primary+Shift+letter.
    #[must_use]
    pub const fn primary_shift(letter: char) -> Self {
        Self {
            letter: letter.to_ascii_lowercase(),
            shift: true,
        }
    }

    /// Whether `event` is exactly this chord.
    #[must_use]
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.primary()
            && !event.alt()
            && event.is_char_ignore_case(self.letter)
            && event.shift() == self.shift
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ctrl/Cmd+")?;
        if self.shift {
            f.write_str("Shift+")?;
        }
        write!(f, "{}", self.letter.to_ascii_uppercase())
    }
}

#[cfg(feature = "crossterm")]
mod crossterm_compat {
    use super::{KeyCode, KeyEvent, KeyEventKind, Modifiers};
    use crossterm::event as cte;

    pub(super) fn map_key_event(event: cte::KeyEvent) -> Option<KeyEvent> {
        let code = map_key_code(event.code)?;
        let mut modifiers = map_modifiers(event.modifiers);
        // Without the kitty keyboard protocol, crossterm reports Shift+letter
        // as an uppercase char and may drop the SHIFT bit. Caps Lock is only
        // distinguishable when the terminal reports it in `state`.
        if let KeyCode::Char(c) = code
            && c.is_ascii_uppercase()
            && !event.state.contains(cte::KeyEventState::CAPS_LOCK)
        {
            modifiers |= Modifiers::SHIFT;
        }
        Some(KeyEvent {
            code,
            modifiers,
            kind: map_key_kind(event.kind),
        })
    }

    fn map_key_kind(kind: cte::KeyEventKind) -> KeyEventKind {
        match kind {
            cte::KeyEventKind::Press => KeyEventKind::Press,
            cte::KeyEventKind::Repeat => KeyEventKind::Repeat,
            cte::KeyEventKind::Release => KeyEventKind::Release,
        }
    }

    fn map_key_code(code: cte::KeyCode) -> Option<KeyCode> {
        match code {
            cte::KeyCode::Char(c) => Some(KeyCode::Char(c)),
            // Bare modifier presses and media keys never form a chord.
            cte::KeyCode::Modifier(_) | cte::KeyCode::Media(_) | cte::KeyCode::Null => None,
            _ => Some(KeyCode::Other),
        }
    }

    fn map_modifiers(modifiers: cte::KeyModifiers) -> Modifiers {
        let mut mapped = Modifiers::NONE;
        if modifiers.contains(cte::KeyModifiers::SHIFT) {
            mapped |= Modifiers::SHIFT;
        }
        if modifiers.contains(cte::KeyModifiers::ALT) {
            mapped |= Modifiers::ALT;
        }
        if modifiers.contains(cte::KeyModifiers::CONTROL) {
            mapped |= Modifiers::CTRL;
        }
        if modifiers.contains(cte::KeyModifiers::SUPER)
            || modifiers.contains(cte::KeyModifiers::META)
        {
            mapped |= Modifiers::SUPER;
        }
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_is_char() {
        let event = KeyEvent::new(KeyCode::Char('s'));
        assert!(event.is_char('s'));
        assert!(!event.is_char('S'));
        assert!(event.is_char_ignore_case('S'));
    }

    #[test]
    fn primary_accepts_ctrl_or_cmd() {
        let ctrl = KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::CTRL);
        let cmd = KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::SUPER);
        let alt = KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::ALT);
        assert!(ctrl.primary());
        assert!(cmd.primary());
        assert!(!alt.primary());
    }

    #[test]
    fn uppercase_letter_alone_is_not_shift() {
        // Caps Lock held: Ctrl+S arrives as 'S' with no SHIFT bit.
        let caps = KeyEvent::new(KeyCode::Char('S')).with_modifiers(Modifiers::CTRL);
        assert!(!caps.shift());
        assert!(
            caps.with_modifiers(Modifiers::CTRL | Modifiers::SHIFT)
                .shift()
        );
    }

    #[test]
    fn release_is_not_actionable() {
        let press = KeyEvent::new(KeyCode::Other);
        assert!(press.is_actionable());
        assert!(press.with_kind(KeyEventKind::Repeat).is_actionable());
        assert!(!press.with_kind(KeyEventKind::Release).is_actionable());
    }

    #[test]
    fn chord_matches_save_but_not_save_and_close() {
        let save = KeyChord::primary('s');
        let save_close = KeyChord::primary_shift('s');

        let ctrl_s = KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::CTRL);
        let ctrl_shift_s =
            KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::CTRL | Modifiers::SHIFT);
        let cmd_upper_s = KeyEvent::new(KeyCode::Char('S')).with_modifiers(Modifiers::SUPER);
        let cmd_shift_upper_s = KeyEvent::new(KeyCode::Char('S'))
            .with_modifiers(Modifiers::SUPER | Modifiers::SHIFT);

        assert!(save.matches(&ctrl_s));
        assert!(!save.matches(&ctrl_shift_s));
        assert!(save_close.matches(&ctrl_shift_s));
        assert!(save_close.matches(&cmd_shift_upper_s));
        assert!(save.matches(&cmd_upper_s));
        assert!(!save_close.matches(&cmd_upper_s));
        assert!(!save_close.matches(&ctrl_s));
    }

    #[test]
    fn chord_rejects_alt_and_plain_letters() {
        let save = KeyChord::primary('s');
        let plain = KeyEvent::new(KeyCode::Char('s'));
        let ctrl_alt =
            KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::CTRL | Modifiers::ALT);
        assert!(!save.matches(&plain));
        assert!(!save.matches(&ctrl_alt));
    }

    #[test]
    fn chord_display() {
        assert_eq!(KeyChord::primary('s').to_string(), "Ctrl/Cmd+S");
        assert_eq!(KeyChord::primary_shift('S').to_string(), "Ctrl/Cmd+Shift+S");
    }

    #[cfg(feature = "crossterm")]
    #[test]
    fn crossterm_ctrl_s_maps() {
        use crossterm::event as ct;
        let event = ct::KeyEvent::new(ct::KeyCode::Char('s'), ct::KeyModifiers::CONTROL);
        let mapped = KeyEvent::from_crossterm(event).expect("mapped");
        assert!(KeyChord::primary('s').matches(&mapped));
    }

    #[cfg(feature = "crossterm")]
    #[test]
    fn crossterm_uppercase_sets_shift_unless_caps_lock() {
        use crossterm::event as ct;
        let shifted = ct::KeyEvent::new(ct::KeyCode::Char('S'), ct::KeyModifiers::CONTROL);
        let mapped = KeyEvent::from_crossterm(shifted).expect("mapped");
        assert!(KeyChord::primary_shift('s').matches(&mapped));

        let caps = ct::KeyEvent::new_with_kind_and_state(
            ct::KeyCode::Char('S'),
            ct::KeyModifiers::CONTROL,
            ct::KeyEventKind::Press,
            ct::KeyEventState::CAPS_LOCK,
        );
        let mapped = KeyEvent::from_crossterm(caps).expect("mapped");
        assert!(KeyChord::primary('s').matches(&mapped));
    }

    #[cfg(feature = "crossterm")]
    #[test]
    fn crossterm_non_char_keys_map_to_other() {
        use crossterm::event as ct;
        let enter = ct::KeyEvent::new(ct::KeyCode::Enter, ct::KeyModifiers::CONTROL);
        assert_eq!(
            KeyEvent::from_crossterm(enter).map(|e| e.code),
            Some(KeyCode::Other)
        );
        let bare = ct::KeyEvent::new(
            ct::KeyCode::Modifier(ct::ModifierKeyCode::LeftControl),
            ct::KeyModifiers::CONTROL,
        );
        assert!(KeyEvent::from_crossterm(bare).is_none());
    }
}
