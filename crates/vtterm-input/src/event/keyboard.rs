//! Key event types.

use bitflags::bitflags;

bitflags! {
    /// Modifier keys accompanying a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierMask: u8 {
        const SHIFT = 0b0001;
        const ALT = 0b0010;
        const CTRL = 0b0100;
        const META = 0b1000;
    }
}

/// A recognized key, independent of any modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character (also carries the rune in [`KeyEvent`]).
    Rune,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    Backspace,
    Tab,
    Enter,
    Esc,
    Function(u8),
}

/// One recognized input event, fanned out to every key subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub rune: char,
    pub modifiers: ModifierMask,
}

impl KeyEvent {
    #[must_use]
    pub const fn rune(r: char, modifiers: ModifierMask) -> Self {
        Self {
            key: Key::Rune,
            rune: r,
            modifiers,
        }
    }

    #[must_use]
    pub const fn key(key: Key, modifiers: ModifierMask) -> Self {
        Self {
            key,
            rune: '\0',
            modifiers,
        }
    }
}
