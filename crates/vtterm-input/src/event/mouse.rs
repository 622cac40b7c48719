//! Mouse event types.

use bitflags::bitflags;

use crate::event::keyboard::ModifierMask;

bitflags! {
    /// Buttons reported active on a mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ButtonMask: u8 {
        const BUTTON1 = 0b0000_0001;
        const BUTTON2 = 0b0000_0010;
        const BUTTON3 = 0b0000_0100;
        const WHEEL_UP = 0b0000_1000;
        const WHEEL_DOWN = 0b0001_0000;
        const RELEASE = 0b0010_0000;
    }
}

/// A normalized mouse event, clipped to the current window size
/// (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub buttons: ButtonMask,
    pub modifiers: ModifierMask,
    pub col: u16,
    pub row: u16,
}
