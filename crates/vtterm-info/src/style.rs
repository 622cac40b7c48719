//! Cell style: foreground/background color plus an attribute mask.

use bitflags::bitflags;

use crate::color::Color;

bitflags! {
    /// Text attributes that can be combined on a single cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttributeMask: u8 {
        const BOLD = 0b0000_0001;
        const DIM = 0b0000_0010;
        const ITALIC = 0b0000_0100;
        const UNDERLINE = 0b0000_1000;
        const BLINK = 0b0001_0000;
        const REVERSE = 0b0010_0000;
        const STRIKETHROUGH = 0b0100_0000;
        /// Sentinel marking "no style computed yet", used by the
        /// engine's last-emitted style cache so the very first cell
        /// drawn never matches by accident.
        const INVALID = 0b1000_0000;
    }
}

impl Default for AttributeMask {
    fn default() -> Self {
        AttributeMask::empty()
    }
}

/// A cell's visual style: foreground color, background color, and
/// combined text attributes. Value type; `PartialEq` drives the
/// engine's style-cache comparison (spec.md §4.6 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub foreground: Color,
    pub background: Color,
    pub attributes: AttributeMask,
}

impl Style {
    #[must_use]
    pub const fn new(foreground: Color, background: Color, attributes: AttributeMask) -> Self {
        Self {
            foreground,
            background,
            attributes,
        }
    }

    /// A style guaranteed not to equal any real style, used to seed
    /// the engine's "last emitted" cache so the first draw always
    /// emits its attributes.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            foreground: Color::DEFAULT,
            background: Color::DEFAULT,
            attributes: AttributeMask::INVALID,
        }
    }
}
