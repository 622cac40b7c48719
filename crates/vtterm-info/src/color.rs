//! Color representation: a 64-bit tagged value carrying either a palette
//! index or an RGB triple, plus validity/special sentinel bits.

use std::fmt;

const RGB_MASK: u64 = 0x00FF_FFFF;
const PALETTE_MASK: u64 = 0x1FF;
const RGB_FLAG: u64 = 1 << 24;
const VALID_FLAG: u64 = 1 << 25;
const SPECIAL_FLAG: u64 = 1 << 26;

/// A terminal color: either a palette index (0-511) or a 24-bit RGB
/// triple, tagged by `valid`/`rgb`/`special` bits.
///
/// Palette indices 0-15 are the ECMA-48 named colors, 16-255 the XTerm
/// 256-color cube, 256+ resolve to W3C-named colors via RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(u64);

impl Color {
    /// The zero value: "use the terminal's default color", distinct
    /// from palette index 0.
    pub const DEFAULT: Color = Color(0);

    /// Sentinel requesting "reset foreground/background to terminal
    /// default" rather than any particular color.
    pub const RESET: Color = Color(SPECIAL_FLAG | VALID_FLAG);

    #[must_use]
    pub const fn palette(index: u16) -> Self {
        Color((index as u64 & PALETTE_MASK) | VALID_FLAG)
    }

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        let packed = ((r as u64) << 16) | ((g as u64) << 8) | (b as u64);
        Color(packed | RGB_FLAG | VALID_FLAG)
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 & VALID_FLAG != 0
    }

    #[must_use]
    pub const fn is_rgb(self) -> bool {
        self.0 & RGB_FLAG != 0
    }

    #[must_use]
    pub const fn is_special(self) -> bool {
        self.0 & SPECIAL_FLAG != 0
    }

    /// `Some((r, g, b))` if this color carries an RGB triple.
    #[must_use]
    pub const fn as_rgb(self) -> Option<(u8, u8, u8)> {
        if !self.is_rgb() {
            return None;
        }
        let packed = self.0 & RGB_MASK;
        Some(((packed >> 16) as u8, (packed >> 8) as u8, packed as u8))
    }

    /// `Some(index)` if this color carries a palette index.
    #[must_use]
    pub const fn as_palette_index(self) -> Option<u16> {
        if !self.is_valid() || self.is_rgb() || self.is_special() {
            return None;
        }
        Some((self.0 & PALETTE_MASK) as u16)
    }

    /// Resolve this color to its nearest entry in `palette` using the
    /// supplied metric, returning the palette index. RGB colors are
    /// matched against the palette; palette colors are returned as-is.
    ///
    /// The distance metric is a client concern (see spec.md §1); this
    /// crate only defines the call shape.
    pub fn to_palette_index(
        self,
        palette: &[Color],
        metric: impl Fn(Color, &[Color]) -> usize,
    ) -> Option<u16> {
        if let Some(idx) = self.as_palette_index() {
            return Some(idx);
        }
        if self.is_rgb() {
            return Some(metric(self, palette) as u16);
        }
        None
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_special() {
            write!(f, "Color(reset)")
        } else if let Some((r, g, b)) = self.as_rgb() {
            write!(f, "Color(#{r:02x}{g:02x}{b:02x})")
        } else if let Some(idx) = self.as_palette_index() {
            write!(f, "Color({idx})")
        } else {
            write!(f, "Color(default)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_invalid_and_not_rgb() {
        assert!(!Color::DEFAULT.is_valid());
        assert!(!Color::DEFAULT.is_rgb());
        assert_eq!(Color::DEFAULT.as_palette_index(), None);
    }

    #[test]
    fn rgb_round_trips() {
        let c = Color::rgb(0x12, 0x34, 0x56);
        assert!(c.is_valid());
        assert!(c.is_rgb());
        assert_eq!(c.as_rgb(), Some((0x12, 0x34, 0x56)));
        assert_eq!(c.as_palette_index(), None);
    }

    #[test]
    fn palette_round_trips() {
        let c = Color::palette(42);
        assert!(c.is_valid());
        assert!(!c.is_rgb());
        assert_eq!(c.as_palette_index(), Some(42));
    }

    #[test]
    fn palette_index_is_bounded_to_nine_bits() {
        // 511 is the maximum representable index (9 bits).
        let c = Color::palette(511);
        assert_eq!(c.as_palette_index(), Some(511));
    }

    #[test]
    fn reset_is_special_and_not_rgb_or_palette() {
        assert!(Color::RESET.is_special());
        assert!(Color::RESET.is_valid());
        assert_eq!(Color::RESET.as_rgb(), None);
        assert_eq!(Color::RESET.as_palette_index(), None);
    }
}
