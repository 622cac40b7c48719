//! Mouse report decoding: SGR (`CSI < b ; x ; y M/m`) and legacy X11
//! (`CSI M b x y`) wire formats (spec.md §4.5).

use vtterm_info::Size;

use crate::event::{ButtonMask, ModifierMask, MouseEvent};

#[derive(Debug, Clone, Default)]
pub struct MouseParser {
    size: Size,
    last_drag: Option<(u16, u16)>,
    /// Tracks whether a button is currently held, so spurious wheel
    /// codes and nominal releases observed mid-drag can be promoted
    /// per spec.md §4.5 "Drag debouncing".
    button_down: bool,
}

impl MouseParser {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            last_drag: None,
            button_down: false,
        }
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }

    /// Decode one complete mouse report. Returns `None` both on a
    /// malformed report and on a debounced drag repeat (spec.md
    /// §4.5 "drag coalescing").
    #[must_use]
    pub fn decode(&mut self, report: &[u8]) -> Option<MouseEvent> {
        if report.starts_with(b"\x1b[<") {
            return self.decode_sgr(report);
        }
        if report.starts_with(b"\x1b[M") {
            return self.decode_x11(report);
        }
        None
    }

    /// Decode the button byte's low 2 bits (masking out the 0x40
    /// wheel bit and 0x20 motion bit), remapping the wire's
    /// button-2/button-3 swap and applying the two drag-promotion
    /// rules spec.md §4.5 names: a wheel code arriving while a button
    /// is already down continues that button instead, and a nominal
    /// release (wire button 3) arriving with the motion bit set while
    /// a button is down continues as Button1 rather than releasing.
    fn decode_button_byte(&mut self, code: u8) -> (ButtonMask, ModifierMask, bool) {
        let modifiers = {
            let mut m = ModifierMask::empty();
            if code & 0b0000_0100 != 0 {
                m |= ModifierMask::SHIFT;
            }
            if code & 0b0000_1000 != 0 {
                m |= ModifierMask::ALT;
            }
            if code & 0b0001_0000 != 0 {
                m |= ModifierMask::CTRL;
            }
            m
        };
        let is_drag = code & 0b0010_0000 != 0;
        let is_wheel = code & 0b0100_0000 != 0;
        let base = code & 0b0000_0011;

        let buttons = if is_wheel {
            match base {
                0 if self.button_down => ButtonMask::BUTTON1,
                0 => ButtonMask::WHEEL_UP,
                _ if self.button_down => ButtonMask::BUTTON2,
                _ => ButtonMask::WHEEL_DOWN,
            }
        } else {
            match base {
                0 => {
                    self.button_down = true;
                    ButtonMask::BUTTON1
                }
                1 => {
                    self.button_down = true;
                    ButtonMask::BUTTON3
                }
                2 => {
                    self.button_down = true;
                    ButtonMask::BUTTON2
                }
                3 if is_drag && self.button_down => ButtonMask::BUTTON1,
                3 => {
                    self.button_down = false;
                    ButtonMask::RELEASE
                }
                _ => ButtonMask::empty(),
            }
        };

        (buttons, modifiers, is_drag)
    }

    fn decode_sgr(&mut self, report: &[u8]) -> Option<MouseEvent> {
        let body = &report[3..];
        let is_release = body.ends_with(b"m");
        let body = &body[..body.len().checked_sub(1)?];
        let text = std::str::from_utf8(body).ok()?;
        let mut parts = text.split(';');
        let code: u8 = parts.next()?.parse().ok()?;
        let x: i32 = parts.next()?.parse().ok()?;
        let y: i32 = parts.next()?.parse().ok()?;

        let (mut buttons, modifiers, is_drag) = self.decode_button_byte(code);
        if is_release {
            buttons = ButtonMask::RELEASE;
            self.button_down = false;
        }
        // Wire coordinates are 1-based (spec.md §8 scenario 2).
        self.finish(buttons, modifiers, is_drag, x - 1, y - 1)
    }

    fn decode_x11(&mut self, report: &[u8]) -> Option<MouseEvent> {
        let rest = &report[3..];
        if rest.len() < 3 {
            return None;
        }
        let code = rest[0].wrapping_sub(32);
        // c = col + 32 + 1, r = row + 32 + 1 (spec.md §4.5).
        let x = i32::from(rest[1]) - 32 - 1;
        let y = i32::from(rest[2]) - 32 - 1;

        let (buttons, modifiers, is_drag) = self.decode_button_byte(code);
        self.finish(buttons, modifiers, is_drag, x, y)
    }

    fn finish(
        &mut self,
        buttons: ButtonMask,
        modifiers: ModifierMask,
        is_drag: bool,
        x: i32,
        y: i32,
    ) -> Option<MouseEvent> {
        let (col, row) = self.size.clamp(x, y);

        if is_drag {
            if self.last_drag == Some((col, row)) {
                return None;
            }
            self.last_drag = Some((col, row));
        } else {
            self.last_drag = None;
        }

        Some(MouseEvent {
            buttons,
            modifiers,
            col,
            row,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> MouseParser {
        MouseParser::new(Size {
            columns: 80,
            rows: 24,
        })
    }

    #[test]
    fn sgr_left_press() {
        let mut p = parser();
        let event = p.decode(b"\x1b[<0;10;5M").unwrap();
        assert_eq!(event.buttons, ButtonMask::BUTTON1);
        assert_eq!(event.col, 9);
        assert_eq!(event.row, 4);
    }

    #[test]
    fn sgr_middle_and_right_press_are_remapped() {
        let mut p = parser();
        // Wire base 1 -> Button3 (middle), wire base 2 -> Button2 (right).
        let middle = p.decode(b"\x1b[<1;10;5M").unwrap();
        assert_eq!(middle.buttons, ButtonMask::BUTTON3);
        let mut p = parser();
        let right = p.decode(b"\x1b[<2;10;5M").unwrap();
        assert_eq!(right.buttons, ButtonMask::BUTTON2);
    }

    #[test]
    fn sgr_release() {
        let mut p = parser();
        let event = p.decode(b"\x1b[<0;10;5m").unwrap();
        assert_eq!(event.buttons, ButtonMask::RELEASE);
    }

    #[test]
    fn sgr_wheel_up() {
        let mut p = parser();
        let event = p.decode(b"\x1b[<64;3;3M").unwrap();
        assert_eq!(event.buttons, ButtonMask::WHEEL_UP);
    }

    #[test]
    fn wheel_during_drag_is_promoted_to_held_button() {
        let mut p = parser();
        assert_eq!(p.decode(b"\x1b[<0;10;5M").unwrap().buttons, ButtonMask::BUTTON1);
        // A spurious wheel-up code while button 1 is still down continues as Button1.
        let during_drag = p.decode(b"\x1b[<64;10;6M").unwrap();
        assert_eq!(during_drag.buttons, ButtonMask::BUTTON1);

        let mut p = parser();
        assert_eq!(p.decode(b"\x1b[<2;10;5M").unwrap().buttons, ButtonMask::BUTTON2);
        let during_drag = p.decode(b"\x1b[<65;10;6M").unwrap();
        assert_eq!(during_drag.buttons, ButtonMask::BUTTON2);
    }

    #[test]
    fn nominal_release_during_motion_continues_as_button1() {
        let mut p = parser();
        assert_eq!(p.decode(b"\x1b[<1;10;5M").unwrap().buttons, ButtonMask::BUTTON3);
        // Wire button 3 (nominal release) with the motion bit (0x20) set,
        // while a button is still down, is not a real release.
        let code = 3 | 0b0010_0000;
        let report = format!("\x1b[<{code};10;6M");
        let continued = p.decode(report.as_bytes()).unwrap();
        assert_eq!(continued.buttons, ButtonMask::BUTTON1);
    }

    #[test]
    fn x11_left_press() {
        let mut p = parser();
        let report = [0x1b, b'[', b'M', 32, 32 + 10, 32 + 5];
        let event = p.decode(&report).unwrap();
        assert_eq!(event.buttons, ButtonMask::BUTTON1);
        assert_eq!(event.col, 9);
        assert_eq!(event.row, 4);
    }

    #[test]
    fn repeated_drag_at_same_cell_is_debounced() {
        let mut p = parser();
        let first = p.decode(b"\x1b[<32;10;5M").unwrap();
        assert_eq!(first.col, 9);
        assert!(p.decode(b"\x1b[<32;10;5M").is_none());
    }

    #[test]
    fn drag_to_new_cell_is_reported() {
        let mut p = parser();
        assert!(p.decode(b"\x1b[<32;10;5M").is_some());
        assert!(p.decode(b"\x1b[<32;11;5M").is_some());
    }

    #[test]
    fn coordinates_clip_to_window_size() {
        let mut p = parser();
        let event = p.decode(b"\x1b[<0;999;999M").unwrap();
        assert_eq!(event.col, 79);
        assert_eq!(event.row, 23);
    }
}
