//! Incremental key-event scanner (spec.md §4.4).
//!
//! Bytes arrive from the TTY in whatever chunks the OS hands back;
//! [`KeyParser`] buffers them and emits complete [`KeyEvent`]s,
//! deferring only on a genuinely ambiguous ESC-prefixed sequence.

use std::time::{Duration, Instant};

use vtterm_info::Terminfo;

use crate::event::{Key, KeyEvent, ModifierMask};
use crate::keytable::{KeyTable, MatchResult};

/// Default wait before a lone ESC is resolved to [`Key::Esc`]
/// (spec.md §4.4 "ESC disambiguation").
pub const DEFAULT_KEY_TIMEOUT: Duration = Duration::from_millis(50);

fn ctrl_char_key(b: u8) -> Option<(Key, char)> {
    match b {
        0x08 => Some((Key::Backspace, '\u{8}')),
        0x09 => Some((Key::Tab, '\t')),
        0x0d => Some((Key::Enter, '\r')),
        0x1b => Some((Key::Esc, '\u{1b}')),
        0x00 => Some((Key::Rune, '@')),
        0x01..=0x1a => Some((Key::Rune, (b'a' + b - 1) as char)),
        0x1c..=0x1f => Some((Key::Rune, (b'\\' + b - 0x1c) as char)),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct KeyParser {
    table: KeyTable,
    timeout: Duration,
    buf: Vec<u8>,
    pending_since: Option<Instant>,
}

impl KeyParser {
    #[must_use]
    pub fn new(terminfo: &Terminfo, timeout: Duration) -> Self {
        Self {
            table: KeyTable::build(terminfo),
            timeout,
            buf: Vec::new(),
            pending_since: None,
        }
    }

    /// Feed newly-read bytes into the internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.buf.is_empty() {
            self.pending_since = Some(Instant::now());
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Drain as many complete [`KeyEvent`]s as the current buffer
    /// supports. `now` lets callers (and tests) control the timeout
    /// clock; pass [`Instant::now`] in production.
    pub fn poll(&mut self, now: Instant) -> Vec<KeyEvent> {
        let mut out = Vec::new();
        loop {
            match self.step(now) {
                Some(event) => out.push(event),
                None => break,
            }
        }
        out
    }

    fn step(&mut self, now: Instant) -> Option<KeyEvent> {
        if self.buf.is_empty() {
            return None;
        }

        let head = self.buf[0];

        // Step 1: mouse-reporting prefixes ("\x1b[M", "\x1b[<") are
        // handled by a separate parser; leave them untouched here.
        if head == 0x1b && self.is_mouse_prefix() {
            return None;
        }

        // Step 4/5: ESC-led sequence via the key table, with
        // disambiguation against a lone/Alt-prefixed ESC.
        if head == 0x1b && self.buf.len() >= 2 {
            match self.table.match_buffer(&self.buf) {
                MatchResult::Complete(n, key, modifiers) => {
                    self.consume(n);
                    return Some(KeyEvent::key(key, modifiers));
                }
                MatchResult::Partial => {
                    if self.timed_out(now) {
                        return self.resolve_as_alt_prefix(now);
                    }
                    return None;
                }
                MatchResult::None => {
                    return self.resolve_as_alt_prefix(now);
                }
            }
        }

        if head == 0x1b {
            // Lone ESC so far: wait for the timeout before declaring
            // it a standalone Esc keypress.
            if self.timed_out(now) {
                self.consume(1);
                return Some(KeyEvent::key(Key::Esc, ModifierMask::empty()));
            }
            return None;
        }

        // Step 2: control characters and ASCII.
        if head < 0x20 || head == 0x7f {
            self.consume(1);
            if let Some((key, ch)) = ctrl_char_key(head) {
                let modifiers = match key {
                    Key::Backspace | Key::Tab | Key::Enter | Key::Esc => ModifierMask::empty(),
                    _ => ModifierMask::CTRL,
                };
                return Some(match key {
                    Key::Rune => KeyEvent::rune(ch, modifiers),
                    other => KeyEvent::key(other, modifiers),
                });
            }
            return Some(KeyEvent::key(Key::Backspace, ModifierMask::empty()));
        }

        if head < 0x80 {
            self.consume(1);
            return Some(KeyEvent::rune(head as char, ModifierMask::empty()));
        }

        // Step 3: UTF-8 multi-byte decode, bounded to 4 bytes.
        let width = utf8_width(head);
        if self.buf.len() < width {
            return None;
        }
        let rune = std::str::from_utf8(&self.buf[..width])
            .ok()
            .and_then(|s| s.chars().next());
        self.consume(width);
        Some(KeyEvent::rune(rune.unwrap_or('\u{fffd}'), ModifierMask::empty()))
    }

    fn resolve_as_alt_prefix(&mut self, now: Instant) -> Option<KeyEvent> {
        // The ESC cannot begin any registered sequence: treat it as
        // the Alt modifier over whatever follows, consuming only the
        // ESC byte and re-scanning the remainder next call.
        self.consume(1);
        match self.step(now) {
            Some(mut event) => {
                event.modifiers |= ModifierMask::ALT;
                Some(event)
            }
            None => None,
        }
    }

    /// True once enough bytes have arrived to tell this is a mouse
    /// report ("\x1b[M..." X11 or "\x1b[<..." SGR), which belongs to
    /// [`crate::mouseparser`] rather than this scanner.
    fn is_mouse_prefix(&self) -> bool {
        self.buf.len() >= 3 && self.buf[0] == 0x1b && self.buf[1] == b'[' && matches!(self.buf[2], b'M' | b'<')
    }

    fn timed_out(&self, now: Instant) -> bool {
        self.pending_since
            .is_some_and(|since| now.duration_since(since) >= self.timeout)
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
        self.pending_since = if self.buf.is_empty() {
            None
        } else {
            Some(Instant::now())
        };
    }
}

fn utf8_width(first_byte: u8) -> usize {
    if first_byte & 0b1110_0000 == 0b1100_0000 {
        2
    } else if first_byte & 0b1111_0000 == 0b1110_0000 {
        3
    } else if first_byte & 0b1111_1000 == 0b1111_0000 {
        4
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtterm_info::TerminfoRegistry;

    fn xterm_parser() -> KeyParser {
        let reg = TerminfoRegistry::with_defaults();
        KeyParser::new(&reg.lookup("xterm", None).unwrap(), DEFAULT_KEY_TIMEOUT)
    }

    #[test]
    fn plain_ascii_rune() {
        let mut p = xterm_parser();
        p.feed(b"a");
        let events = p.poll(Instant::now());
        assert_eq!(events, vec![KeyEvent::rune('a', ModifierMask::empty())]);
    }

    #[test]
    fn arrow_key_sequence() {
        let mut p = xterm_parser();
        p.feed(b"\x1b[A");
        let events = p.poll(Instant::now());
        assert_eq!(events, vec![KeyEvent::key(Key::Up, ModifierMask::empty())]);
    }

    #[test]
    fn lone_esc_waits_then_resolves_after_timeout() {
        let mut p = xterm_parser();
        p.feed(b"\x1b");
        let t0 = Instant::now();
        assert!(p.poll(t0).is_empty());
        let events = p.poll(t0 + DEFAULT_KEY_TIMEOUT + Duration::from_millis(1));
        assert_eq!(events, vec![KeyEvent::key(Key::Esc, ModifierMask::empty())]);
    }

    #[test]
    fn esc_then_rune_resolves_immediately_as_alt() {
        let mut p = xterm_parser();
        p.feed(b"\x1ba");
        let events = p.poll(Instant::now());
        assert_eq!(events, vec![KeyEvent::rune('a', ModifierMask::ALT)]);
    }

    #[test]
    fn ctrl_c_maps_to_rune_c_with_ctrl() {
        let mut p = xterm_parser();
        p.feed(&[0x03]);
        let events = p.poll(Instant::now());
        assert_eq!(events, vec![KeyEvent::rune('c', ModifierMask::CTRL)]);
    }

    #[test]
    fn enter_and_tab_carry_no_modifier() {
        let mut p = xterm_parser();
        p.feed(&[0x0d, 0x09]);
        let events = p.poll(Instant::now());
        assert_eq!(
            events,
            vec![
                KeyEvent::key(Key::Enter, ModifierMask::empty()),
                KeyEvent::key(Key::Tab, ModifierMask::empty()),
            ]
        );
    }

    #[test]
    fn utf8_multibyte_rune_decodes() {
        let mut p = xterm_parser();
        p.feed("é".as_bytes());
        let events = p.poll(Instant::now());
        assert_eq!(events, vec![KeyEvent::rune('é', ModifierMask::empty())]);
    }

    #[test]
    fn shift_up_modifier_grid() {
        let mut p = xterm_parser();
        p.feed(b"\x1b[1;2A");
        let events = p.poll(Instant::now());
        assert_eq!(events, vec![KeyEvent::key(Key::Up, ModifierMask::SHIFT)]);
    }
}
