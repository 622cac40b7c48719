//! Input Demultiplexer: a single scanner that routes raw TTY bytes to
//! whichever of the key/mouse parsers actually owns them (spec.md §2
//! "Input Demultiplexer", §4.4 step 1, §4.5).
//!
//! The source forks every byte to two independently-running parser
//! tasks, each of which recognizes and skips the other's wire prefix.
//! Here the classification lives in one place instead: once a leading
//! run of bytes is established not to be a mouse report opener, it can
//! never retroactively become one, so it is handed to the key parser
//! in one batch and the key parser's own longest-match scan takes over
//! (see `DESIGN.md`).

use std::time::Instant;

use vtterm_info::{Size, Terminfo};
use vtterm_input::{KeyEvent, KeyParser, MouseEvent, MouseParser};

/// Mouse reports are a handful of bytes; anything longer without a
/// terminator is not a well-formed SGR report (spec.md §7 "Parser
/// malformed input": silently dropped).
const MAX_MOUSE_REPORT_LEN: usize = 32;

pub struct Demux {
    key_parser: KeyParser,
    mouse_parser: MouseParser,
    pending: Vec<u8>,
    pending_since: Option<Instant>,
    timeout: std::time::Duration,
}

fn could_still_be_mouse_prefix(buf: &[u8]) -> bool {
    matches!(buf, [0x1b] | [0x1b, b'['])
}

impl Demux {
    #[must_use]
    pub fn new(terminfo: &Terminfo, size: Size, key_timeout: std::time::Duration) -> Self {
        Self {
            key_parser: KeyParser::new(terminfo, key_timeout),
            mouse_parser: MouseParser::new(size),
            pending: Vec::new(),
            pending_since: None,
            timeout: key_timeout,
        }
    }

    pub fn resize(&mut self, size: Size) {
        self.mouse_parser.resize(size);
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        if self.pending.is_empty() {
            self.pending_since = Some(Instant::now());
        }
        self.pending.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn poll(&mut self, now: Instant) -> (Vec<KeyEvent>, Vec<MouseEvent>) {
        let mouse_events = self.drain_mouse_reports(now);
        let key_events = self.key_parser.poll(now);
        (key_events, mouse_events)
    }

    fn timed_out(&self, now: Instant) -> bool {
        self.pending_since
            .is_some_and(|since| now.duration_since(since) >= self.timeout)
    }

    fn drain_mouse_reports(&mut self, now: Instant) -> Vec<MouseEvent> {
        let mut events = Vec::new();
        loop {
            if self.pending.is_empty() {
                break;
            }

            if self.pending.starts_with(b"\x1b[<") {
                if let Some(rel) = self.pending[3..].iter().position(|&b| b == b'M' || b == b'm') {
                    let len = 3 + rel + 1;
                    let report: Vec<u8> = self.pending.drain(..len).collect();
                    if let Some(event) = self.mouse_parser.decode(&report) {
                        events.push(event);
                    }
                    self.pending_since = Some(now);
                    continue;
                }
                if self.pending.len() > MAX_MOUSE_REPORT_LEN {
                    self.pending.remove(0);
                    continue;
                }
                break;
            }

            if self.pending.starts_with(b"\x1b[M") {
                if self.pending.len() >= 6 {
                    let report: Vec<u8> = self.pending.drain(..6).collect();
                    if let Some(event) = self.mouse_parser.decode(&report) {
                        events.push(event);
                    }
                    self.pending_since = Some(now);
                    continue;
                }
                break;
            }

            if self.pending[0] == 0x1b
                && could_still_be_mouse_prefix(&self.pending)
                && !self.timed_out(now)
            {
                break;
            }

            // This run, starting here, is decided not to be (or not to
            // continue as) a mouse report opener. Hand it to the key
            // parser up to (but not including) the next ESC, which may
            // itself open an independent mouse report next iteration.
            let cut = self.pending[1..]
                .iter()
                .position(|&b| b == 0x1b)
                .map_or(self.pending.len(), |i| i + 1);
            let chunk: Vec<u8> = self.pending.drain(..cut).collect();
            self.key_parser.feed(&chunk);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtterm_info::TerminfoRegistry;
    use vtterm_input::{ButtonMask, Key, ModifierMask, DEFAULT_KEY_TIMEOUT};

    fn demux() -> Demux {
        let reg = TerminfoRegistry::with_defaults();
        let terminfo = reg.lookup("xterm", None).unwrap();
        Demux::new(&terminfo, Size::new(80, 24), DEFAULT_KEY_TIMEOUT)
    }

    #[test]
    fn sgr_mouse_report_is_routed_to_mouse_parser() {
        let mut d = demux();
        d.feed(b"\x1b[<0;10;20M");
        let (keys, mice) = d.poll(Instant::now());
        assert!(keys.is_empty());
        assert_eq!(mice.len(), 1);
        assert_eq!(mice[0].buttons, ButtonMask::BUTTON1);
    }

    #[test]
    fn arrow_key_is_routed_to_key_parser() {
        let mut d = demux();
        d.feed(b"\x1b[A");
        let (keys, mice) = d.poll(Instant::now());
        assert!(mice.is_empty());
        assert_eq!(keys, vec![KeyEvent::key(Key::Up, ModifierMask::empty())]);
    }

    #[test]
    fn mixed_stream_routes_each_unit_correctly() {
        let mut d = demux();
        d.feed(b"a\x1b[<0;1;1Mb");
        let (keys, mice) = d.poll(Instant::now());
        assert_eq!(mice.len(), 1);
        assert_eq!(
            keys,
            vec![
                KeyEvent::rune('a', ModifierMask::empty()),
                KeyEvent::rune('b', ModifierMask::empty()),
            ]
        );
    }

    #[test]
    fn lone_esc_still_resolves_after_timeout() {
        let mut d = demux();
        d.feed(b"\x1b");
        let t0 = Instant::now();
        assert!(d.poll(t0).0.is_empty());
        let (keys, _) = d.poll(t0 + DEFAULT_KEY_TIMEOUT + std::time::Duration::from_millis(1));
        assert_eq!(keys, vec![KeyEvent::key(Key::Esc, ModifierMask::empty())]);
    }
}
