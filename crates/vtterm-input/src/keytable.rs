//! Builds the key-code table from a [`vtterm_info::Terminfo`] record:
//! named function-key capabilities plus the synthesized XTerm
//! modifier grid (spec.md §4.4 "Key code preparation").

use vtterm_info::Terminfo;

use crate::event::{Key, ModifierMask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// An exact, longest registered sequence matched; consumes
    /// `usize` bytes.
    Complete(usize, Key, ModifierMask),
    /// The buffer is a strict prefix of at least one registered
    /// sequence: wait for more bytes (or the ESC-disambiguation
    /// timeout).
    Partial,
    /// No registered sequence can possibly match, regardless of how
    /// many more bytes arrive.
    None,
}

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    key: Key,
    modifiers: ModifierMask,
}

#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    entries: Vec<Entry>,
}

fn key_from_capability(name: &str) -> Option<Key> {
    Some(match name {
        "kcuu1" => Key::Up,
        "kcud1" => Key::Down,
        "kcuf1" => Key::Right,
        "kcub1" => Key::Left,
        "khome" => Key::Home,
        "kend" => Key::End,
        "kich1" => Key::Insert,
        "kdch1" => Key::Delete,
        "kpp" => Key::PageUp,
        "knp" => Key::PageDown,
        "kf1" => Key::Function(1),
        "kf2" => Key::Function(2),
        "kf3" => Key::Function(3),
        "kf4" => Key::Function(4),
        "kf5" => Key::Function(5),
        "kf6" => Key::Function(6),
        "kf7" => Key::Function(7),
        "kf8" => Key::Function(8),
        "kf9" => Key::Function(9),
        "kf10" => Key::Function(10),
        "kf11" => Key::Function(11),
        "kf12" => Key::Function(12),
        _ => return None,
    })
}

/// XTerm modifier parameter -> [`ModifierMask`]. `code = 1 + bits`
/// where bit0=Shift, bit1=Alt, bit2=Ctrl, bit3=Meta (spec.md §4.4:
/// `;2~` Shift .. `;9~` Meta .. `;10-;16` Meta combinations).
fn modmask_from_xterm_code(code: u8) -> ModifierMask {
    let bits = code.saturating_sub(1);
    let mut m = ModifierMask::empty();
    if bits & 1 != 0 {
        m |= ModifierMask::SHIFT;
    }
    if bits & 2 != 0 {
        m |= ModifierMask::ALT;
    }
    if bits & 4 != 0 {
        m |= ModifierMask::CTRL;
    }
    if bits & 8 != 0 {
        m |= ModifierMask::META;
    }
    m
}

impl KeyTable {
    #[must_use]
    pub fn build(terminfo: &Terminfo) -> Self {
        let mut entries = Vec::new();

        for (name, seq) in &terminfo.function_keys {
            if let Some(key) = key_from_capability(name) {
                entries.push(Entry {
                    bytes: seq.as_bytes().to_vec(),
                    key,
                    modifiers: ModifierMask::empty(),
                });
            }
        }

        if terminfo.xterm_modifiers {
            Self::synthesize_modifier_grid(terminfo, &mut entries);
        }

        // Longest-first so `match_buffer`'s linear scan naturally
        // prefers the longest match without extra bookkeeping.
        entries.sort_by(|a, b| b.bytes.len().cmp(&a.bytes.len()));
        Self { entries }
    }

    fn synthesize_modifier_grid(terminfo: &Terminfo, entries: &mut Vec<Entry>) {
        // Arrow keys: CSI letter form, modified via "\x1b[1;<code><letter>".
        let arrows: &[(&str, u8, Key)] = &[
            ("kcuu1", b'A', Key::Up),
            ("kcud1", b'B', Key::Down),
            ("kcuf1", b'C', Key::Right),
            ("kcub1", b'D', Key::Left),
        ];
        for (cap, letter, key) in arrows {
            if terminfo.function_keys.get(cap).is_none() {
                continue;
            }
            for code in 2u8..=16 {
                entries.push(Entry {
                    bytes: format!("\x1b[1;{code}{}", *letter as char).into_bytes(),
                    key: *key,
                    modifiers: modmask_from_xterm_code(code),
                });
            }
        }

        // Home/End: CSI letter form too.
        let home_end: &[(&str, u8, Key)] = &[("khome", b'H', Key::Home), ("kend", b'F', Key::End)];
        for (cap, letter, key) in home_end {
            if terminfo.function_keys.get(cap).is_none() {
                continue;
            }
            for code in 2u8..=16 {
                entries.push(Entry {
                    bytes: format!("\x1b[1;{code}{}", *letter as char).into_bytes(),
                    key: *key,
                    modifiers: modmask_from_xterm_code(code),
                });
            }
        }

        // Tilde-numbered keys: "\x1b[<n>;<code>~".
        let tilde: &[(&str, u16, Key)] = &[
            ("kich1", 2, Key::Insert),
            ("kdch1", 3, Key::Delete),
            ("kpp", 5, Key::PageUp),
            ("knp", 6, Key::PageDown),
            ("kf5", 15, Key::Function(5)),
            ("kf6", 17, Key::Function(6)),
            ("kf7", 18, Key::Function(7)),
            ("kf8", 19, Key::Function(8)),
            ("kf9", 20, Key::Function(9)),
            ("kf10", 21, Key::Function(10)),
            ("kf11", 23, Key::Function(11)),
            ("kf12", 24, Key::Function(12)),
        ];
        for (cap, num, key) in tilde {
            if terminfo.function_keys.get(cap).is_none() {
                continue;
            }
            for code in 2u8..=16 {
                entries.push(Entry {
                    bytes: format!("\x1b[{num};{code}~").into_bytes(),
                    key: *key,
                    modifiers: modmask_from_xterm_code(code),
                });
            }
        }

        // F1-F4: SS3 base ("\x1bOP".."\x1bOS"), modified form is
        // always CSI, never SS3 (spec.md §4.4 "ESC O <letter>").
        let ss3_fn: &[(&str, u8, Key)] = &[
            ("kf1", b'P', Key::Function(1)),
            ("kf2", b'Q', Key::Function(2)),
            ("kf3", b'R', Key::Function(3)),
            ("kf4", b'S', Key::Function(4)),
        ];
        for (cap, letter, key) in ss3_fn {
            if terminfo.function_keys.get(cap).is_none() {
                continue;
            }
            for code in 2u8..=16 {
                entries.push(Entry {
                    bytes: format!("\x1b[1;{code}{}", *letter as char).into_bytes(),
                    key: *key,
                    modifiers: modmask_from_xterm_code(code),
                });
            }
        }
    }

    /// Longest-match against `buf`: see [`MatchResult`].
    #[must_use]
    pub fn match_buffer(&self, buf: &[u8]) -> MatchResult {
        let mut best: Option<(usize, Key, ModifierMask)> = None;
        let mut partial = false;
        for entry in &self.entries {
            let n = entry.bytes.len();
            if n <= buf.len() && buf[..n] == entry.bytes[..] {
                if best.is_none_or(|(best_n, _, _)| n > best_n) {
                    best = Some((n, entry.key, entry.modifiers));
                }
            } else if n > buf.len() && entry.bytes[..buf.len()] == *buf {
                partial = true;
            }
        }
        match best {
            Some((n, key, modifiers)) => MatchResult::Complete(n, key, modifiers),
            None if partial => MatchResult::Partial,
            None => MatchResult::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtterm_info::TerminfoRegistry;

    fn xterm_table() -> KeyTable {
        let reg = TerminfoRegistry::with_defaults();
        KeyTable::build(&reg.lookup("xterm", None).unwrap())
    }

    #[test]
    fn plain_arrow_up_matches() {
        let table = xterm_table();
        assert_eq!(
            table.match_buffer(b"\x1b[A"),
            MatchResult::Complete(3, Key::Up, ModifierMask::empty())
        );
    }

    #[test]
    fn longer_sequence_wins_over_shorter_prefix() {
        let table = xterm_table();
        // "\x1b[1;2A" (Shift+Up) shares the "\x1b[1;" prefix family
        // with many entries; a complete buffer must pick the exact,
        // longest registered match, not a shorter coincidental one.
        let (n, key, modifiers) = match table.match_buffer(b"\x1b[1;2A") {
            MatchResult::Complete(n, k, m) => (n, k, m),
            other => panic!("expected complete match, got {other:?}"),
        };
        assert_eq!(n, 6);
        assert_eq!(key, Key::Up);
        assert_eq!(modifiers, ModifierMask::SHIFT);
    }

    #[test]
    fn partial_prefix_reports_partial() {
        let table = xterm_table();
        assert_eq!(table.match_buffer(b"\x1b["), MatchResult::Partial);
    }

    #[test]
    fn unrelated_bytes_report_none() {
        let table = xterm_table();
        assert_eq!(table.match_buffer(b"\x1bZ"), MatchResult::None);
    }
}
