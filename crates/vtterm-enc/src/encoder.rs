use std::collections::HashMap;

use tracing::trace;

use crate::acs::build_acs_map;
use crate::charset::{transcoder_for, CharsetError, Transcoder};
use crate::fallback::default_fallback_map;

/// Converts runes to the byte sequence the TTY should receive,
/// following the lookup chain in spec.md §4.3: per-rune cache,
/// charset transcoder, VT100 ACS map, ASCII fallback map, `?`.
pub struct RuneEncoder {
    transcoder: Box<dyn Transcoder>,
    cache: HashMap<char, Vec<u8>>,
    acs_map: HashMap<char, Vec<u8>>,
    fallback_map: HashMap<char, String>,
}

impl RuneEncoder {
    /// `acsc` is the terminal's raw `acsc` terminfo string; `enter_acs`
    /// / `exit_acs` are its `smacs`/`rmacs` byte sequences.
    ///
    /// # Errors
    ///
    /// Returns [`CharsetError`] if `charset` has no transcoder
    /// (spec.md §7 "No-charset", fatal at construction).
    pub fn new(charset: &str, acsc: &str, enter_acs: &[u8], exit_acs: &[u8]) -> Result<Self, CharsetError> {
        Ok(Self {
            transcoder: transcoder_for(charset)?,
            cache: HashMap::new(),
            acs_map: build_acs_map(acsc, enter_acs, exit_acs),
            fallback_map: default_fallback_map(),
        })
    }

    #[must_use]
    pub fn charset_name(&self) -> &'static str {
        self.transcoder.name()
    }

    pub fn set_rune_fallback(&mut self, r: char, replacement: impl Into<String>) {
        self.fallback_map.insert(r, replacement.into());
    }

    pub fn unset_rune_fallback(&mut self, r: char) {
        self.fallback_map.remove(&r);
    }

    /// `true` if `r` can be rendered: the transcoder succeeds, or an
    /// ACS entry exists, or (`check_fallbacks`) the fallback map has
    /// an entry. Whether `check_fallbacks` should apply when the
    /// terminal charset is already UTF-8 is an open question spec.md
    /// §9 leaves unresolved; this mirrors the unconditional behavior
    /// it describes rather than special-casing UTF-8 (see
    /// `DESIGN.md`).
    #[must_use]
    pub fn can_display(&self, r: char, check_fallbacks: bool) -> bool {
        if self.cache.contains_key(&r) || self.transcoder.transcode(r).is_some() {
            return true;
        }
        if self.acs_map.contains_key(&r) {
            return true;
        }
        check_fallbacks && self.fallback_map.contains_key(&r)
    }

    /// Append the bytes that realize `r` on the TTY to `out`,
    /// returning the number of bytes appended.
    pub fn encode_rune(&mut self, r: char, out: &mut Vec<u8>) -> usize {
        if let Some(cached) = self.cache.get(&r) {
            out.extend_from_slice(cached);
            return cached.len();
        }
        if let Some(bytes) = self.transcoder.transcode(r) {
            out.extend_from_slice(&bytes);
            let len = bytes.len();
            self.cache.insert(r, bytes);
            return len;
        }
        if let Some(seq) = self.acs_map.get(&r) {
            out.extend_from_slice(seq);
            let len = seq.len();
            self.cache.insert(r, seq.clone());
            return len;
        }
        if let Some(replacement) = self.fallback_map.get(&r) {
            trace!(rune = %r, replacement, "rune fallback");
            out.extend_from_slice(replacement.as_bytes());
            return replacement.len();
        }
        out.push(b'?');
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8_encoder() -> RuneEncoder {
        RuneEncoder::new("UTF-8", "lq", b"\x1b(0", b"\x1b(B").unwrap()
    }

    #[test]
    fn ascii_round_trips_under_utf8_charset() {
        let mut enc = utf8_encoder();
        for b in 0x20u8..=0x7E {
            let mut out = Vec::new();
            enc.encode_rune(char::from(b), &mut out);
            assert_eq!(out, vec![b]);
        }
    }

    #[test]
    fn unicode_rune_caches_after_first_encode() {
        let mut enc = utf8_encoder();
        let mut out = Vec::new();
        enc.encode_rune('é', &mut out);
        assert_eq!(out, "é".as_bytes());
        let mut out2 = Vec::new();
        enc.encode_rune('é', &mut out2);
        assert_eq!(out2, "é".as_bytes());
    }

    #[test]
    fn acs_entry_used_when_transcoder_cannot_represent_rune() {
        // Force a single-byte charset that cannot encode box-drawing
        // glyphs, so the ACS map is consulted.
        let mut enc = RuneEncoder::new("US-ASCII", "lq", b"\x1b(0", b"\x1b(B").unwrap();
        let mut out = Vec::new();
        enc.encode_rune('┌', &mut out);
        assert_eq!(out, b"\x1b(0q\x1b(B");
    }

    #[test]
    fn fallback_used_when_no_transcoder_or_acs_entry() {
        let mut enc = RuneEncoder::new("US-ASCII", "", b"", b"").unwrap();
        let mut out = Vec::new();
        enc.encode_rune('↑', &mut out);
        assert_eq!(out, b"^");
    }

    #[test]
    fn unknown_rune_falls_back_to_question_mark() {
        let mut enc = RuneEncoder::new("US-ASCII", "", b"", b"").unwrap();
        let mut out = Vec::new();
        enc.encode_rune('\u{4e2d}', &mut out);
        assert_eq!(out, b"?");
    }

    #[test]
    fn custom_fallback_override_takes_effect() {
        let mut enc = RuneEncoder::new("US-ASCII", "", b"", b"").unwrap();
        enc.set_rune_fallback('↑', "UP");
        let mut out = Vec::new();
        enc.encode_rune('↑', &mut out);
        assert_eq!(out, b"UP");
    }

    #[test]
    fn can_display_respects_check_fallbacks_flag() {
        let enc = RuneEncoder::new("US-ASCII", "", b"", b"").unwrap();
        assert!(!enc.can_display('↑', false));
        assert!(enc.can_display('↑', true));
    }
}
