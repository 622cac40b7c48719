//! Charset transcoders: UTF-8 pass-through and the 8-bit single-byte
//! map (spec.md §1 "Deliberately out of scope" — the broader
//! transcoder registry is a plugin point this crate does not own).

use std::fmt;

#[derive(Debug)]
pub enum CharsetError {
    Unsupported(String),
}

impl fmt::Display for CharsetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharsetError::Unsupported(name) => write!(f, "unsupported charset: {name}"),
        }
    }
}

impl std::error::Error for CharsetError {}

/// Converts a single Unicode scalar value to the bytes a target
/// charset expects. Returns `None` (not an error) when the rune has
/// no representation in this charset — the caller falls through to
/// the ACS map, then the rune-fallback map, then `?` (spec.md §4.3).
pub trait Transcoder: std::fmt::Debug + Send + Sync {
    fn transcode(&self, r: char) -> Option<Vec<u8>>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Default)]
pub struct Utf8Transcoder;

impl Transcoder for Utf8Transcoder {
    fn transcode(&self, r: char) -> Option<Vec<u8>> {
        let mut buf = [0u8; 4];
        Some(r.encode_utf8(&mut buf).as_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "UTF-8"
    }
}

#[derive(Debug, Default)]
pub struct AsciiTranscoder;

impl Transcoder for AsciiTranscoder {
    fn transcode(&self, r: char) -> Option<Vec<u8>> {
        r.is_ascii().then(|| vec![r as u8])
    }

    fn name(&self) -> &'static str {
        "US-ASCII"
    }
}

/// The 8-bit single-byte map spec.md names explicitly: any scalar
/// value in `0..=0xFF` maps to its own byte (an ISO-8859-1-shaped
/// identity map), anything above that fails.
#[derive(Debug, Default)]
pub struct SingleByteTranscoder;

impl Transcoder for SingleByteTranscoder {
    fn transcode(&self, r: char) -> Option<Vec<u8>> {
        let codepoint = r as u32;
        (codepoint <= 0xFF).then_some(vec![codepoint as u8])
    }

    fn name(&self) -> &'static str {
        "single-byte"
    }
}

/// Resolve a charset name (as produced by `vtterm-core`'s env-var
/// detection, spec.md §6) to a transcoder. Anything this crate does
/// not recognize is a hard [`CharsetError`] — the broader transcoder
/// registry is a plugin point outside this crate's scope.
pub fn transcoder_for(charset: &str) -> Result<Box<dyn Transcoder>, CharsetError> {
    match charset {
        "UTF-8" => Ok(Box::new(Utf8Transcoder)),
        "US-ASCII" => Ok(Box::new(AsciiTranscoder)),
        "ISO-8859-1" | "ISO-8859-15" | "single-byte" => Ok(Box::new(SingleByteTranscoder)),
        other => Err(CharsetError::Unsupported(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_transcoder_round_trips_ascii_range() {
        let t = Utf8Transcoder;
        for b in 0x20u8..=0x7E {
            let r = char::from(b);
            assert_eq!(t.transcode(r), Some(vec![b]));
        }
    }

    #[test]
    fn ascii_transcoder_rejects_non_ascii() {
        let t = AsciiTranscoder;
        assert_eq!(t.transcode('é'), None);
        assert_eq!(t.transcode('a'), Some(vec![b'a']));
    }

    #[test]
    fn single_byte_transcoder_rejects_above_0xff() {
        let t = SingleByteTranscoder;
        assert_eq!(t.transcode('\u{100}'), None);
        assert_eq!(t.transcode('\u{e9}'), Some(vec![0xe9]));
    }

    #[test]
    fn unknown_charset_is_an_error() {
        assert!(transcoder_for("Shift_JIS").is_err());
    }
}
