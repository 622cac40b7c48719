//! VT100 Alternate Character Set: the fixed source-byte chart and the
//! logic that turns a terminal's `acsc` capability string into a
//! rune -> byte-sequence map (spec.md §4.3).

use std::collections::HashMap;

/// The fixed VT100 ACS code chart: `acsc` source byte -> the Unicode
/// glyph ncurses documents it as drawing. Decision recorded in
/// `DESIGN.md` (spec.md's original source was filtered from the
/// retrieval pack; this chart is standard public terminfo
/// documentation, not original-source-derived).
const VT100_ACS_CHART: &[(u8, char)] = &[
    (b'l', '┌'),
    (b'm', '└'),
    (b'k', '┐'),
    (b'j', '┘'),
    (b't', '├'),
    (b'u', '┤'),
    (b'v', '┴'),
    (b'w', '┬'),
    (b'q', '─'),
    (b'x', '│'),
    (b'n', '┼'),
    (b'`', '◆'),
    (b'a', '▒'),
    (b'f', '°'),
    (b'g', '±'),
    (b'~', '·'),
    (b',', '←'),
    (b'+', '→'),
    (b'.', '↓'),
    (b'-', '↑'),
    (b'h', '▓'),
    (b'i', '┼'),
    (b'0', '█'),
    (b'y', '≤'),
    (b'z', '≥'),
    (b'{', 'π'),
    (b'|', '≠'),
    (b'}', '£'),
    (b's', ' '),
];

/// Parse a terminfo `acsc` string (a flat sequence of `src, dest`
/// byte pairs) and build `rune -> enter_acs + dest + exit_acs`
/// entries for every pair whose source byte appears in the fixed
/// VT100 chart.
#[must_use]
pub fn build_acs_map(acsc: &str, enter_acs: &[u8], exit_acs: &[u8]) -> HashMap<char, Vec<u8>> {
    let chart: HashMap<u8, char> = VT100_ACS_CHART.iter().copied().collect();
    let bytes = acsc.as_bytes();
    let mut map = HashMap::new();
    let mut pairs = bytes.chunks_exact(2);
    for pair in &mut pairs {
        let (src, dest) = (pair[0], pair[1]);
        if let Some(&glyph) = chart.get(&src) {
            let mut seq = Vec::with_capacity(enter_acs.len() + exit_acs.len() + 1);
            seq.extend_from_slice(enter_acs);
            seq.push(dest);
            seq.extend_from_slice(exit_acs);
            map.insert(glyph, seq);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_entries_for_recognized_source_bytes() {
        // "lq" is a (src, dest) pair: source byte 'l' (upper-left
        // corner in the VT100 chart) maps to the terminal's own
        // glyph byte 'q' under the active charset.
        let map = build_acs_map("lq", b"\x1b(0", b"\x1b(B");
        assert_eq!(map.get(&'┌'), Some(&b"\x1b(0q\x1b(B".to_vec()));
    }

    #[test]
    fn ignores_unrecognized_source_bytes() {
        let map = build_acs_map("Zq", b"\x1b(0", b"\x1b(B");
        assert!(map.is_empty());
    }

    #[test]
    fn odd_length_acsc_ignores_trailing_byte() {
        let map = build_acs_map("lqx", b"\x1b(0", b"\x1b(B");
        assert_eq!(map.len(), 1);
    }
}
