//! The default rune -> ASCII fallback map (spec.md §4.3).

use std::collections::HashMap;

/// ~30 common Unicode glyphs with an ASCII substitute, used when a
/// rune can't be transcoded and has no ACS entry. Decision recorded
/// in `DESIGN.md`.
const DEFAULT_FALLBACKS: &[(char, &str)] = &[
    ('↑', "^"),
    ('↓', "v"),
    ('←', "<"),
    ('→', ">"),
    ('│', "|"),
    ('─', "-"),
    ('┌', "+"),
    ('└', "+"),
    ('┐', "+"),
    ('┘', "+"),
    ('├', "+"),
    ('┤', "+"),
    ('┬', "+"),
    ('┴', "+"),
    ('┼', "+"),
    ('▒', "#"),
    ('▓', "#"),
    ('█', "#"),
    ('•', "*"),
    ('◆', "+"),
    ('·', "."),
    ('°', "'"),
    ('±', "+/-"),
    ('≤', "<="),
    ('≥', ">="),
    ('≠', "!="),
    ('π', "pi"),
    ('£', "GBP"),
    ('\u{201c}', "\""),
    ('\u{201d}', "\""),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('…', "..."),
    ('—', "--"),
    ('–', "-"),
];

#[must_use]
pub fn default_fallback_map() -> HashMap<char, String> {
    DEFAULT_FALLBACKS
        .iter()
        .map(|(r, s)| (*r, (*s).to_string()))
        .collect()
}
