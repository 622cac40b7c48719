//! Terminfo records and the process-wide registry that seeds them.
//!
//! The real embedded terminfo database is out of scope for this crate
//! (spec.md §1): we carry a small, statically compiled base set
//! (`xterm`, `vt100`, `vt102`, `vt220`, `ansi`) good enough to drive
//! the Commander and key-code table, and treat anything richer as a
//! pluggable catalog a host can supply.

use std::collections::HashMap;

use tracing::warn;

/// One terminal's capability record: string templates keyed by
/// capability name, plus a handful of scalar fields. Immutable after
/// load.
#[derive(Debug, Clone)]
pub struct Terminfo {
    pub name: String,
    pub num_colors: u32,
    pub columns: u16,
    pub lines: u16,
    /// Capability name -> template string (may contain `%`
    /// operators, interpreted by [`crate::eval::Evaluator`]).
    pub strings: HashMap<&'static str, String>,
    /// Function-key name (e.g. `"kcuu1"`, `"kf1"`) -> raw byte
    /// sequence the terminal sends for that key.
    pub function_keys: HashMap<&'static str, String>,
    /// Whether this terminal is known to emit XTerm-style modifier
    /// suffixes (`;2~`, `;5~`, ...) on arrow/function/navigation keys.
    pub xterm_modifiers: bool,
    pub pad_char: Option<u8>,
}

impl Terminfo {
    #[must_use]
    pub fn get(&self, capability: &str) -> Option<&str> {
        self.strings.get(capability).map(String::as_str)
    }

    #[must_use]
    pub fn has(&self, capability: &str) -> bool {
        self.strings.contains_key(capability)
    }

    /// Invariant from spec.md §3: either both `setaf`/`setab` are
    /// present, or color output is disabled.
    #[must_use]
    pub fn colors_consistent(&self) -> bool {
        if self.num_colors == 0 {
            return true;
        }
        self.has("setaf") && self.has("setab")
    }

    /// Clone this record and insert ISO 8613-6 truecolor RGB
    /// capabilities, used when `$COLORTERM` advertises 24-bit color
    /// for a terminal whose base entry only has palette colors.
    #[must_use]
    pub fn with_truecolor(&self) -> Self {
        let mut t = self.clone();
        t.strings
            .insert("setrgbf", "\x1b[38;2;%p1%d;%p2%d;%p3%dm".to_string());
        t.strings
            .insert("setrgbb", "\x1b[48;2;%p1%d;%p2%d;%p3%dm".to_string());
        t.strings.insert(
            "setrgbfb",
            "\x1b[38;2;%p1%d;%p2%d;%p3%d;48;2;%p4%d;%p5%d;%p6%dm".to_string(),
        );
        t.num_colors = 1 << 24;
        t
    }
}

fn strings(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
    pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
}

fn function_keys(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
    pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
}

const ARROW_AND_NAV_KEYS: &[(&str, &str)] = &[
    ("kcuu1", "\x1b[A"),
    ("kcud1", "\x1b[B"),
    ("kcuf1", "\x1b[C"),
    ("kcub1", "\x1b[D"),
    ("khome", "\x1b[H"),
    ("kend", "\x1b[F"),
    ("kich1", "\x1b[2~"),
    ("kdch1", "\x1b[3~"),
    ("kpp", "\x1b[5~"),
    ("knp", "\x1b[6~"),
    ("kf1", "\x1bOP"),
    ("kf2", "\x1bOQ"),
    ("kf3", "\x1bOR"),
    ("kf4", "\x1bOS"),
    ("kf5", "\x1b[15~"),
    ("kf6", "\x1b[17~"),
    ("kf7", "\x1b[18~"),
    ("kf8", "\x1b[19~"),
    ("kf9", "\x1b[20~"),
    ("kf10", "\x1b[21~"),
    ("kf11", "\x1b[23~"),
    ("kf12", "\x1b[24~"),
];

fn xterm() -> Terminfo {
    Terminfo {
        name: "xterm".to_string(),
        num_colors: 256,
        columns: 80,
        lines: 24,
        strings: strings(&[
            ("cup", "\x1b[%i%p1%d;%p2%dH"),
            ("smcup", "\x1b[?1049h"),
            ("rmcup", "\x1b[?1049l"),
            ("smkx", "\x1b[?1h\x1b="),
            ("rmkx", "\x1b[?1l\x1b>"),
            ("civis", "\x1b[?25l"),
            ("cnorm", "\x1b[?12l\x1b[?25h"),
            ("clear", "\x1b[H\x1b[2J"),
            ("sgr0", "\x1b(B\x1b[m"),
            ("bold", "\x1b[1m"),
            ("dim", "\x1b[2m"),
            ("sitm", "\x1b[3m"),
            ("ritm", "\x1b[23m"),
            ("smul", "\x1b[4m"),
            ("rmul", "\x1b[24m"),
            ("blink", "\x1b[5m"),
            ("rev", "\x1b[7m"),
            ("smxx", "\x1b[9m"),
            ("rmxx", "\x1b[29m"),
            ("setaf", "\x1b[38;5;%p1%dm"),
            ("setab", "\x1b[48;5;%p1%dm"),
            ("setfb", "\x1b[38;5;%p1%d;48;5;%p2%dm"),
            ("op", "\x1b[39;49m"),
            ("smcx", "\x1b[?1000h\x1b[?1006h"),
            ("rmcx", "\x1b[?1006l\x1b[?1000l"),
            (
                "acsc",
                "``aaffggiijjkkllmmnnooppqqrrssttuuvvwwxxyyzz{{||}}~~",
            ),
        ]),
        function_keys: function_keys(ARROW_AND_NAV_KEYS),
        xterm_modifiers: true,
        pad_char: None,
    }
}

fn vt100() -> Terminfo {
    Terminfo {
        name: "vt100".to_string(),
        num_colors: 0,
        columns: 80,
        lines: 24,
        strings: strings(&[
            ("cup", "\x1b[%i%p1%d;%p2%dH"),
            ("civis", "\x1b[?25l"),
            ("cnorm", "\x1b[?25h"),
            ("clear", "\x1b[H\x1b[2J"),
            ("sgr0", "\x1b[m"),
            ("bold", "\x1b[1m"),
            ("smul", "\x1b[4m"),
            ("rmul", "\x1b[24m"),
            ("blink", "\x1b[5m"),
            ("rev", "\x1b[7m"),
            ("acsc", "``aaffggjjkkllmmnnooppqqrrssttuuvvwwxxyyzz{{||}}~~"),
        ]),
        function_keys: function_keys(&ARROW_AND_NAV_KEYS[..6]),
        xterm_modifiers: false,
        pad_char: None,
    }
}

fn vt102() -> Terminfo {
    let mut t = vt100();
    t.name = "vt102".to_string();
    t.function_keys
        .insert("kich1", "\x1b[2~".to_string());
    t.function_keys
        .insert("kdch1", "\x1b[3~".to_string());
    t
}

fn vt220() -> Terminfo {
    let mut t = vt102();
    t.name = "vt220".to_string();
    t.strings.insert("smkx", "\x1b[?1h".to_string());
    t.strings.insert("rmkx", "\x1b[?1l".to_string());
    for (k, v) in ARROW_AND_NAV_KEYS {
        t.function_keys.entry(k).or_insert_with(|| (*v).to_string());
    }
    t
}

fn ansi() -> Terminfo {
    Terminfo {
        name: "ansi".to_string(),
        num_colors: 8,
        columns: 80,
        lines: 24,
        strings: strings(&[
            ("cup", "\x1b[%i%p1%d;%p2%dH"),
            ("civis", "\x1b[?25l"),
            ("cnorm", "\x1b[?25h"),
            ("clear", "\x1b[H\x1b[2J"),
            ("sgr0", "\x1b[0m"),
            ("bold", "\x1b[1m"),
            ("blink", "\x1b[5m"),
            ("rev", "\x1b[7m"),
            ("setaf", "\x1b[3%p1%dm"),
            ("setab", "\x1b[4%p1%dm"),
            ("op", "\x1b[39;49m"),
        ]),
        function_keys: function_keys(&ARROW_AND_NAV_KEYS[..4]),
        xterm_modifiers: false,
        pad_char: None,
    }
}

/// A `$TERM` -> [`Terminfo`] catalog. Defaults to the statically
/// compiled base set; a host may construct an empty one and insert
/// its own entries (design notes in `DESIGN.md` prefer this over a
/// global mutable registry).
#[derive(Debug, Clone, Default)]
pub struct TerminfoRegistry {
    entries: HashMap<String, Terminfo>,
}

impl TerminfoRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        let mut entries = HashMap::new();
        for t in [xterm(), vt100(), vt102(), vt220(), ansi()] {
            entries.insert(t.name.clone(), t);
        }
        Self { entries }
    }

    pub fn insert(&mut self, terminfo: Terminfo) {
        self.entries.insert(terminfo.name.clone(), terminfo);
    }

    /// Resolve `term` to a [`Terminfo`], synthesizing a truecolor
    /// variant when `colorterm` declares 24-bit color (spec.md §3,
    /// §6: `COLORTERM` env var).
    #[must_use]
    pub fn lookup(&self, term: &str, colorterm: Option<&str>) -> Option<Terminfo> {
        let base = self.entries.get(term).or_else(|| {
            // Fall back to the unsuffixed family (e.g. "xterm-256color" -> "xterm").
            let family = term.split('-').next().unwrap_or(term);
            self.entries.get(family)
        })?;
        let wants_truecolor = matches!(colorterm, Some("truecolor" | "24bit" | "24-bit"));
        if wants_truecolor && !base.has("setrgbf") {
            Some(base.with_truecolor())
        } else {
            Some(base.clone())
        }
    }

    #[must_use]
    pub fn lookup_or_warn(&self, term: &str, colorterm: Option<&str>) -> Option<Terminfo> {
        let result = self.lookup(term, colorterm);
        if result.is_none() {
            warn!(term, "unknown terminal; no terminfo entry and no external dumper configured");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_base_set() {
        let reg = TerminfoRegistry::with_defaults();
        for name in ["xterm", "vt100", "vt102", "vt220", "ansi"] {
            assert!(reg.lookup(name, None).is_some(), "missing {name}");
        }
    }

    #[test]
    fn unknown_terminal_returns_none() {
        let reg = TerminfoRegistry::with_defaults();
        assert!(reg.lookup("no-such-term", None).is_none());
    }

    #[test]
    fn suffixed_term_falls_back_to_family() {
        let reg = TerminfoRegistry::with_defaults();
        assert!(reg.lookup("xterm-256color", None).is_some());
    }

    #[test]
    fn truecolor_synthesis_adds_rgb_capabilities() {
        let reg = TerminfoRegistry::with_defaults();
        let t = reg.lookup("xterm", Some("truecolor")).unwrap();
        assert!(t.has("setrgbf"));
        assert_eq!(t.num_colors, 1 << 24);
    }

    #[test]
    fn all_base_entries_satisfy_color_invariant() {
        let reg = TerminfoRegistry::with_defaults();
        for name in ["xterm", "vt100", "vt102", "vt220", "ansi"] {
            let t = reg.lookup(name, None).unwrap();
            assert!(t.colors_consistent(), "{name} violates color invariant");
        }
    }
}
