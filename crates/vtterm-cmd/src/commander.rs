use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Mutex;

use tracing::{trace, warn};
use vtterm_info::{Color, Evaluator, Position, Size, Terminfo};

struct CommanderState {
    terminfo: Terminfo,
    evaluator: Evaluator,
    goto_cache: HashMap<u32, Vec<u8>>,
    color_cache: HashMap<(bool, bool, Color), Vec<u8>>,
    both_color_cache: HashMap<(bool, Color, Color), Vec<u8>>,
}

/// Caches the evaluator's output for frequent calls and exposes
/// "put `<capability>`" / "write color" primitives. A single lock
/// guards the evaluator's scratch state and both caches (spec.md
/// §4.2 "Concurrency").
///
/// The Commander owns its own copy of the [`Terminfo`] record rather
/// than borrowing from a shared registry, so a caller is free to drop
/// the registry once every terminal's Commander has been built (see
/// `DESIGN.md`).
pub struct Commander {
    state: Mutex<CommanderState>,
}

impl Commander {
    #[must_use]
    pub fn new(terminfo: Terminfo) -> Self {
        Self {
            state: Mutex::new(CommanderState {
                terminfo,
                evaluator: Evaluator::new(),
                goto_cache: HashMap::new(),
                color_cache: HashMap::new(),
                both_color_cache: HashMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn num_colors(&self) -> u32 {
        self.state.lock().unwrap().terminfo.num_colors
    }

    #[must_use]
    pub fn has_truecolor(&self) -> bool {
        self.state.lock().unwrap().terminfo.has("setrgbf")
    }

    #[must_use]
    pub fn can_set_fg(&self) -> bool {
        self.state.lock().unwrap().terminfo.has("setaf")
    }

    #[must_use]
    pub fn can_set_bg(&self) -> bool {
        self.state.lock().unwrap().terminfo.has("setab")
    }

    #[must_use]
    pub fn can_set_fg_bg_together(&self) -> bool {
        self.state.lock().unwrap().terminfo.has("setfb")
    }

    #[must_use]
    pub fn can_set_rgb(&self) -> bool {
        self.has_truecolor()
    }

    /// Evaluate and write a named constant capability. A missing
    /// capability is a no-op (spec.md §7 "Missing capability").
    pub fn put(&self, name: &str, writer: &mut impl Write) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some(template) = state.terminfo.get(name).map(str::to_string) else {
            trace!(capability = name, "capability absent; no-op");
            return Ok(());
        };
        let bytes = state.evaluator.evaluate(&template, &[]);
        writer.write_all(&bytes)
    }

    pub fn put_clear(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("clear", w)
    }
    pub fn put_enter_alternate_screen(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("smcup", w)
    }
    pub fn put_exit_alternate_screen(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("rmcup", w)
    }
    pub fn put_enter_keypad(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("smkx", w)
    }
    pub fn put_exit_keypad(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("rmkx", w)
    }
    pub fn put_show_cursor(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("cnorm", w)
    }
    pub fn put_hide_cursor(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("civis", w)
    }
    pub fn put_attribute_off(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("sgr0", w)
    }
    pub fn put_bold(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("bold", w)
    }
    pub fn put_dim(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("dim", w)
    }
    pub fn put_italic(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("sitm", w)
    }
    pub fn put_underline(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("smul", w)
    }
    pub fn put_blink(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("blink", w)
    }
    pub fn put_reverse(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("rev", w)
    }
    pub fn put_strikethrough(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("smxx", w)
    }
    pub fn put_reset_fg_bg(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("op", w)
    }
    pub fn put_enable_mouse(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("smcx", w)
    }
    pub fn put_disable_mouse(&self, w: &mut impl Write) -> io::Result<()> {
        self.put("rmcx", w)
    }

    /// Write cached cursor-addressing bytes for the given position
    /// hash (spec.md §3 `Position`). On a cache miss, evaluates `cup`
    /// with `(row, col)` args — the `cup` template increments both
    /// via `%i` and renders row before column (spec.md §8 scenario 1).
    pub fn goto(&self, writer: &mut impl Write, position_hash: u32) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(cached) = state.goto_cache.get(&position_hash) {
            return writer.write_all(cached);
        }
        let (col, row) = Position::unhash(position_hash);
        let Some(template) = state.terminfo.get("cup").map(str::to_string) else {
            warn!("terminal has no cursor-addressing capability");
            return Ok(());
        };
        let bytes = state
            .evaluator
            .evaluate(&template, &[i64::from(row), i64::from(col)]);
        state.goto_cache.insert(position_hash, bytes.clone());
        writer.write_all(&bytes)
    }

    /// Pre-populate the goto cache for every `(col, row)` combination
    /// within `size`. The hash function is injective over the full
    /// representable range, so no collisions are possible here.
    pub fn build_goto_cache(&self, size: Size) {
        let mut state = self.state.lock().unwrap();
        let Some(template) = state.terminfo.get("cup").map(str::to_string) else {
            return;
        };
        for row in 0..size.rows {
            for col in 0..size.columns {
                let hash = Position::new(i32::from(col), i32::from(row)).hash();
                if state.goto_cache.contains_key(&hash) {
                    continue;
                }
                let bytes = state
                    .evaluator
                    .evaluate(&template, &[i64::from(row), i64::from(col)]);
                state.goto_cache.insert(hash, bytes);
            }
        }
    }

    /// Write one color, foreground or background. Cache key is
    /// `(is_foreground, is_palette_indexed, color)`.
    pub fn write_color(
        &self,
        writer: &mut impl Write,
        color: Color,
        is_foreground: bool,
        is_palette_indexed: bool,
    ) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        let key = (is_foreground, is_palette_indexed, color);
        if let Some(cached) = state.color_cache.get(&key) {
            return writer.write_all(cached);
        }
        let cap = if is_foreground { "setaf" } else { "setab" };
        let bytes = if is_palette_indexed {
            let Some(idx) = color.as_palette_index() else {
                return Ok(());
            };
            let Some(template) = state.terminfo.get(cap).map(str::to_string) else {
                return Ok(());
            };
            state.evaluator.evaluate(&template, &[i64::from(idx)])
        } else {
            let Some((r, g, b)) = color.as_rgb() else {
                return Ok(());
            };
            let rgb_cap = if is_foreground { "setrgbf" } else { "setrgbb" };
            let Some(template) = state.terminfo.get(rgb_cap).map(str::to_string) else {
                return Ok(());
            };
            state
                .evaluator
                .evaluate(&template, &[i64::from(r), i64::from(g), i64::from(b)])
        };
        state.color_cache.insert(key, bytes.clone());
        writer.write_all(&bytes)
    }

    /// Write both colors in one sequence when the terminal has a
    /// combined capability; cache key is `(is_palette_indexed, fg, bg)`.
    pub fn write_both_colors(
        &self,
        writer: &mut impl Write,
        fg: Color,
        bg: Color,
        is_palette_indexed: bool,
    ) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        let key = (is_palette_indexed, fg, bg);
        if let Some(cached) = state.both_color_cache.get(&key) {
            return writer.write_all(cached);
        }
        let bytes = if is_palette_indexed {
            let (Some(fg_idx), Some(bg_idx)) =
                (fg.as_palette_index(), bg.as_palette_index())
            else {
                return Ok(());
            };
            let Some(template) = state.terminfo.get("setfb").map(str::to_string) else {
                return Ok(());
            };
            state
                .evaluator
                .evaluate(&template, &[i64::from(fg_idx), i64::from(bg_idx)])
        } else {
            let (Some((fr, fgc, fb)), Some((br, bgc, bb))) = (fg.as_rgb(), bg.as_rgb()) else {
                return Ok(());
            };
            let Some(template) = state.terminfo.get("setrgbfb").map(str::to_string) else {
                return Ok(());
            };
            state.evaluator.evaluate(
                &template,
                &[
                    i64::from(fr),
                    i64::from(fgc),
                    i64::from(fb),
                    i64::from(br),
                    i64::from(bgc),
                    i64::from(bb),
                ],
            )
        };
        state.both_color_cache.insert(key, bytes.clone());
        writer.write_all(&bytes)
    }

    /// Legacy 8/16-color path. Folds bright indices (8-15) to their
    /// base color when the terminal only has 8 colors.
    pub fn t_color(
        &self,
        writer: &mut impl Write,
        fg_index: u8,
        bg_index: u8,
    ) -> io::Result<()> {
        let nc = self.num_colors();
        let fold = |idx: u8| {
            if nc <= 8 && (8..16).contains(&idx) {
                idx - 8
            } else {
                idx
            }
        };
        self.write_color(
            writer,
            Color::palette(u16::from(fold(fg_index))),
            true,
            true,
        )?;
        self.write_color(
            writer,
            Color::palette(u16::from(fold(bg_index))),
            false,
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtterm_info::TerminfoRegistry;

    fn xterm_commander() -> Commander {
        let reg = TerminfoRegistry::with_defaults();
        Commander::new(reg.lookup("xterm", None).unwrap())
    }

    #[test]
    fn goto_matches_direct_evaluation() {
        let cmd = xterm_commander();
        let mut buf = Vec::new();
        cmd.goto(&mut buf, Position::new(3, 5).hash()).unwrap();
        assert_eq!(buf, b"\x1b[6;4H");
    }

    #[test]
    fn goto_cache_is_consistent_across_calls() {
        let cmd = xterm_commander();
        let hash = Position::new(10, 2).hash();
        let mut a = Vec::new();
        let mut b = Vec::new();
        cmd.goto(&mut a, hash).unwrap();
        cmd.goto(&mut b, hash).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn build_goto_cache_matches_direct_evaluation_everywhere() {
        let cmd = xterm_commander();
        cmd.build_goto_cache(Size::new(8, 4));
        for row in 0..4u16 {
            for col in 0..8u16 {
                let hash = Position::new(i32::from(col), i32::from(row)).hash();
                let mut cached = Vec::new();
                cmd.goto(&mut cached, hash).unwrap();
                let mut direct = Vec::new();
                direct
                    .write_all(&format!("\x1b[{};{}H", row + 1, col + 1).into_bytes())
                    .unwrap();
                assert_eq!(cached, direct);
            }
        }
    }

    #[test]
    fn color_cache_is_consistent() {
        let cmd = xterm_commander();
        let mut a = Vec::new();
        let mut b = Vec::new();
        cmd.write_color(&mut a, Color::palette(200), true, true)
            .unwrap();
        cmd.write_color(&mut b, Color::palette(200), true, true)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a, b"\x1b[38;5;200m");
    }

    #[test]
    fn truecolor_write_color_uses_rgb_template() {
        let reg = TerminfoRegistry::with_defaults();
        let t = reg.lookup("xterm", Some("truecolor")).unwrap();
        let cmd = Commander::new(t);
        let mut out = Vec::new();
        cmd.write_color(&mut out, Color::rgb(1, 2, 3), true, false)
            .unwrap();
        assert_eq!(out, b"\x1b[38;2;1;2;3m");
    }

    #[test]
    fn t_color_folds_bright_to_base_on_eight_color_terminal() {
        let reg = TerminfoRegistry::with_defaults();
        let cmd = Commander::new(reg.lookup("ansi", None).unwrap());
        let mut out = Vec::new();
        cmd.t_color(&mut out, 9, 10).unwrap();
        // fg fold 9->1, bg fold 10->2, ansi uses 3%p1%d / 4%p1%d.
        assert_eq!(out, b"\x1b[31m\x1b[42m");
    }

    #[test]
    fn missing_capability_is_a_silent_no_op() {
        let reg = TerminfoRegistry::with_defaults();
        let cmd = Commander::new(reg.lookup("vt100", None).unwrap());
        let mut out = Vec::new();
        cmd.put_enter_alternate_screen(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
