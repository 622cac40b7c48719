//! Parameterized-string evaluator: a small stack machine that
//! interprets terminfo capability templates given up to nine integer
//! arguments (spec.md §4.1).

use std::time::Duration;

#[derive(Debug, Clone)]
enum Value {
    Int(i64),
    Str(Vec<u8>),
}

fn pop_int(stack: &mut Vec<Value>) -> i64 {
    match stack.pop() {
        Some(Value::Int(v)) => v,
        Some(Value::Str(s)) => s.len() as i64,
        None => 0,
    }
}

fn pop_str(stack: &mut Vec<Value>) -> Vec<u8> {
    match stack.pop() {
        Some(Value::Str(s)) => s,
        Some(Value::Int(v)) => itoa::Buffer::new().format(v).as_bytes().to_vec(),
        None => Vec::new(),
    }
}

fn write_decimal(out: &mut Vec<u8>, value: i64) {
    out.extend(itoa::Buffer::new().format(value).as_bytes());
}

fn pad_numeric(out: &mut Vec<u8>, digits: Vec<u8>, width: Option<usize>, zero_pad: bool) {
    let width = width.unwrap_or(0);
    if digits.len() < width {
        let fill = if zero_pad { b'0' } else { b' ' };
        out.resize(out.len() + (width - digits.len()), fill);
    }
    out.extend(digits);
}

/// Interprets capability templates. Owns the "static" (`A`-`Z`)
/// variable bank, which persists across calls on the same evaluator
/// instance; "dynamic" (`a`-`z`) variables reset on every call.
///
/// Not reentrant: the owning [`Commander`] (in `vtterm-cmd`) guards
/// this behind a single lock.
#[derive(Debug, Default)]
pub struct Evaluator {
    static_vars: [i64; 26],
}

impl Evaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `template` with up to nine integer arguments, missing
    /// arguments defaulting to zero. Malformed operators are silently
    /// elided rather than aborting the whole emission (spec.md §4.1
    /// "Failure").
    #[must_use]
    pub fn evaluate(&mut self, template: &str, args: &[i64]) -> Vec<u8> {
        let mut arg_buf = [0i64; 9];
        for (slot, value) in arg_buf.iter_mut().zip(args.iter()) {
            *slot = *value;
        }
        let mut dynamic_vars = [0i64; 26];
        let mut stack: Vec<Value> = Vec::new();
        let mut out = Vec::new();
        let bytes = template.as_bytes();
        self.exec(bytes, 0, &mut arg_buf, &mut dynamic_vars, &mut stack, &mut out, true, &[]);
        out
    }

    /// Execute (or, when `execute` is false, merely skip over) the
    /// template starting at `i`, stopping at the first occurrence —
    /// at this nesting level — of a `%<byte>` operator in `stop_set`.
    /// Returns the index just past the consumed stop operator (or the
    /// end of the template) and which stop byte matched, if any.
    ///
    /// Nested `%?...%;` conditionals are fully consumed by recursive
    /// calls before the outer scan resumes, so `stop_set` is only ever
    /// matched at the caller's own level.
    #[allow(clippy::too_many_arguments, clippy::too_many_lines)]
    fn exec(
        &mut self,
        bytes: &[u8],
        mut i: usize,
        args: &mut [i64; 9],
        vars: &mut [i64; 26],
        stack: &mut Vec<Value>,
        out: &mut Vec<u8>,
        execute: bool,
        stop_set: &[u8],
    ) -> (usize, Option<u8>) {
        let len = bytes.len();
        while i < len {
            if bytes[i] != b'%' {
                if execute {
                    out.push(bytes[i]);
                }
                i += 1;
                continue;
            }
            i += 1;
            if i >= len {
                break;
            }
            let c = bytes[i];
            if stop_set.contains(&c) {
                i += 1;
                return (i, Some(c));
            }
            match c {
                b'%' => {
                    i += 1;
                    if execute {
                        out.push(b'%');
                    }
                }
                b'i' => {
                    i += 1;
                    if execute {
                        args[0] += 1;
                        args[1] += 1;
                    }
                }
                b'd' => {
                    i += 1;
                    if execute {
                        let v = pop_int(stack);
                        write_decimal(out, v);
                    }
                }
                b'c' => {
                    i += 1;
                    if execute {
                        let v = pop_int(stack);
                        out.push(v as u8);
                    }
                }
                b's' => {
                    i += 1;
                    if execute {
                        let s = pop_str(stack);
                        out.extend(s);
                    }
                }
                b'p' => {
                    i += 1;
                    let n = if i < len && bytes[i].is_ascii_digit() {
                        let d = bytes[i] - b'0';
                        i += 1;
                        d
                    } else {
                        0
                    };
                    if execute && (1..=9).contains(&n) {
                        stack.push(Value::Int(args[(n - 1) as usize]));
                    }
                }
                b'P' => {
                    i += 1;
                    let v = if i < len {
                        let ch = bytes[i];
                        i += 1;
                        ch
                    } else {
                        0
                    };
                    if execute {
                        let val = pop_int(stack);
                        if v.is_ascii_uppercase() {
                            self.static_vars[(v - b'A') as usize] = val;
                        } else if v.is_ascii_lowercase() {
                            vars[(v - b'a') as usize] = val;
                        }
                    }
                }
                b'g' => {
                    i += 1;
                    let v = if i < len {
                        let ch = bytes[i];
                        i += 1;
                        ch
                    } else {
                        0
                    };
                    if execute {
                        let val = if v.is_ascii_uppercase() {
                            self.static_vars[(v - b'A') as usize]
                        } else if v.is_ascii_lowercase() {
                            vars[(v - b'a') as usize]
                        } else {
                            0
                        };
                        stack.push(Value::Int(val));
                    }
                }
                b'\'' => {
                    i += 1;
                    let ch = if i < len {
                        let ch = bytes[i];
                        i += 1;
                        ch
                    } else {
                        0
                    };
                    if i < len && bytes[i] == b'\'' {
                        i += 1;
                    }
                    if execute {
                        stack.push(Value::Int(i64::from(ch)));
                    }
                }
                b'{' => {
                    i += 1;
                    let start = i;
                    while i < len && bytes[i] != b'}' {
                        i += 1;
                    }
                    let literal = std::str::from_utf8(&bytes[start..i])
                        .ok()
                        .and_then(|s| s.parse::<i64>().ok())
                        .unwrap_or(0);
                    if i < len {
                        i += 1;
                    }
                    if execute {
                        stack.push(Value::Int(literal));
                    }
                }
                b'l' => {
                    i += 1;
                    if execute {
                        let s = pop_str(stack);
                        stack.push(Value::Int(s.len() as i64));
                    }
                }
                b'+' | b'-' | b'*' | b'/' | b'm' | b'&' | b'|' | b'^' | b'=' | b'>' | b'<' => {
                    let op = c;
                    i += 1;
                    if execute {
                        let b = pop_int(stack);
                        let a = pop_int(stack);
                        let r = match op {
                            b'+' => a.wrapping_add(b),
                            b'-' => a.wrapping_sub(b),
                            b'*' => a.wrapping_mul(b),
                            b'/' => {
                                if b == 0 {
                                    0
                                } else {
                                    a / b
                                }
                            }
                            b'm' => {
                                if b == 0 {
                                    0
                                } else {
                                    a % b
                                }
                            }
                            b'&' => a & b,
                            b'|' => a | b,
                            b'^' => a ^ b,
                            b'=' => i64::from(a == b),
                            b'>' => i64::from(a > b),
                            b'<' => i64::from(a < b),
                            _ => 0,
                        };
                        stack.push(Value::Int(r));
                    }
                }
                b'~' => {
                    i += 1;
                    if execute {
                        let a = pop_int(stack);
                        stack.push(Value::Int(!a));
                    }
                }
                b'!' => {
                    i += 1;
                    if execute {
                        let a = pop_int(stack);
                        stack.push(Value::Int(i64::from(a == 0)));
                    }
                }
                b'?' => {
                    i += 1;
                    let (ni, _) = self.exec(bytes, i, args, vars, stack, out, execute, &[b't']);
                    i = ni;
                    let cond = if execute { pop_int(stack) != 0 } else { false };
                    let (ni, term) = self.exec(
                        bytes,
                        i,
                        args,
                        vars,
                        stack,
                        out,
                        execute && cond,
                        &[b'e', b';'],
                    );
                    i = ni;
                    if term == Some(b'e') {
                        let (ni, _) = self.exec(
                            bytes,
                            i,
                            args,
                            vars,
                            stack,
                            out,
                            execute && !cond,
                            &[b';'],
                        );
                        i = ni;
                    }
                }
                b'-' | b'+' | b'#' | b' ' | b'0'..=b'9' | b'.' => {
                    i = self.general_format(bytes, i, stack, out, execute);
                }
                _ => {
                    // Unknown/malformed operator: elide it, not the rest
                    // of the template.
                    i += 1;
                }
            }
        }
        (i, None)
    }

    /// `%[flags][width][.prec]{d,x,X,o,c,s}` general printf-style
    /// format, with `i` positioned just after the leading `%`.
    fn general_format(
        &mut self,
        bytes: &[u8],
        mut i: usize,
        stack: &mut Vec<Value>,
        out: &mut Vec<u8>,
        execute: bool,
    ) -> usize {
        let len = bytes.len();
        let mut zero_pad = false;
        while i < len && matches!(bytes[i], b'-' | b'+' | b'#' | b' ' | b'0') {
            if bytes[i] == b'0' {
                zero_pad = true;
            }
            i += 1;
        }
        let width_start = i;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let width = if i > width_start {
            bytes[width_start..i]
                .iter()
                .fold(0usize, |a, &b| a * 10 + usize::from(b - b'0'))
                .into()
        } else {
            None
        };
        let mut precision = None;
        if i < len && bytes[i] == b'.' {
            i += 1;
            let ps = i;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
            precision = Some(
                bytes[ps..i]
                    .iter()
                    .fold(0usize, |a, &b| a * 10 + usize::from(b - b'0')),
            );
        }
        if i >= len {
            return i;
        }
        let conv = bytes[i];
        i += 1;
        if !execute {
            return i;
        }
        match conv {
            b'd' => {
                let v = pop_int(stack);
                let digits = itoa::Buffer::new().format(v).as_bytes().to_vec();
                pad_numeric(out, digits, width, zero_pad);
            }
            b'x' => {
                let v = pop_int(stack);
                pad_numeric(out, format!("{v:x}").into_bytes(), width, zero_pad);
            }
            b'X' => {
                let v = pop_int(stack);
                pad_numeric(out, format!("{v:X}").into_bytes(), width, zero_pad);
            }
            b'o' => {
                let v = pop_int(stack);
                pad_numeric(out, format!("{v:o}").into_bytes(), width, zero_pad);
            }
            b'c' => {
                let v = pop_int(stack);
                out.push(v as u8);
            }
            b's' => {
                let mut s = pop_str(stack);
                if let Some(p) = precision {
                    s.truncate(p);
                }
                if let Some(w) = width {
                    if s.len() < w {
                        let mut padded = vec![b' '; w - s.len()];
                        padded.extend(s);
                        s = padded;
                    }
                }
                out.extend(s);
            }
            _ => {}
        }
        i
    }
}

/// Scans evaluator output for `$<N>` / `$<N.M>` pad directives and
/// either sleeps (when the terminal declares no pad character) or
/// substitutes the pad character's bytes, matching classic terminfo
/// padding semantics. Modern terminals never declare a pad char, so
/// the common case sleeps.
pub fn strip_padding(bytes: &[u8], pad_char: Option<u8>, mut sleep: impl FnMut(Duration)) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'<') {
            if let Some(end) = bytes[i + 2..].iter().position(|&b| b == b'>') {
                let spec = &bytes[i + 2..i + 2 + end];
                let spec_str = std::str::from_utf8(spec).unwrap_or("0");
                let whole = spec_str.split('.').next().unwrap_or("0");
                let tenths_of_ms: u64 = whole
                    .trim_end_matches(['*', '/'])
                    .parse()
                    .unwrap_or(0);
                match pad_char {
                    Some(pad) => {
                        let count = (tenths_of_ms / 10).max(if tenths_of_ms > 0 { 1 } else { 0 });
                        out.extend(std::iter::repeat_n(pad, count as usize));
                    }
                    None => sleep(Duration::from_millis(tenths_of_ms)),
                }
                i += 2 + end + 1;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_percent_passes_through() {
        let mut e = Evaluator::new();
        assert_eq!(e.evaluate("100%%", &[]), b"100%");
    }

    #[test]
    fn cursor_addressing_scenario() {
        // spec.md §8 scenario 1: set_cursor = "\x1b[%i%p1%d;%p2%dH",
        // args = (row=5, col=3) -> "\x1b[6;4H".
        let mut e = Evaluator::new();
        let out = e.evaluate("\x1b[%i%p1%d;%p2%dH", &[5, 3]);
        assert_eq!(out, b"\x1b[6;4H");
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut e = Evaluator::new();
        let a = e.evaluate("\x1b[%i%p1%d;%p2%dH", &[5, 3]);
        let b = e.evaluate("\x1b[%i%p1%d;%p2%dH", &[5, 3]);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_args_default_to_zero() {
        let mut e = Evaluator::new();
        let out = e.evaluate("%p3%d", &[1, 2]);
        assert_eq!(out, b"0");
    }

    #[test]
    fn conditional_picks_then_branch() {
        let mut e = Evaluator::new();
        let out = e.evaluate("%p1%{1}%=%tyes%enon%;", &[1]);
        assert_eq!(out, b"yes");
    }

    #[test]
    fn conditional_picks_else_branch() {
        let mut e = Evaluator::new();
        let out = e.evaluate("%p1%{1}%=%tyes%eno%;", &[9]);
        assert_eq!(out, b"no");
    }

    #[test]
    fn nested_conditional() {
        let mut e = Evaluator::new();
        // if p1 == 1 { if p2 == 1 { "AA" } else { "AB" } } else { "B" }
        let tmpl = "%p1%{1}%=%t%p2%{1}%=%tAA%eAB%;%eB%;";
        assert_eq!(e.evaluate(tmpl, &[1, 1]), b"AA");
        assert_eq!(e.evaluate(tmpl, &[1, 2]), b"AB");
        assert_eq!(e.evaluate(tmpl, &[2, 1]), b"B");
    }

    #[test]
    fn division_by_zero_pushes_zero() {
        let mut e = Evaluator::new();
        let out = e.evaluate("%{5}%{0}%/%d", &[]);
        assert_eq!(out, b"0");
    }

    #[test]
    fn static_variable_persists_across_calls() {
        let mut e = Evaluator::new();
        let _ = e.evaluate("%{7}%PA", &[]);
        let out = e.evaluate("%gA%d", &[]);
        assert_eq!(out, b"7");
    }

    #[test]
    fn dynamic_variable_resets_between_calls() {
        let mut e = Evaluator::new();
        let _ = e.evaluate("%{7}%Pa", &[]);
        let out = e.evaluate("%ga%d", &[]);
        assert_eq!(out, b"0");
    }

    #[test]
    fn malformed_operator_is_elided_not_fatal() {
        let mut e = Evaluator::new();
        let out = e.evaluate("a%Zb", &[]);
        assert_eq!(out, b"ab");
    }

    #[test]
    fn padding_directive_sleeps_when_no_pad_char() {
        let mut slept = Vec::new();
        let out = strip_padding(b"a$<20>b", None, |d| slept.push(d));
        assert_eq!(out, b"ab");
        assert_eq!(slept, vec![Duration::from_millis(20)]);
    }

    #[test]
    fn padding_directive_substitutes_pad_char_when_declared() {
        let out = strip_padding(b"a$<20>b", Some(0), |_| {});
        assert_eq!(out, vec![b'a', 0, 0, b'b']);
    }
}
