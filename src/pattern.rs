//! Glob patterns over raw key bytes.
//!
//! A glob (`*`, `?`, `[...]`, `\x`) is translated into an anchored byte regex.
//! Patterns that cannot match anything in Redis (`[]`, a trailing lone
//! backslash) and the empty pattern compile to a matcher that rejects every
//! key instead of failing, so commands simply return nothing.

use regex::bytes::{Regex, RegexBuilder};
use std::fmt::Write;
use tracing::debug;

#[derive(Clone, Debug)]
enum Matcher {
    All,
    Nothing,
    Regex(Regex),
}

#[derive(Clone, Debug)]
pub struct KeyPattern {
    matcher: Matcher,
}

impl KeyPattern {
    pub fn compile(glob: &[u8]) -> Self {
        if glob == b"*" {
            return Self::all();
        }
        let matcher = match translate(glob) {
            Some(expr) => match RegexBuilder::new(&expr)
                .unicode(false)
                .dot_matches_new_line(true)
                .build()
            {
                Ok(re) => Matcher::Regex(re),
                Err(e) => {
                    debug!("glob {:?} rejected: {}", String::from_utf8_lossy(glob), e);
                    Matcher::Nothing
                }
            },
            None => Matcher::Nothing,
        };
        Self { matcher }
    }

    /// Matcher for `*`.
    pub fn all() -> Self {
        Self { matcher: Matcher::All }
    }

    pub fn matches(&self, key: &[u8]) -> bool {
        match &self.matcher {
            Matcher::All => true,
            Matcher::Nothing => false,
            Matcher::Regex(re) => re.is_match(key),
        }
    }

    pub fn matches_nothing(&self) -> bool {
        matches!(self.matcher, Matcher::Nothing)
    }
}

fn push_literal(out: &mut String, b: u8) {
    if b.is_ascii_alphanumeric() {
        out.push(b as char);
    } else {
        let _ = write!(out, "\\x{:02X}", b);
    }
}

fn translate(glob: &[u8]) -> Option<String> {
    if glob.is_empty() {
        return None;
    }
    let mut expr = String::with_capacity(glob.len() * 4 + 4);
    expr.push_str(r"\A");
    let mut i = 0;
    while i < glob.len() {
        match glob[i] {
            b'*' => expr.push_str(".*"),
            b'?' => expr.push('.'),
            b'[' => {
                let (class, next) = translate_class(glob, i + 1)?;
                expr.push_str(&class);
                i = next;
                continue;
            }
            b'\\' => {
                push_literal(&mut expr, *glob.get(i + 1)?);
                i += 2;
                continue;
            }
            b => push_literal(&mut expr, b),
        }
        i += 1;
    }
    expr.push_str(r"\z");
    Some(expr)
}

/// Translates the class body starting right after `[`. Returns the regex
/// class and the index following the closing `]`; an unterminated class runs
/// to the end of the pattern.
fn translate_class(glob: &[u8], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    let negate = glob.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    // (byte, escaped)
    let mut members: Vec<(u8, bool)> = Vec::new();
    while i < glob.len() && glob[i] != b']' {
        if glob[i] == b'\\' {
            members.push((*glob.get(i + 1)?, true));
            i += 2;
        } else {
            members.push((glob[i], false));
            i += 1;
        }
    }
    let next = if i < glob.len() { i + 1 } else { i };
    if members.is_empty() {
        return None;
    }

    let mut class = String::from("[");
    if negate {
        class.push('^');
    }
    let mut j = 0;
    while j < members.len() {
        let lo = members[j].0;
        if j + 2 < members.len() && members[j + 1] == (b'-', false) {
            let hi = members[j + 2].0;
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            let _ = write!(class, "\\x{:02X}-\\x{:02X}", lo, hi);
            j += 3;
        } else {
            let _ = write!(class, "\\x{:02X}", lo);
            j += 1;
        }
    }
    class.push(']');
    Some((class, next))
}
