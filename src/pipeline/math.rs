//! Math-delimiter normalisation.
//!
//! LLM output writes every formula as `$$ … $$`, but pandoc renders a
//! doubled-dollar pair as display math even in the middle of a sentence. This
//! pass classifies each line and rewrites pairs that sit inside running text
//! to the single-dollar inline form:
//!
//! | Line                                   | Kind                         | Result          |
//! |----------------------------------------|------------------------------|-----------------|
//! | `$$` … lines … `$$`                    | [`LineKind::BlockMath`]      | unchanged       |
//! | `  $$E = mc^2$$  `                     | [`LineKind::DisplayMath`]    | outer ws trimmed|
//! | `where $$C$$ is the concentration`     | [`LineKind::Text`]           | `$C$`           |
//!
//! ## Known limitation
//!
//! The single-line display pattern is anchored at both ends but lazy in the
//! middle, so a line made of nothing but several pairs (`$$a$$ and $$b$$`)
//! is taken as one display expression. The heuristic is kept as-is.
//!
//! An opening `$$` line with no closing `$$` line is not a block; every line
//! from there on is classified on its own.
//!
//! Inline pairs keep their inner text untouched. `$$ x $$` becomes `$ x $`,
//! which pandoc leaves as literal text.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_BLOCK_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\$\$\s*$").unwrap());

static RE_DISPLAY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\$\$(.+?)\$\$\s*$").unwrap());

static RE_MATH_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$(.+?)\$\$").unwrap());

/// Classification of one markdown line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Part of a multi-line block, fences included.
    BlockMath,
    /// A whole line holding exactly one display expression.
    DisplayMath,
    /// Anything else.
    Text,
}

/// Classify every line. The result is index-aligned with `lines`.
pub fn classify_lines(lines: &[&str]) -> Vec<LineKind> {
    let mut kinds = vec![LineKind::Text; lines.len()];

    // Pass 1: fenced multi-line blocks.
    let mut i = 0;
    while i < lines.len() {
        if RE_BLOCK_FENCE.is_match(lines[i]) {
            let start = i;
            i += 1;
            while i < lines.len() && !RE_BLOCK_FENCE.is_match(lines[i]) {
                i += 1;
            }
            if i < lines.len() {
                for kind in &mut kinds[start..=i] {
                    *kind = LineKind::BlockMath;
                }
            }
        }
        i += 1;
    }

    // Pass 2: single-line display expressions outside blocks.
    for (kind, line) in kinds.iter_mut().zip(lines) {
        if *kind == LineKind::Text && RE_DISPLAY_LINE.is_match(line) {
            *kind = LineKind::DisplayMath;
        }
    }

    kinds
}

/// Rewrite `$$…$$` pairs inside running text to `$…$`.
///
/// Block lines are copied unchanged and whole-line display expressions are
/// trimmed of surrounding whitespace. The output has the same lines in the
/// same order; a trailing newline on the input is kept.
pub fn normalize_math(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let kinds = classify_lines(&lines);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (line, kind) in lines.iter().zip(&kinds) {
        let rewritten = match kind {
            LineKind::BlockMath => (*line).to_string(),
            LineKind::DisplayMath => line.trim().to_string(),
            LineKind::Text if line.contains("$$") => inline_pairs(line),
            LineKind::Text => (*line).to_string(),
        };
        out.push(rewritten);
    }

    join_lines(out.iter().map(String::as_str), text.ends_with('\n'))
}

/// `$$x$$` → `$x$`, with the inner text copied verbatim.
fn inline_pairs(line: &str) -> String {
    RE_MATH_PAIR
        .replace_all(line, |caps: &regex::Captures<'_>| format!("${}$", &caps[1]))
        .into_owned()
}

pub(crate) fn join_lines<'a>(lines: impl Iterator<Item = &'a str>, trailing_newline: bool) -> String {
    let mut s = lines.collect::<Vec<_>>().join("\n");
    if trailing_newline && !s.is_empty() {
        s.push('\n');
    }
    s
}
