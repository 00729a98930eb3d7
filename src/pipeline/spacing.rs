//! Blank-line padding around blocks pandoc must see as separate paragraphs.
//!
//! pandoc only recognises a pipe table, a display-math paragraph or a
//! standalone figure when it is separated from the surrounding text by blank
//! lines. LLM output routinely glues them to the previous sentence. This pass
//! pads three kinds of block:
//!
//! - display math: fenced `$$` blocks and whole-line `$$…$$` expressions
//! - runs of table rows (first non-blank character is `|`)
//! - image reference lines (`![alt](path)`)
//!
//! Each block ends up with exactly one blank line on either side. Nothing is
//! inserted before the first line of the document or after the last one, and
//! a run of several blank lines next to a block collapses to one. Running the
//! pass twice gives the same text as running it once.

use super::math::{classify_lines, join_lines, LineKind};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_IMAGE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*!\[[^\]]*\]\(").unwrap());

/// Pad math blocks, table runs and image lines with single blank lines.
pub fn pad_blocks(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let kinds = classify_lines(&lines);
    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 16);

    let mut i = 0;
    while i < lines.len() {
        let end = match kinds[i] {
            LineKind::BlockMath => run_end(i, lines.len(), |j| kinds[j] == LineKind::BlockMath),
            LineKind::DisplayMath => i + 1,
            LineKind::Text if is_table_row(lines[i]) => run_end(i, lines.len(), |j| {
                kinds[j] == LineKind::Text && is_table_row(lines[j])
            }),
            LineKind::Text if is_image_line(lines[i]) => i + 1,
            LineKind::Text => {
                out.push(lines[i]);
                i += 1;
                continue;
            }
        };
        i = push_padded(&mut out, &lines, i, end);
    }

    join_lines(out.into_iter(), text.ends_with('\n'))
}

/// `true` for a pipe/grid table row.
pub fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// `true` for a line that starts with an image reference.
pub fn is_image_line(line: &str) -> bool {
    RE_IMAGE_LINE.is_match(line)
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// First index after `start` for which `same_run` is false.
fn run_end(start: usize, len: usize, same_run: impl Fn(usize) -> bool) -> usize {
    let mut j = start + 1;
    while j < len && same_run(j) {
        j += 1;
    }
    j
}

/// Emit `lines[start..end]` with one blank line on each side and return the
/// index of the next line to process.
fn push_padded<'a>(out: &mut Vec<&'a str>, lines: &[&'a str], start: usize, end: usize) -> usize {
    // Before: collapse trailing blanks to one, or add one after text.
    while out.len() >= 2 && is_blank(out[out.len() - 1]) && is_blank(out[out.len() - 2]) {
        out.pop();
    }
    if out.last().is_some_and(|l| !is_blank(l)) {
        out.push("");
    }

    out.extend_from_slice(&lines[start..end]);

    // After: swallow a blank run and replace it with exactly one.
    let mut next = end;
    while next < lines.len() && is_blank(lines[next]) {
        next += 1;
    }
    if next > end || end < lines.len() {
        out.push("");
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_gets_blank_lines() {
        let input = "Table 1: yields\n| a | b |\n|---|---|\n| 1 | 2 |\nNext paragraph";
        assert_eq!(
            pad_blocks(input),
            "Table 1: yields\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nNext paragraph"
        );
    }

    #[test]
    fn existing_blank_lines_are_not_doubled() {
        let input = "text\n\n| a |\n\nmore";
        assert_eq!(pad_blocks(input), input);
    }

    #[test]
    fn blank_runs_next_to_blocks_collapse() {
        let input = "text\n\n\n\n$$x$$\n\n\nmore";
        assert_eq!(pad_blocks(input), "text\n\n$$x$$\n\nmore");
    }

    #[test]
    fn nothing_inserted_at_document_edges() {
        assert_eq!(pad_blocks("| a |\n| b |"), "| a |\n| b |");
        assert_eq!(pad_blocks("$$x$$"), "$$x$$");
    }

    #[test]
    fn fenced_block_padded_as_a_unit() {
        let input = "before\n$$\na = b\n$$\nafter";
        assert_eq!(pad_blocks(input), "before\n\n$$\na = b\n$$\n\nafter");
    }

    #[test]
    fn image_line_padded() {
        let input = "see figure\n![](media/fig1.png)\nFigure 1: setup";
        assert_eq!(
            pad_blocks(input),
            "see figure\n\n![](media/fig1.png)\n\nFigure 1: setup"
        );
    }

    #[test]
    fn image_with_alt_text_is_recognised() {
        assert!(is_image_line("  ![apparatus](media/a.png)"));
        assert!(!is_image_line("text ![x](y.png)"));
    }

    #[test]
    fn adjacent_blocks_share_one_blank_line() {
        let input = "$$x$$\n| a |\n![](f.png)";
        assert_eq!(pad_blocks(input), "$$x$$\n\n| a |\n\n![](f.png)");
    }

    #[test]
    fn padding_is_idempotent() {
        let input = "a\n$$x$$\nb\n| t |\n| u |\nc\n![](i.png)\nd\n";
        let once = pad_blocks(input);
        assert_eq!(pad_blocks(&once), once);
    }
}
