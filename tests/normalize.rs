//! Markdown normalization: inline math rewriting and block spacing.

use report_drafter::normalize_markdown;

fn blank_lines_around(out: &str, needle: &str) -> (bool, bool) {
    let lines: Vec<&str> = out.lines().collect();
    let idx = lines
        .iter()
        .position(|l| *l == needle)
        .unwrap_or_else(|| panic!("'{needle}' not found in:\n{out}"));
    let before = idx == 0 || lines[idx - 1].is_empty();
    let after = idx + 1 == lines.len() || lines[idx + 1].is_empty();
    (before, after)
}

// ── Inline math ──────────────────────────────────────────────────────────

#[test]
fn pair_with_text_before_becomes_inline() {
    assert_eq!(
        normalize_markdown("The flux is $$J_A$$"),
        "The flux is $J_A$"
    );
}

#[test]
fn pair_with_text_after_becomes_inline() {
    assert_eq!(
        normalize_markdown("$$C$$ is the total concentration [mol/m³]."),
        "$C$ is the total concentration [mol/m³]."
    );
}

#[test]
fn surrounding_text_is_untouched() {
    let input = "where $$C$$ is the total molar concentration [mol/m³], $$D_{AB}$$ is the diffusion coefficient [m²/s]";
    assert_eq!(
        normalize_markdown(input),
        "where $C$ is the total molar concentration [mol/m³], $D_{AB}$ is the diffusion coefficient [m²/s]"
    );
}

#[test]
fn single_dollar_math_is_left_alone() {
    let input = "already inline $x$ and a price of $5";
    assert_eq!(normalize_markdown(input), input);
}

// ── Display math ─────────────────────────────────────────────────────────

#[test]
fn display_line_is_preserved_and_padded() {
    let input = "Fick's first law:\n$$J_A = -C D_{AB} \\frac{d x_A}{d z}$$\nwhere the symbols are";
    let out = normalize_markdown(input);
    let display = "$$J_A = -C D_{AB} \\frac{d x_A}{d z}$$";
    assert!(out.contains(display));
    assert_eq!(blank_lines_around(&out, display), (true, true));
}

#[test]
fn padded_display_line_is_not_padded_again() {
    let input = "text\n\n$$x = 1$$\n\nmore text\n";
    assert_eq!(normalize_markdown(input), input);
}

#[test]
fn fenced_block_is_kept_as_one_unit() {
    let input = "We get\n$$\n\\begin{aligned}\na &= b \\\\\nc &= d\n\\end{aligned}\n$$\nas a result.";
    let out = normalize_markdown(input);
    assert_eq!(
        out,
        "We get\n\n$$\n\\begin{aligned}\na &= b \\\\\nc &= d\n\\end{aligned}\n$$\n\nas a result."
    );
}

// ── Tables ───────────────────────────────────────────────────────────────

#[test]
fn table_run_gets_exactly_one_blank_line_each_side() {
    let inputs = [
        "Table 1\n| a | b |\n|---|---|\n| 1 | 2 |\nAfter",
        "Table 1\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nAfter",
        "Table 1\n\n\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n\n\nAfter",
    ];
    for input in inputs {
        assert_eq!(
            normalize_markdown(input),
            "Table 1\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nAfter",
            "input: {input:?}"
        );
    }
}

#[test]
fn table_rows_are_not_split() {
    let out = normalize_markdown("x\n| a |\n| b |\n| c |\ny");
    assert!(out.contains("| a |\n| b |\n| c |"));
}

#[test]
fn inline_math_in_table_cells_is_rewritten() {
    let out = normalize_markdown("| $$x_A$$ | 0.5 |\n|---|---|");
    assert_eq!(out, "| $x_A$ | 0.5 |\n|---|---|");
}

// ── Images ───────────────────────────────────────────────────────────────

#[test]
fn image_line_is_padded() {
    let out = normalize_markdown("Setup:\n![](media/image1.png)\nFigure 1");
    assert_eq!(out, "Setup:\n\n![](media/image1.png)\n\nFigure 1");
}

// ── Idempotence ──────────────────────────────────────────────────────────

#[test]
fn normalizing_twice_equals_once() {
    let input = "# 2. Principle\nThe flux $$J_A$$ is\n$$J_A = -D \\frac{dC}{dz}$$\nwhere:\n| sym | unit |\n|---|---|\n| D | m²/s |\n![](f.png)\n$$\na\n$$\nEnd.\n";
    let once = normalize_markdown(input);
    assert_eq!(normalize_markdown(&once), once);
}

#[test]
fn sample_draft_is_stable() {
    let input = include_str!("../test_cases/draft_sample.md");
    let once = normalize_markdown(input);
    assert_eq!(normalize_markdown(&once), once);
    assert!(!once.contains("where $$"), "inline pairs left:\n{once}");
}
