//! Prompts for the OCR and draft-generation calls.
//!
//! Every prompt lives here so the wording can change without touching the
//! retry or streaming code. Callers can override the OCR prompt and the draft
//! instruction block via [`crate::config::DraftConfig`]; the constants here
//! are used only when no override is provided.

/// Instruction sent alongside the PDF for text extraction.
///
/// Formulas are requested in the doubled-dollar form on purpose: the math
/// normaliser later decides per line whether a pair stays a display block or
/// becomes inline math.
pub const OCR_PROMPT: &str = "Extract all of the text from this PDF. \
Write every formula as LaTeX wrapped in double dollar signs, like $$ x = 1 $$. \
Output the result as Markdown.";

/// Default instruction block of the draft prompt.
///
/// `{language}` is replaced with [`crate::config::DraftConfig::language`].
pub const DRAFT_INSTRUCTION: &str = r#"Using the experiment textbook below, write a draft lab report in {language}, following the rules.
Output nothing except the draft itself.
Structure it in three sections: 1. Purpose, 2. Principle, 3. Experiment.
- Purpose: briefly state the aim of the experiment, based on the textbook's stated purpose.
- Principle: briefly explain the underlying theory, based on the textbook. Use equations where needed.
- Experiment: briefly describe the procedure, based on the textbook's operating instructions. Write it entirely in the past tense."#;

/// Formatting rules appended after the instruction block.
pub const DRAFT_RULES: &str = r#"- Write the output in Markdown.
- Use plain declarative prose; avoid bullet lists.
- Give equations as LaTeX source.
- Always wrap equations in two dollar signs ($$), e.g. "$$ x_{A} $$ is the mole fraction".

Example of the expected output:

At this point the molar flux $$J_A$$ of component A relative to the molar-average velocity is given by Fick's first law:

$$J_A = -C D_{AB} \frac{d x_A}{d z}$$

where $$C$$ is the total molar concentration [mol/m³], $$D_{AB}$$ is the diffusion coefficient [m²/s], $$x_A$$ is the mole fraction of A [-] and $$z$$ is the position [m]."#;

/// Assemble the full draft prompt.
///
/// The three parts are emitted as Markdown sections: instruction, rules and
/// the extracted textbook content.
pub fn draft_prompt(textbook: &str, instruction: Option<&str>, language: &str) -> String {
    let instruction = instruction
        .unwrap_or(DRAFT_INSTRUCTION)
        .replace("{language}", language);
    format!(
        "## Instruction\n{instruction}\n\n## Rules\n{DRAFT_RULES}\n\n## Experiment textbook\n{textbook}\n"
    )
}
