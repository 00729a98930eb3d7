//! Fixed formatting pass over a converted Word document.
//!
//! Applied in this order to `word/document.xml`:
//!
//! 1. every body paragraph is justified, and each of its runs gets the
//!    configured Latin / East-Asian fonts and text colour;
//! 2. every body table is centred, the paragraph right before it (the
//!    caption) is centred, the table gets single top and bottom borders and
//!    the cells of its first row get a bottom border.
//!
//! Header and footer parts get the run font and colour fix only. Property
//! elements are created when absent and reused otherwise; new children are
//! inserted in schema order so Word accepts the result.

use super::package::{DocxPackage, DOCUMENT_PART};
use super::xml::{Element, Node, XmlDocument};
use crate::config::DocxStyle;
use crate::error::DraftError;
use std::path::Path;
use tracing::debug;

// ── Schema orders (ECMA-376 Part 1, wml.xsd sequences) ───────────────────

const P_PR_ORDER: &[&str] = &[
    "w:pStyle", "w:keepNext", "w:keepLines", "w:pageBreakBefore", "w:framePr",
    "w:widowControl", "w:numPr", "w:suppressLineNumbers", "w:pBdr", "w:shd",
    "w:tabs", "w:suppressAutoHyphens", "w:kinsoku", "w:wordWrap",
    "w:overflowPunct", "w:topLinePunct", "w:autoSpaceDE", "w:autoSpaceDN",
    "w:bidi", "w:adjustRightInd", "w:snapToGrid", "w:spacing", "w:ind",
    "w:contextualSpacing", "w:mirrorIndents", "w:suppressOverlap", "w:jc",
    "w:textDirection", "w:textAlignment", "w:textboxTightWrap",
    "w:outlineLvl", "w:divId", "w:cnfStyle", "w:rPr", "w:sectPr",
    "w:pPrChange",
];

const R_PR_ORDER: &[&str] = &[
    "w:rStyle", "w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:caps",
    "w:smallCaps", "w:strike", "w:dstrike", "w:outline", "w:shadow",
    "w:emboss", "w:imprint", "w:noProof", "w:snapToGrid", "w:vanish",
    "w:webHidden", "w:color", "w:spacing", "w:w", "w:kern", "w:position",
    "w:sz", "w:szCs", "w:highlight", "w:u", "w:effect", "w:bdr", "w:shd",
    "w:fitText", "w:vertAlign", "w:rtl", "w:cs", "w:em", "w:lang",
    "w:eastAsianLayout", "w:specVanish", "w:oMath",
];

const TBL_PR_ORDER: &[&str] = &[
    "w:tblStyle", "w:tblpPr", "w:tblOverlap", "w:bidiVisual",
    "w:tblStyleRowBandSize", "w:tblStyleColBandSize", "w:tblW", "w:jc",
    "w:tblCellSpacing", "w:tblInd", "w:tblBorders", "w:shd", "w:tblLayout",
    "w:tblCellMar", "w:tblLook", "w:tblCaption", "w:tblDescription",
];

const TBL_BORDERS_ORDER: &[&str] = &[
    "w:top", "w:left", "w:start", "w:bottom", "w:right", "w:end",
    "w:insideH", "w:insideV",
];

const TC_PR_ORDER: &[&str] = &[
    "w:cnfStyle", "w:tcW", "w:gridSpan", "w:hMerge", "w:vMerge",
    "w:tcBorders", "w:shd", "w:noWrap", "w:tcMar", "w:textDirection",
    "w:tcFitText", "w:vAlign", "w:hideMark",
];

const TC_BORDERS_ORDER: &[&str] = &[
    "w:top", "w:start", "w:left", "w:bottom", "w:end", "w:right",
    "w:insideH", "w:insideV", "w:tl2br", "w:tr2bl",
];

/// What the pass touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleReport {
    /// Body paragraphs justified.
    pub paragraphs: usize,
    /// Tables centred and bordered.
    pub tables: usize,
    /// Caption paragraphs centred.
    pub captions: usize,
    /// Header/footer parts restyled.
    pub header_footer_parts: usize,
}

/// Style every relevant part of `package` in place.
pub fn apply_styles(package: &mut DocxPackage, style: &DocxStyle) -> Result<StyleReport, DraftError> {
    let xml = package
        .part(DOCUMENT_PART)
        .ok_or_else(|| DraftError::InvalidDocx(format!("missing '{DOCUMENT_PART}'")))?;
    let mut doc = XmlDocument::parse(DOCUMENT_PART, xml)?;
    let mut report = style_document(&mut doc.root, style)?;
    package.set_part(DOCUMENT_PART, doc.to_bytes());

    for part in package.header_footer_parts() {
        let Some(xml) = package.part(&part) else { continue };
        let mut doc = XmlDocument::parse(&part, xml)?;
        for p in doc.root.elements_mut().filter(|e| e.name == "w:p") {
            style_runs(p, style);
        }
        package.set_part(&part, doc.to_bytes());
        report.header_footer_parts += 1;
    }

    debug!(
        "Styled docx: {} paragraphs, {} tables, {} captions, {} header/footer parts",
        report.paragraphs, report.tables, report.captions, report.header_footer_parts
    );
    Ok(report)
}

/// Style docx bytes and return the rewritten package.
pub fn style_docx_bytes(bytes: &[u8], style: &DocxStyle) -> Result<Vec<u8>, DraftError> {
    let mut package = DocxPackage::from_bytes(bytes)?;
    apply_styles(&mut package, style)?;
    package.to_bytes()
}

/// Style the `.docx` at `path`, overwriting it.
pub async fn apply_styles_to_file(path: &Path, style: &DocxStyle) -> Result<StyleReport, DraftError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DraftError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    let mut package = DocxPackage::from_bytes(&bytes)?;
    let report = apply_styles(&mut package, style)?;
    tokio::fs::write(path, package.to_bytes()?)
        .await
        .map_err(|e| DraftError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(report)
}

/// Apply the body rules to a parsed `w:document` root.
pub fn style_document(root: &mut Element, style: &DocxStyle) -> Result<StyleReport, DraftError> {
    let body = root
        .child_mut("w:body")
        .ok_or_else(|| DraftError::InvalidDocx("document has no <w:body>".into()))?;
    let mut report = StyleReport::default();

    for p in body.elements_mut().filter(|e| e.name == "w:p") {
        set_justification(p, "both");
        style_runs(p, style);
        report.paragraphs += 1;
    }

    let mut previous: Option<usize> = None;
    for idx in 0..body.children.len() {
        let Node::Element(el) = &body.children[idx] else { continue };
        if el.name == "w:tbl" {
            if let Some(prev) = previous {
                if let Node::Element(caption) = &mut body.children[prev] {
                    if caption.name == "w:p" {
                        set_justification(caption, "center");
                        report.captions += 1;
                    }
                }
            }
            if let Node::Element(table) = &mut body.children[idx] {
                style_table(table, style);
                report.tables += 1;
            }
        }
        previous = Some(idx);
    }

    Ok(report)
}

/// The property container of `el` (`w:pPr`, `w:rPr`, ...), which is
/// always its first child.
fn properties<'a>(el: &'a mut Element, name: &str) -> &'a mut Element {
    el.ensure_child(name, &[name])
}

fn set_justification(p: &mut Element, value: &str) {
    properties(p, "w:pPr")
        .ensure_child("w:jc", P_PR_ORDER)
        .set_attr("w:val", value);
}

/// Runs directly in the paragraph and inside its hyperlinks.
fn style_runs(p: &mut Element, style: &DocxStyle) {
    for child in p.elements_mut() {
        match child.name.as_str() {
            "w:r" => style_run(child, style),
            "w:hyperlink" => {
                for run in child.elements_mut().filter(|e| e.name == "w:r") {
                    style_run(run, style);
                }
            }
            _ => {}
        }
    }
}

fn style_run(run: &mut Element, style: &DocxStyle) {
    let rpr = properties(run, "w:rPr");

    let fonts = rpr.ensure_child("w:rFonts", R_PR_ORDER);
    // Theme fonts take precedence over explicit ones in Word.
    for theme in ["w:asciiTheme", "w:hAnsiTheme", "w:eastAsiaTheme"] {
        fonts.remove_attr(theme);
    }
    fonts.set_attr("w:ascii", &style.latin_font);
    fonts.set_attr("w:hAnsi", &style.latin_font);
    fonts.set_attr("w:eastAsia", &style.east_asian_font);

    let color = rpr.ensure_child("w:color", R_PR_ORDER);
    for theme in ["w:themeColor", "w:themeTint", "w:themeShade"] {
        color.remove_attr(theme);
    }
    color.set_attr("w:val", &style.text_color);
}

fn style_table(table: &mut Element, style: &DocxStyle) {
    let tbl_pr = properties(table, "w:tblPr");
    tbl_pr
        .ensure_child("w:jc", TBL_PR_ORDER)
        .set_attr("w:val", "center");
    let borders = tbl_pr.ensure_child("w:tblBorders", TBL_PR_ORDER);
    for side in ["w:top", "w:bottom"] {
        set_border(borders.ensure_child(side, TBL_BORDERS_ORDER), style);
    }

    let Some(header) = table.elements_mut().find(|e| e.name == "w:tr") else {
        return;
    };
    for cell in header.elements_mut().filter(|e| e.name == "w:tc") {
        let tc_borders = properties(cell, "w:tcPr").ensure_child("w:tcBorders", TC_PR_ORDER);
        set_border(tc_borders.ensure_child("w:bottom", TC_BORDERS_ORDER), style);
    }
}

fn set_border(border: &mut Element, style: &DocxStyle) {
    border.set_attr("w:val", "single");
    border.set_attr("w:sz", &style.border_size.to_string());
    border.set_attr("w:space", "0");
    border.set_attr("w:color", &style.border_color);
}
