//! Style post-processing on an in-memory docx shaped like pandoc output.

use report_drafter::docx::package::DOCUMENT_PART;
use report_drafter::docx::style::style_docx_bytes;
use report_drafter::docx::xml::{Element, XmlDocument};
use report_drafter::{DocxPackage, DocxStyle};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

/// Heading, intro text, display math, caption, table, closing text.
const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"><w:body><w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t xml:space="preserve">2. Principle</w:t></w:r></w:p><w:p><w:pPr><w:pStyle w:val="FirstParagraph"/></w:pPr><w:r><w:t xml:space="preserve">The flux is given by</w:t></w:r></w:p><w:p><m:oMathPara><m:oMathParaPr><m:jc m:val="center"/></m:oMathParaPr><m:oMath><m:r><m:t>J</m:t></m:r></m:oMath></m:oMathPara></w:p><w:p><w:pPr><w:pStyle w:val="TableCaption"/></w:pPr><w:r><w:t xml:space="preserve">Table 1: Physical properties</w:t></w:r></w:p><w:tbl><w:tblPr><w:tblStyle w:val="Table"/><w:tblW w:type="pct" w:w="5000"/><w:tblLook w:firstRow="1"/></w:tblPr><w:tblGrid><w:gridCol/><w:gridCol/></w:tblGrid><w:tr><w:trPr><w:tblHeader/></w:trPr><w:tc><w:p><w:pPr><w:pStyle w:val="Compact"/></w:pPr><w:r><w:t xml:space="preserve">Property</w:t></w:r></w:p></w:tc><w:tc><w:p><w:pPr><w:pStyle w:val="Compact"/></w:pPr><w:r><w:t xml:space="preserve">Value</w:t></w:r></w:p></w:tc></w:tr><w:tr><w:tc><w:p><w:r><w:t xml:space="preserve">Density</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t xml:space="preserve">784</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t xml:space="preserve">Values at 25 °C &amp; 1 atm.</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>Lab report</w:t></w:r></w:p></w:hdr>"#;

fn build_docx(with_header: bool) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut parts = vec![
        ("[Content_Types].xml", CONTENT_TYPES),
        (DOCUMENT_PART, DOCUMENT),
        ("word/styles.xml", "<w:styles/>"),
    ];
    if with_header {
        parts.push(("word/header1.xml", HEADER));
    }
    for (name, body) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn parse_part(docx: &[u8], part: &str) -> XmlDocument {
    let pkg = DocxPackage::from_bytes(docx).unwrap();
    XmlDocument::parse(part, pkg.part(part).unwrap()).unwrap()
}

fn body_paragraphs(doc: &XmlDocument) -> Vec<&Element> {
    doc.root
        .child("w:body")
        .unwrap()
        .elements()
        .filter(|e| e.name == "w:p")
        .collect()
}

fn jc(p: &Element) -> Option<&str> {
    p.child("w:pPr")?.child("w:jc")?.attr("w:val")
}

#[test]
fn paragraphs_justified_except_caption() {
    let original = build_docx(false);
    let styled = style_docx_bytes(&original, &DocxStyle::default()).unwrap();

    let before = parse_part(&original, DOCUMENT_PART);
    let after = parse_part(&styled, DOCUMENT_PART);
    let before_paras = body_paragraphs(&before);
    let paras = body_paragraphs(&after);
    assert_eq!(paras.len(), before_paras.len());

    let body = after.root.child("w:body").unwrap();
    let children: Vec<&Element> = body.elements().collect();
    let table_idx = children.iter().position(|e| e.name == "w:tbl").unwrap();
    let caption = children[table_idx - 1];

    for p in &paras {
        let expected = if std::ptr::eq(*p, caption) { "center" } else { "both" };
        assert_eq!(jc(p), Some(expected));
    }
}

#[test]
fn runs_get_fonts_and_black_colour() {
    let styled = style_docx_bytes(&build_docx(false), &DocxStyle::default()).unwrap();
    let doc = parse_part(&styled, DOCUMENT_PART);
    for p in body_paragraphs(&doc) {
        for run in p.elements().filter(|e| e.name == "w:r") {
            let rpr = run.child("w:rPr").expect("run properties");
            let fonts = rpr.child("w:rFonts").unwrap();
            assert_eq!(fonts.attr("w:ascii"), Some("Times New Roman"));
            assert_eq!(fonts.attr("w:eastAsia"), Some("MS Mincho"));
            assert_eq!(rpr.child("w:color").unwrap().attr("w:val"), Some("000000"));
        }
    }
}

#[test]
fn table_is_centred_with_borders() {
    let style = DocxStyle {
        border_size: 12,
        ..DocxStyle::default()
    };
    let styled = style_docx_bytes(&build_docx(false), &style).unwrap();
    let doc = parse_part(&styled, DOCUMENT_PART);
    let table = doc.root.child("w:body").unwrap().child("w:tbl").unwrap();
    let tbl_pr = table.child("w:tblPr").unwrap();

    let order: Vec<&str> = tbl_pr.elements().map(|e| e.name.as_str()).collect();
    assert_eq!(order, ["w:tblStyle", "w:tblW", "w:jc", "w:tblBorders", "w:tblLook"]);
    assert_eq!(tbl_pr.child("w:jc").unwrap().attr("w:val"), Some("center"));

    let borders = tbl_pr.child("w:tblBorders").unwrap();
    let sides: Vec<&str> = borders.elements().map(|e| e.name.as_str()).collect();
    assert_eq!(sides, ["w:top", "w:bottom"]);
    assert_eq!(borders.child("w:top").unwrap().attr("w:sz"), Some("12"));

    let header_row = table.child("w:tr").unwrap();
    for cell in header_row.elements().filter(|e| e.name == "w:tc") {
        let first: Vec<&str> = cell.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(first[0], "w:tcPr");
        let bottom = cell
            .child("w:tcPr")
            .and_then(|p| p.child("w:tcBorders"))
            .and_then(|b| b.child("w:bottom"))
            .unwrap();
        assert_eq!(bottom.attr("w:val"), Some("single"));
    }
}

#[test]
fn text_and_math_content_survive() {
    let styled = style_docx_bytes(&build_docx(false), &DocxStyle::default()).unwrap();
    let xml = String::from_utf8(
        DocxPackage::from_bytes(&styled)
            .unwrap()
            .part(DOCUMENT_PART)
            .unwrap()
            .to_vec(),
    )
    .unwrap();
    assert!(xml.contains("Values at 25 °C &amp; 1 atm."));
    assert!(xml.contains("<m:oMath><m:r><m:t>J</m:t></m:r></m:oMath>"));
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
}

#[test]
fn header_runs_are_styled() {
    let styled = style_docx_bytes(&build_docx(true), &DocxStyle::default()).unwrap();
    let hdr = parse_part(&styled, "word/header1.xml");
    let run = hdr.root.child("w:p").unwrap().child("w:r").unwrap();
    let fonts = run.child("w:rPr").unwrap().child("w:rFonts").unwrap();
    assert_eq!(fonts.attr("w:hAnsi"), Some("Times New Roman"));
    // Header paragraphs keep their alignment.
    assert!(hdr.root.child("w:p").unwrap().child("w:pPr").is_none());
}

#[test]
fn styling_is_stable_when_applied_twice() {
    let once = style_docx_bytes(&build_docx(true), &DocxStyle::default()).unwrap();
    let twice = style_docx_bytes(&once, &DocxStyle::default()).unwrap();
    let a = DocxPackage::from_bytes(&once).unwrap();
    let b = DocxPackage::from_bytes(&twice).unwrap();
    assert_eq!(a.part(DOCUMENT_PART), b.part(DOCUMENT_PART));
    assert_eq!(a.part("word/header1.xml"), b.part("word/header1.xml"));
}

#[test]
fn garbage_is_rejected() {
    assert!(style_docx_bytes(b"definitely not a zip", &DocxStyle::default()).is_err());
}
