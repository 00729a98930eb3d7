//! Word output: pandoc conversion and the formatting pass that follows it.
//!
//! ```text
//! normalized .md ──▶ converter ──▶ .docx ──▶ package ──▶ style ──▶ .docx
//!                    (pandoc)               (zip + xml)  (fonts, jc,
//!                                                         borders)
//! ```

pub mod converter;
pub mod package;
pub mod style;
pub mod xml;

pub use converter::{DocumentConverter, Pandoc};
pub use package::DocxPackage;
pub use style::{apply_styles, apply_styles_to_file, style_docx_bytes, StyleReport};
