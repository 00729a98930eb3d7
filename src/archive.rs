//! Zip packaging of a finished run.
//!
//! The downloadable archive holds three entries, always in this order:
//! `textbook.md` (OCR output), `draft.md` (generated draft) and
//! `report.docx` (styled Word document).

use crate::error::DraftError;
use crate::output::ReportOutput;
use std::io::{Cursor, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const TEXTBOOK_ENTRY: &str = "textbook.md";
pub const DRAFT_ENTRY: &str = "draft.md";
pub const DOCX_ENTRY: &str = "report.docx";

/// Write the archive for `output` into `writer`.
pub fn write_archive<W: Write + Seek>(output: &ReportOutput, writer: W) -> Result<W, DraftError> {
    let mut zip = ZipWriter::new(writer);
    let text = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    // docx is already deflated.
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let entries: [(&str, &[u8], SimpleFileOptions); 3] = [
        (TEXTBOOK_ENTRY, output.textbook.as_bytes(), text),
        (DRAFT_ENTRY, output.draft.as_bytes(), text),
        (DOCX_ENTRY, &output.docx, stored),
    ];
    for (name, data, options) in entries {
        zip.start_file(name, options)?;
        zip.write_all(data)
            .map_err(|e| DraftError::Internal(format!("writing archive entry '{name}': {e}")))?;
    }

    Ok(zip.finish()?)
}

impl ReportOutput {
    /// The archive as bytes.
    pub fn to_archive_bytes(&self) -> Result<Vec<u8>, DraftError> {
        Ok(write_archive(self, Cursor::new(Vec::new()))?.into_inner())
    }
}
