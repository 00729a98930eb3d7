//! In-memory view of a `.docx` zip container.
//!
//! Entries keep their original order when written back; Word expects
//! `[Content_Types].xml` first and pandoc already puts it there.

use crate::error::DraftError;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Main document part.
pub const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// All parts of a Word document, loaded into memory.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<Entry>,
}

impl DocxPackage {
    /// Read a package from docx bytes.
    ///
    /// Fails with [`DraftError::InvalidDocx`] when there is no
    /// `word/document.xml`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DraftError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let mut data = Vec::with_capacity(file.size() as usize);
            if !is_dir {
                file.read_to_end(&mut data).map_err(|e| {
                    DraftError::InvalidDocx(format!("cannot read entry '{name}': {e}"))
                })?;
            }
            entries.push(Entry { name, data, is_dir });
        }

        let package = Self { entries };
        if package.part(DOCUMENT_PART).is_none() {
            return Err(DraftError::InvalidDocx(format!(
                "missing required part '{DOCUMENT_PART}'"
            )));
        }
        Ok(package)
    }

    /// Write the package back out as a zip.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DraftError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)?;
            } else {
                zip.start_file(entry.name.as_str(), options)?;
                zip.write_all(&entry.data).map_err(|e| {
                    DraftError::Internal(format!("writing zip entry '{}': {e}", entry.name))
                })?;
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Bytes of part `name`, if present.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| !e.is_dir && e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Replace the contents of part `name`, adding it if missing.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| !e.is_dir && e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
                is_dir: false,
            }),
        }
    }

    /// Names of all file entries, in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name.as_str())
    }

    /// Header and footer parts (`word/header*.xml`, `word/footer*.xml`).
    pub fn header_footer_parts(&self) -> Vec<String> {
        self.part_names()
            .filter(|n| is_header_or_footer(n))
            .map(str::to_string)
            .collect()
    }
}

fn is_header_or_footer(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    !file.contains('/')
        && (file.starts_with("header") || file.starts_with("footer"))
        && file.ends_with(".xml")
}
