//! Markdown → docx conversion through an external program.
//!
//! [`Pandoc`] is the only real implementation. The trait exists so the
//! pipeline can run without pandoc installed (tests, or a converter
//! service reached some other way).

use crate::error::DraftError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Markdown extensions pandoc must enable for LLM output.
pub const PANDOC_FROM: &str = "markdown+tex_math_dollars+pipe_tables+grid_tables+table_captions";

/// Converts a markdown file into a `.docx` file.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `markdown` to `docx`. Relative image paths in the markdown
    /// resolve against `resource_dir`.
    async fn convert(
        &self,
        markdown: &Path,
        docx: &Path,
        resource_dir: &Path,
    ) -> Result<(), DraftError>;
}

/// The pandoc command-line converter.
#[derive(Debug, Clone)]
pub struct Pandoc {
    program: PathBuf,
}

impl Pandoc {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one conversion, without the program name.
    pub fn args(markdown: &Path, docx: &Path, resource_dir: &Path) -> Vec<String> {
        vec![
            "-f".into(),
            PANDOC_FROM.into(),
            "-t".into(),
            "docx".into(),
            "--mathml".into(),
            "--standalone".into(),
            "--columns=120".into(),
            "--resource-path".into(),
            resource_dir.display().to_string(),
            "-o".into(),
            docx.display().to_string(),
            markdown.display().to_string(),
        ]
    }
}

impl Default for Pandoc {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

#[async_trait]
impl DocumentConverter for Pandoc {
    async fn convert(
        &self,
        markdown: &Path,
        docx: &Path,
        resource_dir: &Path,
    ) -> Result<(), DraftError> {
        let args = Self::args(markdown, docx, resource_dir);
        debug!("{} {}", self.program.display(), args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    DraftError::ConverterNotFound {
                        program: self.program.display().to_string(),
                        reason: e.to_string(),
                    }
                }
                _ => DraftError::Internal(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                )),
            })?;

        if !output.status.success() {
            return Err(DraftError::ConverterFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
