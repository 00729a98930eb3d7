//! Input resolution: load a user-supplied PDF path, URL or upload into memory.
//!
//! The OCR call attaches the whole PDF as inline data, so every input form
//! ends up as a [`PdfSource`] holding the bytes. We validate the PDF magic
//! bytes (`%PDF`) and the size cap here so callers get a meaningful error
//! before any API call is made.

use crate::error::DraftError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A validated PDF held in memory.
#[derive(Clone)]
pub struct PdfSource {
    /// Display name (file name or last URL segment).
    pub name: String,
    /// Raw PDF bytes.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSource")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PdfSource {
    /// Validate an in-memory upload.
    ///
    /// An empty upload counts as a missing file.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, DraftError> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(DraftError::MissingInput { field: "file" });
        }
        validate_pdf(&name, &bytes, max_bytes)?;
        Ok(Self { name, bytes })
    }

    /// Read and validate a local file.
    pub fn from_path(path: impl AsRef<Path>, max_bytes: usize) -> Result<Self, DraftError> {
        let path = path.as_ref();
        let bytes = read_local(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input.pdf".to_string());
        validate_pdf(&name, &bytes, max_bytes)?;
        debug!("Loaded local PDF: {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { name, bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to a validated [`PdfSource`].
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<PdfSource, DraftError> {
    if input.trim().is_empty() {
        return Err(DraftError::MissingInput { field: "file" });
    }
    if is_url(input) {
        download_url(input, timeout_secs, max_bytes).await
    } else {
        PdfSource::from_path(input, max_bytes)
    }
}

fn read_local(path: &Path) -> Result<Vec<u8>, DraftError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DraftError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => DraftError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => DraftError::ReadFailed {
            path: PathBuf::from(path),
            source: e,
        },
    })
}

fn validate_pdf(name: &str, bytes: &[u8], max_bytes: usize) -> Result<(), DraftError> {
    if !bytes.starts_with(b"%PDF") {
        return Err(DraftError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    if bytes.len() > max_bytes {
        return Err(DraftError::PdfTooLarge {
            name: name.to_string(),
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Download a URL into memory.
async fn download_url(
    url: &str,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<PdfSource, DraftError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DraftError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DraftError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DraftError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(DraftError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DraftError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    let name = filename_from_url(url);
    validate_pdf(&name, &bytes, max_bytes)?;
    info!("Downloaded {} ({} bytes)", name, bytes.len());

    Ok(PdfSource { name, bytes })
}

/// Last path segment of the URL, or `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}
