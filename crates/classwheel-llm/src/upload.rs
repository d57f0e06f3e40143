// Loading a local document for question extraction.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("file is too large ({size} bytes, limit {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Document payload in the shape the model accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Plain text, inlined into the prompt.
    Text(String),
    /// Base64-encoded bytes sent as an inline data part.
    Inline { mime_type: String, data: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub kind: AttachmentKind,
}

/// Read `path`, rejecting files over `max_bytes` before reading them.
///
/// `.txt` and other text types are decoded as UTF-8 (lossily). PDFs and
/// images are base64-encoded; any other binary is labelled `image/jpeg`.
pub fn load_attachment(path: &Path, max_bytes: u64) -> Result<Attachment, UploadError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => {
            return Err(UploadError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(UploadError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(UploadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if metadata.len() > max_bytes {
        return Err(UploadError::TooLarge {
            size: metadata.len(),
            max: max_bytes,
        });
    }

    let bytes = std::fs::read(path).map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let kind = match detect_mime(path) {
        Some(mime) if mime.starts_with("text/") => {
            AttachmentKind::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        mime => AttachmentKind::Inline {
            mime_type: inline_mime(mime).to_string(),
            data: STANDARD.encode(&bytes),
        },
    };

    info!(file = %file_name, bytes = bytes.len(), "attachment loaded");
    Ok(Attachment { file_name, kind })
}

fn detect_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        _ => return None,
    };
    Some(mime)
}

fn inline_mime(detected: Option<&'static str>) -> &'static str {
    match detected {
        Some(mime) if mime == "application/pdf" || mime.starts_with("image/") => mime,
        _ => "image/jpeg",
    }
}
