//! Read back basic facts about a PDF on disk.

use crate::error::{PdfError, Result};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

static PAGE_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?-u)/Type\s*/Page\b").unwrap());
static ENCRYPT_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)/Encrypt\s*\d+\s+\d+\s+R").unwrap());

/// Size, page count and encryption state of a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub page_count: usize,
    pub is_encrypted: bool,
}

/// Inspect the PDF at `path`.
///
/// The trailer is read through lopdf, which covers both classic trailers
/// and cross-reference streams. Files lopdf cannot parse fall back to a
/// raw scan of the object headers.
pub fn inspect(path: &Path) -> Result<PdfInfo> {
    let bytes = std::fs::read(path).map_err(|e| PdfError::io(path, e))?;
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfError::Unreadable(format!(
            "{}: missing %PDF header",
            path.display()
        )));
    }

    let (page_count, is_encrypted) = match lopdf::Document::load_mem(&bytes) {
        Ok(doc) => {
            let encrypted = doc.is_encrypted() || doc.trailer.get(b"Encrypt").is_ok();
            let pages = match doc.get_pages().len() {
                0 if encrypted => PAGE_OBJECT.find_iter(&bytes).count(),
                n => n,
            };
            (pages, encrypted)
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "lopdf could not parse; scanning raw bytes");
            let encrypted = declares_encryption(&bytes);
            if !encrypted {
                return Err(PdfError::Unreadable(format!("{}: {e}", path.display())));
            }
            (PAGE_OBJECT.find_iter(&bytes).count(), encrypted)
        }
    };

    Ok(PdfInfo {
        path: path.to_path_buf(),
        file_size: bytes.len() as u64,
        page_count,
        is_encrypted,
    })
}

/// True when some trailer or cross-reference stream references an
/// `/Encrypt` dictionary.
fn declares_encryption(bytes: &[u8]) -> bool {
    ENCRYPT_ENTRY.is_match(bytes)
}
