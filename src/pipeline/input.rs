//! Input validation: make sure a path points at a readable PDF before any
//! extraction work starts.
//!
//! Failing here is the cheap failure: the checks below turn the three most
//! common operator mistakes (wrong path, unreadable file, renamed
//! spreadsheet) into specific errors with a hint, instead of a generic parse
//! failure half a pipeline later.

use crate::error::SiproquimError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// PDF files start with `%PDF`.
const PDF_MAGIC: [u8; 4] = *b"%PDF";

/// Verify that `path` is an existing, readable PDF file and return its
/// canonical form.
pub fn resolve_pdf(path: &Path) -> Result<PathBuf, SiproquimError> {
    let meta = std::fs::metadata(path).map_err(|e| io_error(path, e))?;
    if !meta.is_file() {
        return Err(SiproquimError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut magic = [0u8; 4];
    let mut file = File::open(path).map_err(|e| io_error(path, e))?;
    file.read_exact(&mut magic).map_err(|_| SiproquimError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })?;
    if magic != PDF_MAGIC {
        return Err(SiproquimError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    let canonical = path.canonicalize().map_err(|e| io_error(path, e))?;
    debug!(path = %canonical.display(), size = meta.len(), "input accepted");
    Ok(canonical)
}

fn io_error(path: &Path, e: std::io::Error) -> SiproquimError {
    match e.kind() {
        std::io::ErrorKind::NotFound => SiproquimError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => SiproquimError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SiproquimError::Internal(format!("reading '{}': {e}", path.display())),
    }
}
