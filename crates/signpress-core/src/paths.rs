//! Filesystem layout for stored documents

use std::env;
use std::path::{Path, PathBuf};

/// Base directory for stored documents: `UPLOAD_DIR`, default
/// `./uploads`.
pub fn upload_dir() -> PathBuf {
    env::var("UPLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./uploads"))
}

/// Where the finalized copy of a document is written:
/// `<base>/<document_id>/<stem>_signed.pdf`.
pub fn signed_output_path(base: &Path, document_id: &str, filename: &str) -> PathBuf {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    base.join(document_id).join(format!("{}_signed.pdf", stem))
}

/// Page count of a stored PDF, defaulting to 1 when the file cannot be
/// parsed. The upload flow records a best-effort count; it never fails
/// an upload over it.
pub fn page_count_or_default(path: &Path) -> usize {
    match lopdf::Document::load(path) {
        Ok(doc) => doc.get_pages().len(),
        Err(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_pdf;

    #[test]
    fn test_signed_output_path_layout() {
        let path = signed_output_path(Path::new("/data/uploads"), "doc-42", "lease.pdf");
        assert_eq!(
            path,
            PathBuf::from("/data/uploads/doc-42/lease_signed.pdf")
        );
    }

    #[test]
    fn test_signed_output_path_without_extension() {
        let path = signed_output_path(Path::new("uploads"), "doc-1", "contract");
        assert_eq!(path, PathBuf::from("uploads/doc-1/contract_signed.pdf"));
    }

    #[test]
    fn test_page_count_of_valid_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, test_pdf(4)).unwrap();
        assert_eq!(page_count_or_default(&path), 4);
    }

    #[test]
    fn test_page_count_defaults_on_unreadable_file() {
        assert_eq!(page_count_or_default(Path::new("/nonexistent.pdf")), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert_eq!(page_count_or_default(&path), 1);
    }
}
