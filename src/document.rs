//! Catalog entry identity

use std::path::{Path, PathBuf};

/// File extension handled by the catalog, lowercase, without the dot.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// A single document known to the catalog.
#[derive(Clone, Debug)]
pub struct Document {
    /// Absolute or folder-relative path as enumerated from disk.
    pub path: PathBuf,
    /// File stem shown in listings.
    pub display_name: String,
}

impl Document {
    /// Build an entry from a listed path, or `None` if the extension does
    /// not match [`DOCUMENT_EXTENSION`].
    #[must_use]
    pub fn from_path(path: PathBuf) -> Option<Self> {
        if !has_document_extension(&path) {
            return None;
        }
        let display_name = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Some(Self { path, display_name })
    }

    /// Identity check against another path, case-insensitive.
    #[must_use]
    pub fn matches_path(&self, other: &Path) -> bool {
        paths_equal(&self.path, other)
    }
}

/// True if `path` carries the handled extension, matched case-insensitively.
#[must_use]
pub fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
}

/// Case-insensitive full-path comparison.
///
/// Matching across refreshes follows the case-insensitivity of the
/// filesystems this tool targets; not a universal guarantee.
#[must_use]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    path_key(a) == path_key(b)
}

/// Lowercased path string used as an identity key.
#[must_use]
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_accepts_pdf_any_case() {
        let doc = Document::from_path(PathBuf::from("/tmp/Report.PDF")).unwrap();
        assert_eq!(doc.display_name, "Report");

        assert!(Document::from_path(PathBuf::from("/tmp/report.pdf")).is_some());
    }

    #[test]
    fn from_path_rejects_other_extensions() {
        assert!(Document::from_path(PathBuf::from("/tmp/report.txt")).is_none());
        assert!(Document::from_path(PathBuf::from("/tmp/report")).is_none());
        assert!(Document::from_path(PathBuf::from("/tmp/report.pdf.bak")).is_none());
    }

    #[test]
    fn path_identity_is_case_insensitive() {
        assert!(paths_equal(
            Path::new("/docs/Invoice.pdf"),
            Path::new("/docs/invoice.PDF")
        ));
        assert!(!paths_equal(
            Path::new("/docs/invoice.pdf"),
            Path::new("/docs/invoices.pdf")
        ));
    }
}
