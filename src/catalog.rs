//! Document catalog for the watched folder
//!
//! Mirrors one folder's listing in memory and carries the selection across
//! refreshes. A selected document missing from a single listing stays
//! selected (pending confirmation); missing from two consecutive listings
//! it is cleared.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::document::{self, Document};

/// Folder listing failure.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("cannot list {}: {source}", .folder.display())]
    Unreadable {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot of the catalog handed to display collaborators.
#[derive(Clone, Debug)]
pub struct CatalogState {
    pub folder: PathBuf,
    pub documents: Vec<Document>,
    pub selected: Option<PathBuf>,
}

/// In-memory mirror of one folder's documents.
pub struct DocumentCatalog {
    folder: PathBuf,
    documents: Vec<Document>,
    selected: Option<PathBuf>,
    /// Selected path missing from the last listing, awaiting confirmation.
    selection_pending: bool,
}

impl DocumentCatalog {
    /// Create an empty catalog for `folder`; call [`refresh`] to populate.
    ///
    /// [`refresh`]: Self::refresh
    #[must_use]
    pub fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            documents: Vec::new(),
            selected: None,
            selection_pending: false,
        }
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[must_use]
    pub fn selected(&self) -> Option<&PathBuf> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.matches_path(path))
    }

    /// Snapshot for the `catalog_changed` callback.
    #[must_use]
    pub fn state(&self) -> CatalogState {
        CatalogState {
            folder: self.folder.clone(),
            documents: self.documents.clone(),
            selected: self.selected.clone(),
        }
    }

    /// Reconcile the in-memory listing against the folder on disk.
    ///
    /// Idempotent: two calls with no intervening filesystem change yield
    /// the same ordered list and the same selection. On a listing failure
    /// the catalog empties and the selection enters the same
    /// two-reconciliation countdown as a missing file.
    pub fn refresh(&mut self) -> Result<(), ListingError> {
        let listing = match list_documents(&self.folder) {
            Ok(listing) => listing,
            Err(err) => {
                self.documents.clear();
                self.reconcile_selection();
                return Err(err);
            }
        };

        debug!(
            "refreshed {}: {} documents",
            self.folder.display(),
            listing.len()
        );
        self.documents = listing;
        self.reconcile_selection();
        Ok(())
    }

    /// Select a document already present in the catalog.
    ///
    /// Returns false (selection unchanged) if the path is unknown.
    pub fn select(&mut self, path: &Path) -> bool {
        match self.find(path) {
            Some(doc) => {
                self.selected = Some(doc.path.clone());
                self.selection_pending = false;
                true
            }
            None => false,
        }
    }

    /// Point the selection at a path the next refresh is expected to list,
    /// e.g. the target of a just-completed rename.
    pub fn expect_selection(&mut self, path: PathBuf) {
        self.selected = Some(path);
        self.selection_pending = false;
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.selection_pending = false;
    }

    fn reconcile_selection(&mut self) {
        let Some(selected) = self.selected.clone() else {
            return;
        };

        if let Some(entry) = self.find(&selected) {
            // Normalize to the casing the listing reports.
            self.selected = Some(entry.path.clone());
            self.selection_pending = false;
        } else if self.selection_pending {
            info!(
                "selection {} confirmed gone after two listings",
                selected.display()
            );
            self.selected = None;
            self.selection_pending = false;
        } else {
            debug!(
                "selection {} absent from listing, keeping it pending",
                selected.display()
            );
            self.selection_pending = true;
        }
    }
}

/// List matching documents in `folder`, sorted by display name
/// case-insensitively so the order is stable under append/delete.
fn list_documents(folder: &Path) -> Result<Vec<Document>, ListingError> {
    let entries = fs::read_dir(folder).map_err(|source| ListingError::Unreadable {
        folder: folder.to_path_buf(),
        source,
    })?;

    let mut documents: Vec<Document> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if !path.is_file() {
                return None;
            }
            Document::from_path(path)
        })
        .collect();

    documents.sort_by(|a, b| {
        a.display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
    });

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_pdf;
    use tempfile::TempDir;

    fn catalog_with(files: &[&str]) -> (TempDir, DocumentCatalog) {
        let tmp = TempDir::new().unwrap();
        for name in files {
            write_pdf(&tmp.path().join(name), 1).unwrap();
        }
        let mut catalog = DocumentCatalog::new(tmp.path().to_path_buf());
        catalog.refresh().unwrap();
        (tmp, catalog)
    }

    fn names(catalog: &DocumentCatalog) -> Vec<String> {
        catalog
            .documents()
            .iter()
            .map(|d| d.display_name.clone())
            .collect()
    }

    #[test]
    fn listing_is_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        write_pdf(&tmp.path().join("beta.pdf"), 1).unwrap();
        write_pdf(&tmp.path().join("Alpha.pdf"), 1).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"skip me").unwrap();

        let mut catalog = DocumentCatalog::new(tmp.path().to_path_buf());
        catalog.refresh().unwrap();

        assert_eq!(names(&catalog), vec!["Alpha", "beta"]);
    }

    #[test]
    fn refresh_is_idempotent() {
        let (_tmp, mut catalog) = catalog_with(&["a.pdf", "b.pdf", "c.pdf"]);
        let selected = catalog.documents()[1].path.clone();
        assert!(catalog.select(&selected));

        let first = names(&catalog);
        catalog.refresh().unwrap();
        assert_eq!(names(&catalog), first);
        assert_eq!(catalog.selected(), Some(&selected));

        catalog.refresh().unwrap();
        assert_eq!(names(&catalog), first);
        assert_eq!(catalog.selected(), Some(&selected));
    }

    #[test]
    fn selection_survives_refresh_case_insensitively() {
        let (_tmp, mut catalog) = catalog_with(&["Report.pdf"]);
        let actual = catalog.documents()[0].path.clone();

        let upper = actual.with_file_name("REPORT.PDF");
        assert!(catalog.select(&upper));
        catalog.refresh().unwrap();

        // Normalized to the on-disk casing.
        assert_eq!(catalog.selected(), Some(&actual));
    }

    #[test]
    fn transient_disappearance_keeps_selection_for_one_refresh() {
        let (tmp, mut catalog) = catalog_with(&["a.pdf", "b.pdf"]);
        let selected = catalog.documents()[0].path.clone();
        catalog.select(&selected);

        std::fs::remove_file(&selected).unwrap();

        // First listing without the file: still selected, pending.
        catalog.refresh().unwrap();
        assert_eq!(catalog.selected(), Some(&selected));

        // Reappears before the second listing: selection recovers fully.
        write_pdf(&selected, 1).unwrap();
        catalog.refresh().unwrap();
        assert_eq!(catalog.selected(), Some(&selected));

        // Gone for two consecutive listings: cleared.
        std::fs::remove_file(&selected).unwrap();
        catalog.refresh().unwrap();
        assert_eq!(catalog.selected(), Some(&selected));
        catalog.refresh().unwrap();
        assert_eq!(catalog.selected(), None);

        drop(tmp);
    }

    #[test]
    fn select_unknown_path_is_rejected() {
        let (_tmp, mut catalog) = catalog_with(&["a.pdf"]);
        assert!(!catalog.select(Path::new("/nowhere/else.pdf")));
        assert_eq!(catalog.selected(), None);
    }

    #[test]
    fn unreadable_folder_empties_catalog() {
        let tmp = TempDir::new().unwrap();
        write_pdf(&tmp.path().join("a.pdf"), 1).unwrap();
        let mut catalog = DocumentCatalog::new(tmp.path().join("missing"));

        assert!(catalog.refresh().is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn expected_selection_binds_on_next_refresh() {
        let (tmp, mut catalog) = catalog_with(&["old.pdf"]);
        let old = catalog.documents()[0].path.clone();
        catalog.select(&old);

        let new = tmp.path().join("new.pdf");
        std::fs::rename(&old, &new).unwrap();
        catalog.expect_selection(new.clone());
        catalog.refresh().unwrap();

        assert_eq!(catalog.selected(), Some(&new));
        assert!(catalog.find(&old).is_none());
    }
}
