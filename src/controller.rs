//! Preview orchestration
//!
//! Owns the catalog, the folder watch, the render service and the zoom
//! state, and runs the rename sequence. All state mutation happens on the
//! caller's context: watcher signals and render results are queued and
//! drained by [`PreviewController::pump`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use log::{info, warn};
use thiserror::Error;

use crate::catalog::{CatalogState, DocumentCatalog};
use crate::document;
use crate::error::Notice;
use crate::render::{
    self, Bitmap, RenderKind, RenderResponse, RenderService,
};
use crate::watcher::{ChangeNotifier, DEFAULT_DEBOUNCE, RefreshRequested};
use crate::zoom::{Zoom, ZoomDirection};

/// Controller lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No folder chosen yet
    Idle,
    /// Catalog mirrors the folder, nothing in flight
    Ready,
    /// A catalog refresh is underway
    Loading,
    /// Preview/thumbnail renders are in flight
    Rendering,
    /// A rename sequence is running
    Renaming,
}

/// Callbacks into the display collaborators.
///
/// Implementations only present; they never mutate engine state from
/// inside a callback.
pub trait PreviewSurface {
    /// The listing or selection changed.
    fn catalog_changed(&mut self, state: &CatalogState);
    /// The full-resolution preview for the current selection is ready.
    fn preview_ready(&mut self, bitmap: Arc<Bitmap>);
    /// One thumbnail for the current selection is ready.
    fn thumbnail_ready(&mut self, page_index: usize, bitmap: Arc<Bitmap>);
    /// The selection is gone; drop displayed preview and thumbnails.
    fn selection_cleared(&mut self);
    /// A categorized failure to present.
    fn report(&mut self, notice: &Notice);
}

/// Why a rename was rejected or failed.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("another rename is still in progress")]
    Busy,

    #[error("no document is selected")]
    NothingSelected,

    #[error("invalid file name: {name:?}")]
    InvalidName { name: String },

    #[error("a file named {name:?} already exists")]
    NameCollision { name: String },

    #[error("source file vanished: {}", .path.display())]
    SourceMissing { path: PathBuf },

    #[error("access denied (file open elsewhere or insufficient permission): {source}")]
    AccessDenied {
        #[source]
        source: std::io::Error,
    },

    #[error("rename failed: {source}")]
    Failed {
        #[source]
        source: std::io::Error,
    },
}

/// Transient description of an in-flight rename; exists only for the
/// duration of [`PreviewController::rename_selected`].
#[derive(Debug)]
struct RenameOperation {
    old_path: PathBuf,
    new_path: PathBuf,
}

/// Top-level orchestrator for one watched folder.
pub struct PreviewController {
    phase: Phase,
    catalog: Option<DocumentCatalog>,
    notifier: Option<ChangeNotifier>,
    signal_tx: Sender<RefreshRequested>,
    signal_rx: Receiver<RefreshRequested>,
    render: RenderService,
    zoom: Zoom,
    debounce: Duration,
    /// Listing failures are reported once per failure episode.
    listing_error_reported: bool,
}

impl Default for PreviewController {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewController {
    #[must_use]
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    /// Controller with an explicit watcher debounce window.
    #[must_use]
    pub fn with_debounce(debounce: Duration) -> Self {
        let (signal_tx, signal_rx) = flume::unbounded();
        Self {
            phase: Phase::Idle,
            catalog: None,
            notifier: None,
            signal_tx,
            signal_rx,
            render: RenderService::new(),
            zoom: Zoom::default(),
            debounce,
            listing_error_reported: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn zoom_factor(&self) -> f32 {
        self.zoom.factor()
    }

    /// True while filesystem changes arrive automatically; false in
    /// manual-refresh fallback mode.
    #[must_use]
    pub fn watching(&self) -> bool {
        self.notifier.is_some()
    }

    #[must_use]
    pub fn catalog_state(&self) -> Option<CatalogState> {
        self.catalog.as_ref().map(DocumentCatalog::state)
    }

    #[must_use]
    pub fn selected(&self) -> Option<PathBuf> {
        self.catalog.as_ref().and_then(|c| c.selected().cloned())
    }

    /// Point the controller at a folder: refresh the catalog and establish
    /// the folder watch. Watch failure degrades to manual refresh and is
    /// reported, not fatal.
    pub fn set_folder(&mut self, folder: &Path, surface: &mut dyn PreviewSurface) {
        // Stop the old watch before touching the new folder.
        self.notifier = None;
        self.catalog = Some(DocumentCatalog::new(folder.to_path_buf()));
        self.listing_error_reported = false;

        self.render.release_resources();
        self.zoom.reset();
        surface.selection_cleared();

        self.phase = Phase::Loading;
        self.do_refresh(surface);

        match ChangeNotifier::with_debounce(folder, self.signal_tx.clone(), self.debounce) {
            Ok(notifier) => self.notifier = Some(notifier),
            Err(err) => {
                surface.report(&Notice::notifier(
                    err.to_string(),
                    Some(folder.to_path_buf()),
                ));
                info!(
                    "falling back to manual refresh for {}",
                    folder.display()
                );
            }
        }

        self.phase = Phase::Ready;
    }

    /// Manual refresh trigger (toolbar button, watch fallback mode).
    pub fn refresh(&mut self, surface: &mut dyn PreviewSurface) {
        self.phase = Phase::Loading;
        self.do_refresh(surface);
        self.phase = self.settled_phase();
    }

    /// Make `path` the current selection and start rendering it.
    pub fn select_document(&mut self, path: &Path, surface: &mut dyn PreviewSurface) {
        let selected = match self.catalog.as_mut() {
            Some(catalog) => catalog.select(path),
            None => {
                warn!("select_document without a folder");
                return;
            }
        };
        if !selected {
            warn!("selection rejected, {} is not in the catalog", path.display());
            return;
        }

        self.zoom.reset();
        if let Some(catalog) = self.catalog.as_ref() {
            surface.catalog_changed(&catalog.state());
        }
        self.start_render(surface);
    }

    /// Re-render the preview pane for another page of the current
    /// selection (thumbnail activation).
    pub fn show_page(&mut self, page_index: usize, surface: &mut dyn PreviewSurface) {
        let Some(path) = self.selected() else {
            return;
        };

        self.zoom.reset();
        let token = self.render.current_token();
        match self
            .render
            .request(token, &path, page_index, render::PREVIEW_BOX, RenderKind::Preview)
        {
            Some(bitmap) => surface.preview_ready(bitmap),
            None => self.phase = Phase::Rendering,
        }
    }

    /// Step the presentation zoom; returns the clamped factor.
    pub fn apply_zoom_delta(&mut self, direction: ZoomDirection) -> f32 {
        self.zoom.apply_delta(direction)
    }

    /// Hand the current selection to the system viewer.
    pub fn open_selected(&mut self, surface: &mut dyn PreviewSurface) {
        let Some(path) = self.selected() else {
            return;
        };
        if let Err(err) = open::that(&path) {
            surface.report(&Notice::open(err.to_string(), Some(path)));
        }
    }

    /// Rename the selected document within its folder, extension unchanged.
    ///
    /// The sequence is fixed: release rendering resources, suppress the
    /// watcher, move the file, reconcile the catalog, re-render, resume
    /// the watcher. On failure the old selection is restored and
    /// re-rendered, and the watcher is still resumed.
    pub fn rename_selected(
        &mut self,
        new_base_name: &str,
        surface: &mut dyn PreviewSurface,
    ) -> Result<(), RenameError> {
        if self.phase == Phase::Renaming {
            return reject(RenameError::Busy, None, surface);
        }

        let Some(old_path) = self.selected() else {
            return reject(RenameError::NothingSelected, None, surface);
        };

        let name = new_base_name.trim();
        if let Err(err) = validate_base_name(name) {
            return reject(err, Some(old_path), surface);
        }

        let old_stem = old_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        if name == old_stem {
            return Ok(());
        }

        let Some(folder) = old_path.parent().map(Path::to_path_buf) else {
            let err = RenameError::SourceMissing {
                path: old_path.clone(),
            };
            return reject(err, Some(old_path), surface);
        };
        let op = RenameOperation {
            new_path: folder.join(format!("{name}.{}", document::DOCUMENT_EXTENSION)),
            old_path,
        };

        if !op.old_path.exists() {
            let err = RenameError::SourceMissing {
                path: op.old_path.clone(),
            };
            self.refresh(surface);
            return reject(err, Some(op.old_path), surface);
        }
        if op.new_path.exists() && !document::paths_equal(&op.old_path, &op.new_path) {
            let err = RenameError::NameCollision {
                name: name.to_string(),
            };
            return reject(err, Some(op.old_path), surface);
        }

        self.phase = Phase::Renaming;

        // No rendering resource may outlive this point; the move must not
        // contend with an open handle or a bitmap tied to the old path.
        self.render.release_resources();
        surface.selection_cleared();

        if let Some(notifier) = &self.notifier {
            notifier.suppress();
        }

        clear_readonly(&op.old_path);

        let result = match fs::rename(&op.old_path, &op.new_path) {
            Ok(()) => {
                info!(
                    "renamed {} -> {}",
                    op.old_path.display(),
                    op.new_path.display()
                );
                if let Some(catalog) = self.catalog.as_mut() {
                    catalog.expect_selection(op.new_path.clone());
                }
                self.do_refresh(surface);
                Ok(())
            }
            Err(io_err) => {
                let err = classify_rename_io(io_err, &op.old_path);
                surface.report(&Notice::rename(err.to_string(), Some(op.old_path.clone())));
                self.do_refresh(surface);
                Err(err)
            }
        };

        self.start_render(surface);

        if let Some(notifier) = &self.notifier {
            notifier.resume();
        }
        self.phase = self.settled_phase();

        result
    }

    /// Drain queued watcher signals and render results. Call this from the
    /// main loop; it is the only place background work touches state.
    pub fn pump(&mut self, surface: &mut dyn PreviewSurface) {
        let mut refresh_requested = false;
        while self.signal_rx.try_recv().is_ok() {
            refresh_requested = true;
        }
        if refresh_requested {
            self.phase = Phase::Loading;
            self.do_refresh(surface);
        }

        for response in self.render.poll() {
            match response {
                RenderResponse::Completed {
                    kind: RenderKind::Preview,
                    bitmap,
                    ..
                } => surface.preview_ready(bitmap),
                RenderResponse::Completed {
                    kind: RenderKind::Thumbnail,
                    page_index,
                    bitmap,
                    ..
                } => surface.thumbnail_ready(page_index, bitmap),
                RenderResponse::Failed {
                    page_index,
                    path,
                    error,
                    ..
                } => surface.report(&Notice::render(
                    format!("page {page_index}: {error}"),
                    Some(path),
                )),
                RenderResponse::Cancelled { .. } => {}
            }
        }

        if matches!(self.phase, Phase::Loading | Phase::Rendering) {
            self.phase = self.settled_phase();
        }
    }

    fn settled_phase(&self) -> Phase {
        if self.render.idle() {
            Phase::Ready
        } else {
            Phase::Rendering
        }
    }

    /// Refresh the catalog and propagate the outcome. Phase handling is
    /// the caller's business so the rename sequence keeps its own phase.
    fn do_refresh(&mut self, surface: &mut dyn PreviewSurface) {
        let Some(catalog) = self.catalog.as_mut() else {
            return;
        };

        let had_selection = catalog.selected().cloned();
        let result = catalog.refresh();
        let lost = had_selection.is_some() && catalog.selected().is_none();
        let state = catalog.state();

        match result {
            Ok(()) => {
                self.listing_error_reported = false;
                // Folder contents moved under us; cached bitmaps may be stale.
                self.render.invalidate_cache();
            }
            Err(err) => {
                if !self.listing_error_reported {
                    self.listing_error_reported = true;
                    surface.report(&Notice::listing(
                        err.to_string(),
                        Some(state.folder.clone()),
                    ));
                }
            }
        }

        if lost {
            // In-flight renders of the vanished selection must never land.
            self.render.release_resources();
            surface.selection_cleared();
        }

        surface.catalog_changed(&state);
    }

    /// Kick off preview + thumbnail rendering for the current selection.
    fn start_render(&mut self, surface: &mut dyn PreviewSurface) {
        let Some(path) = self.selected() else {
            self.phase = self.settled_phase();
            return;
        };

        let token = self.render.begin_generation();
        let count = match render::engine::page_count(&path) {
            Ok(count) => count,
            Err(err) => {
                surface.report(&Notice::render(err.to_string(), Some(path)));
                self.phase = Phase::Ready;
                return;
            }
        };

        self.phase = Phase::Rendering;

        if let Some(bitmap) =
            self.render
                .request(token, &path, 0, render::PREVIEW_BOX, RenderKind::Preview)
        {
            surface.preview_ready(bitmap);
        }
        for page_index in 0..count {
            if let Some(bitmap) = self.render.request(
                token,
                &path,
                page_index,
                render::THUMBNAIL_BOX,
                RenderKind::Thumbnail,
            ) {
                surface.thumbnail_ready(page_index, bitmap);
            }
        }

        self.phase = self.settled_phase();
    }
}

fn reject(
    err: RenameError,
    path: Option<PathBuf>,
    surface: &mut dyn PreviewSurface,
) -> Result<(), RenameError> {
    surface.report(&Notice::rename(err.to_string(), path));
    Err(err)
}

/// Characters rejected in proposed base names (Windows superset, which is
/// also safe everywhere else).
const INVALID_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

fn validate_base_name(name: &str) -> Result<(), RenameError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.ends_with('.')
        || name
            .chars()
            .any(|c| INVALID_NAME_CHARS.contains(&c) || c.is_control());

    if invalid {
        return Err(RenameError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Drop a read-only bit so the move is not rejected for a reason the user
/// can't see. Best effort.
fn clear_readonly(path: &Path) {
    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        if let Err(err) = fs::set_permissions(path, permissions) {
            warn!("cannot clear read-only bit on {}: {err}", path.display());
        }
    }
}

fn classify_rename_io(err: std::io::Error, old_path: &Path) -> RenameError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => RenameError::AccessDenied { source: err },
        std::io::ErrorKind::NotFound => RenameError::SourceMissing {
            path: old_path.to_path_buf(),
        },
        _ => RenameError::Failed { source: err },
    }
}
