//! Filesystem change notification for the watched folder
//!
//! Wraps the OS watcher and squeezes bursts of raw events into single
//! refresh signals. Raw events arrive on notify's own thread and are only
//! forwarded into a channel; a debounce thread owns the coalescing loop and
//! posts the final signal to the main context's channel. No callback ever
//! touches catalog state directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use crate::document;

/// Coalescing window: raw events closer together than this merge into one
/// signal, fired once the window closes quietly.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Watch establishment failure. Non-fatal: the controller degrades to
/// manual refresh.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("cannot watch {}: {source}", .folder.display())]
    WatchFailed {
        folder: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Signal posted to the main context: the folder changed, refresh it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshRequested;

/// One folder's change watch. Dropping it stops the watch.
pub struct ChangeNotifier {
    suppressed: Arc<AtomicBool>,
    pending: Arc<AtomicBool>,
    signal_tx: Sender<RefreshRequested>,
    /// Kept alive for the lifetime of the watch; dropped first so the
    /// debounce thread sees its input disconnect and exits.
    watcher: Option<RecommendedWatcher>,
    debounce_handle: Option<JoinHandle<()>>,
}

impl ChangeNotifier {
    /// Establish a watch on `folder`, posting signals to `signal_tx`.
    pub fn watch(
        folder: &Path,
        signal_tx: Sender<RefreshRequested>,
    ) -> Result<Self, NotifierError> {
        Self::with_debounce(folder, signal_tx, DEFAULT_DEBOUNCE)
    }

    /// Same as [`watch`] with an explicit debounce window.
    ///
    /// [`watch`]: Self::watch
    pub fn with_debounce(
        folder: &Path,
        signal_tx: Sender<RefreshRequested>,
        debounce: Duration,
    ) -> Result<Self, NotifierError> {
        let (event_tx, event_rx) = flume::unbounded::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if is_relevant(&event) {
                        let _ = event_tx.send(());
                    }
                }
                Err(err) => warn!("watch error: {err}"),
            },
            Config::default(),
        )
        .map_err(|source| NotifierError::WatchFailed {
            folder: folder.to_path_buf(),
            source,
        })?;

        watcher
            .watch(folder, RecursiveMode::NonRecursive)
            .map_err(|source| NotifierError::WatchFailed {
                folder: folder.to_path_buf(),
                source,
            })?;

        let suppressed = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(AtomicBool::new(false));

        let thread_signals = signal_tx.clone();
        let thread_suppressed = Arc::clone(&suppressed);
        let thread_pending = Arc::clone(&pending);
        let debounce_handle = std::thread::spawn(move || {
            debounce_loop(
                &event_rx,
                &thread_signals,
                &thread_suppressed,
                &thread_pending,
                debounce,
            );
        });

        debug!("watching {}", folder.display());
        Ok(Self {
            suppressed,
            pending,
            signal_tx,
            watcher: Some(watcher),
            debounce_handle: Some(debounce_handle),
        })
    }

    /// Hold back signals. Events are still observed so nothing is lost.
    pub fn suppress(&self) {
        self.suppressed.store(true, Ordering::Release);
    }

    /// Let signals through again; if anything happened while suppressed,
    /// emit one signal immediately.
    pub fn resume(&self) {
        self.suppressed.store(false, Ordering::Release);
        if self.pending.swap(false, Ordering::AcqRel) {
            let _ = self.signal_tx.send(RefreshRequested);
        }
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        // Dropping the watcher disconnects the event channel, which ends
        // the debounce loop.
        self.watcher.take();
        if let Some(handle) = self.debounce_handle.take() {
            let _ = handle.join();
        }
    }
}

fn is_relevant(event: &Event) -> bool {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    // Rescan-style events come without paths; treat them as relevant.
    if event.paths.is_empty() {
        return true;
    }
    event
        .paths
        .iter()
        .any(|path| document::has_document_extension(path))
}

/// Coalesce raw events into refresh signals.
///
/// Blocks until the first event of a burst, then extends the window while
/// events keep arriving; once it closes quietly, one signal is emitted (or
/// the pending flag is set while suppressed). Exits when either channel
/// disconnects.
fn debounce_loop(
    events: &Receiver<()>,
    signals: &Sender<RefreshRequested>,
    suppressed: &AtomicBool,
    pending: &AtomicBool,
    window: Duration,
) {
    loop {
        if events.recv().is_err() {
            break;
        }

        loop {
            match events.recv_timeout(window) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        if suppressed.load(Ordering::Acquire) {
            pending.store(true, Ordering::Release);
        } else if signals.send(RefreshRequested).is_err() {
            break;
        }
    }
}
