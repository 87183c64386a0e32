//! Structured failure reports for the error-presentation surface
//!
//! Every recoverable failure is reduced to a [`Notice`] at the component
//! boundary that detected it. The presentation surface displays the kind
//! and message; it never interprets them.

use std::path::PathBuf;

/// Category of a reported failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    /// Folder listing failed
    Listing,
    /// A page render failed
    Render,
    /// A rename was rejected or failed
    Rename,
    /// The folder watch could not be established
    Notifier,
    /// Handing a document to the system viewer failed
    Open,
}

/// One categorized failure report.
#[derive(Clone, Debug)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub path: Option<PathBuf>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            kind,
            message: message.into(),
            path,
        }
    }

    pub fn listing(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::new(NoticeKind::Listing, message, path)
    }

    pub fn render(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::new(NoticeKind::Render, message, path)
    }

    pub fn rename(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::new(NoticeKind::Rename, message, path)
    }

    pub fn notifier(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::new(NoticeKind::Notifier, message, path)
    }

    pub fn open(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::new(NoticeKind::Open, message, path)
    }
}
