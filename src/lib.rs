// Export modules for use in tests
pub mod catalog;
pub mod controller;
pub mod document;
pub mod error;
pub mod render;
pub mod session;
pub mod watcher;
pub mod zoom;

pub mod test_utils;

// Re-export the orchestration surface
pub use controller::{Phase, PreviewController, PreviewSurface, RenameError};
