//! Cross-restart session state
//!
//! The one thing remembered between runs is the last opened folder, stored
//! as pretty JSON under the platform data directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "pdfolio";
const SESSION_FILENAME: &str = "session.json";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Session {
    pub last_folder: Option<PathBuf>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
}

impl Session {
    /// Session that never touches disk.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Load from the default platform location, falling back to an
    /// ephemeral session when that is unavailable or unreadable.
    #[must_use]
    pub fn load_default() -> Self {
        match default_path() {
            Some(path) => Self::load_from_file(&path).unwrap_or_else(|err| {
                log::error!("failed to load session from {}: {err}", path.display());
                Self {
                    file_path: Some(path),
                    ..Self::default()
                }
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let mut session: Self = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            session.file_path = Some(path.to_path_buf());
            Ok(session)
        } else {
            Ok(Self {
                file_path: Some(path.to_path_buf()),
                ..Self::default()
            })
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.file_path else {
            // Ephemeral sessions don't save to disk.
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Record and persist the folder; persistence failure is logged, not
    /// propagated.
    pub fn remember_folder(&mut self, folder: &Path) {
        self.last_folder = Some(folder.to_path_buf());
        if let Err(err) = self.save() {
            log::error!("failed to save session: {err}");
        }
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_NAME).join(SESSION_FILENAME))
}

/// Compute the log file path, preferring the state dir where the platform
/// has one.
pub fn resolve_log_path() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .context("could not determine state or cache directory")?;

    let log_dir = base.join(APP_NAME);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    Ok(log_dir.join("pdfolio.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_empty_session() {
        let tmp = TempDir::new().unwrap();
        let session = Session::load_from_file(&tmp.path().join("session.json")).unwrap();
        assert!(session.last_folder.is_none());
    }

    #[test]
    fn remember_folder_round_trips() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("nested").join("session.json");

        let mut session = Session::load_from_file(&file).unwrap();
        session.remember_folder(Path::new("/docs/invoices"));

        let reloaded = Session::load_from_file(&file).unwrap();
        assert_eq!(
            reloaded.last_folder.as_deref(),
            Some(Path::new("/docs/invoices"))
        );
    }

    #[test]
    fn ephemeral_save_is_a_no_op() {
        let mut session = Session::ephemeral();
        session.remember_folder(Path::new("/anywhere"));
        assert!(session.save().is_ok());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("session.json");
        fs::write(&file, "not json").unwrap();
        assert!(Session::load_from_file(&file).is_err());
    }
}
