//! Search-state persistence
//!
//! The live `SearchState` is flushed to a JSON file on every
//! controller-driven change (write to a temp file, then atomic rename)
//! and re-read at startup, so tuning survives restarts without ever
//! being trusted from volatile memory alone.

use std::io::Write;
use std::path::{Path, PathBuf};
use zetahunt_types::SearchState;

/// Atomic load/flush handle for the persisted [`SearchState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by `path`.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, or defaults when no file exists yet.
    ///
    /// # Errors
    /// `std::io::Error` on filesystem failure or a corrupt state file;
    /// corruption is surfaced rather than silently replaced, since it
    /// would otherwise discard deliberate tuning.
    pub fn load_or_default(&self) -> std::io::Result<SearchState> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("corrupt state file {}: {e}", self.path.display()),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SearchState::default()),
            Err(e) => Err(e),
        }
    }

    /// Durably flush `state`: temp file in the same directory, fsync,
    /// atomic rename over the old copy.
    ///
    /// # Errors
    /// `std::io::Error` on any filesystem failure; the previous state
    /// file is left intact in that case.
    pub fn persist(&self, state: &SearchState) -> std::io::Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_data()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
