//! Durable rotation cursor.
//!
//! The cursor records the index of the last key handed out, so the next run
//! starts with the key after it instead of always starting at key 0. The file
//! holds a single JSON record: `{"lastKeyIndex": 2}`, with `-1` meaning that
//! nothing has been leased yet.
//!
//! The cursor only provides continuity across runs. Nothing inside a run
//! depends on it, so save failures are logged and swallowed.

use std::io::Write;
use std::path::{Path, PathBuf};

use scribeflow_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// File name used when no cursor path is configured.
pub const DEFAULT_CURSOR_FILE: &str = ".session_data.json";

/// On-disk shape of the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct RotationState {
    #[serde(rename = "lastKeyIndex")]
    last_index: i64,
}

impl RotationState {
    fn from_cursor(cursor: Option<usize>) -> Self {
        Self {
            last_index: cursor.map(|i| i as i64).unwrap_or(-1),
        }
    }
}

/// File-backed store for the last leased index.
#[derive(Debug, Clone)]
pub struct RotationCursor {
    path: PathBuf,
}

impl RotationCursor {
    /// Create a cursor stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cursor file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last leased index for a pool of `pool_size` keys.
    ///
    /// Returns `None` (the unset value) when the file is missing, unreadable,
    /// corrupt, negative, or points past the end of the pool.
    pub fn load(&self, pool_size: usize) -> Option<usize> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No rotation cursor at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read rotation cursor {}: {e}",
                    self.path.display()
                );
                return None;
            }
        };

        let state: RotationState = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    "Ignoring corrupt rotation cursor {}: {e}",
                    self.path.display()
                );
                return None;
            }
        };

        match usize::try_from(state.last_index) {
            Ok(index) if index < pool_size => {
                tracing::info!(
                    "Resuming key rotation at index {}",
                    (index + 1) % pool_size
                );
                Some(index)
            }
            _ => {
                if state.last_index != -1 {
                    tracing::warn!(
                        "Rotation cursor {} out of range for {pool_size} key(s); starting over",
                        state.last_index
                    );
                }
                None
            }
        }
    }

    /// Persist the cursor, replacing the whole record.
    ///
    /// The record is written to a temporary file in the same directory and
    /// renamed over the old one.
    pub fn try_save(&self, cursor: Option<usize>) -> Result<()> {
        let json = serde_json::to_string(&RotationState::from_cursor(cursor))
            .map_err(|e| Error::persistence("rotation cursor", e))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| Error::persistence("rotation cursor", e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| Error::persistence("rotation cursor", e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| Error::persistence("rotation cursor", e))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::persistence("rotation cursor", e.error))?;

        Ok(())
    }

    /// Persist the cursor, logging instead of failing.
    ///
    /// Nothing is written for an empty pool.
    pub fn save(&self, cursor: Option<usize>, pool_size: usize) {
        if pool_size == 0 {
            return;
        }
        match self.try_save(cursor) {
            Ok(()) => tracing::debug!(
                "Saved rotation cursor {:?} to {}",
                cursor,
                self.path.display()
            ),
            Err(e) => tracing::warn!("{e}"),
        }
    }
}

impl Default for RotationCursor {
    fn default() -> Self {
        Self::new(DEFAULT_CURSOR_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let cursor = RotationCursor::new(dir.path().join("cursor.json"));

        cursor.try_save(Some(2)).unwrap();
        assert_eq!(cursor.load(5), Some(2));

        cursor.try_save(None).unwrap();
        assert_eq!(cursor.load(5), None);
    }

    #[test]
    fn on_disk_format_matches_session_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".session_data.json");
        let cursor = RotationCursor::new(&path);

        cursor.try_save(Some(1)).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"lastKeyIndex":1}"#);

        cursor.try_save(None).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"lastKeyIndex":-1}"#);
    }

    #[test]
    fn missing_file_is_unset() {
        let dir = tempdir().unwrap();
        let cursor = RotationCursor::new(dir.path().join("absent.json"));
        assert_eq!(cursor.load(3), None);
    }

    #[test]
    fn corrupt_record_is_unset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursor.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(RotationCursor::new(&path).load(3), None);

        std::fs::write(&path, r#"{"lastKeyIndex":"two"}"#).unwrap();
        assert_eq!(RotationCursor::new(&path).load(3), None);
    }

    #[test]
    fn out_of_range_is_unset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursor.json");
        let cursor = RotationCursor::new(&path);

        std::fs::write(&path, r#"{"lastKeyIndex":3}"#).unwrap();
        assert_eq!(cursor.load(3), None);
        assert_eq!(cursor.load(4), Some(3));

        std::fs::write(&path, r#"{"lastKeyIndex":-7}"#).unwrap();
        assert_eq!(cursor.load(3), None);

        std::fs::write(&path, r#"{"lastKeyIndex":0}"#).unwrap();
        assert_eq!(cursor.load(0), None);
    }

    #[test]
    fn save_overwrites_and_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/state/cursor.json");
        let cursor = RotationCursor::new(&path);

        cursor.try_save(Some(4)).unwrap();
        cursor.try_save(Some(0)).unwrap();
        assert_eq!(cursor.load(5), Some(0));
    }

    #[test]
    fn save_swallows_failures() {
        let dir = tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        let cursor = RotationCursor::new(&path);

        assert!(cursor.try_save(Some(1)).is_err());
        cursor.save(Some(1), 3);
    }

    #[test]
    fn save_skips_empty_pool() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursor.json");
        RotationCursor::new(&path).save(None, 0);
        assert!(!path.exists());
    }
}
