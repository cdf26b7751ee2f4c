//! Local inbox of recordings waiting to be transcribed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use scribeflow_common::Result;

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "mkv", "avi", "webm", "m4v", "m4a", "mp3", "wav", "aac", "flac", "ogg",
];

/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_filename(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE
        .get_or_init(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid filename regex"))
        .replace_all(name, "_")
        .into_owned()
}

/// One recording in the inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    /// Stable identifier recorded in the outcome logs.
    pub id: String,
    /// Display name.
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct InboxSource {
    dir: PathBuf,
}

impl InboxSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Media files in the inbox, sorted by name, minus `exclude`d ids.
    ///
    /// A missing inbox is an empty inbox.
    pub fn list(&self, exclude: &HashSet<String>) -> Vec<InboxEntry> {
        if !self.dir.is_dir() {
            tracing::warn!("Inbox {:?} does not exist", self.dir);
            return Vec::new();
        }

        let mut entries: Vec<InboxEntry> = walkdir::WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| is_media(e.path()))
            .map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                InboxEntry {
                    id: name.clone(),
                    name,
                    path: e.into_path(),
                }
            })
            .filter(|entry| !exclude.contains(&entry.id))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::info!("Found {} unprocessed recording(s) in {:?}", entries.len(), self.dir);
        entries
    }

    /// First unprocessed entry, if any.
    pub fn next(&self, exclude: &HashSet<String>) -> Option<InboxEntry> {
        self.list(exclude).into_iter().next()
    }

    /// Copy `entry` into `downloads`, returning the local path.
    pub fn fetch(&self, entry: &InboxEntry, downloads: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(downloads)?;
        let target = downloads.join(sanitize_filename(&entry.name));
        std::fs::copy(&entry.path, &target)?;
        tracing::info!("Fetched {} to {:?}", entry.name, target);
        Ok(target)
    }
}

fn is_media(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}
