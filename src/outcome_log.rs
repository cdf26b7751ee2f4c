//! Append-only success and failure logs.
//!
//! One line per processed recording: `timestamp,id,name,STATUS[,error]`.
//! The id column of both logs forms the set of recordings that are never
//! picked up again. Ids are stored escaped so any file name survives the
//! round trip.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use scribeflow_common::{Error, Result};

use crate::inbox::sanitize_filename;

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_FAILURE: &str = "FAILURE";

#[derive(Debug, Clone)]
pub struct OutcomeLog {
    success_path: PathBuf,
    failure_path: PathBuf,
}

impl OutcomeLog {
    pub fn new(success_path: impl Into<PathBuf>, failure_path: impl Into<PathBuf>) -> Self {
        Self {
            success_path: success_path.into(),
            failure_path: failure_path.into(),
        }
    }

    pub fn success_path(&self) -> &Path {
        &self.success_path
    }

    pub fn failure_path(&self) -> &Path {
        &self.failure_path
    }

    /// Record a success. Write errors are logged and swallowed.
    pub fn record_success(&self, id: &str, name: &str) {
        let line = format_line(id, name, STATUS_SUCCESS, None);
        if let Err(e) = append(&self.success_path, &line) {
            tracing::warn!("Failed to record success for {id}: {e}");
        }
    }

    /// Record a failure. Write errors are logged and swallowed.
    pub fn record_failure(&self, id: &str, name: &str, error: &str) {
        let line = format_line(id, name, STATUS_FAILURE, Some(error));
        if let Err(e) = append(&self.failure_path, &line) {
            tracing::warn!("Failed to record failure for {id}: {e}");
        }
    }

    /// Ids found in either log. Missing logs contribute nothing.
    pub fn processed_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for path in [&self.success_path, &self.failure_path] {
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!("Failed to read outcome log {:?}: {e}", path);
                    continue;
                }
            };
            ids.extend(
                content
                    .lines()
                    .filter_map(|line| line.split(',').nth(1))
                    .filter(|id| !id.is_empty())
                    .map(unescape_id),
            );
        }
        ids
    }
}

fn format_line(id: &str, name: &str, status: &str, error: Option<&str>) -> String {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let id = escape_id(id);
    let name = sanitize_filename(name).replace(',', "_");
    match error {
        Some(error) => {
            let error = error.replace(['\n', '\r', ','], " ");
            format!("{timestamp},{id},{name},{status},{error}")
        }
        None => format!("{timestamp},{id},{name},{status}"),
    }
}

/// Percent-escape the characters that would break the line format.
fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        match c {
            '%' => out.push_str("%25"),
            ',' => out.push_str("%2C"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_id(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let decoded = match rest.get(pos + 1..pos + 3) {
            Some("25") => Some('%'),
            Some("2C") => Some(','),
            Some("0A") => Some('\n'),
            Some("0D") => Some('\r'),
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[pos + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn append(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::persistence(path.display().to_string(), e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::persistence(path.display().to_string(), e))?;
    writeln!(file, "{line}").map_err(|e| Error::persistence(path.display().to_string(), e))
}
