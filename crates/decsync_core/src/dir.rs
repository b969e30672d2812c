//! On-disk directory layout.
//!
//! ```text
//! <decsync-dir>/
//! ├─ .decsync-info
//! └─ <sync-type>[/<collection>]/
//!    ├─ new-entries/<writer>/<encoded path>           # append-only logs
//!    ├─ stored-entries/<writer>/<encoded path>        # materialized views
//!    └─ read-bytes/<reader>/<writer>/<encoded path>   # sequence cursors
//! ```
//!
//! This layout is the wire format: it must stay bit-compatible with
//! existing deployments. App ids and path segments are encoded with the
//! rules of [`crate::path`].

use crate::error::{DecsyncError, DecsyncResult};
use crate::path::{decode_segment, encode_path, encode_segment};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const NEW_ENTRIES_DIR: &str = "new-entries";
const STORED_ENTRIES_DIR: &str = "stored-entries";
const READ_BYTES_DIR: &str = "read-bytes";

/// The filesystem layout of one synchronized collection.
#[derive(Debug, Clone)]
pub struct DecsyncDir {
    base: PathBuf,
}

impl DecsyncDir {
    /// Creates the layout for `sync_type` and an optional `collection`
    /// under `decsync_dir`.
    pub fn new(decsync_dir: &Path, sync_type: &str, collection: Option<&str>) -> Self {
        let mut base = decsync_dir.join(sync_type);
        if let Some(collection) = collection {
            base.push(collection);
        }
        Self { base }
    }

    /// Returns the collection base directory, `<dir>/<sync-type>[/<collection>]`.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the log file of `app_id` for `path`.
    pub(crate) fn log_file(&self, app_id: &str, path: &[String]) -> PathBuf {
        self.base
            .join(NEW_ENTRIES_DIR)
            .join(encode_segment(app_id))
            .join(encode_path(path))
    }

    /// Returns the stored-entries subtree of `app_id`.
    pub(crate) fn stored_dir(&self, app_id: &str) -> PathBuf {
        self.base
            .join(STORED_ENTRIES_DIR)
            .join(encode_segment(app_id))
    }

    /// Returns the cursor file of reader `own` for the log of `writer` at
    /// `path`.
    pub(crate) fn cursor_file(&self, own: &str, writer: &str, path: &[String]) -> PathBuf {
        self.base
            .join(READ_BYTES_DIR)
            .join(encode_segment(own))
            .join(encode_segment(writer))
            .join(encode_path(path))
    }

    /// Enumerates every writer's log files, sorted by (writer, path) so the
    /// scan order is stable within a call.
    pub(crate) fn log_files(&self) -> Vec<LogFileRef> {
        let mut out = Vec::new();
        for (app_id, writer_dir) in self.writer_dirs() {
            let mut prefix = Vec::new();
            collect_logs(&writer_dir, &app_id, &mut prefix, &mut out);
        }
        out.sort_by(|a, b| (&a.app_id, &a.path).cmp(&(&b.app_id, &b.path)));
        out
    }

    /// The log files of a single `path` across all writers, sorted by
    /// writer.
    pub(crate) fn log_files_at(&self, path: &[String]) -> Vec<LogFileRef> {
        let mut out = Vec::new();
        for (app_id, writer_dir) in self.writer_dirs() {
            let file = writer_dir.join(encode_path(path));
            if file.is_file() {
                out.push(LogFileRef {
                    app_id,
                    path: path.to_vec(),
                    file,
                });
            }
        }
        out.sort_by(|a, b| a.app_id.cmp(&b.app_id));
        out
    }

    fn writer_dirs(&self) -> Vec<(String, PathBuf)> {
        let new_entries = self.base.join(NEW_ENTRIES_DIR);
        let entries = match fs::read_dir(&new_entries) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Some(app_id) = decode_segment(&name) else {
                continue;
            };
            out.push((app_id, dir));
        }
        out
    }
}

/// A discovered log file: its writer, decoded entry path, and location.
#[derive(Debug, Clone)]
pub(crate) struct LogFileRef {
    /// The writer that owns the log.
    pub app_id: String,
    /// The decoded entry path.
    pub path: Vec<String>,
    /// The filesystem path of the log file.
    pub file: PathBuf,
}

fn collect_logs(dir: &Path, app_id: &str, prefix: &mut Vec<String>, out: &mut Vec<LogFileRef>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "cannot read log directory, skipping");
            return;
        }
    };
    for entry in entries.flatten() {
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let Some(segment) = decode_segment(&name) else {
            continue;
        };
        let child = entry.path();
        if child.is_dir() {
            prefix.push(segment);
            collect_logs(&child, app_id, prefix, out);
            prefix.pop();
        } else if child.is_file() {
            let mut path = prefix.clone();
            path.push(segment);
            out.push(LogFileRef {
                app_id: app_id.to_owned(),
                path,
                file: child,
            });
        }
    }
}

/// Lists the collections under `decsync_dir/sync_type` that contain
/// synchronized data, sorted by name.
pub fn list_collections(decsync_dir: &Path, sync_type: &str) -> Vec<String> {
    let type_dir = decsync_dir.join(sync_type);
    let entries = match fs::read_dir(&type_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if has_any_file(&dir.join(NEW_ENTRIES_DIR)) {
            out.push(name);
        }
    }
    out.sort();
    out
}

fn has_any_file(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let child = entry.path();
        if child.is_file() || has_any_file(&child) {
            return true;
        }
    }
    false
}

/// Returns the default DecSync directory: `$DECSYNC_DIR` when set,
/// otherwise `DecSync` in the user's home directory.
pub fn default_decsync_dir() -> DecsyncResult<PathBuf> {
    if let Some(dir) = std::env::var_os("DECSYNC_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = dirs::home_dir().ok_or_else(|| {
        DecsyncError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "no home directory on this platform",
        ))
    })?;
    Ok(home.join("DecSync"))
}

/// Writes a file via a hidden sibling temp file and an atomic rename,
/// creating parent directories as needed. The temp name starts with a dot,
/// which no encoded path segment ever does, so it cannot shadow real data.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    fs::create_dir_all(parent)?;

    let tmp = parent.join(format!(".{file_name}.tmp"));
    let mut file = File::create(&tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)
}
