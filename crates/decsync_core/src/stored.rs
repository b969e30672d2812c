//! The stored-entries materialized view.
//!
//! Each writer keeps its own view of the current best value per
//! `(path, key)` under `stored-entries/<app-id>/`. The file format mirrors
//! the log-line format, `datetime\tkey\tvalue`, one line per key; unlike
//! the logs these files are private to their owner and may be rewritten.
//!
//! An incoming entry replaces the stored one only with a strictly newer
//! datetime: the on-disk format carries no source app id, so equal
//! datetimes keep what is already there. The view is monotonic; nothing
//! here ever retracts a value.

use crate::codec;
use crate::dir::write_atomic;
use crate::entry::Entry;
use crate::path::{decode_segment, encode_path};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One writer's materialized `(path, key) → (datetime, value)` view.
#[derive(Debug, Clone)]
pub(crate) struct StoredView {
    root: PathBuf,
}

impl StoredView {
    /// Creates a view rooted at `stored-entries/<app-id>`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn file_for(&self, path: &[String]) -> PathBuf {
        self.root.join(encode_path(path))
    }

    /// Returns all entries stored at exactly `path`.
    pub fn entries_at(&self, path: &[String]) -> Vec<Entry> {
        read_entries(&self.file_for(path))
    }

    /// Returns the entry at `(path, key)`, if any.
    pub fn get(&self, path: &[String], key: &str) -> Option<Entry> {
        self.entries_at(path).into_iter().find(|e| e.key == key)
    }

    /// Applies updates at one path, keeping existing values unless an
    /// update carries a strictly newer datetime. Returns whether the file
    /// changed.
    pub fn merge_at(&self, path: &[String], updates: &[Entry]) -> io::Result<bool> {
        let file = self.file_for(path);
        let mut entries = read_entries(&file);
        let mut changed = false;
        for update in updates {
            match entries.iter_mut().find(|e| e.key == update.key) {
                Some(existing) => {
                    if update.datetime > existing.datetime {
                        *existing = update.clone();
                        changed = true;
                    }
                }
                None => {
                    entries.push(update.clone());
                    changed = true;
                }
            }
        }
        if changed {
            let mut buf = String::new();
            for entry in &entries {
                buf.push_str(&codec::encode_line(entry));
                buf.push('\n');
            }
            write_atomic(&file, buf.as_bytes())?;
        }
        Ok(changed)
    }

    /// Walks every stored file at or below `prefix`, yielding the decoded
    /// path and the entries of each.
    pub fn entries_below(&self, prefix: &[String]) -> Vec<(Vec<String>, Vec<Entry>)> {
        let target = self.file_for(prefix);
        let mut out = Vec::new();
        if target.is_file() {
            out.push((prefix.to_vec(), read_entries(&target)));
        } else if target.is_dir() {
            let mut path = prefix.to_vec();
            collect_stored(&target, &mut path, &mut out);
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

fn collect_stored(dir: &Path, prefix: &mut Vec<String>, out: &mut Vec<(Vec<String>, Vec<Entry>)>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "cannot read stored directory, skipping");
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
            collect_stored(&child, prefix, out);
            prefix.pop();
        } else if child.is_file() {
            let mut path = prefix.clone();
            path.push(segment);
            out.push((path, read_entries(&child)));
        }
    }
}

/// Reads a stored file; missing files are empty, corrupt lines skipped.
fn read_entries(file: &Path) -> Vec<Entry> {
    let Ok(data) = fs::read(file) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for chunk in data.split_inclusive(|&b| b == b'\n') {
        let Some(line_bytes) = chunk.strip_suffix(b"\n") else {
            break;
        };
        let Ok(line) = std::str::from_utf8(line_bytes) else {
            warn!(file = %file.display(), "skipping non-UTF-8 stored line");
            continue;
        };
        match codec::parse_line(line) {
            Ok(entry) => out.push(entry),
            Err(err) => warn!(file = %file.display(), %err, "skipping corrupt stored line"),
        }
    }
    out
}
