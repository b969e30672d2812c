//! Append-only log files.
//!
//! One log file exists per (writer, path). Line N (1-indexed) is the Nth
//! entry that writer appended for that path; lines are never rewritten or
//! reordered. Appends by the same writer are serialized by the engine
//! lock; different writers own disjoint files.

use crate::codec;
use crate::entry::Entry;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A handle to one writer's log file for one path.
#[derive(Debug, Clone)]
pub(crate) struct LogFile {
    path: PathBuf,
}

impl LogFile {
    /// Creates a handle for the given filesystem path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the filesystem path of this log.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line per entry.
    ///
    /// Parent directories are created as needed; the batch is flushed and
    /// synced to durable storage at the end. Entries carrying raw control
    /// bytes that would break the line format are skipped with a warning,
    /// the canonical JSON convention never produces them.
    pub fn append(&self, entries: &[Entry]) -> io::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut buf = String::new();
        for entry in entries {
            if entry.key.contains('\t')
                || entry.key.contains('\n')
                || entry.value.contains('\n')
            {
                warn!(key = %entry.key, "skipping entry with raw control bytes");
                continue;
            }
            buf.push_str(&codec::encode_line(entry));
            buf.push('\n');
        }
        if buf.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()?;
        file.sync_all()
    }

    /// Reads every complete line after `after_line` (1-indexed).
    ///
    /// Corrupt lines yield `None` but still occupy their line number, so
    /// the caller's cursor advances past them. An unterminated final line
    /// is a crashed append still in progress: it is ignored and does not
    /// count as a line.
    pub fn read_after(&self, after_line: u64) -> io::Result<Vec<(u64, Option<Entry>)>> {
        let data = fs::read(&self.path)?;
        let mut out = Vec::new();
        let mut line_no = 0u64;
        for chunk in data.split_inclusive(|&b| b == b'\n') {
            let Some(line_bytes) = chunk.strip_suffix(b"\n") else {
                // Unterminated final line; the writer may yet complete it.
                break;
            };
            line_no += 1;
            if line_no <= after_line {
                continue;
            }
            let parsed = match std::str::from_utf8(line_bytes) {
                Ok(line) => match codec::parse_line(line) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(file = %self.path.display(), line = line_no, %err, "skipping corrupt line");
                        None
                    }
                },
                Err(_) => {
                    warn!(file = %self.path.display(), line = line_no, "skipping non-UTF-8 line");
                    None
                }
            };
            out.push((line_no, parsed));
        }
        Ok(out)
    }
}
