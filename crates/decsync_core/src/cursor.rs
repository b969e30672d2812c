//! Per-reader sequence cursors.
//!
//! A cursor records the last consumed line of one log file, as a single
//! decimal integer in a file of its own. Lines up to the cursor have been
//! delivered to listeners exactly once; lines beyond it are pending.
//! Cursor loss is tolerated: a missing or unreadable file reads as `0`,
//! which merely re-delivers.

use crate::dir::write_atomic;
use std::fs;
use std::io;
use std::path::Path;

/// Loads a cursor; missing or unreadable files mean nothing was consumed.
pub(crate) fn load(file: &Path) -> u64 {
    match fs::read_to_string(file) {
        Ok(text) => text.trim().parse().unwrap_or(0),
        Err(_) => 0,
    }
}

/// Persists a cursor via a sibling temp file and an atomic rename.
pub(crate) fn store(file: &Path, line: u64) -> io::Result<()> {
    write_atomic(file, line.to_string().as_bytes())
}
