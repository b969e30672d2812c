//! Info command implementation.

use std::path::Path;

/// Runs the info command.
pub fn run(dir: &Path, sync_type: &str, collection: Option<&str>, key: &str) {
    let value = decsync_core::get_static_info(dir, sync_type, collection, key);
    println!("{value}");
}
