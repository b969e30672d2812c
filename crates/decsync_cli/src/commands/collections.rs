//! Collections command implementation.

use std::path::Path;

/// Runs the collections command.
pub fn run(dir: &Path, sync_type: &str) {
    let collections = decsync_core::list_collections(dir, sync_type);
    if collections.is_empty() {
        println!("no collections for sync type {sync_type}");
        return;
    }
    for collection in collections {
        println!("{collection}");
    }
}
