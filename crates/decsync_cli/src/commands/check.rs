//! Check command implementation.

use std::path::Path;

/// Runs the check command.
pub fn run(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match decsync_core::check_decsync_info(dir) {
        Ok(()) => {
            println!("{}: valid DecSync directory (version 1)", dir.display());
            Ok(())
        }
        Err(err) => Err(format!("{}: {err}", dir.display()).into()),
    }
}
