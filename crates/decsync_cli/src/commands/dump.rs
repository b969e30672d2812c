//! Dump command implementation.

use serde::Serialize;
use std::path::Path;

/// One merged entry for output.
#[derive(Debug, Serialize)]
pub struct DumpEntry {
    /// The entry path.
    pub path: Vec<String>,
    /// JSON-serialized key.
    pub key: String,
    /// JSON-serialized value.
    pub value: String,
    /// When the winning entry was written.
    pub datetime: String,
    /// The writer whose entry won the merge.
    pub app_id: String,
}

/// Runs the dump command.
pub fn run(
    dir: &Path,
    sync_type: &str,
    collection: Option<&str>,
    path_prefix: &[String],
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries: Vec<DumpEntry> = decsync_core::all_latest_entries(dir, sync_type, collection)
        .into_iter()
        .filter(|latest| {
            latest.path.len() >= path_prefix.len()
                && latest.path.iter().zip(path_prefix).all(|(a, b)| a == b)
        })
        .map(|latest| DumpEntry {
            path: latest.path,
            key: latest.entry.key,
            value: latest.entry.value,
            datetime: latest.entry.datetime,
            app_id: latest.app_id,
        })
        .collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(&entries);
        }
    }

    Ok(())
}

fn print_text_output(entries: &[DumpEntry]) {
    println!("Entries ({} total)", entries.len());
    println!("================");
    println!();

    for entry in entries {
        println!(
            "[{}] /{} {} = {} (by {})",
            entry.datetime,
            entry.path.join("/"),
            entry.key,
            entry.value,
            entry.app_id
        );
    }
}
