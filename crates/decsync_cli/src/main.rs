//! DecSync CLI
//!
//! Command-line tools for inspecting DecSync directories.
//!
//! # Commands
//!
//! - `check` - Validate the `.decsync-info` version gate
//! - `collections` - List collections of a sync type
//! - `info` - Print a static info value
//! - `dump` - Print the merged winning entries of a collection

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DecSync command-line directory tools.
#[derive(Parser)]
#[command(name = "decsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the DecSync directory (defaults to $DECSYNC_DIR or
    /// ~/DecSync)
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the .decsync-info version gate
    Check,

    /// List collections of a sync type
    Collections {
        /// The sync type, e.g. "contacts" or "calendars"
        #[arg(short = 't', long)]
        sync_type: String,
    },

    /// Print the static info value for a key
    Info {
        /// The sync type, e.g. "rss" or "contacts"
        #[arg(short = 't', long)]
        sync_type: String,

        /// Optional collection identifier
        #[arg(short, long)]
        collection: Option<String>,

        /// JSON-serialized key, e.g. '"name"'
        #[arg(short, long)]
        key: String,
    },

    /// Print the merged winning entries of a collection
    Dump {
        /// The sync type, e.g. "rss" or "contacts"
        #[arg(short = 't', long)]
        sync_type: String,

        /// Optional collection identifier
        #[arg(short, long)]
        collection: Option<String>,

        /// Only entries whose path starts with these segments
        #[arg(short, long)]
        path: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let dir = match cli.dir {
        Some(dir) => dir,
        None => decsync_core::default_decsync_dir()?,
    };

    match cli.command {
        Commands::Check => commands::check::run(&dir)?,
        Commands::Collections { sync_type } => commands::collections::run(&dir, &sync_type),
        Commands::Info {
            sync_type,
            collection,
            key,
        } => commands::info::run(&dir, &sync_type, collection.as_deref(), &key),
        Commands::Dump {
            sync_type,
            collection,
            path,
            format,
        } => commands::dump::run(&dir, &sync_type, collection.as_deref(), &path, &format)?,
    }

    Ok(())
}
