//! # DecSync Core
//!
//! Serverless synchronization of key/value mappings through a shared
//! directory tree, typically replicated between devices by an external
//! file-synchronization service. There is no coordinator and no network
//! code: the filesystem is the transport.
//!
//! This crate provides:
//! - Append-only per-writer log files and their on-disk layout
//! - A read path that scans, merges and deduplicates entries per
//!   `(path, key)` under a last-writer-wins total order
//! - A write path that batches appends and syncs them durably
//! - A per-reader stored-entries view for on-demand retrieval
//! - Listener dispatch by path prefix
//! - The `.decsync-info` version gate and app-id conventions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use decsync_core::Decsync;
//!
//! # fn main() -> decsync_core::DecsyncResult<()> {
//! let decsync: Decsync<Vec<String>> =
//!     Decsync::new("/sync".as_ref(), "rss", None, "app-12ab34cd")?;
//! decsync.add_listener(
//!     vec![],
//!     Box::new(|path, entry, extra| {
//!         extra.push(format!("{path:?}: {} = {}", entry.key, entry.value));
//!     }),
//! );
//! decsync.init_done();
//!
//! decsync.set_entry(&["feeds".into(), "1".into()], "\"name\"", "\"Foo\"");
//!
//! let mut updates = Vec::new();
//! decsync.execute_all_new_entries(&mut updates);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod app_id;
mod codec;
mod cursor;
mod dir;
mod engine;
mod entry;
mod error;
mod info;
mod listener;
mod log;
mod path;
mod stored;

pub use app_id::{generate_app_id, get_app_id, get_app_id_with_id};
pub use dir::{default_decsync_dir, list_collections, DecsyncDir};
pub use engine::{all_latest_entries, get_static_info, Decsync, LatestEntry};
pub use entry::{now_datetime, Entry, EntryWithPath, StoredEntry};
pub use error::{DecsyncError, DecsyncResult};
pub use info::check_decsync_info;
pub use listener::{OnEntryUpdate, OnEntryUpdateWithSuccess};
pub use path::{decode_segment, encode_segment};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
