//! # DecSync FFI
//!
//! Stable C ABI for the DecSync engine, exporting the `decsync_so_*`
//! symbol set consumed by the C header and the language bindings.
//!
//! ## Memory ownership
//!
//! - Handles (`Decsync`, entry builders) are opaque pointers owned by this
//!   library; release them with the paired `decsync_so_*_free` function
//! - Input strings are NUL-terminated UTF-8 owned by the caller
//! - Output strings are written into caller-allocated buffers whose length
//!   includes the terminator; over-long values are truncated and always
//!   NUL-terminated
//!
//! ## Error handling
//!
//! Only `decsync_so_new` and `decsync_so_check_decsync_info` report
//! errors, as `0` (success), `1` (invalid info) or `2` (unsupported
//! version). Every other operation is infallible at the ABI: I/O problems
//! are logged and swallowed, and nothing ever unwinds across the boundary.
//!
//! ## Callbacks
//!
//! Listeners receive `(path, len, datetime, key, value, extra)` with the
//! caller's `extra` userdata passed through untouched. The with-success
//! variant returns a boolean; `false` re-queues the entry for the next
//! `decsync_so_execute_all_new_entries` call.

#![warn(missing_docs)]
// No panics across the C boundary - avoid the panicking APIs outright.
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod builders;
mod instance;
mod statics;
mod types;

pub use builders::*;
pub use instance::*;
pub use statics::*;
pub use types::{DecsyncEntry, DecsyncEntryWithPath, DecsyncHandle, DecsyncStoredEntry};
