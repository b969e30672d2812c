//! Listener registration and dispatch.
//!
//! A listener pairs a subpath with a callback. It matches an entry when
//! its subpath is a (non-strict) prefix of the entry's path. When several
//! listeners match, they run in registration order.

use crate::entry::Entry;

/// Callback invoked for an updated entry whose path matches.
///
/// Receives the entry's path, the entry (datetime, key, value) and the
/// caller's `extra` userdata. Always considered successful.
pub type OnEntryUpdate<T> = Box<dyn Fn(&[String], &Entry, &mut T) + Send>;

/// Callback variant that reports success.
///
/// Returning `false` freezes the source log's cursor so the entry, and
/// every later line of the same log, is delivered again on the next scan.
pub type OnEntryUpdateWithSuccess<T> = Box<dyn Fn(&[String], &Entry, &mut T) -> bool + Send>;

pub(crate) enum Callback<T> {
    Plain(OnEntryUpdate<T>),
    WithSuccess(OnEntryUpdateWithSuccess<T>),
}

pub(crate) struct Listener<T> {
    pub subpath: Vec<String>,
    pub callback: Callback<T>,
}

impl<T> Listener<T> {
    pub fn matches(&self, path: &[String]) -> bool {
        path.len() >= self.subpath.len()
            && self.subpath.iter().zip(path.iter()).all(|(a, b)| a == b)
    }

    /// Invokes the callback; plain listeners always report success.
    pub fn invoke(&self, path: &[String], entry: &Entry, extra: &mut T) -> bool {
        match &self.callback {
            Callback::Plain(callback) => {
                callback(path, entry, extra);
                true
            }
            Callback::WithSuccess(callback) => callback(path, entry, extra),
        }
    }
}
