//! Entry builder handles.
//!
//! The C API batches updates through opaque builder values: an entry with
//! its path, a bare entry (stamped with the current datetime on
//! construction), and a path/key pair for stored-entry retrieval. Each
//! constructor has a paired destructor; the set/execute functions copy out
//! of the handles, so callers free them independently.

use crate::types::{cstr, string_array, DecsyncEntry, DecsyncEntryWithPath, DecsyncStoredEntry};
use decsync_core::{Entry, EntryWithPath, StoredEntry};
use std::ffi::{c_char, c_int};

/// Creates an entry-with-path builder.
///
/// The entry's datetime is set to the current datetime.
///
/// Returns null when any argument is null or not valid UTF-8.
///
/// # Safety
///
/// `path` must point at `len` valid NUL-terminated strings; `key` and
/// `value` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_entry_with_path_new(
    path: *const *const c_char,
    len: c_int,
    key: *const c_char,
    value: *const c_char,
) -> *mut DecsyncEntryWithPath {
    let Some(path) = string_array(path, len) else {
        return std::ptr::null_mut();
    };
    let (Some(key), Some(value)) = (cstr(key), cstr(value)) else {
        return std::ptr::null_mut();
    };
    Box::into_raw(Box::new(EntryWithPath::new(path, key, value))) as *mut DecsyncEntryWithPath
}

/// Frees an entry-with-path builder.
///
/// # Safety
///
/// `entry_with_path` must be null or a handle returned by
/// [`decsync_so_entry_with_path_new`], not used after this call.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_entry_with_path_free(
    entry_with_path: *mut DecsyncEntryWithPath,
) {
    if !entry_with_path.is_null() {
        drop(Box::from_raw(entry_with_path as *mut EntryWithPath));
    }
}

/// Creates an entry builder stamped with the current datetime.
///
/// Returns null when any argument is null or not valid UTF-8.
///
/// # Safety
///
/// `key` and `value` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_entry_new(
    key: *const c_char,
    value: *const c_char,
) -> *mut DecsyncEntry {
    let (Some(key), Some(value)) = (cstr(key), cstr(value)) else {
        return std::ptr::null_mut();
    };
    Box::into_raw(Box::new(Entry::new(key, value))) as *mut DecsyncEntry
}

/// Frees an entry builder.
///
/// # Safety
///
/// `entry` must be null or a handle returned by [`decsync_so_entry_new`],
/// not used after this call.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_entry_free(entry: *mut DecsyncEntry) {
    if !entry.is_null() {
        drop(Box::from_raw(entry as *mut Entry));
    }
}

/// Creates a stored-entry builder holding a path and key.
///
/// Returns null when any argument is null or not valid UTF-8.
///
/// # Safety
///
/// `path` must point at `len` valid NUL-terminated strings; `key` must be
/// a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_stored_entry_new(
    path: *const *const c_char,
    len: c_int,
    key: *const c_char,
) -> *mut DecsyncStoredEntry {
    let Some(path) = string_array(path, len) else {
        return std::ptr::null_mut();
    };
    let Some(key) = cstr(key) else {
        return std::ptr::null_mut();
    };
    Box::into_raw(Box::new(StoredEntry::new(path, key))) as *mut DecsyncStoredEntry
}

/// Frees a stored-entry builder.
///
/// # Safety
///
/// `stored_entry` must be null or a handle returned by
/// [`decsync_so_stored_entry_new`], not used after this call.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_stored_entry_free(stored_entry: *mut DecsyncStoredEntry) {
    if !stored_entry.is_null() {
        drop(Box::from_raw(stored_entry as *mut StoredEntry));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::ffi::CString;

    #[test]
    fn entry_with_path_round_trip() {
        let feeds = CString::new("feeds").unwrap();
        let one = CString::new("1").unwrap();
        let path = [feeds.as_ptr(), one.as_ptr()];
        let key = CString::new("\"name\"").unwrap();
        let value = CString::new("\"Foo\"").unwrap();

        let handle =
            unsafe { decsync_so_entry_with_path_new(path.as_ptr(), 2, key.as_ptr(), value.as_ptr()) };
        assert!(!handle.is_null());

        let entry = unsafe { &*(handle as *mut EntryWithPath) };
        assert_eq!(entry.path, vec!["feeds".to_owned(), "1".to_owned()]);
        assert_eq!(entry.entry.key, "\"name\"");
        assert!(!entry.entry.datetime.is_empty());

        unsafe { decsync_so_entry_with_path_free(handle) };
    }

    #[test]
    fn null_arguments_yield_null_handles() {
        let key = CString::new("\"k\"").unwrap();

        let handle = unsafe { decsync_so_entry_new(key.as_ptr(), std::ptr::null()) };
        assert!(handle.is_null());

        let handle = unsafe { decsync_so_stored_entry_new(std::ptr::null(), 1, key.as_ptr()) };
        assert!(handle.is_null());

        // Freeing null is a no-op.
        unsafe { decsync_so_entry_free(std::ptr::null_mut()) };
        unsafe { decsync_so_entry_with_path_free(std::ptr::null_mut()) };
        unsafe { decsync_so_stored_entry_free(std::ptr::null_mut()) };
    }
}
