//! Standalone functions that need no engine instance.

use crate::types::{cstr, dir_or_default, write_str};
use decsync_core::DecsyncError;
use std::ffi::{c_char, c_int};
use tracing::warn;

/// Writes the most up-to-date value stored at the path `["info"]` with
/// `key` into `value`, or the JSON literal `null` when absent.
///
/// # Safety
///
/// - string arguments must be null or valid NUL-terminated strings
/// - `value` must be valid for `len` bytes
#[no_mangle]
pub unsafe extern "C" fn decsync_so_get_static_info(
    decsync_dir: *const c_char,
    sync_type: *const c_char,
    collection: *const c_char,
    key: *const c_char,
    value: *mut c_char,
    len: c_int,
) {
    write_str("null", value, len);
    let Some(dir) = dir_or_default(decsync_dir) else {
        return;
    };
    let Some(sync_type) = cstr(sync_type) else {
        return;
    };
    let collection = cstr(collection).filter(|c| !c.is_empty());
    let Some(key) = cstr(key) else {
        return;
    };
    let info = decsync_core::get_static_info(&dir, sync_type, collection, key);
    write_str(&info, value, len);
}

/// Checks whether the `.decsync-info` file in `decsync_dir` has the right
/// format and a supported version, creating a fresh one when absent.
///
/// Returns `0` on success, `1` for invalid info, `2` for an unsupported
/// version.
///
/// # Safety
///
/// `decsync_dir` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_check_decsync_info(decsync_dir: *const c_char) -> c_int {
    let Some(dir) = dir_or_default(decsync_dir) else {
        return 1;
    };
    match decsync_core::check_decsync_info(&dir) {
        Ok(()) => 0,
        Err(DecsyncError::UnsupportedVersion { .. }) => 2,
        Err(_) => 1,
    }
}

/// Writes the collection identifiers under `decsync_dir/sync_type` into
/// the caller's buffer array and returns how many were written.
///
/// Every buffer must be 256 bytes long, including the terminator; names
/// are truncated to fit. At most `max_len` names are written.
///
/// # Safety
///
/// - string arguments must be null or valid NUL-terminated strings
/// - `collections` must point at `max_len` buffers of 256 bytes each
#[no_mangle]
pub unsafe extern "C" fn decsync_so_list_decsync_collections(
    decsync_dir: *const c_char,
    sync_type: *const c_char,
    collections: *mut *mut c_char,
    max_len: c_int,
) -> c_int {
    if collections.is_null() || max_len <= 0 {
        return 0;
    }
    let Some(dir) = dir_or_default(decsync_dir) else {
        return 0;
    };
    let Some(sync_type) = cstr(sync_type) else {
        return 0;
    };
    let names = decsync_core::list_collections(&dir, sync_type);
    let mut written = 0;
    for name in names.iter().take(max_len as usize) {
        write_str(name, *collections.add(written), 256);
        written += 1;
    }
    written as c_int
}

/// Writes the appId of this device and application combination into
/// `app_id`.
///
/// `len` includes the terminator and should be at least 256.
///
/// # Safety
///
/// - `app_name` must be a valid NUL-terminated string
/// - `app_id` must be valid for `len` bytes
#[no_mangle]
pub unsafe extern "C" fn decsync_so_get_app_id(
    app_name: *const c_char,
    app_id: *mut c_char,
    len: c_int,
) {
    write_str("", app_id, len);
    let Some(app_name) = cstr(app_name) else {
        return;
    };
    match decsync_core::get_app_id(app_name) {
        Ok(id) => write_str(&id, app_id, len),
        Err(err) => warn!(%err, "could not derive app id"),
    }
}

/// Like [`decsync_so_get_app_id`], with an instance id in `[0, 100000)`.
///
/// # Safety
///
/// Same contract as [`decsync_so_get_app_id`].
#[no_mangle]
pub unsafe extern "C" fn decsync_so_get_app_id_with_id(
    app_name: *const c_char,
    id: c_int,
    app_id: *mut c_char,
    len: c_int,
) {
    write_str("", app_id, len);
    let Some(app_name) = cstr(app_name) else {
        return;
    };
    match decsync_core::get_app_id_with_id(app_name, i64::from(id)) {
        Ok(id) => write_str(&id, app_id, len),
        Err(err) => warn!(%err, "could not derive app id"),
    }
}

/// Writes an appId for `app_name`, appending a random instance id when
/// `is_random` is set.
///
/// # Safety
///
/// Same contract as [`decsync_so_get_app_id`].
#[no_mangle]
pub unsafe extern "C" fn decsync_so_generate_app_id(
    app_name: *const c_char,
    is_random: bool,
    app_id: *mut c_char,
    len: c_int,
) {
    write_str("", app_id, len);
    let Some(app_name) = cstr(app_name) else {
        return;
    };
    match decsync_core::generate_app_id(app_name, is_random) {
        Ok(id) => write_str(&id, app_id, len),
        Err(err) => warn!(%err, "could not generate app id"),
    }
}
