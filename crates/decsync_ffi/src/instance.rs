//! Engine instance functions.

use crate::types::{
    c_path, cstr, dir_or_default, string_array, DecsyncEntry, DecsyncEntryWithPath,
    DecsyncHandle, DecsyncStoredEntry, Engine, RawExtra,
};
use decsync_core::{DecsyncError, Entry, EntryWithPath, StoredEntry};
use std::ffi::{c_char, c_int, c_void, CString};

/// Listener callback: `(path, len, datetime, key, value, extra)`.
pub type DecsyncEntryUpdateFn = unsafe extern "C" fn(
    path: *const *const c_char,
    len: c_int,
    datetime: *const c_char,
    key: *const c_char,
    value: *const c_char,
    extra: *mut c_void,
);

/// Listener callback variant reporting success; `false` re-queues the
/// entry for the next scan.
pub type DecsyncEntryUpdateWithSuccessFn = unsafe extern "C" fn(
    path: *const *const c_char,
    len: c_int,
    datetime: *const c_char,
    key: *const c_char,
    value: *const c_char,
    extra: *mut c_void,
) -> bool;

unsafe fn engine_ref<'a>(handle: *mut DecsyncHandle) -> Option<&'a Engine> {
    if handle.is_null() {
        None
    } else {
        Some(&*(handle as *mut Engine))
    }
}

fn invoke_plain(
    callback: DecsyncEntryUpdateFn,
    path: &[String],
    entry: &Entry,
    extra: *mut c_void,
) {
    let Some((_owned, ptrs)) = c_path(path) else {
        return;
    };
    let Ok(datetime) = CString::new(entry.datetime.as_str()) else {
        return;
    };
    let Ok(key) = CString::new(entry.key.as_str()) else {
        return;
    };
    let Ok(value) = CString::new(entry.value.as_str()) else {
        return;
    };
    // Safety: all pointers stay valid for the duration of the call.
    unsafe {
        callback(
            ptrs.as_ptr(),
            ptrs.len() as c_int,
            datetime.as_ptr(),
            key.as_ptr(),
            value.as_ptr(),
            extra,
        );
    }
}

fn invoke_with_success(
    callback: DecsyncEntryUpdateWithSuccessFn,
    path: &[String],
    entry: &Entry,
    extra: *mut c_void,
) -> bool {
    let Some((_owned, ptrs)) = c_path(path) else {
        return true;
    };
    let Ok(datetime) = CString::new(entry.datetime.as_str()) else {
        return true;
    };
    let Ok(key) = CString::new(entry.key.as_str()) else {
        return true;
    };
    let Ok(value) = CString::new(entry.value.as_str()) else {
        return true;
    };
    // Safety: all pointers stay valid for the duration of the call.
    unsafe {
        callback(
            ptrs.as_ptr(),
            ptrs.len() as c_int,
            datetime.as_ptr(),
            key.as_ptr(),
            value.as_ptr(),
            extra,
        )
    }
}

/// Creates a new engine instance for the given directory, sync type,
/// optional collection and app id, and writes its handle to `decsync`.
///
/// A null or empty `decsync_dir` selects the default DecSync directory; a
/// null or empty `collection` means the sync type has a single instance.
///
/// Returns `0` on success, `1` for invalid info, `2` for an unsupported
/// version.
///
/// # Safety
///
/// - `decsync` must be a valid pointer
/// - all string arguments must be null or valid NUL-terminated strings
#[no_mangle]
pub unsafe extern "C" fn decsync_so_new(
    decsync: *mut *mut DecsyncHandle,
    decsync_dir: *const c_char,
    sync_type: *const c_char,
    collection: *const c_char,
    own_app_id: *const c_char,
) -> c_int {
    if decsync.is_null() {
        return 1;
    }
    *decsync = std::ptr::null_mut();

    let Some(dir) = dir_or_default(decsync_dir) else {
        return 1;
    };
    let Some(sync_type) = cstr(sync_type) else {
        return 1;
    };
    let collection = cstr(collection).filter(|c| !c.is_empty());
    let Some(own_app_id) = cstr(own_app_id) else {
        return 1;
    };

    match Engine::new(&dir, sync_type, collection, own_app_id) {
        Ok(engine) => {
            *decsync = Box::into_raw(Box::new(engine)) as *mut DecsyncHandle;
            0
        }
        Err(DecsyncError::UnsupportedVersion { .. }) => 2,
        Err(_) => 1,
    }
}

/// Frees an engine instance.
///
/// # Safety
///
/// `decsync` must be null or a handle returned by [`decsync_so_new`], not
/// used after this call.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_free(decsync: *mut DecsyncHandle) {
    if !decsync.is_null() {
        drop(Box::from_raw(decsync as *mut Engine));
    }
}

/// Registers a listener for entries whose path starts with `subpath`.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `subpath` must point at `len` valid NUL-terminated strings
/// - `on_entry_update` must be a valid callback or null (ignored)
#[no_mangle]
pub unsafe extern "C" fn decsync_so_add_listener(
    decsync: *mut DecsyncHandle,
    subpath: *const *const c_char,
    len: c_int,
    on_entry_update: Option<DecsyncEntryUpdateFn>,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(callback) = on_entry_update else {
        return;
    };
    let Some(subpath) = string_array(subpath, len) else {
        return;
    };
    engine.add_listener(
        subpath,
        Box::new(move |path, entry, extra: &mut RawExtra| {
            invoke_plain(callback, path, entry, extra.0);
        }),
    );
}

/// Like [`decsync_so_add_listener`], with a callback that reports
/// success.
///
/// # Safety
///
/// Same contract as [`decsync_so_add_listener`].
#[no_mangle]
pub unsafe extern "C" fn decsync_so_add_listener_with_success(
    decsync: *mut DecsyncHandle,
    subpath: *const *const c_char,
    len: c_int,
    on_entry_update: Option<DecsyncEntryUpdateWithSuccessFn>,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(callback) = on_entry_update else {
        return;
    };
    let Some(subpath) = string_array(subpath, len) else {
        return;
    };
    engine.add_listener_with_success(
        subpath,
        Box::new(move |path, entry, extra: &mut RawExtra| {
            invoke_with_success(callback, path, entry, extra.0)
        }),
    );
}

/// Marks listener registration complete.
///
/// # Safety
///
/// `decsync` must be a valid engine handle.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_init_done(decsync: *mut DecsyncHandle) {
    if let Some(engine) = engine_ref(decsync) {
        engine.init_done();
    }
}

/// Associates `value` with `key` in the mapping at `path`; the update is
/// synchronized to other devices.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `path` must point at `len` valid NUL-terminated strings
/// - `key` and `value` must be valid NUL-terminated strings
#[no_mangle]
pub unsafe extern "C" fn decsync_so_set_entry(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len: c_int,
    key: *const c_char,
    value: *const c_char,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(path) = string_array(path, len) else {
        return;
    };
    let (Some(key), Some(value)) = (cstr(key), cstr(value)) else {
        return;
    };
    engine.set_entry(&path, key, value);
}

/// Inserts multiple entries with their paths, batching per path.
///
/// The handles remain owned by the caller.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `entries_with_path` must point at `len` builder handles
#[no_mangle]
pub unsafe extern "C" fn decsync_so_set_entries(
    decsync: *mut DecsyncHandle,
    entries_with_path: *mut *mut DecsyncEntryWithPath,
    len: c_int,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    if len < 0 || (len > 0 && entries_with_path.is_null()) {
        return;
    }
    let mut entries = Vec::with_capacity(len as usize);
    for i in 0..len as usize {
        let handle = *entries_with_path.add(i);
        if handle.is_null() {
            continue;
        }
        entries.push((*(handle as *mut EntryWithPath)).clone());
    }
    engine.set_entries(entries);
}

/// Inserts multiple entries sharing one path.
///
/// The handles remain owned by the caller.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `path` must point at `len_path` valid NUL-terminated strings
/// - `entries` must point at `len_entries` builder handles
#[no_mangle]
pub unsafe extern "C" fn decsync_so_set_entries_for_path(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len_path: c_int,
    entries: *mut *mut DecsyncEntry,
    len_entries: c_int,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(path) = string_array(path, len_path) else {
        return;
    };
    if len_entries < 0 || (len_entries > 0 && entries.is_null()) {
        return;
    }
    let mut batch = Vec::with_capacity(len_entries as usize);
    for i in 0..len_entries as usize {
        let handle = *entries.add(i);
        if handle.is_null() {
            continue;
        }
        batch.push((*(handle as *mut Entry)).clone());
    }
    engine.set_entries_for_path(&path, batch);
}

/// Gets all updated entries and executes the corresponding listeners,
/// passing `extra` through.
///
/// # Safety
///
/// `decsync` must be a valid engine handle; `extra` is forwarded to the
/// caller's callbacks untouched.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_all_new_entries(
    decsync: *mut DecsyncHandle,
    extra: *mut c_void,
) {
    if let Some(engine) = engine_ref(decsync) {
        let mut extra = RawExtra(extra);
        engine.execute_all_new_entries(&mut extra);
    }
}

/// Executes the stored entry at `(path, key)`, if present.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `path` must point at `len` valid NUL-terminated strings
/// - `key` must be a valid NUL-terminated string
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_stored_entry(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len: c_int,
    key: *const c_char,
    extra: *mut c_void,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(path) = string_array(path, len) else {
        return;
    };
    let Some(key) = cstr(key) else {
        return;
    };
    let mut extra = RawExtra(extra);
    engine.execute_stored_entry(&path, key, &mut extra);
}

/// Executes multiple stored entries.
///
/// The handles remain owned by the caller.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `stored_entries` must point at `len` builder handles
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_stored_entries(
    decsync: *mut DecsyncHandle,
    stored_entries: *mut *mut DecsyncStoredEntry,
    len: c_int,
    extra: *mut c_void,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    if len < 0 || (len > 0 && stored_entries.is_null()) {
        return;
    }
    let mut batch = Vec::with_capacity(len as usize);
    for i in 0..len as usize {
        let handle = *stored_entries.add(i);
        if handle.is_null() {
            continue;
        }
        batch.push((*(handle as *mut StoredEntry)).clone());
    }
    let mut extra = RawExtra(extra);
    engine.execute_stored_entries(&batch, &mut extra);
}

/// Executes the stored entries at exactly `path` whose key is in `keys`.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `path` must point at `len_path` valid NUL-terminated strings
/// - `keys` must point at `len_keys` valid NUL-terminated strings
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_stored_entries_for_path_exact(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len_path: c_int,
    extra: *mut c_void,
    keys: *const *const c_char,
    len_keys: c_int,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(path) = string_array(path, len_path) else {
        return;
    };
    let Some(keys) = string_array(keys, len_keys) else {
        return;
    };
    let mut extra = RawExtra(extra);
    engine.execute_stored_entries_for_path_exact(&path, &keys, &mut extra);
}

/// Pre-rename alias of
/// [`decsync_so_execute_stored_entries_for_path_exact`], kept for older
/// bindings.
///
/// # Safety
///
/// Same contract as [`decsync_so_execute_stored_entries_for_path_exact`].
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_stored_entries_for_path(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len_path: c_int,
    extra: *mut c_void,
    keys: *const *const c_char,
    len_keys: c_int,
) {
    decsync_so_execute_stored_entries_for_path_exact(decsync, path, len_path, extra, keys, len_keys);
}

/// Executes every stored entry at exactly `path`.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `path` must point at `len` valid NUL-terminated strings
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_all_stored_entries_for_path_exact(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len: c_int,
    extra: *mut c_void,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(path) = string_array(path, len) else {
        return;
    };
    let mut extra = RawExtra(extra);
    engine.execute_all_stored_entries_for_path_exact(&path, &mut extra);
}

/// Pre-rename alias of
/// [`decsync_so_execute_all_stored_entries_for_path_exact`], kept for
/// older bindings.
///
/// # Safety
///
/// Same contract as
/// [`decsync_so_execute_all_stored_entries_for_path_exact`].
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_all_stored_entries_for_path(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len: c_int,
    extra: *mut c_void,
) {
    decsync_so_execute_all_stored_entries_for_path_exact(decsync, path, len, extra);
}

/// Executes the stored entries below the prefix `path` whose key is in
/// `keys`.
///
/// # Safety
///
/// Same contract as
/// [`decsync_so_execute_stored_entries_for_path_exact`].
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_stored_entries_for_path_prefix(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len_path: c_int,
    extra: *mut c_void,
    keys: *const *const c_char,
    len_keys: c_int,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(path) = string_array(path, len_path) else {
        return;
    };
    let Some(keys) = string_array(keys, len_keys) else {
        return;
    };
    let mut extra = RawExtra(extra);
    engine.execute_stored_entries_for_path_prefix(&path, &keys, &mut extra);
}

/// Executes every stored entry below the prefix `path`.
///
/// # Safety
///
/// Same contract as
/// [`decsync_so_execute_all_stored_entries_for_path_exact`].
#[no_mangle]
pub unsafe extern "C" fn decsync_so_execute_all_stored_entries_for_path_prefix(
    decsync: *mut DecsyncHandle,
    path: *const *const c_char,
    len: c_int,
    extra: *mut c_void,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    let Some(path) = string_array(path, len) else {
        return;
    };
    let mut extra = RawExtra(extra);
    engine.execute_all_stored_entries_for_path_prefix(&path, &mut extra);
}

/// Initializes the stored entries without executing any listeners.
///
/// # Safety
///
/// `decsync` must be a valid engine handle.
#[no_mangle]
pub unsafe extern "C" fn decsync_so_init_stored_entries(decsync: *mut DecsyncHandle) {
    if let Some(engine) = engine_ref(decsync) {
        engine.init_stored_entries();
    }
}

/// Writes the most up-to-date app id into `app_id`.
///
/// `len` includes the terminator and should be at least 256; over-long
/// values are truncated.
///
/// # Safety
///
/// - `decsync` must be a valid engine handle
/// - `app_id` must be valid for `len` bytes
#[no_mangle]
pub unsafe extern "C" fn decsync_so_latest_app_id(
    decsync: *mut DecsyncHandle,
    app_id: *mut c_char,
    len: c_int,
) {
    let Some(engine) = engine_ref(decsync) else {
        return;
    };
    crate::types::write_str(&engine.latest_app_id(), app_id, len);
}
