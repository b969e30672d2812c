//! Opaque handle types and conversion helpers.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::PathBuf;

/// An opaque engine handle.
///
/// Points at the internal engine structure; never dereference or modify
/// directly.
#[repr(C)]
pub struct DecsyncHandle {
    _private: [u8; 0],
}

/// An opaque entry-with-path builder handle.
#[repr(C)]
pub struct DecsyncEntryWithPath {
    _private: [u8; 0],
}

/// An opaque entry builder handle.
#[repr(C)]
pub struct DecsyncEntry {
    _private: [u8; 0],
}

/// An opaque stored-entry builder handle.
#[repr(C)]
pub struct DecsyncStoredEntry {
    _private: [u8; 0],
}

/// Caller userdata forwarded to callbacks untouched.
///
/// The pointer is never dereferenced by this library; `Send` is sound
/// because it only ever travels back to the caller's own callback on the
/// invoking thread.
#[derive(Clone, Copy)]
pub(crate) struct RawExtra(pub *mut c_void);

unsafe impl Send for RawExtra {}

/// The engine instance behind a [`DecsyncHandle`].
pub(crate) type Engine = decsync_core::Decsync<RawExtra>;

/// Borrows a NUL-terminated UTF-8 string.
///
/// Returns `None` for null pointers and invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated string valid for the
/// lifetime of the returned reference.
pub(crate) unsafe fn cstr<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Copies a `(char**, int)` string array.
///
/// # Safety
///
/// `ptr` must point at `len` valid NUL-terminated strings, or be null
/// when `len` is zero.
pub(crate) unsafe fn string_array(ptr: *const *const c_char, len: c_int) -> Option<Vec<String>> {
    if len < 0 {
        return None;
    }
    if len == 0 {
        return Some(Vec::new());
    }
    if ptr.is_null() {
        return None;
    }
    let mut out = Vec::with_capacity(len as usize);
    for i in 0..len as usize {
        out.push(cstr(*ptr.add(i))?.to_owned());
    }
    Some(out)
}

/// Writes `value` into a caller buffer of `len` bytes including the
/// terminator, truncating at a character boundary when too small. The
/// result is always NUL-terminated; a non-positive `len` writes nothing.
///
/// # Safety
///
/// `buf` must be null or valid for `len` bytes.
pub(crate) unsafe fn write_str(value: &str, buf: *mut c_char, len: c_int) {
    if buf.is_null() || len <= 0 {
        return;
    }
    let capacity = (len - 1) as usize;
    let mut end = value.len().min(capacity);
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    std::ptr::copy_nonoverlapping(value.as_ptr(), buf as *mut u8, end);
    *buf.add(end) = 0;
}

/// Resolves a directory argument, with null and the empty string meaning
/// the default DecSync directory.
///
/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn dir_or_default(ptr: *const c_char) -> Option<PathBuf> {
    match cstr(ptr) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        Some(_) => decsync_core::default_decsync_dir().ok(),
        None if ptr.is_null() => decsync_core::default_decsync_dir().ok(),
        None => None,
    }
}

/// Builds the NUL-terminated strings and pointer array for one callback
/// invocation. The `CString`s own the bytes the pointers refer to, so
/// both must stay alive for the duration of the call.
pub(crate) fn c_path(path: &[String]) -> Option<(Vec<CString>, Vec<*const c_char>)> {
    let owned: Vec<CString> = path
        .iter()
        .map(|segment| CString::new(segment.as_str()))
        .collect::<Result<_, _>>()
        .ok()?;
    let ptrs = owned.iter().map(|segment| segment.as_ptr()).collect();
    Some((owned, ptrs))
}
