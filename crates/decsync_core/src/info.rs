//! The `.decsync-info` root metadata file.
//!
//! A single JSON object at the root of every DecSync directory, at minimum
//! `{"version": 1}`. Unknown fields are tolerated and preserved. Opening a
//! directory whose info file is malformed or declares an unsupported
//! version is refused.

use crate::dir::write_atomic;
use crate::entry::now_datetime;
use crate::error::{DecsyncError, DecsyncResult};
use fs2::FileExt;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, warn};

/// Name of the info file at the DecSync root.
pub(crate) const INFO_FILE: &str = ".decsync-info";

/// The only on-disk format version this library supports.
const SUPPORTED_VERSION: u64 = 1;

/// Checks whether the `.decsync-info` file in `decsync_dir` has the right
/// format and a supported version. If it does not exist, a new one with
/// version 1 is created.
///
/// # Errors
///
/// [`DecsyncError::InvalidInfo`] when the file exists but does not parse
/// as the expected JSON shape, [`DecsyncError::UnsupportedVersion`] when
/// it declares a version other than 1.
pub fn check_decsync_info(decsync_dir: &Path) -> DecsyncResult<()> {
    load_or_create(decsync_dir).map(|_| ())
}

/// Loads the info object, creating `{"version": 1}` when absent.
pub(crate) fn load_or_create(decsync_dir: &Path) -> DecsyncResult<Map<String, Value>> {
    let info_file = decsync_dir.join(INFO_FILE);
    if !info_file.exists() {
        let mut fresh = Map::new();
        fresh.insert("version".to_owned(), Value::from(SUPPORTED_VERSION));
        write_atomic(&info_file, Value::Object(fresh.clone()).to_string().as_bytes())?;
        return Ok(fresh);
    }
    let text = fs::read_to_string(&info_file)?;
    parse_info(&text)
}

fn parse_info(text: &str) -> DecsyncResult<Map<String, Value>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| DecsyncError::invalid_info(err.to_string()))?;
    let Value::Object(map) = value else {
        return Err(DecsyncError::invalid_info("expected a JSON object"));
    };
    let version = match map.get("version") {
        Some(version) => version
            .as_u64()
            .ok_or_else(|| DecsyncError::invalid_info("version is not an integer"))?,
        None => return Err(DecsyncError::invalid_info("missing version")),
    };
    if version != SUPPORTED_VERSION {
        return Err(DecsyncError::UnsupportedVersion { version });
    }
    Ok(map)
}

/// Records that `app_id` is active, best-effort.
///
/// The `last-active` field is advisory and last-writer-wins; lock
/// contention and write failures are logged and ignored.
pub(crate) fn touch_last_active(decsync_dir: &Path, app_id: &str) {
    if let Err(err) = try_touch_last_active(decsync_dir, app_id) {
        warn!(%err, "could not update last-active, ignoring");
    }
}

fn try_touch_last_active(decsync_dir: &Path, app_id: &str) -> DecsyncResult<()> {
    let info_file = decsync_dir.join(INFO_FILE);
    let lock = File::open(&info_file)?;
    if lock.try_lock_exclusive().is_err() {
        debug!("info file locked by another writer, skipping last-active");
        return Ok(());
    }

    let mut map = parse_info(&fs::read_to_string(&info_file)?)?;
    let actives = map
        .entry("last-active")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(actives) = actives {
        actives.insert(app_id.to_owned(), Value::String(now_datetime()));
    }
    write_atomic(&info_file, Value::Object(map).to_string().as_bytes())?;
    Ok(())
}
