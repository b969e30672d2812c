//! Writer identifiers.
//!
//! Every writer against a DecSync directory is identified by an appId of
//! the form `<app_name>-<device_id>` or `<app_name>-<device_id>-<id>`. The
//! device id is a random hex string persisted once per device, outside the
//! synchronized tree, so reinstalled applications keep their identity.

use crate::dir::write_atomic;
use crate::error::{DecsyncError, DecsyncResult};
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Instance ids must lie in `[0, 100000)`.
const MAX_INSTANCE_ID: i64 = 100_000;

/// Returns the appId of this device and application combination.
pub fn get_app_id(app_name: &str) -> DecsyncResult<String> {
    Ok(format!("{}-{}", app_name, device_id()?))
}

/// Like [`get_app_id`], but with an instance id to distinguish multiple
/// instances of the same application on one device.
///
/// # Errors
///
/// Returns [`DecsyncError::InvalidArgument`] when `id` is outside
/// `[0, 100000)`.
pub fn get_app_id_with_id(app_name: &str, id: i64) -> DecsyncResult<String> {
    if !(0..MAX_INSTANCE_ID).contains(&id) {
        return Err(DecsyncError::invalid_argument(format!(
            "instance id out of range: {id}"
        )));
    }
    Ok(format!("{}-{}-{:05}", app_name, device_id()?, id))
}

/// Returns an appId, appending a random instance id when `is_random` is
/// set.
pub fn generate_app_id(app_name: &str, is_random: bool) -> DecsyncResult<String> {
    if is_random {
        let id = rand::thread_rng().gen_range(0..MAX_INSTANCE_ID);
        get_app_id_with_id(app_name, id)
    } else {
        get_app_id(app_name)
    }
}

fn device_id() -> DecsyncResult<String> {
    let base = dirs::data_local_dir().ok_or_else(|| {
        DecsyncError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "no data directory on this platform",
        ))
    })?;
    device_id_at(&device_id_file(&base))
}

fn device_id_file(data_dir: &Path) -> PathBuf {
    data_dir.join("decsync").join("device-id")
}

/// Loads the persistent device id, generating it on first use.
///
/// Creation is race-safe: the fresh id is written to a temp file and
/// renamed into place, and the file is re-read afterwards so concurrent
/// first runs all agree on whichever id landed.
fn device_id_at(file: &Path) -> DecsyncResult<String> {
    if let Ok(existing) = fs::read_to_string(file) {
        let existing = existing.trim();
        if is_valid_device_id(existing) {
            return Ok(existing.to_owned());
        }
    }

    let bytes: [u8; 8] = rand::random();
    let fresh: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    write_atomic(file, fresh.as_bytes())?;

    let written = fs::read_to_string(file)?;
    Ok(written.trim().to_owned())
}

fn is_valid_device_id(id: &str) -> bool {
    id.len() >= 8 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn device_id_is_generated_and_stable() {
        let temp = tempdir().unwrap();
        let file = device_id_file(temp.path());

        let first = device_id_at(&file).unwrap();
        assert!(is_valid_device_id(&first));
        assert_eq!(first.len(), 16);

        let second = device_id_at(&file).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn existing_device_id_is_kept() {
        let temp = tempdir().unwrap();
        let file = device_id_file(temp.path());
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "0123456789abcdef\n").unwrap();

        assert_eq!(device_id_at(&file).unwrap(), "0123456789abcdef");
    }

    #[test]
    fn invalid_device_id_is_replaced() {
        let temp = tempdir().unwrap();
        let file = device_id_file(temp.path());
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "not hex!").unwrap();

        let id = device_id_at(&file).unwrap();
        assert!(is_valid_device_id(&id));
    }

    #[test]
    fn instance_id_range_is_enforced() {
        assert!(matches!(
            get_app_id_with_id("app", -1),
            Err(DecsyncError::InvalidArgument { .. })
        ));
        assert!(matches!(
            get_app_id_with_id("app", 100_000),
            Err(DecsyncError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn app_id_shapes() {
        // The platform data directory may be unavailable in sandboxed
        // environments; the formats are still checked when it is.
        if get_app_id("app").is_err() {
            return;
        }

        let app_id = get_app_id("app").unwrap();
        assert!(app_id.starts_with("app-"));

        let with_id = get_app_id_with_id("app", 42).unwrap();
        assert!(with_id.ends_with("-00042"));

        let generated = generate_app_id("app", true).unwrap();
        assert!(generated.starts_with("app-"));
        assert_eq!(generated.rsplit('-').next().unwrap().len(), 5);
    }
}
