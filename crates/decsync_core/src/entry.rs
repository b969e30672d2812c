//! Entry records and the total order that resolves concurrent updates.

use chrono::Utc;
use std::cmp::Ordering;

/// Returns the current UTC datetime in the on-disk format.
///
/// Millisecond precision, no zone suffix, e.g. `2024-03-14T15:09:26.535`.
/// The fixed width makes lexicographic comparison agree with chronological
/// order.
pub fn now_datetime() -> String {
    Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.3f")
        .to_string()
}

/// One key/value pair together with the datetime at which it was written.
///
/// Keys and values are JSON-serialized strings by convention; the engine
/// treats them as opaque UTF-8 and never parses them beyond equality. A
/// deletion is an entry whose value is the JSON literal `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// ISO-8601 UTC datetime with millisecond precision.
    pub datetime: String,
    /// JSON-serialized key.
    pub key: String,
    /// JSON-serialized value.
    pub value: String,
}

impl Entry {
    /// Creates an entry stamped with the current datetime.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            datetime: now_datetime(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates an entry with an explicit datetime.
    pub fn with_datetime(
        datetime: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            datetime: datetime.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An [`Entry`] together with the path of the mapping it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryWithPath {
    /// Path to the mapping the entry belongs to.
    pub path: Vec<String>,
    /// The entry itself.
    pub entry: Entry,
}

impl EntryWithPath {
    /// Creates an entry at `path` stamped with the current datetime.
    pub fn new(path: Vec<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path,
            entry: Entry::new(key, value),
        }
    }
}

/// The path and key of an entry to retrieve from the stored view.
///
/// The value is not part of this record: it is unknown until the stored
/// entry is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Path to the mapping.
    pub path: Vec<String>,
    /// JSON-serialized key.
    pub key: String,
}

impl StoredEntry {
    /// Creates a stored-entry reference.
    pub fn new(path: Vec<String>, key: impl Into<String>) -> Self {
        Self {
            path,
            key: key.into(),
        }
    }
}

/// Returns whether `candidate` strictly dominates `current` under the
/// engine's total order on `(datetime, app_id)` pairs.
///
/// A later datetime wins; on equal datetimes the lexicographically greater
/// app id wins; fully equal pairs denote the same entry and neither
/// dominates.
pub(crate) fn dominates(candidate: (&str, &str), current: (&str, &str)) -> bool {
    match candidate.0.cmp(current.0) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate.1 > current.1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_shape() {
        let dt = now_datetime();
        // 2024-03-14T15:09:26.535
        assert_eq!(dt.len(), 23);
        assert_eq!(&dt[10..11], "T");
        assert_eq!(&dt[19..20], ".");
        assert!(!dt.contains(' '));
    }

    #[test]
    fn later_datetime_wins() {
        assert!(dominates(
            ("2024-01-01T00:00:00.001", "app-a"),
            ("2024-01-01T00:00:00.000", "app-b"),
        ));
        assert!(!dominates(
            ("2024-01-01T00:00:00.000", "app-b"),
            ("2024-01-01T00:00:00.001", "app-a"),
        ));
    }

    #[test]
    fn app_id_breaks_ties() {
        let dt = "2024-01-01T00:00:00.000";
        assert!(dominates((dt, "app-b"), (dt, "app-a")));
        assert!(!dominates((dt, "app-a"), (dt, "app-b")));
    }

    #[test]
    fn identical_pairs_do_not_dominate() {
        let dt = "2024-01-01T00:00:00.000";
        assert!(!dominates((dt, "app-a"), (dt, "app-a")));
    }

    #[test]
    fn entry_constructors() {
        let entry = Entry::with_datetime("2024-01-01T00:00:00.000", "\"k\"", "\"v\"");
        assert_eq!(entry.key, "\"k\"");
        assert_eq!(entry.value, "\"v\"");

        let stamped = Entry::new("\"k\"", "\"v\"");
        assert!(!stamped.datetime.is_empty());
    }
}
