//! Log-line codec.
//!
//! One entry per line: `<datetime>\t<key>\t<value>`. The datetime carries
//! no whitespace, the key no raw tab or newline, the value no raw newline;
//! everything after the second tab up to the line end is the value, so the
//! value may contain tabs. JSON escapes (`\n`, `\t`) inside keys and values
//! are of course fine: the engine only rejects raw control bytes, which the
//! canonical JSON convention never produces.

use crate::entry::Entry;
use crate::error::{DecsyncError, DecsyncResult};

/// Serializes one entry as a log line, without the trailing newline.
pub(crate) fn encode_line(entry: &Entry) -> String {
    format!("{}\t{}\t{}", entry.datetime, entry.key, entry.value)
}

/// Parses one log line.
///
/// Fails with [`DecsyncError::CorruptLine`] when the line has fewer than
/// two tabs or a malformed datetime field.
pub(crate) fn parse_line(line: &str) -> DecsyncResult<Entry> {
    let (datetime, rest) = line
        .split_once('\t')
        .ok_or_else(|| DecsyncError::corrupt_line("missing first tab"))?;
    let (key, value) = rest
        .split_once('\t')
        .ok_or_else(|| DecsyncError::corrupt_line("missing second tab"))?;
    if !is_datetime_shaped(datetime) {
        return Err(DecsyncError::corrupt_line(format!(
            "malformed datetime field: {datetime:?}"
        )));
    }
    Ok(Entry {
        datetime: datetime.to_owned(),
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

/// Cheap shape check for the datetime field: non-empty and drawn from the
/// ISO-8601 alphabet. Full calendar validation is pointless here, entries
/// are ordered by string comparison anyway.
fn is_datetime_shaped(field: &str) -> bool {
    !field.is_empty()
        && field
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'-' | b':' | b'.' | b'T' | b'Z' | b'+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let entry = Entry::with_datetime("2024-03-14T15:09:26.535", "\"name\"", "\"Foo\"");
        let line = encode_line(&entry);
        assert_eq!(line, "2024-03-14T15:09:26.535\t\"name\"\t\"Foo\"");
        assert_eq!(parse_line(&line).unwrap(), entry);
    }

    #[test]
    fn value_may_contain_tabs() {
        let parsed = parse_line("2024-03-14T15:09:26.535\t\"k\"\t\"a\tb\"").unwrap();
        assert_eq!(parsed.value, "\"a\tb\"");
    }

    #[test]
    fn missing_tabs_are_corrupt() {
        assert!(parse_line("no tabs at all").is_err());
        assert!(parse_line("2024-03-14T15:09:26.535\tonly one tab").is_err());
    }

    #[test]
    fn garbage_datetime_is_corrupt() {
        assert!(parse_line("not a datetime\t\"k\"\t\"v\"").is_err());
        assert!(parse_line("\t\"k\"\t\"v\"").is_err());
    }

    #[test]
    fn escaped_newline_in_key_is_fine() {
        let parsed = parse_line("2024-03-14T15:09:26.535\t\"a\\nb\"\t\"v\"").unwrap();
        assert_eq!(parsed.key, "\"a\\nb\"");
    }
}
