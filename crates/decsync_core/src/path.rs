//! Path-segment encoding for the on-disk layout.
//!
//! Entry paths may contain arbitrary strings while file names may not, so
//! every segment is percent-encoded before it becomes a directory or file
//! name. The encoding is total and injective: enumeration of the tree
//! recovers the original paths exactly.
//!
//! Rules:
//!
//! - Bytes in `[A-Za-z0-9.-]` pass through, everything else becomes `%XX`
//!   (uppercase hex).
//! - `_` is always escaped so that the empty segment can encode to `_`
//!   without colliding.
//! - A leading `.` is escaped, so no encoded name ever collides with
//!   `.decsync-info`, hidden temp files, or the `.`/`..` directory entries.
//!
//! [`decode_segment`] accepts only canonical encodings; any other name in
//! the tree (temp files, foreign data) decodes to `None` and is ignored by
//! enumeration.

use std::fmt::Write;
use std::path::PathBuf;

fn is_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-'
}

/// Encodes one path segment into a file name.
pub fn encode_segment(segment: &str) -> String {
    if segment.is_empty() {
        return "_".to_owned();
    }
    let mut out = String::with_capacity(segment.len());
    for (i, byte) in segment.bytes().enumerate() {
        let escape = !is_safe(byte) || (i == 0 && byte == b'.');
        if escape {
            // Infallible for String.
            let _ = write!(out, "%{byte:02X}");
        } else {
            out.push(byte as char);
        }
    }
    out
}

/// Decodes a file name back into the original path segment.
///
/// Returns `None` for names that are not a canonical encoding.
pub fn decode_segment(name: &str) -> Option<String> {
    if name == "_" {
        return Some(String::new());
    }
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    let decoded = String::from_utf8(out).ok()?;
    // Reject non-canonical spellings (lowercase hex, unescaped specials).
    if encode_segment(&decoded) == name {
        Some(decoded)
    } else {
        None
    }
}

/// Encodes a full entry path into a relative filesystem path.
pub fn encode_path(path: &[String]) -> PathBuf {
    path.iter().map(|segment| encode_segment(segment)).collect()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn safe_segments_pass_through() {
        assert_eq!(encode_segment("feeds"), "feeds");
        assert_eq!(encode_segment("a-b.c"), "a-b.c");
        assert_eq!(encode_segment("Categ0ry"), "Categ0ry");
    }

    #[test]
    fn specials_are_escaped() {
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment("a b"), "a%20b");
        assert_eq!(encode_segment("a_b"), "a%5Fb");
    }

    #[test]
    fn empty_segment_is_underscore() {
        assert_eq!(encode_segment(""), "_");
        assert_eq!(decode_segment("_"), Some(String::new()));
        // A literal underscore must not collide with the empty segment.
        assert_eq!(encode_segment("_"), "%5F");
        assert_eq!(decode_segment("%5F"), Some("_".to_owned()));
    }

    #[test]
    fn leading_dot_is_escaped() {
        assert_eq!(encode_segment(".hidden"), "%2Ehidden");
        assert_eq!(encode_segment("a.b"), "a.b");
        assert_eq!(decode_segment("%2Ehidden"), Some(".hidden".to_owned()));
    }

    #[test]
    fn non_canonical_names_are_rejected() {
        // Lowercase hex, raw underscore inside a longer name, raw leading dot.
        assert_eq!(decode_segment("a%2fb"), None);
        assert_eq!(decode_segment("a_b"), None);
        assert_eq!(decode_segment(".hidden"), None);
        assert_eq!(decode_segment(".feeds.tmp"), None);
    }

    #[test]
    fn invalid_escapes_are_rejected() {
        assert_eq!(decode_segment("%"), None);
        assert_eq!(decode_segment("%2"), None);
        assert_eq!(decode_segment("%GG"), None);
    }

    #[test]
    fn multibyte_round_trip() {
        let segment = "café ☺";
        let encoded = encode_segment(segment);
        assert!(encoded.is_ascii());
        assert_eq!(decode_segment(&encoded), Some(segment.to_owned()));
    }

    #[test]
    fn path_encoding() {
        let path = vec!["feeds".to_owned(), "http://x/y".to_owned()];
        let encoded = encode_path(&path);
        assert_eq!(
            encoded,
            PathBuf::from("feeds").join("http%3A%2F%2Fx%2Fy")
        );
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(segment in "\\PC*") {
            let encoded = encode_segment(&segment);
            prop_assert_eq!(decode_segment(&encoded), Some(segment));
        }
    }
}
