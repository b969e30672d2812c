//! Multi-instance synchronization scenarios.
//!
//! Each test drives two or more engine instances against one shared
//! directory, the way independent applications on different devices would
//! after the file-synchronization service has replicated the tree.

use decsync_core::{Decsync, Entry};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

type Seen = Vec<(Vec<String>, String, String)>;

fn engine(dir: &Path, app_id: &str) -> Decsync<Seen> {
    let decsync = Decsync::new(dir, "rss", None, app_id).unwrap();
    decsync.add_listener(
        vec![],
        Box::new(|path, entry, seen: &mut Seen| {
            seen.push((path.to_vec(), entry.key.clone(), entry.value.clone()));
        }),
    );
    decsync.init_done();
    decsync
}

fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn single_writer_basic() {
    let temp = tempdir().unwrap();
    let decsync = engine(temp.path(), "app-id");

    decsync.set_entry(&path(&["feeds", "1"]), "\"name\"", "\"Foo\"");

    let mut seen = Seen::new();
    decsync.execute_all_new_entries(&mut seen);
    assert_eq!(
        seen,
        vec![(
            path(&["feeds", "1"]),
            "\"name\"".to_owned(),
            "\"Foo\"".to_owned()
        )]
    );

    // A repeated call fires nothing.
    seen.clear();
    decsync.execute_all_new_entries(&mut seen);
    assert!(seen.is_empty());
}

#[test]
fn update_is_observed_by_other_writer_exactly_once() {
    let temp = tempdir().unwrap();
    let a = engine(temp.path(), "app-a");
    let b = engine(temp.path(), "app-b");

    a.set_entry(&path(&["feeds", "1"]), "\"name\"", "\"Foo\"");

    let mut seen = Seen::new();
    b.execute_all_new_entries(&mut seen);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].2, "\"Foo\"");

    seen.clear();
    b.execute_all_new_entries(&mut seen);
    assert!(seen.is_empty());
}

#[test]
fn last_writer_wins_across_writers() {
    let temp = tempdir().unwrap();
    let a = engine(temp.path(), "app-a");
    let b = engine(temp.path(), "app-b");
    let reader = engine(temp.path(), "app-reader");

    a.set_entries_for_path(
        &path(&["k"]),
        vec![Entry::with_datetime(
            "2024-01-01T00:00:00.000",
            "\"v\"",
            "\"X\"",
        )],
    );
    b.set_entries_for_path(
        &path(&["k"]),
        vec![Entry::with_datetime(
            "2024-01-01T00:00:00.001",
            "\"v\"",
            "\"Y\"",
        )],
    );

    let mut seen = Seen::new();
    reader.execute_all_new_entries(&mut seen);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].2, "\"Y\"");
}

#[test]
fn greater_app_id_breaks_datetime_ties() {
    let temp = tempdir().unwrap();
    let a = engine(temp.path(), "app-a");
    let b = engine(temp.path(), "app-b");
    let reader = engine(temp.path(), "app-0-reader");

    let dt = "2024-01-01T00:00:00.000";
    a.set_entries_for_path(&path(&["k"]), vec![Entry::with_datetime(dt, "\"v\"", "\"X\"")]);
    b.set_entries_for_path(&path(&["k"]), vec![Entry::with_datetime(dt, "\"v\"", "\"Y\"")]);

    let mut seen = Seen::new();
    reader.execute_all_new_entries(&mut seen);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].2, "\"Y\"");
}

#[test]
fn prefix_listener_only_sees_its_subtree() {
    let temp = tempdir().unwrap();
    let writer = engine(temp.path(), "app-w");

    let reader: Decsync<Seen> = Decsync::new(temp.path(), "rss", None, "app-r").unwrap();
    reader.add_listener(
        vec!["contacts".to_owned()],
        Box::new(|path, entry, seen: &mut Seen| {
            seen.push((path.to_vec(), entry.key.clone(), entry.value.clone()));
        }),
    );
    reader.init_done();

    writer.set_entry(&path(&["contacts", "123"]), "\"name\"", "\"A\"");
    writer.set_entry(&path(&["calendars", "9"]), "\"name\"", "\"B\"");

    let mut seen = Seen::new();
    reader.execute_all_new_entries(&mut seen);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, path(&["contacts", "123"]));
}

#[test]
fn with_success_failure_freezes_and_redelivers() {
    let temp = tempdir().unwrap();
    let writer = engine(temp.path(), "app-w");

    // 5 lines in one log, distinct keys so every line survives the merge.
    let entries: Vec<Entry> = (1..=5)
        .map(|i| {
            Entry::with_datetime(
                format!("2024-01-01T00:00:00.00{i}"),
                format!("\"k{i}\""),
                format!("\"v{i}\""),
            )
        })
        .collect();
    writer.set_entries_for_path(&path(&["items"]), entries);

    // The reader fails on "k3" the first time around.
    let reader: Decsync<(bool, Seen)> =
        Decsync::new(temp.path(), "rss", None, "app-r").unwrap();
    reader.add_listener_with_success(
        vec![],
        Box::new(|path, entry, extra: &mut (bool, Seen)| {
            if extra.0 && entry.key == "\"k3\"" {
                return false;
            }
            extra
                .1
                .push((path.to_vec(), entry.key.clone(), entry.value.clone()));
            true
        }),
    );
    reader.init_done();

    let mut extra = (true, Seen::new());
    reader.execute_all_new_entries(&mut extra);
    let delivered: Vec<&str> = extra.1.iter().map(|(_, k, _)| k.as_str()).collect();
    assert_eq!(delivered, vec!["\"k1\"", "\"k2\""]);

    // Next call with no new writes redelivers lines 3..5 only.
    let mut extra = (false, Seen::new());
    reader.execute_all_new_entries(&mut extra);
    let delivered: Vec<&str> = extra.1.iter().map(|(_, k, _)| k.as_str()).collect();
    assert_eq!(delivered, vec!["\"k3\"", "\"k4\"", "\"k5\""]);

    // And after that, nothing is pending.
    let mut extra = (false, Seen::new());
    reader.execute_all_new_entries(&mut extra);
    assert!(extra.1.is_empty());
}

#[test]
fn corrupt_line_does_not_block_later_lines() {
    let temp = tempdir().unwrap();

    // A foreign writer whose log has a raw newline inside a key: the line
    // splits into two fragments, both rejected, and the good line after
    // them still arrives.
    let log = temp.path().join("rss/new-entries/app-w/feeds");
    fs::create_dir_all(log.parent().unwrap()).unwrap();
    fs::write(
        &log,
        "2024-01-01T00:00:00.000\t\"broken\nkey\"\t\"v\"\n\
         2024-01-01T00:00:00.001\t\"good\"\t\"v\"\n",
    )
    .unwrap();

    let reader = engine(temp.path(), "app-r");
    let mut seen = Seen::new();
    reader.execute_all_new_entries(&mut seen);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, "\"good\"");

    // The corrupt fragments were consumed; nothing is redelivered.
    seen.clear();
    reader.execute_all_new_entries(&mut seen);
    assert!(seen.is_empty());
}

#[test]
fn init_stored_entries_materializes_the_maximum() {
    let temp = tempdir().unwrap();
    let a = engine(temp.path(), "app-a");
    let b = engine(temp.path(), "app-b");

    a.set_entries_for_path(
        &path(&["feeds", "1"]),
        vec![Entry::with_datetime(
            "2024-01-01T00:00:00.000",
            "\"name\"",
            "\"Old\"",
        )],
    );
    b.set_entries_for_path(
        &path(&["feeds", "1"]),
        vec![Entry::with_datetime(
            "2024-01-01T00:00:00.001",
            "\"name\"",
            "\"New\"",
        )],
    );
    a.set_entries_for_path(
        &path(&["feeds", "2"]),
        vec![Entry::with_datetime(
            "2024-01-01T00:00:00.000",
            "\"name\"",
            "\"Other\"",
        )],
    );

    // A freshly installed instance rebuilds its view from all logs.
    let fresh = engine(temp.path(), "app-c");
    fresh.init_stored_entries();

    let mut seen = Seen::new();
    fresh.execute_all_stored_entries_for_path_prefix(&[], &mut seen);
    seen.sort();
    assert_eq!(
        seen,
        vec![
            (
                path(&["feeds", "1"]),
                "\"name\"".to_owned(),
                "\"New\"".to_owned()
            ),
            (
                path(&["feeds", "2"]),
                "\"name\"".to_owned(),
                "\"Other\"".to_owned()
            ),
        ]
    );
}

#[test]
fn init_stored_entries_is_idempotent() {
    let temp = tempdir().unwrap();
    let writer = engine(temp.path(), "app-w");
    writer.set_entry(&path(&["feeds", "1"]), "\"name\"", "\"Foo\"");

    let reader = engine(temp.path(), "app-r");
    reader.init_stored_entries();

    let mut first = Seen::new();
    reader.execute_all_stored_entries_for_path_prefix(&[], &mut first);

    reader.init_stored_entries();
    let mut second = Seen::new();
    reader.execute_all_stored_entries_for_path_prefix(&[], &mut second);

    first.sort();
    second.sort();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn stored_entry_retrieval_variants() {
    let temp = tempdir().unwrap();
    let decsync = engine(temp.path(), "app-a");

    decsync.set_entry(&path(&["contacts", "1"]), "\"name\"", "\"Ada\"");
    decsync.set_entry(&path(&["contacts", "1"]), "\"email\"", "\"ada@x\"");
    decsync.set_entry(&path(&["contacts", "2"]), "\"name\"", "\"Bob\"");
    let mut sink = Seen::new();
    decsync.execute_all_new_entries(&mut sink);

    // Exact path, selected keys.
    let mut seen = Seen::new();
    decsync.execute_stored_entries_for_path_exact(
        &path(&["contacts", "1"]),
        &["\"name\"".to_owned()],
        &mut seen,
    );
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].2, "\"Ada\"");

    // Exact path, all keys.
    let mut seen = Seen::new();
    decsync.execute_all_stored_entries_for_path_exact(&path(&["contacts", "1"]), &mut seen);
    assert_eq!(seen.len(), 2);

    // Prefix, selected keys.
    let mut seen = Seen::new();
    decsync.execute_stored_entries_for_path_prefix(
        &path(&["contacts"]),
        &["\"name\"".to_owned()],
        &mut seen,
    );
    assert_eq!(seen.len(), 2);

    // Prefix, all keys.
    let mut seen = Seen::new();
    decsync.execute_all_stored_entries_for_path_prefix(&path(&["contacts"]), &mut seen);
    assert_eq!(seen.len(), 3);

    // A prefix outside the written subtree matches nothing.
    let mut seen = Seen::new();
    decsync.execute_all_stored_entries_for_path_prefix(&path(&["calendars"]), &mut seen);
    assert!(seen.is_empty());
}

#[test]
fn batched_stored_entries() {
    use decsync_core::StoredEntry;

    let temp = tempdir().unwrap();
    let decsync = engine(temp.path(), "app-a");

    decsync.set_entry(&path(&["feeds", "1"]), "\"name\"", "\"Foo\"");
    decsync.set_entry(&path(&["feeds", "2"]), "\"name\"", "\"Bar\"");
    let mut sink = Seen::new();
    decsync.execute_all_new_entries(&mut sink);

    let mut seen = Seen::new();
    decsync.execute_stored_entries(
        &[
            StoredEntry::new(path(&["feeds", "1"]), "\"name\""),
            StoredEntry::new(path(&["feeds", "2"]), "\"name\""),
            StoredEntry::new(path(&["feeds", "3"]), "\"name\""),
        ],
        &mut seen,
    );
    seen.sort();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].2, "\"Foo\"");
    assert_eq!(seen[1].2, "\"Bar\"");
}

#[test]
fn set_entries_groups_paths() {
    use decsync_core::EntryWithPath;

    let temp = tempdir().unwrap();
    let writer = engine(temp.path(), "app-w");

    writer.set_entries(vec![
        EntryWithPath::new(path(&["feeds", "1"]), "\"name\"", "\"One\""),
        EntryWithPath::new(path(&["feeds", "2"]), "\"name\"", "\"Two\""),
        EntryWithPath::new(path(&["feeds", "1"]), "\"color\"", "\"red\""),
    ]);

    let reader = engine(temp.path(), "app-r");
    let mut seen = Seen::new();
    reader.execute_all_new_entries(&mut seen);
    assert_eq!(seen.len(), 3);
}

#[test]
fn deletion_is_a_null_value() {
    let temp = tempdir().unwrap();
    let a = engine(temp.path(), "app-a");
    let reader = engine(temp.path(), "app-r");

    a.set_entries_for_path(
        &path(&["feeds", "1"]),
        vec![Entry::with_datetime(
            "2024-01-01T00:00:00.000",
            "\"name\"",
            "\"Foo\"",
        )],
    );
    let mut seen = Seen::new();
    reader.execute_all_new_entries(&mut seen);

    a.set_entries_for_path(
        &path(&["feeds", "1"]),
        vec![Entry::with_datetime(
            "2024-01-01T00:00:00.001",
            "\"name\"",
            "null",
        )],
    );
    seen.clear();
    reader.execute_all_new_entries(&mut seen);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].2, "null");
}
