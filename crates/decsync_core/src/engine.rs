//! The synchronization engine.
//!
//! [`Decsync`] is an interface to synchronized key/value mappings stored
//! in a shared directory tree. Entries written by any device eventually
//! appear in every other device's copy of the tree; concurrent updates of
//! the same `(path, key)` resolve to the entry with the greatest
//! `(datetime, app id)` pair, so all readers converge on the same value.
//!
//! The engine does not watch the filesystem and has no background
//! threads: reads happen when the caller drives them through
//! [`Decsync::execute_all_new_entries`] and the stored-entry methods.

use crate::cursor;
use crate::dir::{DecsyncDir, LogFileRef};
use crate::entry::{dominates, Entry, EntryWithPath, StoredEntry};
use crate::error::DecsyncResult;
use crate::info;
use crate::listener::{Callback, Listener, OnEntryUpdate, OnEntryUpdateWithSuccess};
use crate::log::LogFile;
use crate::stored::StoredView;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An interface to the synchronized key/value mappings of one collection.
///
/// `T` is the type of the `extra` userdata threaded through to listener
/// callbacks. A single instance may be used from multiple threads; all
/// operations are serialized internally by one exclusive lock, and
/// callbacks run on the invoking thread while that lock is held. Callbacks
/// must not re-enter the same instance.
///
/// There must never be two live instances with the same app id against the
/// same directory.
pub struct Decsync<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    dir: DecsyncDir,
    own_app_id: String,
    stored: StoredView,
    listeners: Vec<Listener<T>>,
    init_done: bool,
}

impl<T> Decsync<T> {
    /// Opens the collection `sync_type`/`collection` in `decsync_dir`,
    /// writing as `own_app_id`.
    ///
    /// Creates `.decsync-info` when absent and records `own_app_id` as
    /// active.
    ///
    /// # Errors
    ///
    /// [`crate::DecsyncError::InvalidInfo`] or
    /// [`crate::DecsyncError::UnsupportedVersion`] when the directory's
    /// info file fails the version gate.
    pub fn new(
        decsync_dir: &Path,
        sync_type: &str,
        collection: Option<&str>,
        own_app_id: &str,
    ) -> DecsyncResult<Self> {
        info::load_or_create(decsync_dir)?;
        info::touch_last_active(decsync_dir, own_app_id);

        let dir = DecsyncDir::new(decsync_dir, sync_type, collection);
        let stored = StoredView::new(dir.stored_dir(own_app_id));
        Ok(Self {
            inner: Mutex::new(Inner {
                dir,
                own_app_id: own_app_id.to_owned(),
                stored,
                listeners: Vec::new(),
                init_done: false,
            }),
        })
    }

    /// Returns the app id this instance writes as.
    pub fn own_app_id(&self) -> String {
        self.inner.lock().own_app_id.clone()
    }

    /// Registers a listener for entries whose path starts with `subpath`.
    pub fn add_listener(&self, subpath: Vec<String>, on_entry_update: OnEntryUpdate<T>) {
        self.inner.lock().add_listener(Listener {
            subpath,
            callback: Callback::Plain(on_entry_update),
        });
    }

    /// Like [`Decsync::add_listener`], with a callback that reports
    /// success. A `false` return re-queues the entry for the next
    /// [`Decsync::execute_all_new_entries`] call.
    pub fn add_listener_with_success(
        &self,
        subpath: Vec<String>,
        on_entry_update: OnEntryUpdateWithSuccess<T>,
    ) {
        self.inner.lock().add_listener(Listener {
            subpath,
            callback: Callback::WithSuccess(on_entry_update),
        });
    }

    /// Marks listener registration complete.
    pub fn init_done(&self) {
        self.inner.lock().init_done = true;
    }

    /// Associates `value` with `key` in the mapping at `path` and stamps
    /// it with the current datetime. The update is synchronized to all
    /// other instances.
    pub fn set_entry(&self, path: &[String], key: &str, value: &str) {
        self.set_entries_for_path(path, vec![Entry::new(key, value)]);
    }

    /// Like [`Decsync::set_entry`] for multiple entries at once, more
    /// efficient when several entries share a path.
    pub fn set_entries(&self, entries: Vec<EntryWithPath>) {
        let inner = self.inner.lock();
        let mut by_path: HashMap<Vec<String>, Vec<Entry>> = HashMap::new();
        for EntryWithPath { path, entry } in entries {
            by_path.entry(path).or_default().push(entry);
        }
        for (path, batch) in by_path {
            inner.append_batch(&path, &batch);
        }
    }

    /// Like [`Decsync::set_entries`], with all entries sharing one `path`.
    pub fn set_entries_for_path(&self, path: &[String], entries: Vec<Entry>) {
        self.inner.lock().append_batch(path, &entries);
    }

    /// Scans every writer's log for lines beyond this reader's cursors,
    /// merges them per `(path, key)` and invokes the matching listeners
    /// with each winning entry, passing `extra` through.
    ///
    /// For any `(path, key)` the listener fires at most once per call,
    /// with the final merged value; suppressed intermediate values are
    /// consumed silently. Cursors advance only after the listeners return.
    pub fn execute_all_new_entries(&self, extra: &mut T) {
        self.inner.lock().execute_all_new_entries(extra);
    }

    /// Looks up `(path, key)` in the stored view and, when present,
    /// dispatches it to the matching listeners with its stored datetime.
    pub fn execute_stored_entry(&self, path: &[String], key: &str, extra: &mut T) {
        let inner = self.inner.lock();
        if let Some(entry) = inner.stored.get(path, key) {
            inner.dispatch_stored(path, &[entry], extra);
        }
    }

    /// Batch variant of [`Decsync::execute_stored_entry`].
    pub fn execute_stored_entries(&self, stored_entries: &[StoredEntry], extra: &mut T) {
        let inner = self.inner.lock();
        let mut keys_by_path: HashMap<&[String], Vec<&str>> = HashMap::new();
        for stored in stored_entries {
            keys_by_path
                .entry(stored.path.as_slice())
                .or_default()
                .push(stored.key.as_str());
        }
        for (path, keys) in keys_by_path {
            let entries: Vec<Entry> = inner
                .stored
                .entries_at(path)
                .into_iter()
                .filter(|e| keys.contains(&e.key.as_str()))
                .collect();
            inner.dispatch_stored(path, &entries, extra);
        }
    }

    /// Dispatches the stored entries at exactly `path` whose key is in
    /// `keys`.
    pub fn execute_stored_entries_for_path_exact(
        &self,
        path: &[String],
        keys: &[String],
        extra: &mut T,
    ) {
        let inner = self.inner.lock();
        let entries: Vec<Entry> = inner
            .stored
            .entries_at(path)
            .into_iter()
            .filter(|e| keys.contains(&e.key))
            .collect();
        inner.dispatch_stored(path, &entries, extra);
    }

    /// Dispatches every stored entry at exactly `path`.
    pub fn execute_all_stored_entries_for_path_exact(&self, path: &[String], extra: &mut T) {
        let inner = self.inner.lock();
        let entries = inner.stored.entries_at(path);
        inner.dispatch_stored(path, &entries, extra);
    }

    /// Dispatches the stored entries below the prefix `path` whose key is
    /// in `keys`.
    pub fn execute_stored_entries_for_path_prefix(
        &self,
        path: &[String],
        keys: &[String],
        extra: &mut T,
    ) {
        let inner = self.inner.lock();
        for (entry_path, entries) in inner.stored.entries_below(path) {
            let matching: Vec<Entry> =
                entries.into_iter().filter(|e| keys.contains(&e.key)).collect();
            inner.dispatch_stored(&entry_path, &matching, extra);
        }
    }

    /// Dispatches every stored entry below the prefix `path`.
    pub fn execute_all_stored_entries_for_path_prefix(&self, path: &[String], extra: &mut T) {
        let inner = self.inner.lock();
        for (entry_path, entries) in inner.stored.entries_below(path) {
            inner.dispatch_stored(&entry_path, &entries, extra);
        }
    }

    /// Rebuilds the stored view from the union of all writers' logs
    /// without invoking any listeners.
    ///
    /// Almost exclusively used when the application is installed, usually
    /// followed by [`Decsync::execute_stored_entry`] or similar. Running
    /// it twice is a no-op the second time.
    pub fn init_stored_entries(&self) {
        self.inner.lock().init_stored_entries();
    }

    /// Returns the app id that wrote the most recent entry, preferring
    /// this instance's own app id on ties.
    pub fn latest_app_id(&self) -> String {
        self.inner.lock().latest_app_id()
    }
}

impl<T> Inner<T> {
    fn add_listener(&mut self, listener: Listener<T>) {
        if self.init_done {
            debug!("listener registered after init_done");
        }
        self.listeners.push(listener);
    }

    fn append_batch(&self, path: &[String], entries: &[Entry]) {
        if entries.is_empty() {
            return;
        }
        let log = LogFile::new(self.dir.log_file(&self.own_app_id, path));
        debug!(?path, count = entries.len(), "appending entries");
        if let Err(err) = log.append(entries) {
            warn!(?path, %err, "failed to append entries");
        }
    }

    fn execute_all_new_entries(&self, extra: &mut T) {
        struct Scan {
            log: LogFileRef,
            cursor_file: PathBuf,
            old_cursor: u64,
            lines: Vec<(u64, Option<Entry>)>,
        }

        // Step 1+2: stable enumeration, then read each log past its cursor.
        let mut scans = Vec::new();
        for log in self.dir.log_files() {
            let cursor_file = self.dir.cursor_file(&self.own_app_id, &log.app_id, &log.path);
            let old_cursor = cursor::load(&cursor_file);
            let lines = match LogFile::new(log.file.clone()).read_after(old_cursor) {
                Ok(lines) => lines,
                Err(err) => {
                    warn!(file = %log.file.display(), %err, "cannot read log, skipping");
                    continue;
                }
            };
            if lines.is_empty() {
                continue;
            }
            scans.push(Scan {
                log,
                cursor_file,
                old_cursor,
                lines,
            });
        }

        // Step 3: merge tentatives per (path, key) under the total order.
        struct Winning {
            scan: usize,
            line: u64,
            datetime: String,
        }
        let mut winners: HashMap<(Vec<String>, String), Winning> = HashMap::new();
        for (scan_idx, scan) in scans.iter().enumerate() {
            for (line_no, parsed) in &scan.lines {
                let Some(entry) = parsed else { continue };
                let candidate = (entry.datetime.as_str(), scan.log.app_id.as_str());
                match winners.entry((scan.log.path.clone(), entry.key.clone())) {
                    std::collections::hash_map::Entry::Occupied(mut current) => {
                        let held = (
                            current.get().datetime.as_str(),
                            scans[current.get().scan].log.app_id.as_str(),
                        );
                        if dominates(candidate, held) {
                            current.insert(Winning {
                                scan: scan_idx,
                                line: *line_no,
                                datetime: entry.datetime.clone(),
                            });
                        }
                    }
                    std::collections::hash_map::Entry::Vacant(slot) => {
                        slot.insert(Winning {
                            scan: scan_idx,
                            line: *line_no,
                            datetime: entry.datetime.clone(),
                        });
                    }
                }
            }
        }

        // Step 4+5: dispatch winners per file in line order, then persist
        // the cursor. A with-success failure freezes the cursor before the
        // failed line and suppresses the rest of that file for this call.
        for (scan_idx, scan) in scans.iter().enumerate() {
            let mut new_cursor = scan.old_cursor;
            for (line_no, parsed) in &scan.lines {
                let Some(entry) = parsed else {
                    new_cursor = *line_no;
                    continue;
                };
                let won = winners
                    .get(&(scan.log.path.clone(), entry.key.clone()))
                    .is_some_and(|w| w.scan == scan_idx && w.line == *line_no);
                if !won {
                    new_cursor = *line_no;
                    continue;
                }
                if dispatch(&self.listeners, &scan.log.path, entry, extra) {
                    if let Err(err) = self.stored.merge_at(&scan.log.path, std::slice::from_ref(entry)) {
                        warn!(path = ?scan.log.path, %err, "failed to update stored entries");
                    }
                    new_cursor = *line_no;
                } else {
                    debug!(
                        file = %scan.log.file.display(),
                        line = line_no,
                        "listener reported failure, freezing cursor"
                    );
                    break;
                }
            }
            if new_cursor > scan.old_cursor {
                if let Err(err) = cursor::store(&scan.cursor_file, new_cursor) {
                    warn!(file = %scan.cursor_file.display(), %err, "failed to persist cursor");
                }
            }
        }
    }

    fn dispatch_stored(&self, path: &[String], entries: &[Entry], extra: &mut T) {
        for entry in entries {
            dispatch(&self.listeners, path, entry, extra);
        }
    }

    fn init_stored_entries(&self) {
        let mut winners: HashMap<(Vec<String>, String), (Entry, String)> = HashMap::new();
        for log in self.dir.log_files() {
            let lines = match LogFile::new(log.file.clone()).read_after(0) {
                Ok(lines) => lines,
                Err(err) => {
                    warn!(file = %log.file.display(), %err, "cannot read log, skipping");
                    continue;
                }
            };
            for (_, parsed) in lines {
                let Some(entry) = parsed else { continue };
                match winners.entry((log.path.clone(), entry.key.clone())) {
                    std::collections::hash_map::Entry::Occupied(mut current) => {
                        let (held, held_app) = current.get();
                        if dominates(
                            (entry.datetime.as_str(), log.app_id.as_str()),
                            (held.datetime.as_str(), held_app.as_str()),
                        ) {
                            current.insert((entry, log.app_id.clone()));
                        }
                    }
                    std::collections::hash_map::Entry::Vacant(slot) => {
                        slot.insert((entry, log.app_id.clone()));
                    }
                }
            }
        }

        let mut by_path: HashMap<Vec<String>, Vec<Entry>> = HashMap::new();
        for ((path, _), (entry, _)) in winners {
            by_path.entry(path).or_default().push(entry);
        }
        for (path, entries) in by_path {
            if let Err(err) = self.stored.merge_at(&path, &entries) {
                warn!(?path, %err, "failed to initialize stored entries");
            }
        }
    }

    fn latest_app_id(&self) -> String {
        let mut best: Option<(String, String)> = None;
        for log in self.dir.log_files() {
            let lines = match LogFile::new(log.file.clone()).read_after(0) {
                Ok(lines) => lines,
                Err(err) => {
                    warn!(file = %log.file.display(), %err, "cannot read log, skipping");
                    continue;
                }
            };
            for (_, parsed) in lines {
                let Some(entry) = parsed else { continue };
                let better = match &best {
                    None => true,
                    Some((best_dt, best_app)) => match entry.datetime.cmp(best_dt) {
                        std::cmp::Ordering::Greater => true,
                        std::cmp::Ordering::Less => false,
                        std::cmp::Ordering::Equal => {
                            best_app != &self.own_app_id
                                && (log.app_id == self.own_app_id || log.app_id > *best_app)
                        }
                    },
                };
                if better {
                    best = Some((entry.datetime.clone(), log.app_id.clone()));
                }
            }
        }
        best.map_or_else(|| self.own_app_id.clone(), |(_, app_id)| app_id)
    }
}

/// Invokes every matching listener in registration order, stopping at the
/// first failure. Returns whether all invoked listeners succeeded.
fn dispatch<T>(listeners: &[Listener<T>], path: &[String], entry: &Entry, extra: &mut T) -> bool {
    for listener in listeners.iter().filter(|l| l.matches(path)) {
        if !listener.invoke(path, entry, extra) {
            return false;
        }
    }
    true
}

/// Returns the most recent value at the path `["info"]` for `key` in the
/// given directory, without constructing a full engine. Returns the JSON
/// literal `null` when no such value exists.
pub fn get_static_info(
    decsync_dir: &Path,
    sync_type: &str,
    collection: Option<&str>,
    key: &str,
) -> String {
    let dir = DecsyncDir::new(decsync_dir, sync_type, collection);
    let info_path = vec!["info".to_owned()];
    let mut best: Option<(Entry, String)> = None;
    for log in dir.log_files_at(&info_path) {
        let lines = match LogFile::new(log.file.clone()).read_after(0) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(file = %log.file.display(), %err, "cannot read log, skipping");
                continue;
            }
        };
        for (_, parsed) in lines {
            let Some(entry) = parsed else { continue };
            if entry.key != key {
                continue;
            }
            let better = match &best {
                None => true,
                Some((held, held_app)) => dominates(
                    (entry.datetime.as_str(), log.app_id.as_str()),
                    (held.datetime.as_str(), held_app.as_str()),
                ),
            };
            if better {
                best = Some((entry, log.app_id.clone()));
            }
        }
    }
    best.map_or_else(|| "null".to_owned(), |(entry, _)| entry.value)
}

/// A merged snapshot row: the winning entry at a path and its source
/// writer.
#[derive(Debug, Clone)]
pub struct LatestEntry {
    /// The decoded entry path.
    pub path: Vec<String>,
    /// The writer whose entry won the merge.
    pub app_id: String,
    /// The winning entry.
    pub entry: Entry,
}

/// Scans every writer's logs in the given collection and returns the
/// winning entry per `(path, key)`, sorted by path and key.
///
/// A read-only inspection helper: it touches no cursors and no stored
/// view.
pub fn all_latest_entries(
    decsync_dir: &Path,
    sync_type: &str,
    collection: Option<&str>,
) -> Vec<LatestEntry> {
    let dir = DecsyncDir::new(decsync_dir, sync_type, collection);
    let mut winners: HashMap<(Vec<String>, String), (Entry, String)> = HashMap::new();
    for log in dir.log_files() {
        let lines = match LogFile::new(log.file.clone()).read_after(0) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(file = %log.file.display(), %err, "cannot read log, skipping");
                continue;
            }
        };
        for (_, parsed) in lines {
            let Some(entry) = parsed else { continue };
            match winners.entry((log.path.clone(), entry.key.clone())) {
                std::collections::hash_map::Entry::Occupied(mut current) => {
                    let (held, held_app) = current.get();
                    if dominates(
                        (entry.datetime.as_str(), log.app_id.as_str()),
                        (held.datetime.as_str(), held_app.as_str()),
                    ) {
                        current.insert((entry, log.app_id.clone()));
                    }
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert((entry, log.app_id.clone()));
                }
            }
        }
    }

    let mut out: Vec<LatestEntry> = winners
        .into_iter()
        .map(|((path, _), (entry, app_id))| LatestEntry {
            path,
            app_id,
            entry,
        })
        .collect();
    out.sort_by(|a, b| (&a.path, &a.entry.key).cmp(&(&b.path, &b.entry.key)));
    out
}
