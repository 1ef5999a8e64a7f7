#![forbid(unsafe_code)]

//! Key-value persistence for recent and pinned records.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │         RecentItems / PinnedItems                  │
//! │   - JSON list of {entity, id, title} under one key │
//! │   - storage failures logged, read as empty         │
//! └────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌────────────────────────────────────────────────────┐
//! │                 KeyValueStore                      │
//! │   - MemoryStore: in-process (tests, ephemeral)     │
//! │   - FileStore: JSON file (requires `file-store`)   │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. Storage failures never panic. List reads degrade to an empty list and
//!    list writes are dropped, both with a `warn!` event.
//! 2. File writes use write-then-rename, so a crash leaves either the old or
//!    the new file.
//! 3. Recent items are most-recent first, unique by `(entity, id)`, and
//!    capped. Pinned items keep insertion order and have no cap.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Store key for recent items.
pub const RECENT_ITEMS_KEY: &str = "mdaform.recent_items";

/// Store key for pinned items.
pub const PINNED_ITEMS_KEY: &str = "mdaform.pinned_items";

/// Default number of recent items kept.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from a [`KeyValueStore`].
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// A value could not be encoded or decoded.
    Serialization(String),
    /// The backing file is not in the expected format.
    Corruption(String),
    /// The backend cannot be used.
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::Corruption(msg) => write!(f, "storage corruption: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Store Trait
// ─────────────────────────────────────────────────────────────────────────────

/// String key-value store, the shape of browser local storage.
pub trait KeyValueStore {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read a value. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value. Missing keys are not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Check if the backend is usable.
    fn is_available(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store (always available)
// ─────────────────────────────────────────────────────────────────────────────

/// In-process store. Contents are lost when dropped.
#[derive(Default)]
pub struct MemoryStore {
    data: RefCell<BTreeMap<String, String>>,
    unavailable: RefCell<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StorageError::Unavailable`] until
    /// [`restore`](Self::restore) is called.
    pub fn break_with(&self, reason: impl Into<String>) {
        *self.unavailable.borrow_mut() = Some(reason.into());
    }

    /// Undo [`break_with`](Self::break_with).
    pub fn restore(&self) {
        *self.unavailable.borrow_mut() = None;
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> StorageResult<()> {
        match self.unavailable.borrow().as_ref() {
            Some(reason) => Err(StorageError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.check()?;
        Ok(self.data.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check()?;
        self.data
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.check()?;
        self.data.borrow_mut().remove(key);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.unavailable.borrow().is_none()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.len())
            .field("available", &self.is_available())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Store (requires file-store feature)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "file-store")]
mod file_store {
    use super::*;
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    #[derive(Serialize, Deserialize)]
    struct StoreFile {
        format_version: u32,
        entries: BTreeMap<String, String>,
    }

    impl StoreFile {
        const FORMAT_VERSION: u32 = 1;

        fn new() -> Self {
            Self {
                format_version: Self::FORMAT_VERSION,
                entries: BTreeMap::new(),
            }
        }
    }

    /// JSON file store.
    ///
    /// ```json
    /// {
    ///   "format_version": 1,
    ///   "entries": {
    ///     "mdaform.recent_items": "[{\"entity\":\"project\",...}]"
    ///   }
    /// }
    /// ```
    ///
    /// Every write rewrites the whole file through `{path}.tmp` and a rename.
    pub struct FileStore {
        path: PathBuf,
    }

    impl FileStore {
        /// Store at `path`. The file is created on first write.
        #[must_use]
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
            }
        }

        /// Store at the default per-user location for `app_name`.
        ///
        /// Uses `$XDG_STATE_HOME/mdaform/{app_name}/store.json`, falling back
        /// to `~/.local/state` and then the working directory.
        #[must_use]
        pub fn default_for_app(app_name: &str) -> Self {
            let path = state_dir().join("mdaform").join(app_name).join("store.json");
            Self { path }
        }

        /// Backing file path.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut tmp = self.path.clone();
            tmp.set_extension("json.tmp");
            tmp
        }

        fn load(&self) -> StorageResult<StoreFile> {
            if !self.path.exists() {
                return Ok(StoreFile::new());
            }
            let reader = BufReader::new(File::open(&self.path)?);
            let file: StoreFile = serde_json::from_reader(reader).map_err(|e| {
                StorageError::Corruption(format!("failed to parse store file: {e}"))
            })?;
            if file.format_version != StoreFile::FORMAT_VERSION {
                return Err(StorageError::Corruption(format!(
                    "unsupported store format version {}",
                    file.format_version
                )));
            }
            Ok(file)
        }

        fn save(&self, file: &StoreFile) -> StorageResult<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp_path = self.temp_path();
            {
                let mut writer = BufWriter::new(File::create(&tmp_path)?);
                serde_json::to_writer_pretty(&mut writer, file)?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)?;
            tracing::debug!(
                path = %self.path.display(),
                entries = file.entries.len(),
                "store file written"
            );
            Ok(())
        }
    }

    fn state_dir() -> PathBuf {
        if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(state_home);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local").join("state");
        }
        PathBuf::from(".")
    }

    impl KeyValueStore for FileStore {
        fn name(&self) -> &str {
            "FileStore"
        }

        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            Ok(self.load()?.entries.get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            let mut file = self.load()?;
            file.entries.insert(key.to_owned(), value.to_owned());
            self.save(&file)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            let mut file = self.load()?;
            if file.entries.remove(key).is_some() {
                self.save(&file)?;
            }
            Ok(())
        }

        fn is_available(&self) -> bool {
            match self.path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    parent.is_dir() || fs::create_dir_all(parent).is_ok()
                }
                _ => true,
            }
        }
    }

    impl fmt::Debug for FileStore {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileStore")
                .field("path", &self.path)
                .finish()
        }
    }
}

#[cfg(feature = "file-store")]
pub use file_store::FileStore;

// ─────────────────────────────────────────────────────────────────────────────
// Item Lists
// ─────────────────────────────────────────────────────────────────────────────

/// A reference to a record shown in a recent or pinned list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub entity: String,
    pub id: String,
    pub title: String,
}

impl ItemRef {
    pub fn new(entity: impl Into<String>, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
            title: title.into(),
        }
    }

    /// Whether `self` refers to the record `(entity, id)`.
    #[must_use]
    pub fn is(&self, entity: &str, id: &str) -> bool {
        self.entity == entity && self.id == id
    }
}

/// A JSON-encoded list of [`ItemRef`] stored under one key.
#[derive(Clone)]
struct ItemList {
    store: Rc<dyn KeyValueStore>,
    key: String,
}

impl ItemList {
    fn try_load(&self) -> StorageResult<Vec<ItemRef>> {
        match self.store.get(&self.key)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn load(&self) -> Vec<ItemRef> {
        self.try_load().unwrap_or_else(|e| {
            tracing::warn!(
                store = self.store.name(),
                key = %self.key,
                error = %e,
                "item list unreadable, using empty list"
            );
            Vec::new()
        })
    }

    fn save(&self, items: &[ItemRef]) {
        let result = serde_json::to_string(items)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(&self.key, &json));
        if let Err(e) = result {
            tracing::warn!(
                store = self.store.name(),
                key = %self.key,
                error = %e,
                "item list not saved"
            );
        }
    }
}

/// Most-recently opened records.
#[derive(Clone)]
pub struct RecentItems {
    list: ItemList,
    limit: usize,
}

impl RecentItems {
    /// Recent list under [`RECENT_ITEMS_KEY`] with the given cap.
    pub fn new(store: Rc<dyn KeyValueStore>, limit: usize) -> Self {
        Self {
            list: ItemList {
                store,
                key: RECENT_ITEMS_KEY.to_owned(),
            },
            limit,
        }
    }

    /// Items, most recent first.
    #[must_use]
    pub fn items(&self) -> Vec<ItemRef> {
        self.list.load()
    }

    /// Move `item` to the front, dropping any older entry for the same record
    /// and anything past the cap. A changed title replaces the stored one.
    pub fn record(&self, item: ItemRef) {
        let mut items = self.list.load();
        items.retain(|i| !i.is(&item.entity, &item.id));
        items.insert(0, item);
        items.truncate(self.limit);
        self.list.save(&items);
    }

    /// Forget one record.
    pub fn remove(&self, entity: &str, id: &str) {
        let mut items = self.list.load();
        let before = items.len();
        items.retain(|i| !i.is(entity, id));
        if items.len() != before {
            self.list.save(&items);
        }
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.list.save(&[]);
    }

    /// The cap.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl fmt::Debug for RecentItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecentItems")
            .field("store", &self.list.store.name())
            .field("limit", &self.limit)
            .finish()
    }
}

/// Records the user pinned.
#[derive(Clone)]
pub struct PinnedItems {
    list: ItemList,
}

impl PinnedItems {
    /// Pinned list under [`PINNED_ITEMS_KEY`].
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            list: ItemList {
                store,
                key: PINNED_ITEMS_KEY.to_owned(),
            },
        }
    }

    /// Items in pin order.
    #[must_use]
    pub fn items(&self) -> Vec<ItemRef> {
        self.list.load()
    }

    #[must_use]
    pub fn is_pinned(&self, entity: &str, id: &str) -> bool {
        self.list.load().iter().any(|i| i.is(entity, id))
    }

    /// Pin `item`. Already-pinned records only get their title refreshed.
    pub fn pin(&self, item: ItemRef) {
        let mut items = self.list.load();
        match items.iter_mut().find(|i| i.is(&item.entity, &item.id)) {
            Some(existing) => existing.title = item.title,
            None => items.push(item),
        }
        self.list.save(&items);
    }

    /// Unpin a record.
    pub fn unpin(&self, entity: &str, id: &str) {
        let mut items = self.list.load();
        let before = items.len();
        items.retain(|i| !i.is(entity, id));
        if items.len() != before {
            self.list.save(&items);
        }
    }

    /// Pin if unpinned, unpin if pinned. Returns whether it is now pinned.
    pub fn toggle(&self, item: ItemRef) -> bool {
        if self.is_pinned(&item.entity, &item.id) {
            self.unpin(&item.entity, &item.id);
            false
        } else {
            self.pin(item);
            true
        }
    }
}

impl fmt::Debug for PinnedItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedItems")
            .field("store", &self.list.store.name())
            .finish()
    }
}
