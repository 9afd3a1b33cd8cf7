//! Persistence gateway.
//!
//! An opaque, synchronous key-value store holding dataset snapshots as JSON
//! text. The engine uses a single fixed key for the whole dataset.
//!
//! - [`MemoryStore`] keeps snapshots in a map (tests, ephemeral sessions).
//! - [`FileStore`] writes one `<key>.json` file per key into a directory.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreResult;

/// Default directory for [`FileStore`] (relative to current dir).
pub const DEFAULT_DATA_DIR: &str = ".gridform";

/// Default key the dataset snapshot is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "savedGridData";

/// Synchronous key-value persistence.
pub trait KeyValueStore {
    /// Store `snapshot` under `key`, replacing any previous value.
    fn save(&mut self, key: &str, snapshot: &str) -> StoreResult<()>;

    /// Fetch the snapshot stored under `key`.
    fn load(&self, key: &str) -> StoreResult<Option<String>>;

    /// Remove `key`. Removing a missing key is not an error.
    fn clear(&mut self, key: &str) -> StoreResult<()>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn save(&mut self, key: &str, snapshot: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), snapshot.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn clear(&mut self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Directory-backed store: one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where snapshots are stored
    dir: PathBuf,
}

impl FileStore {
    /// Create a store in the default directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_DATA_DIR)
    }

    /// Create a store with a custom directory. The directory is created on
    /// first save.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for FileStore {
    fn save(&mut self, key: &str, snapshot: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;

        // Temp file + rename: the previous snapshot is replaced atomically.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&mut self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Map a key to a safe file stem
fn file_stem(key: &str) -> String {
    let stem: String = key
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if stem.is_empty() {
        "default".to_string()
    } else {
        stem
    }
}
