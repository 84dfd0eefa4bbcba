//! File-backed cache implementation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{CacheError, CacheValue, LocalCache};

/// A [`LocalCache`] persisted as a single JSON file.
///
/// The whole map is rewritten on every `save`: the cache is a handful of
/// profile fields and flags, so atomicity matters far more than write
/// volume. Writes go to a sibling temp file first and are renamed into
/// place, so a crash mid-save leaves the previous file intact.
pub struct FileCache {
    path: PathBuf,
    map: HashMap<String, CacheValue>,
}

impl FileCache {
    /// Opens the cache at `path`, loading any existing contents.
    ///
    /// A missing file is an empty cache, not an error — that's the normal
    /// first-run state. A file that exists but doesn't parse is surfaced,
    /// since silently discarding it would lose the player's flags.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let map = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                HashMap::new()
            }
            Err(e) => return Err(CacheError::Io(e)),
        };
        Ok(Self { path, map })
    }

    /// The file this cache persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Option<&CacheValue> {
        self.map.get(key)
    }

    fn set(&mut self, key: &str, value: impl Into<CacheValue>) {
        self.map.insert(key.to_string(), value.into());
    }

    fn delete(&mut self, key: &str) {
        self.map.remove(key);
    }

    fn save(&mut self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec_pretty(&self.map)?;

        // Temp write + rename keeps the previous file intact if this
        // process dies mid-save.
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "cache saved");
        Ok(())
    }
}
