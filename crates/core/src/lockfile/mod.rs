//! Lock file types and storage.
//!
//! The lock file (`dependencies.lock`) pins every resolved external dependency
//! of a project to a version so that repeated builds resolve identical graphs.
//! Override files use the same format.
//!
//! ## Structure
//!
//! ```json
//! {
//!   "com.example:foo": {
//!     "locked": "1.0.0",
//!     "requested": "1.+"
//!   },
//!   "com.example:internal": {
//!     "project": true
//!   }
//! }
//! ```
//!
//! Entries without `locked` describe project-internal dependencies. They are
//! kept for bookkeeping and never forced. Fields other than `locked` and
//! `requested` are carried through untouched.

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Default file name for lock files.
pub const LOCKFILE_NAME: &str = "dependencies.lock";

/// Field recording the override version applied while a lock was generated.
pub const VIA_OVERRIDE_FIELD: &str = "viaOverride";

/// Per-coordinate resolution record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockEntry {
    /// The version to force. Absent for project-internal dependencies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<String>,
    /// The version originally requested. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<String>,
    /// Any other fields, preserved on round-trip.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LockEntry {
    /// An entry locked to `version`.
    #[must_use]
    pub fn locked(version: impl Into<String>) -> Self {
        Self {
            locked: Some(version.into()),
            ..Self::default()
        }
    }

    /// Set the requested version.
    #[must_use]
    pub fn with_requested(mut self, requested: impl Into<String>) -> Self {
        self.requested = Some(requested.into());
        self
    }

    /// Whether this entry carries a `locked` version and may be forced.
    #[must_use]
    pub fn is_forceable(&self) -> bool {
        self.locked.is_some()
    }
}

/// A mapping from coordinate to resolution record, ordered by coordinate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lock {
    entries: BTreeMap<Coordinate, LockEntry>,
}

impl Lock {
    /// Create an empty lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `coordinate`.
    pub fn insert(&mut self, coordinate: Coordinate, entry: LockEntry) -> Option<LockEntry> {
        self.entries.insert(coordinate, entry)
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, coordinate: &Coordinate) -> Option<&LockEntry> {
        self.entries.get(coordinate)
    }

    /// Whether the lock has an entry (forceable or not) for `coordinate`.
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.entries.contains_key(coordinate)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the lock has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in coordinate order.
    pub fn iter(&self) -> btree_map::Iter<'_, Coordinate, LockEntry> {
        self.entries.iter()
    }

    /// Entries carrying a `locked` version, paired with that version, in coordinate order.
    pub fn forceable(&self) -> impl Iterator<Item = (&Coordinate, &str)> {
        self.entries
            .iter()
            .filter_map(|(coord, entry)| entry.locked.as_deref().map(|locked| (coord, locked)))
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Coordinate, &mut LockEntry) -> bool) {
        self.entries.retain(|coord, entry| keep(coord, entry));
    }
}

impl FromIterator<(Coordinate, LockEntry)> for Lock {
    fn from_iter<I: IntoIterator<Item = (Coordinate, LockEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Lock {
    type Item = (&'a Coordinate, &'a LockEntry);
    type IntoIter = btree_map::Iter<'a, Coordinate, LockEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Reads and writes lock files.
#[derive(Debug, Default, Clone, Copy)]
pub struct LockStore;

impl LockStore {
    /// Parse the lock file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::MalformedLock`] if it is not an object-shaped lock document.
    pub fn read(path: &Path) -> Result<Lock> {
        let content = fs::read_to_string(path)
            .map_err(|source| Error::io(source, path, "reading lock file"))?;

        let lock: Lock = serde_json::from_str(&content).map_err(|source| Error::MalformedLock {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

        tracing::debug!(path = %path.display(), entries = lock.len(), "Read lock file");
        Ok(lock)
    }

    /// Serialize a lock in the canonical on-disk form.
    ///
    /// Keys are sorted, so equal locks always serialize to equal bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if an extra field cannot be serialized.
    pub fn render(lock: &Lock) -> Result<String> {
        let mut content = serde_json::to_string_pretty(lock)
            .map_err(|e| Error::configuration(format!("Failed to serialize lock: {e}")))?;
        content.push('\n');
        Ok(content)
    }

    /// Write `lock` to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory or file cannot be written.
    pub fn write(path: &Path, lock: &Lock) -> Result<()> {
        let content = Self::render(lock)?;
        write_atomic(path, content.as_bytes())?;
        tracing::debug!(path = %path.display(), entries = lock.len(), "Wrote lock file");
        Ok(())
    }

    /// Whether a lock file exists at `path`.
    #[must_use]
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }
}

/// Replace `path` with `bytes` through a temporary file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(parent)
        .map_err(|source| Error::io(source, parent, "creating lock directory"))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|source| Error::io(source, parent, "creating temporary lock file"))?;
    temp.write_all(bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|source| Error::io(source, temp.path(), "writing temporary lock file"))?;
    temp.persist(path)
        .map_err(|e| Error::io(e.error, path, "replacing lock file"))?;

    Ok(())
}
