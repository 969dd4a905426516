//! Override loading and merging.
//!
//! Overrides come from two independent sources: an override file in the lock
//! file format and an inline `group:artifact:version` list given at
//! invocation time. [`Overrides::merge`] combines them with inline entries
//! taking precedence.

use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::lockfile::LockStore;
use indexmap::IndexMap;
use indexmap::map::Iter;
use std::path::{Path, PathBuf};

/// Insertion-ordered mapping from coordinate to forced version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    entries: IndexMap<Coordinate, String>,
}

impl Overrides {
    /// Create an empty override map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an override. An overwritten entry keeps its position.
    pub fn insert(&mut self, coordinate: Coordinate, version: impl Into<String>) {
        self.entries.insert(coordinate, version.into());
    }

    /// The overriding version for `coordinate`, if any.
    #[must_use]
    pub fn get(&self, coordinate: &Coordinate) -> Option<&str> {
        self.entries.get(coordinate).map(String::as_str)
    }

    /// Whether `coordinate` is overridden.
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.entries.contains_key(coordinate)
    }

    /// Number of overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overrides in insertion order.
    pub fn iter(&self) -> Iter<'_, Coordinate, String> {
        self.entries.iter()
    }

    /// Merge file-sourced and inline overrides.
    ///
    /// File entries are applied first and inline entries second, so an inline
    /// override replaces a file override for the same coordinate. Entries only
    /// present inline are appended in their inline order.
    #[must_use]
    pub fn merge(file: Self, inline: Self) -> Self {
        let mut merged = file;
        for (coordinate, version) in inline.entries {
            merged.entries.insert(coordinate, version);
        }
        merged
    }

    /// Project an override file onto its forceable entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnreadableOverrideFile`] if the file cannot be read
    /// and [`Error::MalformedLock`] if it is not a lock document.
    pub fn from_file(path: &Path) -> Result<Self> {
        let lock = LockStore::read(path).map_err(|e| match e {
            Error::Io { source, .. } => Error::UnreadableOverrideFile {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        let overrides: Self = lock
            .forceable()
            .map(|(coordinate, locked)| (coordinate.clone(), locked.to_string()))
            .collect();
        tracing::debug!(
            path = %path.display(),
            overrides = overrides.len(),
            skipped = lock.len() - overrides.len(),
            "Loaded override file"
        );
        Ok(overrides)
    }

    /// Parse a comma-separated list of `group:artifact:version` triples.
    ///
    /// A blank string yields no overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedOverride`] for the first entry that is not a
    /// triple of non-empty fields.
    pub fn parse_inline(spec: &str) -> Result<Self> {
        if spec.trim().is_empty() {
            return Ok(Self::new());
        }

        let mut overrides = Self::new();
        for raw in spec.split(',') {
            let entry = raw.trim();
            let malformed = || Error::MalformedOverride {
                spec: spec.to_string(),
                entry: entry.to_string(),
            };

            let fields: Vec<&str> = entry.split(':').collect();
            let [group, artifact, version] = fields.as_slice() else {
                return Err(malformed());
            };
            if version.is_empty() {
                return Err(malformed());
            }
            let coordinate = Coordinate::new(*group, *artifact).map_err(|_| malformed())?;
            overrides.insert(coordinate, *version);
        }
        Ok(overrides)
    }
}

impl FromIterator<(Coordinate, String)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (Coordinate, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Overrides {
    type Item = (&'a Coordinate, &'a String);
    type IntoIter = Iter<'a, Coordinate, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Where overrides are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSources {
    /// Override file in lock format.
    pub file: Option<PathBuf>,
    /// Inline `group:artifact:version` list.
    pub inline: Option<String>,
}

/// Loads overrides from their sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverrideLoader;

impl OverrideLoader {
    /// Load and merge overrides.
    ///
    /// When `ignore_all` is set the result is empty and neither source is
    /// read, so a broken override file or inline string is not reported.
    ///
    /// # Errors
    ///
    /// Returns the error of whichever source fails to load. There is no
    /// partial result.
    pub fn load(sources: &OverrideSources, ignore_all: bool) -> Result<Overrides> {
        if ignore_all {
            tracing::debug!("Overrides ignored");
            return Ok(Overrides::new());
        }

        let file = match &sources.file {
            Some(path) => Overrides::from_file(path)?,
            None => Overrides::new(),
        };
        let inline = match &sources.inline {
            Some(spec) => Overrides::parse_inline(spec)?,
            None => Overrides::new(),
        };

        Ok(Overrides::merge(file, inline))
    }
}
