//! Dependency coordinates and force directives.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter;
use std::str::FromStr;

/// A dependency identifier of the form `group:artifact`, independent of version.
///
/// Coordinates are case sensitive and order as their `group:artifact` text,
/// so a sorted lock lists keys in plain string order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    group: String,
    artifact: String,
}

impl Coordinate {
    /// Create a coordinate from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinate`] if either part is empty or contains `:`.
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Result<Self> {
        let group = group.into();
        let artifact = artifact.into();
        if !is_valid_part(&group) || !is_valid_part(&artifact) {
            return Err(Error::InvalidCoordinate {
                value: format!("{group}:{artifact}"),
            });
        }
        Ok(Self { group, artifact })
    }

    /// The group part.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The artifact part.
    #[must_use]
    pub fn artifact(&self) -> &str {
        &self.artifact
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty() && !part.contains(':')
}

impl Coordinate {
    fn key_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.group
            .bytes()
            .chain(iter::once(b':'))
            .chain(self.artifact.bytes())
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_bytes().cmp(other.key_bytes())
    }
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((group, artifact)) if is_valid_part(group) && is_valid_part(artifact) => {
                Ok(Self {
                    group: group.to_string(),
                    artifact: artifact.to_string(),
                })
            }
            _ => Err(Error::InvalidCoordinate {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An instruction to pin a coordinate to a specific version during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForceDirective {
    /// The dependency to force.
    pub coordinate: Coordinate,
    /// The version to force it to.
    pub version: String,
}

impl ForceDirective {
    /// Create a new force directive.
    #[must_use]
    pub fn new(coordinate: Coordinate, version: impl Into<String>) -> Self {
        Self {
            coordinate,
            version: version.into(),
        }
    }
}

impl fmt::Display for ForceDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.coordinate, self.version)
    }
}
