//! Override/lock precedence engine.
//!
//! Turns a lock and a set of overrides into the ordered list of
//! [`ForceDirective`]s handed to the resolver. Both entry points are pure.

use crate::coordinate::ForceDirective;
use crate::lockfile::Lock;
use crate::overrides::Overrides;

/// Combine a lock with overrides.
///
/// Every forceable lock entry yields one directive, using the override
/// version when the coordinate is overridden and the locked version
/// otherwise. Overrides for coordinates the lock does not mention at all are
/// appended afterwards in override order.
///
/// A lock entry without a `locked` version is never forced, even when its
/// coordinate is overridden.
#[must_use]
pub fn resolve_with_lock(lock: &Lock, overrides: &Overrides) -> Vec<ForceDirective> {
    let mut directives: Vec<ForceDirective> = lock
        .forceable()
        .map(|(coordinate, locked)| {
            let version = overrides.get(coordinate).unwrap_or(locked);
            ForceDirective::new(coordinate.clone(), version)
        })
        .collect();

    for (coordinate, version) in overrides {
        match lock.get(coordinate) {
            None => directives.push(ForceDirective::new(coordinate.clone(), version.clone())),
            Some(entry) if !entry.is_forceable() => {
                tracing::debug!(
                    coordinate = %coordinate,
                    version = %version,
                    "Override ignored for unlocked project dependency"
                );
            }
            Some(_) => {}
        }
    }

    directives
}

/// Force every override, with no lock involved.
#[must_use]
pub fn resolve_without_lock(overrides: &Overrides) -> Vec<ForceDirective> {
    overrides
        .iter()
        .map(|(coordinate, version)| ForceDirective::new(coordinate.clone(), version.clone()))
        .collect()
}
