//! In-memory checker registry.

use crate::checker::Checker;
use crate::error::{CheckerError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Name-to-adapter table the orchestration core resolves checkers through.
///
/// Scan configuration refers to checkers by name only; the embedding
/// application registers the adapters it has available. Lookups of names
/// with no registration fail with [`CheckerError::Unknown`].
#[derive(Clone)]
pub struct CheckerRegistry {
    checkers: Arc<RwLock<HashMap<String, Arc<dyn Checker>>>>,
}

impl CheckerRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            checkers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a checker under its own name, replacing any previous
    /// registration for that name.
    pub fn register(&self, checker: Arc<dyn Checker>) {
        let name = checker.name().to_string();

        let mut table = self
            .checkers
            .write()
            .expect("acquire write lock on checkers");

        table.insert(name.clone(), checker);

        debug!(checker = %name, "registered checker");
    }

    /// Resolve a checker by name.
    ///
    /// # Errors
    /// Returns `Unknown` if no checker is registered under the name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Checker>> {
        let table = self
            .checkers
            .read()
            .expect("acquire read lock on checkers");

        table
            .get(name)
            .cloned()
            .ok_or_else(|| CheckerError::Unknown {
                name: name.to_string(),
            })
    }

    /// Check whether a name has a registration.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let table = self
            .checkers
            .read()
            .expect("acquire read lock on checkers");

        table.contains_key(name)
    }

    /// All registered checker names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let table = self
            .checkers
            .read()
            .expect("acquire read lock on checkers");

        let mut names: Vec<String> = table.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a registration.
    ///
    /// Returns `true` if the checker was present, `false` otherwise.
    pub fn remove(&self, name: &str) -> bool {
        let mut table = self
            .checkers
            .write()
            .expect("acquire write lock on checkers");

        let removed = table.remove(name).is_some();

        if removed {
            debug!(checker = name, "removed checker");
        }

        removed
    }

    /// Number of registered checkers.
    #[must_use]
    pub fn count(&self) -> usize {
        let table = self
            .checkers
            .read()
            .expect("acquire read lock on checkers");

        table.len()
    }
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
