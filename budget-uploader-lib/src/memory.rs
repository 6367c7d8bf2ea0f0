use std::collections::HashMap;

use serde::Serialize;

use crate::backend::CategoryMap;


/// Client side cache of the persisted description to category memory
///
/// Entries are only ever added or overwritten. Local commits carry the sequence number of the
/// save that produced them so an older confirmation can not overwrite a newer one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryMemory {
    entries: CategoryMap,
    #[serde(skip)]
    committed: HashMap<String, u64>,
}

impl From<CategoryMap> for CategoryMemory {
    fn from(entries: CategoryMap) -> Self {
        Self {
            entries,
            committed: HashMap::new(),
        }
    }
}

impl CategoryMemory {
    /// Category remembered for a description, empty when there is none
    pub fn get(&self, description: &str) -> &str {
        self.entries
            .get(description)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Sequence of the newest save committed for a description during this session
    pub fn committed_sequence(&self, description: &str) -> Option<u64> {
        self.committed.get(description).copied()
    }

    /// Record a persisted category
    ///
    /// Returns false when a newer save for the same description was already committed.
    pub fn commit(&mut self, description: &str, category: &str, sequence: u64) -> bool {
        if let Some(committed) = self.committed.get(description) {
            if *committed > sequence {
                return false;
            }
        }
        self.committed.insert(description.into(), sequence);
        self.entries.insert(description.into(), category.into());
        true
    }

    /// Overlay a snapshot loaded from the backend
    ///
    /// Entries committed locally win over the snapshot, it may have been read before they were
    /// saved.
    pub fn merge(&mut self, snapshot: CategoryMap) {
        for (description, category) in snapshot {
            if !self.committed.contains_key(&description) {
                self.entries.insert(description, category);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &CategoryMap {
        &self.entries
    }
}
