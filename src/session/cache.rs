use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{RepositoryInfo, TypeDefinition};

/// Per-repository cache of repository descriptors. Entries are created
/// lazily on first successful fetch and evicted per repository id or by
/// replacing the whole cache.
#[derive(Debug)]
pub struct RepositoryInfoCache {
    capacity: usize,
    entries: HashMap<String, Arc<RepositoryInfo>>,
}

impl RepositoryInfoCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, repository_id: &str) -> Option<Arc<RepositoryInfo>> {
        self.entries.get(repository_id).cloned()
    }

    pub fn put(&mut self, info: Arc<RepositoryInfo>) {
        if !self.entries.contains_key(&info.id) && self.entries.len() >= self.capacity {
            // Coarse eviction; the cache is small and bounded, order is not
            // significant for correctness.
            if let Some(victim) = self.entries.keys().next().cloned() {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(info.id.clone(), info);
    }

    pub fn remove(&mut self, repository_id: &str) {
        self.entries.remove(repository_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-repository cache of type definitions, keyed by repository id and
/// type id. Removal by repository id drops that repository's whole subtree
/// and nothing else.
#[derive(Debug)]
pub struct TypeDefinitionCache {
    capacity: usize,
    entries: HashMap<String, HashMap<String, Arc<TypeDefinition>>>,
}

impl TypeDefinitionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, repository_id: &str, type_id: &str) -> Option<Arc<TypeDefinition>> {
        self.entries
            .get(repository_id)
            .and_then(|types| types.get(type_id))
            .cloned()
    }

    pub fn put(&mut self, repository_id: &str, type_def: Arc<TypeDefinition>) {
        let types = self.entries.entry(repository_id.to_string()).or_default();
        if !types.contains_key(&type_def.id) && types.len() >= self.capacity {
            if let Some(victim) = types.keys().next().cloned() {
                types.remove(&victim);
            }
        }
        types.insert(type_def.id.clone(), type_def);
    }

    pub fn remove(&mut self, repository_id: &str) {
        self.entries.remove(repository_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn repository_len(&self, repository_id: &str) -> usize {
        self.entries.get(repository_id).map_or(0, HashMap::len)
    }
}
