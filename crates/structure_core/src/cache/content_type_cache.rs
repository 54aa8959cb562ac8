//! Content type cache contract and in-memory implementation.
//!
//! # Invariants
//! - `remove` drops every cached type list holding the structure's inode,
//!   plus the list for its current type.
//! - A poisoned lock degrades to a cache miss instead of panicking.

use crate::model::structure::{Structure, StructureType};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

pub trait ContentTypeCache: Send + Sync {
    fn structures_by_type(&self, structure_type: StructureType) -> Option<Vec<Structure>>;
    fn add_structures_by_type(&self, structure_type: StructureType, structures: Vec<Structure>);
    fn remove(&self, structure: &Structure);
    /// Drops the compiled URL-map master pattern.
    fn clear_url_map_patterns(&self);
}

/// Cache hit/miss and invalidation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub removals: u64,
    pub url_map_clears: u64,
}

#[derive(Default)]
pub struct InMemoryContentTypeCache {
    by_type: RwLock<HashMap<StructureType, Vec<Structure>>>,
    url_map_master_pattern: RwLock<Option<String>>,
    hits: AtomicU64,
    misses: AtomicU64,
    removals: AtomicU64,
    url_map_clears: AtomicU64,
}

impl InMemoryContentTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            url_map_clears: self.url_map_clears.load(Ordering::Relaxed),
        }
    }

    /// Stores the compiled URL-map master pattern.
    pub fn set_url_map_master_pattern(&self, pattern: impl Into<String>) {
        if let Ok(mut slot) = self.url_map_master_pattern.write() {
            *slot = Some(pattern.into());
        }
    }

    pub fn url_map_master_pattern(&self) -> Option<String> {
        self.url_map_master_pattern
            .read()
            .ok()
            .and_then(|slot| slot.clone())
    }
}

impl ContentTypeCache for InMemoryContentTypeCache {
    fn structures_by_type(&self, structure_type: StructureType) -> Option<Vec<Structure>> {
        let cached = self
            .by_type
            .read()
            .ok()
            .and_then(|map| map.get(&structure_type).cloned());
        if cached.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        cached
    }

    fn add_structures_by_type(&self, structure_type: StructureType, structures: Vec<Structure>) {
        if let Ok(mut map) = self.by_type.write() {
            map.insert(structure_type, structures);
        }
    }

    fn remove(&self, structure: &Structure) {
        if let Ok(mut map) = self.by_type.write() {
            map.remove(&structure.structure_type);
            map.retain(|_, cached| !cached.iter().any(|item| item.inode == structure.inode));
        }
        self.removals.fetch_add(1, Ordering::Relaxed);
        debug!(
            "event=cache_remove module=cache status=ok inode={} type={:?}",
            structure.inode, structure.structure_type
        );
    }

    fn clear_url_map_patterns(&self) {
        if let Ok(mut slot) = self.url_map_master_pattern.write() {
            *slot = None;
        }
        self.url_map_clears.fetch_add(1, Ordering::Relaxed);
        debug!("event=cache_clear_url_map module=cache status=ok");
    }
}
