use crate::error::Result;
use log::debug;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Derives a stable cache key from any serializable input by hashing its
/// JSON form. Identical inputs always produce the same key.
pub fn content_key<T: Serialize>(input: &T) -> Result<String> {
    let bytes = serde_json::to_vec(input)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// In-memory memoization for analysis results. Keys are content hashes, so
/// re-analyzing unchanged input is a lookup instead of a recomputation.
#[derive(Debug, Default)]
pub struct AnalysisCache<V> {
    entries: HashMap<String, V>,
}

impl<V> AnalysisCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, value: V) {
        self.entries.insert(key, value);
    }

    pub fn get_or_insert_with<F>(&mut self, key: &str, compute: F) -> &V
    where
        F: FnOnce() -> V,
    {
        if !self.entries.contains_key(key) {
            debug!("cache miss for {key}");
            self.entries.insert(key.to_string(), compute());
        }
        &self.entries[key]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
