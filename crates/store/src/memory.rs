//! In-memory datastore implementation using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;

use traffic_ops_core::{traits::Datastore, Result};

/// In-memory datastore using DashMap for concurrent access.
///
/// Each collection is a sorted map so listings come back ordered by key.
#[derive(Debug, Default)]
pub struct InMemoryDatastore {
    /// Collection name -> (key -> document).
    collections: DashMap<String, BTreeMap<String, Value>>,
    /// Last id handed out per collection.
    sequences: DashMap<String, i64>,
}

impl InMemoryDatastore {
    /// Create a new empty datastore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Check if a collection is empty.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        Ok(self
            .collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|c| c.get(key).cloned()))
    }

    async fn insert(&self, collection: &str, key: &str, doc: Value) -> Result<u64> {
        let mut records = self.collections.entry(collection.to_string()).or_default();
        if records.contains_key(key) {
            return Ok(0);
        }

        tracing::trace!(collection = collection, key = key, "Storing record in memory");
        records.insert(key.to_string(), doc);
        Ok(1)
    }

    async fn update(&self, collection: &str, key: &str, doc: Value) -> Result<u64> {
        let Some(mut records) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        match records.get_mut(key) {
            Some(existing) => {
                *existing = doc;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<u64> {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|mut c| c.remove(key));
        Ok(u64::from(removed.is_some()))
    }

    async fn next_id(&self, collection: &str) -> Result<i64> {
        let mut seq = self.sequences.entry(collection.to_string()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn observe_id(&self, collection: &str, id: i64) -> Result<()> {
        let mut seq = self.sequences.entry(collection.to_string()).or_insert(0);
        *seq = (*seq).max(id);
        Ok(())
    }
}
