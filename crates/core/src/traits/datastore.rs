//! Storage collaborator used by API handlers.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Document store keyed by (collection, key).
///
/// Records are opaque JSON documents; typing happens in the handlers.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// List every record in a collection, ordered by key.
    async fn list(&self, collection: &str) -> Result<Vec<Value>>;

    /// Fetch one record.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>>;

    /// Insert a new record. Returns rows affected; 0 if the key already exists.
    async fn insert(&self, collection: &str, key: &str, doc: Value) -> Result<u64>;

    /// Replace an existing record. Returns rows affected; 0 if absent.
    async fn update(&self, collection: &str, key: &str, doc: Value) -> Result<u64>;

    /// Remove a record. Returns rows affected; 0 if absent.
    async fn delete(&self, collection: &str, key: &str) -> Result<u64>;

    /// Reserve the next integral id for a collection.
    async fn next_id(&self, collection: &str) -> Result<i64>;

    /// Note that `id` was chosen by a client, so `next_id` only hands out
    /// larger ids from now on.
    async fn observe_id(&self, collection: &str, id: i64) -> Result<()>;
}
