//! SQLite-backed document datastore.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::Arc;

use traffic_ops_core::{traits::Datastore, Error, Result};

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> Error + '_ {
    move |e| Error::storage(format!("{}: {}", context, e))
}

/// Persistent datastore keeping each record as a JSON document row.
pub struct SqliteDatastore {
    conn: Arc<tokio::sync::Mutex<Connection>>,
}

impl SqliteDatastore {
    /// Open (or create) a datastore at the given path.
    pub fn new(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err("DB error"))?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err("DB error"))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                doc TEXT NOT NULL, -- JSON document
                PRIMARY KEY (collection, key)
            )",
            [],
        )
        .map_err(db_err("Schema error"))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sequences (
                collection TEXT PRIMARY KEY,
                last_id INTEGER NOT NULL
            )",
            [],
        )
        .map_err(db_err("Schema error"))?;

        Ok(Self {
            conn: Arc::new(tokio::sync::Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))?
    }
}

fn parse_doc(raw: &str) -> Result<Value> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl Datastore for SqliteDatastore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let collection = collection.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM records WHERE collection = ?1 ORDER BY key")
                .map_err(db_err("Prepare error"))?;
            let rows = stmt
                .query_map(params![collection], |row| row.get::<_, String>(0))
                .map_err(db_err("Query error"))?;

            let mut docs = Vec::new();
            for row in rows {
                let raw = row.map_err(db_err("Row error"))?;
                docs.push(parse_doc(&raw)?);
            }
            Ok(docs)
        })
        .await
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.with_conn(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT doc FROM records WHERE collection = ?1 AND key = ?2",
                    params![collection, key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err("Query error"))?;
            raw.as_deref().map(parse_doc).transpose()
        })
        .await
    }

    async fn insert(&self, collection: &str, key: &str, doc: Value) -> Result<u64> {
        let (collection, key) = (collection.to_string(), key.to_string());
        let raw = serde_json::to_string(&doc)?;
        self.with_conn(move |conn| {
            let affected = conn
                .execute(
                    "INSERT OR IGNORE INTO records (collection, key, doc) VALUES (?1, ?2, ?3)",
                    params![collection, key, raw],
                )
                .map_err(db_err("Insert error"))?;
            Ok(affected as u64)
        })
        .await
    }

    async fn update(&self, collection: &str, key: &str, doc: Value) -> Result<u64> {
        let (collection, key) = (collection.to_string(), key.to_string());
        let raw = serde_json::to_string(&doc)?;
        self.with_conn(move |conn| {
            let affected = conn
                .execute(
                    "UPDATE records SET doc = ?3 WHERE collection = ?1 AND key = ?2",
                    params![collection, key, raw],
                )
                .map_err(db_err("Update error"))?;
            Ok(affected as u64)
        })
        .await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<u64> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.with_conn(move |conn| {
            let affected = conn
                .execute(
                    "DELETE FROM records WHERE collection = ?1 AND key = ?2",
                    params![collection, key],
                )
                .map_err(db_err("Delete error"))?;
            Ok(affected as u64)
        })
        .await
    }

    async fn next_id(&self, collection: &str) -> Result<i64> {
        let collection = collection.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sequences (collection, last_id) VALUES (?1, 1)
                 ON CONFLICT(collection) DO UPDATE SET last_id = last_id + 1",
                params![collection],
            )
            .map_err(db_err("Sequence error"))?;
            conn.query_row(
                "SELECT last_id FROM sequences WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )
            .map_err(db_err("Sequence error"))
        })
        .await
    }

    async fn observe_id(&self, collection: &str, id: i64) -> Result<()> {
        let collection = collection.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sequences (collection, last_id) VALUES (?1, ?2)
                 ON CONFLICT(collection) DO UPDATE SET last_id = MAX(last_id, excluded.last_id)",
                params![collection, id],
            )
            .map_err(db_err("Sequence error"))?;
            Ok(())
        })
        .await
    }
}
