//! Persistent key-value storage for client-side state.
//!
//! Values are JSON strings under well-known keys. Writes are always applied as
//! a batch: either every put/delete of the batch lands or none does.

use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod keys {
    pub const THEME: &str = "theme";
    pub const SEARCH_HISTORY: &str = "searchHistory";
    pub const USER: &str = "user";
    pub const COLLECTIONS: &str = "collections";
    pub const FAVORITED_ASSETS: &str = "favoritedAssets";
    /// Single-list favorites written by older releases.
    pub const LEGACY_FAVORITES: &str = "favorites";
    pub const FAVORITES_MIGRATED: &str = "favoritesMigrated";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvWrite {
    Put { key: String, value: String },
    Delete { key: String },
}

impl KvWrite {
    pub fn put_json<T: Serialize + ?Sized>(key: &str, value: &T) -> StoreResult<Self> {
        Ok(Self::Put {
            key: key.to_string(),
            value: serde_json::to_string(value)?,
        })
    }

    pub fn delete(key: &str) -> Self {
        Self::Delete {
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>>;

    /// Applies every write or none of them.
    fn apply(&self, writes: &[KvWrite]) -> StoreResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_raw(key)
    }

    fn apply(&self, writes: &[KvWrite]) -> StoreResult<()> {
        (**self).apply(writes)
    }
}

/// Reads and decodes a JSON value. Undecodable values are treated as absent.
pub fn get_json<T, S>(store: &S, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get_raw(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!(key, "ignoring unreadable stored value: {}", err);
            Ok(None)
        }
    }
}

pub fn put_json<T, S>(store: &S, key: &str, value: &T) -> StoreResult<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    store.apply(&[KvWrite::put_json(key, value)?])
}

fn lock_connection(connection: &Mutex<Connection>) -> StoreResult<MutexGuard<'_, Connection>> {
    connection
        .lock()
        .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".to_string()))
}

fn run_kv_migrations(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_entries (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// SQLite-backed store; clones share one connection.
#[derive(Clone)]
pub struct SqliteKvStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    pub fn open(database_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = database_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(database_path)?;
        tracing::info!(path = %database_path.display(), "opened key-value store");
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        run_kv_migrations(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        let connection = lock_connection(&self.connection)?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn apply(&self, writes: &[KvWrite]) -> StoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut connection = lock_connection(&self.connection)?;
        let transaction = connection.transaction()?;
        let now = Utc::now().timestamp_millis();
        for write in writes {
            match write {
                KvWrite::Put { key, value } => {
                    transaction.execute(
                        "INSERT INTO kv_entries (key, value, updated_at)
                         VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET
                             value = excluded.value,
                             updated_at = excluded.updated_at",
                        params![key, value, now],
                    )?;
                }
                KvWrite::Delete { key } => {
                    transaction.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
                }
            }
        }
        transaction.commit()?;
        tracing::debug!(writes = writes.len(), "committed key-value batch");
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn apply(&self, writes: &[KvWrite]) -> StoreResult<()> {
        let mut entries = self.lock()?;
        for write in writes {
            match write {
                KvWrite::Put { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                KvWrite::Delete { key } => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Theme;

    #[test]
    fn sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gallery.db");
        {
            let store = SqliteKvStore::open(&path).unwrap();
            put_json(&store, keys::THEME, &Theme::Dark).unwrap();
        }
        let reopened = SqliteKvStore::open(&path).unwrap();
        let theme: Option<Theme> = get_json(&reopened, keys::THEME).unwrap();
        assert_eq!(theme, Some(Theme::Dark));
    }

    #[test]
    fn batch_puts_and_deletes_together() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        put_json(&store, keys::LEGACY_FAVORITES, &Vec::<String>::new()).unwrap();

        store
            .apply(&[
                KvWrite::put_json(keys::COLLECTIONS, &vec!["a"]).unwrap(),
                KvWrite::delete(keys::LEGACY_FAVORITES),
            ])
            .unwrap();

        assert!(store.get_raw(keys::LEGACY_FAVORITES).unwrap().is_none());
        assert_eq!(
            store.get_raw(keys::COLLECTIONS).unwrap().as_deref(),
            Some("[\"a\"]")
        );
    }

    #[test]
    fn unreadable_json_reads_as_absent() {
        let store = MemoryKvStore::new();
        store
            .apply(&[KvWrite::Put {
                key: keys::THEME.to_string(),
                value: "{not json".to_string(),
            }])
            .unwrap();
        let theme: Option<Theme> = get_json(&store, keys::THEME).unwrap();
        assert!(theme.is_none());
    }

    #[test]
    fn shared_handles_see_the_same_data() {
        let store = MemoryKvStore::new();
        let other = store.clone();
        put_json(&store, keys::USER, &"demo").unwrap();
        assert!(other.get_raw(keys::USER).unwrap().is_some());
    }
}
