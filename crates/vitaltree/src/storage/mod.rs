//! Storage layer for vitaltree.
//!
//! Every top-level collection (current user, health profiles, vital records,
//! the family tree document) is persisted as one serialized JSON blob under a
//! fixed key. Mutations always rewrite the whole collection; there is no
//! partial update and no write batching.

mod memory;
pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use memory::MemoryStore;

/// Key holding the signed-in user.
pub const USER_KEY: &str = "vt_user";

/// Key holding the health profile collection.
pub const PROFILES_KEY: &str = "vt_patients";

/// Key holding the vital record collection.
pub const RECORDS_KEY: &str = "vt_records";

/// Key holding the family tree document.
pub const TREE_KEY: &str = "genealogy_tree_data_v2";

/// A whole-blob key-value store.
///
/// Implementations must treat a missing key as `Ok(None)`, never as an error.
pub trait KeyValueStore {
    /// Read the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(&self, key: &str, blob: &str) -> Result<()>;

    /// Remove `key`. Returns `true` if something was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<bool>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        (**self).save(key, blob)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}

/// Load and deserialize the document under `key`.
///
/// # Errors
///
/// Returns an error if the store fails or the blob is not valid JSON for `T`.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.load(key)? {
        Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
        None => Ok(None),
    }
}

/// Load a collection, treating an absent key as empty.
///
/// # Errors
///
/// Returns an error if the store fails or the blob is not a JSON array of `T`.
pub fn load_collection<T, S>(store: &S, key: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    Ok(load_json(store, key)?.unwrap_or_default())
}

/// Serialize `value` and write it under `key`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let blob = serde_json::to_string(value)?;
    store.save(key, &blob)
}

/// `SQLite`-backed key-value store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List the stored keys in lexical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (total_keys, total_bytes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv_store",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_keys,
            total_bytes,
            db_size_bytes,
        })
    }
}

impl KeyValueStore for Storage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, blob, Utc::now().to_rfc3339()],
        )?;
        debug!("Saved {} bytes under {}", blob.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of stored keys.
    pub total_keys: i64,
    /// Combined size of all stored blobs in bytes.
    pub total_bytes: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        value: i32,
    }

    #[test]
    fn test_load_missing_key() {
        let storage = create_test_storage();
        assert_eq!(storage.load("nope").unwrap(), None);
    }

    #[test]
    fn test_save_and_load() {
        let storage = create_test_storage();
        storage.save("k", "hello").unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn test_save_overwrites() {
        let storage = create_test_storage();
        storage.save("k", "first").unwrap();
        storage.save("k", "second").unwrap();

        assert_eq!(storage.load("k").unwrap().as_deref(), Some("second"));
        assert_eq!(storage.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_remove() {
        let storage = create_test_storage();
        storage.save("k", "v").unwrap();

        assert!(storage.remove("k").unwrap());
        assert!(!storage.remove("k").unwrap());
        assert_eq!(storage.load("k").unwrap(), None);
    }

    #[test]
    fn test_load_collection_absent_is_empty() {
        let storage = create_test_storage();
        let items: Vec<Item> = load_collection(&storage, RECORDS_KEY).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_collection_json_roundtrip() {
        let storage = create_test_storage();
        let items = vec![
            Item {
                id: "a".to_string(),
                value: 1,
            },
            Item {
                id: "b".to_string(),
                value: 2,
            },
        ];
        save_json(&storage, PROFILES_KEY, &items).unwrap();

        let loaded: Vec<Item> = load_collection(&storage, PROFILES_KEY).unwrap();
        assert_eq!(loaded, items);
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let storage = create_test_storage();
        storage.save(PROFILES_KEY, "{not json").unwrap();

        let result: Result<Vec<Item>> = load_collection(&storage, PROFILES_KEY);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_stats() {
        let storage = create_test_storage();
        storage.save("a", "12345").unwrap();
        storage.save("b", "678").unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_keys, 2);
        assert_eq!(stats.total_bytes, 8);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_empty() {
        let stats = create_test_storage().stats().unwrap();
        assert_eq!(stats.total_keys, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_unicode_blob() {
        let storage = create_test_storage();
        storage.save(TREE_KEY, "{\"label\":\"💍 1960\"}").unwrap();
        assert_eq!(
            storage.load(TREE_KEY).unwrap().as_deref(),
            Some("{\"label\":\"💍 1960\"}")
        );
    }

    #[test]
    fn test_open_creates_parent_dirs_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("vitaltree.db");

        {
            let storage = Storage::open(&db_path).unwrap();
            assert_eq!(storage.path(), db_path);
            storage.save(USER_KEY, "{\"id\":\"a@b.c\"}").unwrap();
        }

        let reopened = Storage::open(&db_path).unwrap();
        assert_eq!(
            reopened.load(USER_KEY).unwrap().as_deref(),
            Some("{\"id\":\"a@b.c\"}")
        );
        assert!(reopened.stats().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn test_borrowed_store_sees_same_data() {
        let storage = create_test_storage();
        let borrowed: &Storage = &storage;
        save_json(&borrowed, PROFILES_KEY, &vec![1, 2, 3]).unwrap();

        let loaded: Vec<i32> = load_collection(&storage, PROFILES_KEY).unwrap();
        assert_eq!(loaded, [1, 2, 3]);
        assert!(borrowed.remove(PROFILES_KEY).unwrap());
    }
}
