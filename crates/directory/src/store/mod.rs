//! Local cache database operations.
//!
//! # Database: `hamlet.db` (SQLite)
//!
//! Stores cached data only (the remote service is the source of truth for
//! businesses and categories):
//!
//! ## Tables
//!
//! - `businesses` - Cached business records, JSON document per row
//! - `categories` - Cached category records, JSON document per row
//! - `metadata` - Small opaque values, holds the sync version descriptor
//!
//! # Migrations
//!
//! Migrations are stored in `crates/directory/migrations/` and run when the
//! store is opened (also explicitly via `hamlet migrate`).

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use hamlet_core::{Business, Category};

/// Errors that can occur during local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Cached document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The cached record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Businesses,
    Categories,
}

impl Collection {
    const fn table(self) -> &'static str {
        match self {
            Self::Businesses => "businesses",
            Self::Categories => "categories",
        }
    }
}

/// A record that knows its own cache key.
pub trait Keyed {
    /// The identifier the record is stored under.
    fn key(&self) -> &str;
}

impl Keyed for Business {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

impl Keyed for Category {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// Durable, structured, zero-network persistence for cached directory data.
///
/// Cheaply cloneable; clones share the underlying connection pool.
/// Persistence survives process restart; it does not survive an explicit
/// [`LocalStore::clear`].
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (creating if missing) the cache database at `path` and run
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Open an in-memory store. Used by tests and ephemeral sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        // A single connection keeps every operation on the same in-memory
        // database; separate connections would each get their own.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Fetch every cached record in a collection.
    ///
    /// Absence is not an error: an empty collection yields an empty vector.
    /// The local-only `synced_at` column is never part of the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a cached document no longer
    /// deserializes.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, StoreError> {
        let sql = format!("SELECT data FROM {}", collection.table());
        let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|(data,)| serde_json::from_str(&data).map_err(StoreError::from))
            .collect()
    }

    /// Transactionally clear a collection and repopulate it with `records`.
    ///
    /// Used only on full sync. Runs in one transaction, so a concurrent
    /// [`LocalStore::get_all`] observes either the fully-old or fully-new
    /// set, and no stale record survives a sync that legitimately shrank
    /// the dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; the collection is left
    /// unchanged in that case.
    pub async fn replace_all<T>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> Result<(), StoreError>
    where
        T: Serialize + Keyed,
    {
        let synced_at = chrono::Utc::now().to_rfc3339();
        let delete_sql = format!("DELETE FROM {}", collection.table());
        let insert_sql = format!(
            "INSERT INTO {} (id, data, synced_at) VALUES (?1, ?2, ?3)",
            collection.table()
        );

        let mut tx = self.pool.begin().await?;
        sqlx::query(&delete_sql).execute(&mut *tx).await?;

        for record in records {
            let data = serde_json::to_string(record)?;
            sqlx::query(&insert_sql)
                .bind(record.key())
                .bind(data)
                .bind(&synced_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Upsert a single record, used immediately after a confirmed remote
    /// mutation so the cache reflects admin edits without waiting for the
    /// next full sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn put_one<T>(&self, collection: Collection, record: &T) -> Result<(), StoreError>
    where
        T: Serialize + Keyed,
    {
        let sql = format!(
            "INSERT INTO {} (id, data, synced_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, synced_at = excluded.synced_at",
            collection.table()
        );
        let data = serde_json::to_string(record)?;

        sqlx::query(&sql)
            .bind(record.key())
            .bind(data)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Remove a single record by identifier. Removing an absent record is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn delete_one(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", collection.table());

        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    /// Read a metadata value by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value no longer
    /// deserializes as `T`.
    pub async fn get_metadata<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM metadata WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(value,)| serde_json::from_str(&value))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Write a metadata value by key, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn set_metadata<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_string(value)?;

        sqlx::query(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Explicit cache clear: empty every collection and the metadata table.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM businesses").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM metadata").execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hamlet_core::{BusinessId, CategoryId};

    fn business(id: &str, shop_name: &str) -> Business {
        Business {
            id: BusinessId::new(id),
            category_id: CategoryId::new("cat-grocery"),
            shop_name: shop_name.to_string(),
            owner_name: "Owner".to_string(),
            phone: "9876543210".to_string(),
            address: None,
            hours: None,
            services: vec![],
            home_delivery: false,
            payment_options: vec![],
        }
    }

    #[tokio::test]
    async fn test_get_all_on_empty_store() {
        let store = LocalStore::open_in_memory().await.unwrap();

        let businesses: Vec<Business> = store.get_all(Collection::Businesses).await.unwrap();
        assert!(businesses.is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_round_trip() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let records = vec![business("b1", "One"), business("b2", "Two")];

        store
            .replace_all(Collection::Businesses, &records)
            .await
            .unwrap();

        let mut cached: Vec<Business> = store.get_all(Collection::Businesses).await.unwrap();
        cached.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(cached, records);
    }

    #[tokio::test]
    async fn test_replace_all_leaves_no_stale_leftovers() {
        let store = LocalStore::open_in_memory().await.unwrap();

        let initial = vec![business("b1", "One"), business("b2", "Two"), business("b3", "Three")];
        store
            .replace_all(Collection::Businesses, &initial)
            .await
            .unwrap();

        // A legitimately shrinking sync
        let shrunk = vec![business("b2", "Two")];
        store
            .replace_all(Collection::Businesses, &shrunk)
            .await
            .unwrap();

        let cached: Vec<Business> = store.get_all(Collection::Businesses).await.unwrap();
        assert_eq!(cached, shrunk);
    }

    #[tokio::test]
    async fn test_put_one_upserts() {
        let store = LocalStore::open_in_memory().await.unwrap();

        store
            .put_one(Collection::Businesses, &business("b1", "Old Name"))
            .await
            .unwrap();
        store
            .put_one(Collection::Businesses, &business("b1", "New Name"))
            .await
            .unwrap();

        let cached: Vec<Business> = store.get_all(Collection::Businesses).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached.first().unwrap().shop_name, "New Name");
    }

    #[tokio::test]
    async fn test_delete_one() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let records = vec![business("b1", "One"), business("b2", "Two")];
        store
            .replace_all(Collection::Businesses, &records)
            .await
            .unwrap();

        store.delete_one(Collection::Businesses, "b1").await.unwrap();
        // Deleting an absent record is a no-op
        store.delete_one(Collection::Businesses, "b1").await.unwrap();

        let cached: Vec<Business> = store.get_all(Collection::Businesses).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached.first().unwrap().id.as_str(), "b2");
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let store = LocalStore::open_in_memory().await.unwrap();

        assert_eq!(
            store.get_metadata::<i64>("missing").await.unwrap(),
            None
        );

        store.set_metadata("answer", &42_i64).await.unwrap();
        store.set_metadata("answer", &43_i64).await.unwrap();

        assert_eq!(store.get_metadata::<i64>("answer").await.unwrap(), Some(43));
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store
            .replace_all(Collection::Businesses, &[business("b1", "One")])
            .await
            .unwrap();

        let categories: Vec<Category> = store.get_all(Collection::Categories).await.unwrap();
        assert!(categories.is_empty());
    }

    #[tokio::test]
    async fn test_clear_empties_everything() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store
            .replace_all(Collection::Businesses, &[business("b1", "One")])
            .await
            .unwrap();
        store.set_metadata("answer", &1_i64).await.unwrap();

        store.clear().await.unwrap();

        let businesses: Vec<Business> = store.get_all(Collection::Businesses).await.unwrap();
        assert!(businesses.is_empty());
        assert_eq!(store.get_metadata::<i64>("answer").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hamlet.db");

        {
            let store = LocalStore::open(&path).await.unwrap();
            store
                .replace_all(Collection::Businesses, &[business("b1", "One")])
                .await
                .unwrap();
        }

        let store = LocalStore::open(&path).await.unwrap();
        let cached: Vec<Business> = store.get_all(Collection::Businesses).await.unwrap();
        assert_eq!(cached.len(), 1);
    }
}
