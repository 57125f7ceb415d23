//! Integration tests for Hamlet.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p hamlet-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `sync_reconciler` - Staleness decisions and full-refresh scenarios
//! - `event_batcher` - Batching thresholds, debounce, and flush isolation
//! - `local_store` - Cache round-trips across the store's public surface
//!
//! This crate also hosts the mock collaborators the scenarios share: a
//! scriptable remote directory and a recording analytics sink. No network
//! and no on-disk database are involved; stores are in-memory SQLite.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use hamlet_core::{Business, BusinessId, Category, CategoryId, RemoteVersion};
use hamlet_directory::analytics::{AnalyticsError, EventSink};
use hamlet_directory::remote::{RemoteDirectory, RemoteError};

/// A scriptable remote: canned version/data, per-accessor call counters,
/// optional failure injection.
#[derive(Default)]
pub struct MockRemote {
    pub version: Mutex<Option<RemoteVersion>>,
    pub businesses: Mutex<Vec<Business>>,
    pub categories: Mutex<Vec<Category>>,
    pub version_calls: AtomicUsize,
    pub business_fetches: AtomicUsize,
    pub category_fetches: AtomicUsize,
    /// When set, `data_version` errors instead of answering.
    pub fail_version_fetch: std::sync::atomic::AtomicBool,
}

impl MockRemote {
    #[must_use]
    pub fn with_version(count: i64, last_updated: &str) -> Self {
        let remote = Self::default();
        *remote.version.lock().expect("lock") = Some(RemoteVersion {
            record_count: count,
            last_updated: Some(last_updated.parse().expect("timestamp")),
        });
        remote
    }

    pub fn set_businesses(&self, businesses: Vec<Business>) {
        *self.businesses.lock().expect("lock") = businesses;
    }

    pub fn set_categories(&self, categories: Vec<Category>) {
        *self.categories.lock().expect("lock") = categories;
    }

    #[must_use]
    pub fn full_fetches(&self) -> usize {
        self.business_fetches.load(Ordering::SeqCst) + self.category_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteDirectory for MockRemote {
    async fn data_version(&self) -> Result<RemoteVersion, RemoteError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_version_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        self.version
            .lock()
            .expect("lock")
            .ok_or(RemoteError::NotFound("no version".to_string()))
    }

    async fn fetch_businesses(&self) -> Result<Vec<Business>, RemoteError> {
        self.business_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.businesses.lock().expect("lock").clone())
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, RemoteError> {
        self.category_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.categories.lock().expect("lock").clone())
    }

    async fn add_business(&self, business: &Business) -> Result<Business, RemoteError> {
        self.businesses.lock().expect("lock").push(business.clone());
        Ok(business.clone())
    }

    async fn update_business(&self, business: &Business) -> Result<Business, RemoteError> {
        Ok(business.clone())
    }

    async fn delete_business(&self, id: &BusinessId) -> Result<(), RemoteError> {
        self.businesses.lock().expect("lock").retain(|b| &b.id != id);
        Ok(())
    }
}

/// An analytics sink that records every batch and upsert it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub batches: Mutex<Vec<(String, Vec<JsonValue>)>>,
    pub upserts: Mutex<Vec<(String, JsonValue)>>,
}

impl RecordingSink {
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.lock().expect("lock").len()
    }

    #[must_use]
    pub fn total_events(&self) -> usize {
        self.batches
            .lock()
            .expect("lock")
            .iter()
            .map(|(_, rows)| rows.len())
            .sum()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn insert_batch(&self, table: &str, rows: Vec<JsonValue>) -> Result<(), AnalyticsError> {
        self.batches
            .lock()
            .expect("lock")
            .push((table.to_string(), rows));
        Ok(())
    }

    async fn upsert(&self, table: &str, row: JsonValue) -> Result<(), AnalyticsError> {
        self.upserts
            .lock()
            .expect("lock")
            .push((table.to_string(), row));
        Ok(())
    }
}

/// A business record with the given id and defaults everywhere else.
#[must_use]
pub fn sample_business(id: &str) -> Business {
    Business {
        id: BusinessId::new(id),
        category_id: CategoryId::new("cat-grocery"),
        shop_name: format!("Shop {id}"),
        owner_name: "Owner".to_string(),
        phone: "9876543210".to_string(),
        address: None,
        hours: None,
        services: vec![],
        home_delivery: false,
        payment_options: vec![],
    }
}

/// A category record with the given id.
#[must_use]
pub fn sample_category(id: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        name: format!("Category {id}"),
        icon: "tag".to_string(),
    }
}
