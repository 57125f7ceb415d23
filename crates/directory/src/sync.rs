//! Version-based cache reconciliation against the remote source of truth.
//!
//! The cache is read optimistically at startup for an instant first paint;
//! `smart_sync` then compares a two-field fingerprint (record count + newest
//! `updated_at`) against the locally stored descriptor and either confirms
//! the cache or replaces it wholesale. There is no incremental sync: at the
//! dataset sizes involved (tens to low hundreds of records), a full replace
//! is simpler and cheap.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use hamlet_core::{Business, BusinessId, Category, DataVersion};

use crate::remote::{RemoteDirectory, RemoteError};
use crate::store::{Collection, LocalStore, StoreError};

/// Metadata key the version descriptor is persisted under.
pub const DATA_VERSION_KEY: &str = "data_version";

/// What `smart_sync` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Cache confirmed fresh (or sync failed and the cache was kept).
    NoChange,
    /// Cache was replaced wholesale from the remote.
    FullSync,
}

/// The dataset handed back to the caller, with provenance.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub businesses: Vec<Business>,
    pub categories: Vec<Category>,
    /// Whether the data came from the local cache.
    pub from_cache: bool,
    pub action: SyncAction,
}

/// Anything that can interrupt a sync attempt. Internal only: sync failures
/// degrade to the cache and are never surfaced.
#[derive(Debug, Error)]
enum SyncFailure {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates staleness checks, full refreshes, and cache-patching admin
/// mutations.
#[derive(Clone)]
pub struct SyncService {
    store: LocalStore,
    remote: Arc<dyn RemoteDirectory>,
}

impl SyncService {
    /// Create a new sync service over a local store and a remote accessor.
    #[must_use]
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteDirectory>) -> Self {
        Self { store, remote }
    }

    /// Access the underlying local store.
    #[must_use]
    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Decide cheaply whether the cache is stale and, if so, refresh it
    /// wholesale.
    ///
    /// Never fails: any error along the way falls back to whatever the
    /// cache currently holds (possibly nothing), tagged `NoChange`. Stale
    /// or empty data is preferred over a crash.
    #[instrument(skip(self))]
    pub async fn smart_sync(&self) -> SyncOutcome {
        match self.try_sync().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "sync failed, falling back to cached data");
                self.cached_fallback().await
            }
        }
    }

    async fn try_sync(&self) -> Result<SyncOutcome, SyncFailure> {
        let remote_version = self.remote.data_version().await?;
        let local_version: Option<DataVersion> =
            self.store.get_metadata(DATA_VERSION_KEY).await?;

        // Absent local descriptor means first run: always stale.
        if let Some(local) = local_version
            && local.matches(&remote_version)
        {
            debug!(
                record_count = remote_version.record_count,
                "version descriptors match, serving cache"
            );
            let businesses = self.store.get_all(Collection::Businesses).await?;
            let categories = self.store.get_all(Collection::Categories).await?;

            return Ok(SyncOutcome {
                businesses,
                categories,
                from_cache: true,
                action: SyncAction::NoChange,
            });
        }

        let businesses = self.remote.fetch_businesses().await?;
        let categories = self.remote.fetch_categories().await?;

        self.store
            .replace_all(Collection::Businesses, &businesses)
            .await?;
        self.store
            .replace_all(Collection::Categories, &categories)
            .await?;
        self.store
            .set_metadata(
                DATA_VERSION_KEY,
                &DataVersion::from_remote(remote_version, Utc::now()),
            )
            .await?;

        info!(
            businesses = businesses.len(),
            categories = categories.len(),
            "full sync completed"
        );

        Ok(SyncOutcome {
            businesses,
            categories,
            from_cache: false,
            action: SyncAction::FullSync,
        })
    }

    /// Serve whatever the cache holds, swallowing store errors into an
    /// empty result.
    async fn cached_fallback(&self) -> SyncOutcome {
        let businesses = match self.store.get_all(Collection::Businesses).await {
            Ok(businesses) => businesses,
            Err(e) => {
                warn!(error = %e, "cache read failed during fallback");
                Vec::new()
            }
        };
        let categories = match self.store.get_all(Collection::Categories).await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(error = %e, "cache read failed during fallback");
                Vec::new()
            }
        };

        SyncOutcome {
            businesses,
            categories,
            from_cache: true,
            action: SyncAction::NoChange,
        }
    }

    // =========================================================================
    // Admin mutations
    // =========================================================================
    //
    // Unlike sync, these are explicitly triggered and their errors ARE
    // surfaced. On confirmed remote success the cache is patched in place;
    // a failed patch is logged only, since the next full sync repairs it.

    /// Add a business on the remote, then mirror it into the cache.
    ///
    /// # Errors
    ///
    /// Returns the remote error when the mutation fails.
    #[instrument(skip(self, business), fields(id = %business.id))]
    pub async fn add_business(&self, business: &Business) -> Result<Business, RemoteError> {
        let created = self.remote.add_business(business).await?;

        if let Err(e) = self.store.put_one(Collection::Businesses, &created).await {
            warn!(error = %e, "cache patch after add failed");
        }
        Ok(created)
    }

    /// Update a business on the remote, then mirror it into the cache.
    ///
    /// # Errors
    ///
    /// Returns the remote error when the mutation fails.
    #[instrument(skip(self, business), fields(id = %business.id))]
    pub async fn update_business(&self, business: &Business) -> Result<Business, RemoteError> {
        let updated = self.remote.update_business(business).await?;

        if let Err(e) = self.store.put_one(Collection::Businesses, &updated).await {
            warn!(error = %e, "cache patch after update failed");
        }
        Ok(updated)
    }

    /// Delete a business on the remote, then drop it from the cache.
    ///
    /// # Errors
    ///
    /// Returns the remote error when the mutation fails.
    #[instrument(skip(self))]
    pub async fn delete_business(&self, id: &BusinessId) -> Result<(), RemoteError> {
        self.remote.delete_business(id).await?;

        if let Err(e) = self
            .store
            .delete_one(Collection::Businesses, id.as_str())
            .await
        {
            warn!(error = %e, "cache patch after delete failed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use hamlet_core::{CategoryId, RemoteVersion};

    /// Remote stub with canned data and per-accessor call counters.
    #[derive(Default)]
    struct StubRemote {
        version: Option<RemoteVersion>,
        businesses: Vec<Business>,
        categories: Vec<Category>,
        version_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
        fail_mutations: bool,
    }

    #[async_trait]
    impl RemoteDirectory for StubRemote {
        async fn data_version(&self) -> Result<RemoteVersion, RemoteError> {
            self.version_calls.fetch_add(1, Ordering::SeqCst);
            self.version.ok_or(RemoteError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }

        async fn fetch_businesses(&self) -> Result<Vec<Business>, RemoteError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.businesses.clone())
        }

        async fn fetch_categories(&self) -> Result<Vec<Category>, RemoteError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.categories.clone())
        }

        async fn add_business(&self, business: &Business) -> Result<Business, RemoteError> {
            if self.fail_mutations {
                return Err(RemoteError::NotSignedIn);
            }
            Ok(business.clone())
        }

        async fn update_business(&self, business: &Business) -> Result<Business, RemoteError> {
            if self.fail_mutations {
                return Err(RemoteError::NotSignedIn);
            }
            Ok(business.clone())
        }

        async fn delete_business(&self, _id: &BusinessId) -> Result<(), RemoteError> {
            if self.fail_mutations {
                return Err(RemoteError::NotSignedIn);
            }
            Ok(())
        }
    }

    fn business(id: &str) -> Business {
        Business {
            id: BusinessId::new(id),
            category_id: CategoryId::new("c1"),
            shop_name: format!("Shop {id}"),
            owner_name: "Owner".to_string(),
            phone: "123".to_string(),
            address: None,
            hours: None,
            services: vec![],
            home_delivery: false,
            payment_options: vec![],
        }
    }

    fn remote_version(count: i64, last_updated: &str) -> RemoteVersion {
        RemoteVersion {
            record_count: count,
            last_updated: Some(last_updated.parse().unwrap()),
        }
    }

    async fn service(remote: StubRemote) -> (SyncService, Arc<StubRemote>) {
        let store = LocalStore::open_in_memory().await.unwrap();
        let remote = Arc::new(remote);
        (SyncService::new(store, remote.clone()), remote)
    }

    #[tokio::test]
    async fn test_first_run_is_full_sync() {
        let (service, remote) = service(StubRemote {
            version: Some(remote_version(1, "2024-01-01T00:00:00Z")),
            businesses: vec![business("b1")],
            ..StubRemote::default()
        })
        .await;

        let outcome = service.smart_sync().await;

        assert_eq!(outcome.action, SyncAction::FullSync);
        assert!(!outcome.from_cache);
        assert_eq!(outcome.businesses.len(), 1);
        assert_eq!(remote.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_matching_versions_serve_cache_without_fetch() {
        let (service, remote) = service(StubRemote {
            version: Some(remote_version(1, "2024-01-01T00:00:00Z")),
            businesses: vec![business("b1")],
            ..StubRemote::default()
        })
        .await;

        // First sync populates; second must not fetch again.
        service.smart_sync().await;
        let outcome = service.smart_sync().await;

        assert_eq!(outcome.action, SyncAction::NoChange);
        assert!(outcome.from_cache);
        assert_eq!(outcome.businesses.len(), 1);
        assert_eq!(remote.fetch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(remote.version_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_version_fetch_failure_falls_back_to_cache() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store
            .replace_all(Collection::Businesses, &[business("b1")])
            .await
            .unwrap();

        let remote = Arc::new(StubRemote::default()); // version fetch errors
        let service = SyncService::new(store, remote);

        let outcome = service.smart_sync().await;

        assert_eq!(outcome.action, SyncAction::NoChange);
        assert!(outcome.from_cache);
        assert_eq!(outcome.businesses.len(), 1);
    }

    #[tokio::test]
    async fn test_full_sync_persists_remote_descriptor() {
        let version = remote_version(5, "2024-02-01T00:00:00Z");
        let (service, _remote) = service(StubRemote {
            version: Some(version),
            businesses: (1..=5).map(|i| business(&format!("b{i}"))).collect(),
            ..StubRemote::default()
        })
        .await;

        service.smart_sync().await;

        let stored: DataVersion = service
            .store()
            .get_metadata(DATA_VERSION_KEY)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.matches(&version));
    }

    #[tokio::test]
    async fn test_mutation_errors_are_surfaced() {
        let (service, _remote) = service(StubRemote {
            fail_mutations: true,
            ..StubRemote::default()
        })
        .await;

        let result = service.add_business(&business("b1")).await;
        assert!(matches!(result, Err(RemoteError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_mutations_patch_the_cache() {
        let (service, _remote) = service(StubRemote::default()).await;

        service.add_business(&business("b1")).await.unwrap();
        let cached: Vec<Business> = service
            .store()
            .get_all(Collection::Businesses)
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);

        service
            .delete_business(&BusinessId::new("b1"))
            .await
            .unwrap();
        let cached: Vec<Business> = service
            .store()
            .get_all(Collection::Businesses)
            .await
            .unwrap();
        assert!(cached.is_empty());
    }
}
