//! Integration tests for the sync reconciler.
//!
//! These drive `SyncService` end to end over an in-memory store and a
//! scriptable remote, covering the staleness decision table and the
//! fall-back-to-cache failure behavior.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use hamlet_core::{Business, DataVersion, RemoteVersion};
use hamlet_directory::store::{Collection, LocalStore};
use hamlet_directory::sync::{DATA_VERSION_KEY, SyncAction, SyncService};

use hamlet_integration_tests::{MockRemote, sample_business, sample_category};

async fn store_with_version(count: i64, last_updated: &str) -> LocalStore {
    let store = LocalStore::open_in_memory().await.expect("store");
    let version = DataVersion {
        record_count: count,
        last_updated: Some(last_updated.parse().expect("timestamp")),
        last_sync: chrono::Utc::now(),
    };
    store
        .set_metadata(DATA_VERSION_KEY, &version)
        .await
        .expect("metadata");
    store
}

// =============================================================================
// Staleness Decision Tests
// =============================================================================

#[tokio::test]
async fn matching_descriptors_serve_cache_with_zero_full_fetches() {
    let store = store_with_version(5, "2024-01-01T00:00:00Z").await;
    let cached: Vec<Business> = (1..=5).map(|i| sample_business(&format!("b{i}"))).collect();
    store
        .replace_all(Collection::Businesses, &cached)
        .await
        .expect("replace");

    let remote = Arc::new(MockRemote::with_version(5, "2024-01-01T00:00:00Z"));
    let service = SyncService::new(store, remote.clone());

    let outcome = service.smart_sync().await;

    assert_eq!(outcome.action, SyncAction::NoChange);
    assert!(outcome.from_cache);
    assert_eq!(outcome.businesses.len(), 5);
    assert_eq!(remote.full_fetches(), 0);
    assert_eq!(remote.version_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn count_difference_triggers_full_sync() {
    // Local {count: 12, 2024-01-01} vs remote {count: 13, 2024-01-02}
    let store = store_with_version(12, "2024-01-01T00:00:00Z").await;

    let remote = Arc::new(MockRemote::with_version(13, "2024-01-02T00:00:00Z"));
    remote.set_businesses((1..=13).map(|i| sample_business(&format!("b{i}"))).collect());
    remote.set_categories(vec![sample_category("c1")]);
    let service = SyncService::new(store, remote.clone());

    let outcome = service.smart_sync().await;

    assert_eq!(outcome.action, SyncAction::FullSync);
    assert!(!outcome.from_cache);
    assert_eq!(outcome.businesses.len(), 13);
    // Exactly one full fetch per collection
    assert_eq!(remote.business_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(remote.category_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn timestamp_difference_alone_triggers_full_sync() {
    let store = store_with_version(12, "2024-01-01T00:00:00Z").await;

    let remote = Arc::new(MockRemote::with_version(12, "2024-01-03T00:00:00Z"));
    remote.set_businesses((1..=12).map(|i| sample_business(&format!("b{i}"))).collect());
    let service = SyncService::new(store, remote);

    let outcome = service.smart_sync().await;
    assert_eq!(outcome.action, SyncAction::FullSync);
}

#[tokio::test]
async fn full_sync_persists_the_remote_descriptor() {
    let store = LocalStore::open_in_memory().await.expect("store");
    let remote = Arc::new(MockRemote::with_version(3, "2024-02-02T00:00:00Z"));
    remote.set_businesses((1..=3).map(|i| sample_business(&format!("b{i}"))).collect());
    let service = SyncService::new(store, remote);

    service.smart_sync().await;

    let stored: DataVersion = service
        .store()
        .get_metadata(DATA_VERSION_KEY)
        .await
        .expect("metadata read")
        .expect("descriptor present");
    let expected = RemoteVersion {
        record_count: 3,
        last_updated: Some("2024-02-02T00:00:00Z".parse().expect("timestamp")),
    };
    assert!(stored.matches(&expected));
}

#[tokio::test]
async fn full_sync_replaces_shrunken_dataset_without_leftovers() {
    let store = store_with_version(3, "2024-01-01T00:00:00Z").await;
    let old: Vec<Business> = (1..=3).map(|i| sample_business(&format!("old{i}"))).collect();
    store
        .replace_all(Collection::Businesses, &old)
        .await
        .expect("replace");

    let remote = Arc::new(MockRemote::with_version(1, "2024-01-05T00:00:00Z"));
    remote.set_businesses(vec![sample_business("new1")]);
    let service = SyncService::new(store, remote);

    let outcome = service.smart_sync().await;
    assert_eq!(outcome.businesses.len(), 1);

    let cached: Vec<Business> = service
        .store()
        .get_all(Collection::Businesses)
        .await
        .expect("read");
    assert_eq!(cached.len(), 1);
    assert_eq!(cached.first().expect("record").id.as_str(), "new1");
}

// =============================================================================
// Failure Fallback Tests
// =============================================================================

#[tokio::test]
async fn version_fetch_failure_falls_back_to_cache_without_panicking() {
    let store = store_with_version(5, "2024-01-01T00:00:00Z").await;
    let cached: Vec<Business> = (1..=5).map(|i| sample_business(&format!("b{i}"))).collect();
    store
        .replace_all(Collection::Businesses, &cached)
        .await
        .expect("replace");

    let remote = Arc::new(MockRemote::with_version(9, "2024-09-09T00:00:00Z"));
    remote.fail_version_fetch.store(true, Ordering::SeqCst);
    let service = SyncService::new(store, remote.clone());

    let outcome = service.smart_sync().await;

    assert_eq!(outcome.action, SyncAction::NoChange);
    assert!(outcome.from_cache);
    assert_eq!(outcome.businesses.len(), 5);
    assert_eq!(remote.full_fetches(), 0);
}

#[tokio::test]
async fn version_fetch_failure_with_empty_cache_yields_empty_result() {
    let store = LocalStore::open_in_memory().await.expect("store");
    let remote = Arc::new(MockRemote::default());
    remote.fail_version_fetch.store(true, Ordering::SeqCst);
    let service = SyncService::new(store, remote);

    let outcome = service.smart_sync().await;

    assert_eq!(outcome.action, SyncAction::NoChange);
    assert!(outcome.from_cache);
    assert!(outcome.businesses.is_empty());
    assert!(outcome.categories.is_empty());
}

// =============================================================================
// Mutation Tests
// =============================================================================

#[tokio::test]
async fn mutations_patch_cache_without_a_full_sync() {
    let store = LocalStore::open_in_memory().await.expect("store");
    let remote = Arc::new(MockRemote::default());
    let service = SyncService::new(store, remote.clone());

    let created = service
        .add_business(&sample_business("b1"))
        .await
        .expect("add");
    assert_eq!(created.id.as_str(), "b1");
    assert_eq!(remote.full_fetches(), 0);

    let cached: Vec<Business> = service
        .store()
        .get_all(Collection::Businesses)
        .await
        .expect("read");
    assert_eq!(cached.len(), 1);

    service.delete_business(&created.id).await.expect("delete");
    let cached: Vec<Business> = service
        .store()
        .get_all(Collection::Businesses)
        .await
        .expect("read");
    assert!(cached.is_empty());
}
