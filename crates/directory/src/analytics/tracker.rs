//! The facade user actions go through to reach the event batcher.

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use hamlet_core::{AiSearchLog, BusinessId, BusinessInteraction, DeviceId, InteractionKind, PageVisit};

use super::batcher::EventBatcher;

/// Target table names in the analytics store.
pub mod tables {
    pub const PAGE_VISITS: &str = "page_visits";
    pub const BUSINESS_INTERACTIONS: &str = "business_interactions";
    pub const AI_SEARCHES: &str = "ai_search_logs";
    pub const PRESENCE: &str = "presence_pings";
}

/// Builds event payloads and enqueues them, stamped with this device's
/// identifier. All methods are fire-and-forget: nothing here ever fails
/// outward.
#[derive(Clone)]
pub struct Tracker {
    batcher: EventBatcher,
    device_id: DeviceId,
}

impl Tracker {
    /// Create a tracker enqueueing into `batcher` on behalf of `device_id`.
    #[must_use]
    pub const fn new(batcher: EventBatcher, device_id: DeviceId) -> Self {
        Self { batcher, device_id }
    }

    /// Access the underlying batcher (for flush-on-shutdown).
    #[must_use]
    pub const fn batcher(&self) -> &EventBatcher {
        &self.batcher
    }

    /// Record a page visit.
    pub async fn page_visit(&self, page: &str) {
        let event = PageVisit {
            page: page.to_string(),
            device_id: self.device_id.clone(),
            visited_at: Utc::now(),
        };
        self.enqueue(tables::PAGE_VISITS, &event).await;
    }

    /// Record an interaction with a business listing.
    pub async fn business_interaction(&self, business_id: &BusinessId, action: InteractionKind) {
        let event = BusinessInteraction {
            business_id: business_id.clone(),
            action,
            device_id: self.device_id.clone(),
            occurred_at: Utc::now(),
        };
        self.enqueue(tables::BUSINESS_INTERACTIONS, &event).await;
    }

    /// Record the outcome of an AI-assisted search.
    pub async fn ai_search(&self, query: &str, result_count: usize, matched: bool) {
        let event = AiSearchLog {
            query: query.to_string(),
            matched,
            result_count: i64::try_from(result_count).unwrap_or(i64::MAX),
            device_id: self.device_id.clone(),
            searched_at: Utc::now(),
        };
        self.enqueue(tables::AI_SEARCHES, &event).await;
    }

    async fn enqueue<T: Serialize>(&self, table: &'static str, event: &T) {
        match serde_json::to_value(event) {
            Ok(payload) => self.batcher.enqueue(table, payload).await,
            Err(e) => warn!(table, error = %e, "dropping unserializable event"),
        }
    }
}
