//! The sync version descriptor.
//!
//! A cheap two-field fingerprint (record count + newest `updated_at`) stands
//! in for a full content hash when deciding whether the cache is stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The remote side of the staleness comparison.
///
/// Produced by one count query plus one newest-timestamp query; no full
/// payload transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVersion {
    /// Number of business records on the remote.
    pub record_count: i64,
    /// `updated_at` of the most recently modified record, `None` when the
    /// remote table is empty.
    pub last_updated: Option<DateTime<Utc>>,
}

/// The locally persisted version descriptor.
///
/// `last_sync` is local bookkeeping only and never participates in the
/// staleness comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataVersion {
    /// Record count copied from the remote at the last full sync.
    pub record_count: i64,
    /// Newest remote `updated_at` copied at the last full sync.
    pub last_updated: Option<DateTime<Utc>>,
    /// When this device last completed a full sync.
    pub last_sync: DateTime<Utc>,
}

impl DataVersion {
    /// Build a local descriptor from a remote one, stamping `last_sync`.
    #[must_use]
    pub const fn from_remote(remote: RemoteVersion, last_sync: DateTime<Utc>) -> Self {
        Self {
            record_count: remote.record_count,
            last_updated: remote.last_updated,
            last_sync,
        }
    }

    /// Whether this descriptor is equal-enough to the remote one.
    ///
    /// Equal-enough iff `record_count` and `last_updated` both match. This
    /// fingerprint cannot detect a same-count, same-timestamp replacement;
    /// the remote write path always sets `updated_at` on mutation, so that
    /// blind spot is an accepted limitation.
    #[must_use]
    pub fn matches(&self, remote: &RemoteVersion) -> bool {
        self.record_count == remote.record_count && self.last_updated == remote.last_updated
    }
}
