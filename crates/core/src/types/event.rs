//! Analytics event payloads.
//!
//! These are the row shapes batched into the analytics store. They are
//! best-effort telemetry: queued in memory only, lost without ceremony if a
//! flush fails or the process terminates first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BusinessId, DeviceId};

/// The kind of interaction a visitor had with a business listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Opened the business detail view.
    View,
    /// Tapped the contact number.
    Call,
    /// Shared the listing.
    Share,
}

/// A page-visit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageVisit {
    pub page: String,
    pub device_id: DeviceId,
    pub visited_at: DateTime<Utc>,
}

/// A business-interaction event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInteraction {
    pub business_id: BusinessId,
    pub action: InteractionKind,
    pub device_id: DeviceId,
    pub occurred_at: DateTime<Utc>,
}

/// The outcome of an AI-assisted search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSearchLog {
    pub query: String,
    /// Whether the search produced at least one business match.
    pub matched: bool,
    pub result_count: i64,
    pub device_id: DeviceId,
    pub searched_at: DateTime<Utc>,
}

/// A presence heartbeat, upserted directly (not batched) and keyed by
/// device identifier so repeated pings overwrite rather than accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePing {
    pub device_id: DeviceId,
    pub last_seen: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_kind_wire_format() {
        let json = serde_json::to_string(&InteractionKind::Call).unwrap();
        assert_eq!(json, "\"call\"");

        let back: InteractionKind = serde_json::from_str("\"view\"").unwrap();
        assert_eq!(back, InteractionKind::View);
    }

    #[test]
    fn test_page_visit_fields_are_snake_case() {
        let visit = PageVisit {
            page: "home".to_string(),
            device_id: DeviceId::new("dev-1"),
            visited_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        };

        let value = serde_json::to_value(&visit).unwrap();
        assert_eq!(value["page"], "home");
        assert_eq!(value["device_id"], "dev-1");
        assert!(value.get("visited_at").is_some());
    }

    #[test]
    fn test_presence_ping_round_trip() {
        let ping = PresencePing {
            device_id: DeviceId::new("dev-2"),
            last_seen: "2024-05-01T12:00:00Z".parse().unwrap(),
        };

        let json = serde_json::to_string(&ping).unwrap();
        let back: PresencePing = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ping);
    }
}
