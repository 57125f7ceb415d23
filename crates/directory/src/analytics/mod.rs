//! Best-effort usage analytics.
//!
//! # Architecture
//!
//! - [`EventBatcher`] buffers events in memory and flushes them in bulk,
//!   by debounce timer, size threshold, or explicit shutdown
//! - [`Tracker`] is the facade user actions go through; it builds payloads
//!   and enqueues them
//! - [`PresenceTracker`] upserts a last-seen heartbeat keyed by device
//! - [`AnalyticsViews`] reads the aggregated views back, behind a short
//!   in-memory TTL cache
//!
//! # Failure philosophy
//!
//! Analytics is non-critical telemetry, not transactional state. Every
//! failure in this module is logged and swallowed: a dropped batch, a lost
//! ping, or a disabled configuration must never surface as an application
//! error or block the primary workflow. When analytics is not configured,
//! enqueue is a complete no-op.

mod batcher;
mod presence;
mod sink;
mod tracker;
mod views;

pub use batcher::{EventBatcher, FLUSH_DELAY, FLUSH_THRESHOLD};
pub use presence::{ACTIVITY_WINDOW, HEARTBEAT_INTERVAL, PresenceState, PresenceTracker};
pub use sink::{EventSink, SupabaseSink};
pub use tracker::{Tracker, tables};
pub use views::{AnalyticsViews, BusinessCount, SearchCount};

use thiserror::Error;

/// Errors that can occur when writing to or reading from the analytics
/// store. Write-side callers log these and move on.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),
}
