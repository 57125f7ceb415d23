//! Unified error handling for callers of the library.
//!
//! Only explicitly triggered operations (admin mutations, sign-in, AI
//! search) surface errors at all; background work (sync, tracking,
//! presence) degrades silently and logs instead. `AppError` exists for the
//! surfaced paths so binaries can hold one error type.

use thiserror::Error;

use crate::ai::AiSearchError;
use crate::analytics::AnalyticsError;
use crate::config::ConfigError;
use crate::device::DeviceError;
use crate::remote::RemoteError;
use crate::store::StoreError;

/// Application-level error type for the directory client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration failed to load.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local cache operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Remote service operation failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// AI search failed.
    #[error("AI search error: {0}")]
    Ai(#[from] AiSearchError),

    /// Analytics read failed (write paths never error outward).
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    /// Device identity flags could not be read or written.
    #[error("Device identity error: {0}")]
    Device(#[from] DeviceError),
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
