//! Hamlet Directory - local-first client for a village business directory.
//!
//! The library behind the Hamlet surfaces: a persistent local cache in
//! front of a hosted backend, reconciled by a cheap version fingerprint,
//! with best-effort usage analytics and an AI-assisted search on top.
//!
//! # Architecture
//!
//! - [`store`] - SQLite cache of businesses, categories, and metadata
//! - [`sync`] - staleness decision + wholesale refresh, never failing
//!   louder than "serve the cache"
//! - [`remote`] - client for the hosted backend (data, auth, mutations)
//! - [`analytics`] - event batching, presence heartbeat, aggregated views
//! - [`ai`] - natural-language search over the business snapshot
//! - [`device`] - device identifier and display name flags
//!
//! # Startup flow
//!
//! Read the cache optimistically for an instant first paint, then call
//! [`sync::SyncService::smart_sync`] to confirm or replace it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ai;
pub mod analytics;
pub mod config;
pub mod device;
pub mod error;
pub mod remote;
pub mod store;
pub mod sync;

pub use error::{AppError, Result};
