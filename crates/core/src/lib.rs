//! Hamlet Core - Shared types library.
//!
//! This crate provides common types used across all Hamlet components:
//! - `directory` - The local-first directory client library
//! - `cli` - Command-line tools for sync, search, and curation
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, domain records, the sync version descriptor,
//!   and analytics event payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
