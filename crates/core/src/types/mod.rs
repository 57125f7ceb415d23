//! Core types for Hamlet.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod business;
pub mod category;
pub mod event;
pub mod id;
pub mod version;

pub use business::Business;
pub use category::Category;
pub use event::{AiSearchLog, BusinessInteraction, InteractionKind, PageVisit, PresencePing};
pub use id::*;
pub use version::{DataVersion, RemoteVersion};
