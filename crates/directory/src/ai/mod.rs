//! AI-assisted natural-language search.
//!
//! # Architecture
//!
//! - The visitor's free-text question is sent together with a snapshot of
//!   every business record; no retrieval step, the dataset is small enough
//!   to ship whole
//! - Two interchangeable backends, selected by configured model name
//! - Every failure is classified into a fixed user-facing category
//!   ([`AiSearchError`]); natural-language understanding itself is entirely
//!   the backend's job
//!
//! # Example
//!
//! ```rust,ignore
//! use hamlet_directory::ai::AiSearchClient;
//!
//! let client = AiSearchClient::new(&config.ai)?;
//! let result = client.search("who repairs cycles?", &businesses).await?;
//! println!("{}", result.summary);
//! ```

mod client;
mod error;
mod types;

pub use client::AiSearchClient;
pub use error::AiSearchError;
pub use types::{AiMatch, AiSearchResult};
