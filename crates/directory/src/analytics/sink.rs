//! The flush transport behind the event batcher.
//!
//! Injected as a trait so batching thresholds and presence behavior are
//! deterministic under test without real network calls.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::Value as JsonValue;
use tracing::instrument;

use super::AnalyticsError;
use crate::config::SupabaseConfig;

/// Where flushed event batches land.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Bulk-insert a group of event rows into one target table.
    async fn insert_batch(&self, table: &str, rows: Vec<JsonValue>) -> Result<(), AnalyticsError>;

    /// Upsert a single row, merging on the table's conflict key. Used by
    /// the presence heartbeat (same key, overwritten value).
    async fn upsert(&self, table: &str, row: JsonValue) -> Result<(), AnalyticsError>;
}

/// Production sink: posts JSON row arrays to the hosted analytics tables.
#[derive(Clone)]
pub struct SupabaseSink {
    inner: Arc<SupabaseSinkInner>,
}

struct SupabaseSinkInner {
    client: reqwest::Client,
    rest_url: String,
}

impl SupabaseSink {
    /// Create a new sink from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the anon key contains invalid header characters
    /// or the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, AnalyticsError> {
        let anon_key = config.anon_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key)
                .map_err(|e| AnalyticsError::Parse(format!("invalid anon key for header: {e}")))?,
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {anon_key}"))
                .map_err(|e| AnalyticsError::Parse(format!("invalid anon key for header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base = config.url.trim_end_matches('/');

        Ok(Self {
            inner: Arc::new(SupabaseSinkInner {
                client,
                rest_url: format!("{base}/rest/v1"),
            }),
        })
    }

    async fn post(
        &self,
        table: &str,
        prefer: &'static str,
        body: &JsonValue,
    ) -> Result<(), AnalyticsError> {
        let url = format!("{}/{table}", self.inner.rest_url);
        let response = self
            .inner
            .client
            .post(&url)
            .header("Prefer", prefer)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(AnalyticsError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl EventSink for SupabaseSink {
    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn insert_batch(&self, table: &str, rows: Vec<JsonValue>) -> Result<(), AnalyticsError> {
        self.post(table, "return=minimal", &JsonValue::Array(rows))
            .await
    }

    #[instrument(skip(self, row))]
    async fn upsert(&self, table: &str, row: JsonValue) -> Result<(), AnalyticsError> {
        self.post(
            table,
            "resolution=merge-duplicates,return=minimal",
            &JsonValue::Array(vec![row]),
        )
        .await
    }
}
