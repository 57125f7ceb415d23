//! Aggregated analytics views, consumed read-only by the admin surface.
//!
//! Each view is one REST query over the analytics tables, memoized in an
//! in-memory `moka` cache (60 second TTL) so a busy admin dashboard does
//! not hammer the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::AnalyticsError;
use super::tracker::tables;
use crate::config::SupabaseConfig;

/// How long a computed view stays fresh.
const VIEW_TTL: Duration = Duration::from_secs(60);

/// How far back a presence ping still counts as "live", in seconds.
const LIVE_WINDOW_SECS: i64 = 60;

/// How many recent rows feed the popularity aggregations.
const AGGREGATION_SAMPLE: usize = 500;

/// Cache key for computed views.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum ViewKey {
    PopularSearches,
    PopularBusinesses,
    ConversionRate,
    LiveCount,
}

/// Cached view values.
#[derive(Debug, Clone)]
enum ViewValue {
    Searches(Vec<SearchCount>),
    Businesses(Vec<BusinessCount>),
    Rate(f64),
    Count(i64),
}

/// A search query with how often it was issued recently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCount {
    pub query: String,
    pub count: usize,
}

/// A business with how often it was interacted with recently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessCount {
    pub business_id: String,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    query: String,
}

#[derive(Debug, Deserialize)]
struct BusinessIdRow {
    business_id: String,
}

/// Read-side client for the analytics store.
#[derive(Clone)]
pub struct AnalyticsViews {
    inner: Arc<ViewsInner>,
}

struct ViewsInner {
    client: reqwest::Client,
    rest_url: String,
    cache: Cache<ViewKey, ViewValue>,
}

impl AnalyticsViews {
    /// Create a new view reader from configuration.
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

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(VIEW_TTL)
            .build();

        let base = config.url.trim_end_matches('/');

        Ok(Self {
            inner: Arc::new(ViewsInner {
                client,
                rest_url: format!("{base}/rest/v1"),
                cache,
            }),
        })
    }

    /// The most frequent recent search queries, most popular first.
    ///
    /// # Errors
    ///
    /// Returns an error if the analytics store cannot be read.
    pub async fn popular_searches(&self, limit: usize) -> Result<Vec<SearchCount>, AnalyticsError> {
        if let Some(ViewValue::Searches(cached)) =
            self.inner.cache.get(&ViewKey::PopularSearches).await
        {
            return Ok(truncated(cached, limit));
        }

        let url = format!(
            "{}/{}?select=query&order=searched_at.desc&limit={AGGREGATION_SAMPLE}",
            self.inner.rest_url,
            tables::AI_SEARCHES
        );
        let rows: Vec<QueryRow> = self.fetch(&url).await?;
        let counts = count_by(rows.into_iter().map(|row| row.query), |query, count| {
            SearchCount { query, count }
        });

        self.inner
            .cache
            .insert(ViewKey::PopularSearches, ViewValue::Searches(counts.clone()))
            .await;
        Ok(truncated(counts, limit))
    }

    /// The most interacted-with businesses, most popular first.
    ///
    /// # Errors
    ///
    /// Returns an error if the analytics store cannot be read.
    pub async fn popular_businesses(
        &self,
        limit: usize,
    ) -> Result<Vec<BusinessCount>, AnalyticsError> {
        if let Some(ViewValue::Businesses(cached)) =
            self.inner.cache.get(&ViewKey::PopularBusinesses).await
        {
            return Ok(truncated(cached, limit));
        }

        let url = format!(
            "{}/{}?select=business_id&order=occurred_at.desc&limit={AGGREGATION_SAMPLE}",
            self.inner.rest_url,
            tables::BUSINESS_INTERACTIONS
        );
        let rows: Vec<BusinessIdRow> = self.fetch(&url).await?;
        let counts = count_by(
            rows.into_iter().map(|row| row.business_id),
            |business_id, count| BusinessCount { business_id, count },
        );

        self.inner
            .cache
            .insert(
                ViewKey::PopularBusinesses,
                ViewValue::Businesses(counts.clone()),
            )
            .await;
        Ok(truncated(counts, limit))
    }

    /// Calls per view: how often a listing visit converts into tapping the
    /// contact number. `0.0` when there are no views yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the analytics store cannot be read.
    pub async fn conversion_rate(&self) -> Result<f64, AnalyticsError> {
        if let Some(ViewValue::Rate(cached)) = self.inner.cache.get(&ViewKey::ConversionRate).await
        {
            return Ok(cached);
        }

        let views = self
            .count(tables::BUSINESS_INTERACTIONS, "action=eq.view")
            .await?;
        let calls = self
            .count(tables::BUSINESS_INTERACTIONS, "action=eq.call")
            .await?;

        #[allow(clippy::cast_precision_loss)] // interaction counts stay far below f64 precision
        let rate = if views == 0 {
            0.0
        } else {
            calls as f64 / views as f64
        };

        self.inner
            .cache
            .insert(ViewKey::ConversionRate, ViewValue::Rate(rate))
            .await;
        Ok(rate)
    }

    /// Devices whose presence ping is within the live window.
    ///
    /// # Errors
    ///
    /// Returns an error if the analytics store cannot be read.
    pub async fn live_count(&self) -> Result<i64, AnalyticsError> {
        if let Some(ViewValue::Count(cached)) = self.inner.cache.get(&ViewKey::LiveCount).await {
            return Ok(cached);
        }

        let cutoff = (Utc::now() - chrono::Duration::seconds(LIVE_WINDOW_SECS)).to_rfc3339();
        let filter = format!("last_seen=gte.{}", urlencoding::encode(&cutoff));
        let count = self.count(tables::PRESENCE, &filter).await?;

        self.inner
            .cache
            .insert(ViewKey::LiveCount, ViewValue::Count(count))
            .await;
        Ok(count)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, AnalyticsError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AnalyticsError::Api {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| AnalyticsError::Parse(e.to_string()))
    }

    /// Exact row count via the `Content-Range` header, transferring at most
    /// one row.
    async fn count(&self, table: &str, filter: &str) -> Result<i64, AnalyticsError> {
        let url = format!("{}/{table}?select=id&{filter}", self.inner.rest_url);
        let response = self
            .inner
            .client
            .get(&url)
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(crate::remote::parse_total_count)
            .ok_or_else(|| AnalyticsError::Parse("missing Content-Range header".to_string()))
    }
}

/// Count occurrences, most frequent first (ties keep first-seen order).
fn count_by<I, T, F>(values: I, make: F) -> Vec<T>
where
    I: Iterator<Item = String>,
    F: Fn(String, usize) -> T,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .map(|(value, count)| make(value, count))
        .collect()
}

fn truncated<T>(mut values: Vec<T>, limit: usize) -> Vec<T> {
    values.truncate(limit);
    values
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_count_by_orders_by_frequency() {
        let values = ["milk", "bread", "milk", "eggs", "milk", "bread"]
            .into_iter()
            .map(String::from);
        let counts = count_by(values, |query, count| SearchCount { query, count });

        assert_eq!(
            counts,
            vec![
                SearchCount { query: "milk".to_string(), count: 3 },
                SearchCount { query: "bread".to_string(), count: 2 },
                SearchCount { query: "eggs".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_truncated() {
        let values = vec![1, 2, 3, 4];
        assert_eq!(truncated(values.clone(), 2), vec![1, 2]);
        assert_eq!(truncated(values, 10), vec![1, 2, 3, 4]);
    }
}
