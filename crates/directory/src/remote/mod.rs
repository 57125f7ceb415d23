//! Remote directory service client (hosted Postgres + auth).
//!
//! # Architecture
//!
//! - Speaks the hosted service's REST interface directly with `reqwest`
//! - The remote is the source of truth - the local store only ever holds
//!   disposable copies
//! - The version descriptor costs one count query plus one
//!   newest-timestamp query, never a full payload transfer
//!
//! # Auth
//!
//! Reads go out under the anon key. Admin mutations require a password
//! sign-in first; the bearer token from the auth endpoint is attached to
//! every subsequent mutation. Protocol details (token issuance, refresh,
//! row-level security) are the hosted service's problem, not this crate's.

pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use hamlet_core::{Business, BusinessId, Category, RemoteVersion};

use crate::config::SupabaseConfig;
use types::{BusinessRow, CategoryRow, ProfileRow, TokenResponse, UpdatedAtRow};

/// Errors that can occur when talking to the remote directory service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limited by the service.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Credentials rejected or token expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),

    /// A mutation was attempted without signing in first.
    #[error("not signed in")]
    NotSignedIn,
}

/// The remote source of truth, as the sync reconciler sees it.
///
/// Split into a lightweight accessor (`data_version`) and heavy accessors
/// (full fetches) so staleness can be decided without transferring data.
/// Injected as a trait so batching thresholds and sync decisions are
/// testable without network calls.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Fetch the lightweight version descriptor.
    async fn data_version(&self) -> Result<RemoteVersion, RemoteError>;

    /// Fetch every business record.
    async fn fetch_businesses(&self) -> Result<Vec<Business>, RemoteError>;

    /// Fetch every category record.
    async fn fetch_categories(&self) -> Result<Vec<Category>, RemoteError>;

    /// Insert a business record.
    async fn add_business(&self, business: &Business) -> Result<Business, RemoteError>;

    /// Update a business record in place.
    async fn update_business(&self, business: &Business) -> Result<Business, RemoteError>;

    /// Delete a business record.
    async fn delete_business(&self, id: &BusinessId) -> Result<(), RemoteError>;
}

/// A signed-in admin session.
#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    user_id: String,
}

/// Client for the hosted directory service.
///
/// Cheaply cloneable via `Arc`; clones share the HTTP connection pool and
/// the signed-in session.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: String,
    auth_url: String,
    session: RwLock<Option<Session>>,
}

impl SupabaseClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the anon key contains invalid header characters
    /// or the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, RemoteError> {
        let anon_key = config.anon_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key)
                .map_err(|e| RemoteError::Parse(format!("invalid anon key for header: {e}")))?,
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {anon_key}"))
                .map_err(|e| RemoteError::Parse(format!("invalid anon key for header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base = config.url.trim_end_matches('/');

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                rest_url: format!("{base}/rest/v1"),
                auth_url: format!("{base}/auth/v1"),
                session: RwLock::new(None),
            }),
        })
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Sign in with email and password, holding the session for subsequent
    /// admin calls.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` on rejected credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), RemoteError> {
        let url = format!("{}/token?grant_type=password", self.inner.auth_url);
        let body = serde_json::json!({ "email": email, "password": password });

        let response = self.inner.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(RemoteError::Unauthorized(
                "invalid email or password".to_string(),
            ));
        }

        let token: TokenResponse = read_json(response).await?;
        *self.inner.session.write().await = Some(Session {
            access_token: token.access_token,
            user_id: token.user.id,
        });

        debug!("signed in");
        Ok(())
    }

    /// Sign out, clearing the held session. The local session is cleared
    /// even if the revocation request fails.
    pub async fn sign_out(&self) {
        let session = self.inner.session.write().await.take();

        if let Some(session) = session {
            let url = format!("{}/logout", self.inner.auth_url);
            let result = self
                .inner
                .client
                .post(&url)
                .bearer_auth(&session.access_token)
                .send()
                .await;
            if let Err(e) = result {
                debug!(error = %e, "sign-out revocation failed");
            }
        }
    }

    /// Whether the signed-in user has the admin role.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a session, or a remote error if the
    /// profile lookup fails.
    pub async fn is_admin(&self) -> Result<bool, RemoteError> {
        let session = self.session().await.ok_or(RemoteError::NotSignedIn)?;

        let url = format!(
            "{}/profiles?select=role&id=eq.{}",
            self.inner.rest_url,
            urlencoding::encode(&session.user_id)
        );
        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        let profiles: Vec<ProfileRow> = read_json(response).await?;
        Ok(profiles
            .into_iter()
            .next()
            .and_then(|p| p.role)
            .is_some_and(|role| role == "admin"))
    }

    async fn session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    async fn require_session(&self) -> Result<Session, RemoteError> {
        self.session().await.ok_or(RemoteError::NotSignedIn)
    }
}

#[async_trait]
impl RemoteDirectory for SupabaseClient {
    #[instrument(skip(self))]
    async fn data_version(&self) -> Result<RemoteVersion, RemoteError> {
        // Exact row count from the Content-Range header; Range: 0-0 keeps
        // the payload to a single row.
        let count_url = format!("{}/businesses?select=id", self.inner.rest_url);
        let response = self
            .inner
            .client
            .get(&count_url)
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await?;
        let response = check_status(response).await?;
        let record_count = response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total_count)
            .ok_or_else(|| RemoteError::Parse("missing Content-Range header".to_string()))?;

        // Newest updated_at; None when the table is empty.
        let newest_url = format!(
            "{}/businesses?select=updated_at&order=updated_at.desc.nullslast&limit=1",
            self.inner.rest_url
        );
        let response = self.inner.client.get(&newest_url).send().await?;
        let rows: Vec<UpdatedAtRow> = read_json(response).await?;
        let last_updated = rows.into_iter().next().and_then(|row| row.updated_at);

        Ok(RemoteVersion {
            record_count,
            last_updated,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_businesses(&self) -> Result<Vec<Business>, RemoteError> {
        let url = format!("{}/businesses?select=*", self.inner.rest_url);
        let response = self.inner.client.get(&url).send().await?;
        let rows: Vec<BusinessRow> = read_json(response).await?;

        Ok(rows.into_iter().map(Business::from).collect())
    }

    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<Category>, RemoteError> {
        let url = format!("{}/categories?select=*", self.inner.rest_url);
        let response = self.inner.client.get(&url).send().await?;
        let rows: Vec<CategoryRow> = read_json(response).await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self, business), fields(id = %business.id))]
    async fn add_business(&self, business: &Business) -> Result<Business, RemoteError> {
        let session = self.require_session().await?;
        let row = BusinessRow::for_write(business, Utc::now());

        let url = format!("{}/businesses", self.inner.rest_url);
        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(&session.access_token)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        let rows: Vec<BusinessRow> = read_json(response).await?;
        rows.into_iter()
            .next()
            .map(Business::from)
            .ok_or_else(|| RemoteError::Parse("insert returned no representation".to_string()))
    }

    #[instrument(skip(self, business), fields(id = %business.id))]
    async fn update_business(&self, business: &Business) -> Result<Business, RemoteError> {
        let session = self.require_session().await?;
        let row = BusinessRow::for_write(business, Utc::now());

        let url = format!(
            "{}/businesses?id=eq.{}",
            self.inner.rest_url,
            urlencoding::encode(business.id.as_str())
        );
        let response = self
            .inner
            .client
            .patch(&url)
            .bearer_auth(&session.access_token)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        let rows: Vec<BusinessRow> = read_json(response).await?;
        rows.into_iter()
            .next()
            .map(Business::from)
            .ok_or_else(|| RemoteError::NotFound(business.id.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete_business(&self, id: &BusinessId) -> Result<(), RemoteError> {
        let session = self.require_session().await?;

        let url = format!(
            "{}/businesses?id=eq.{}",
            self.inner.rest_url,
            urlencoding::encode(id.as_str())
        );
        let response = self
            .inner
            .client
            .delete(&url)
            .bearer_auth(&session.access_token)
            .header("Prefer", "return=minimal")
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

// =============================================================================
// Response handling
// =============================================================================

/// Classify a non-success response, consuming it for the error body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return Err(RemoteError::RateLimited(retry_after));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RemoteError::Unauthorized(
            "token rejected by the service".to_string(),
        ));
    }

    let message = response.text().await.unwrap_or_default();
    error!(
        status = %status,
        body = %message.chars().take(500).collect::<String>(),
        "remote service returned non-success status"
    );

    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(message));
    }

    Err(RemoteError::Api {
        status: status.as_u16(),
        message: message.chars().take(200).collect(),
    })
}

/// Check the status, then parse the body as JSON with a logged body on
/// parse failure.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    let response = check_status(response).await?;
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "failed to parse remote response"
        );
        RemoteError::Parse(e.to_string())
    })
}

/// Parse the total from a `Content-Range` header value like `0-0/57` or
/// `*/0`.
pub(crate) fn parse_total_count(value: &str) -> Option<i64> {
    value.split('/').nth(1)?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total_count() {
        assert_eq!(parse_total_count("0-0/57"), Some(57));
        assert_eq!(parse_total_count("*/0"), Some(0));
        assert_eq!(parse_total_count("0-24/3573"), Some(3573));
        assert_eq!(parse_total_count("garbage"), None);
        assert_eq!(parse_total_count("0-0/*"), None);
    }

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::RateLimited(30);
        assert_eq!(err.to_string(), "rate limited, retry after 30 seconds");

        let err = RemoteError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error (500): boom");
    }

    #[test]
    fn test_supabase_client_is_clone_send_sync() {
        fn assert_clone<T: Clone>() {}
        fn assert_send_sync<T: Send + Sync>() {}
        assert_clone::<SupabaseClient>();
        assert_send_sync::<SupabaseClient>();
    }
}
