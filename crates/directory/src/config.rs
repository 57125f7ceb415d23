//! Directory client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Base URL of the hosted backend project
//! - `SUPABASE_ANON_KEY` - Public (anon) API key
//!
//! ## Optional
//! - `HAMLET_DATA_DIR` - Where the cache database and device flags live
//!   (default: the platform data directory, under `hamlet/`)
//! - `HAMLET_AI_MODEL` - Model name for AI search (e.g., gemini-2.0-flash);
//!   unset disables AI search
//! - `HAMLET_AI_API_KEY` - API key for the configured model
//! - `HAMLET_ANALYTICS` - `true`/`false`, default `true`; `false` makes all
//!   tracking a no-op

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("No platform data directory available; set HAMLET_DATA_DIR")]
    NoDataDir,
}

/// Directory client configuration.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Where the cache database and device flags live.
    pub data_dir: PathBuf,
    /// Hosted backend configuration.
    pub supabase: SupabaseConfig,
    /// AI search configuration (both fields optional; validated at client
    /// construction, not here, so a missing key is reported as a search
    /// failure rather than a startup failure).
    pub ai: AiConfig,
    /// Whether usage analytics is collected at all.
    pub analytics_enabled: bool,
}

/// Hosted backend configuration.
///
/// Implements `Debug` manually to redact the anon key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project base URL (e.g., <https://abc.supabase.co>).
    pub url: String,
    /// Public (anon) API key.
    pub anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// AI search configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone, Default)]
pub struct AiConfig {
    /// Model name; `None` disables AI search.
    pub model: Option<String>,
    /// API key for the model's backend.
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("model", &self.model)
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl DirectoryConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the anon key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let data_dir = match get_optional_env("HAMLET_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("hamlet"),
        };

        let supabase = SupabaseConfig::from_env()?;
        let ai = AiConfig::from_env();
        let analytics_enabled = match get_env_or_default("HAMLET_ANALYTICS", "true").as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "HAMLET_ANALYTICS".to_string(),
                    format!("expected true/false, got {other}"),
                ));
            }
        };

        Ok(Self {
            data_dir,
            supabase,
            ai,
            analytics_enabled,
        })
    }

    /// Path of the cache database inside the data directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("hamlet.db")
    }
}

impl SupabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = get_required_env("SUPABASE_URL")?;
        url::Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

        Ok(Self {
            url,
            anon_key: get_validated_secret("SUPABASE_ANON_KEY")?,
        })
    }
}

impl AiConfig {
    fn from_env() -> Self {
        Self {
            model: get_optional_env("HAMLET_AI_MODEL"),
            api_key: get_optional_env("HAMLET_AI_API_KEY").map(SecretString::from),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a secret is not an obvious placeholder.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
