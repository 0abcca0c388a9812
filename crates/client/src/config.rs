//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LOCKSHOP_API_BASE_URL` - Backend REST root (e.g. `http://host:8080/api/v1`)
//!
//! ## Optional
//! - `LOCKSHOP_LANGUAGE` - Catalog language sent as `Accept-Language` (default: ru)
//! - `LOCKSHOP_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `LOCKSHOP_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `LOCKSHOP_CREDENTIALS_PATH` - JSON file for persisted credentials; when
//!   unset, credentials live in memory for the lifetime of the process

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_LANGUAGE: &str = "ru";
const DEFAULT_HTTP_TIMEOUT_SECS: &str = "30";
const DEFAULT_CATALOG_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront UI languages supported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    En,
    Uz,
    #[default]
    Ru,
    Ar,
}

impl Language {
    /// The `Accept-Language` header value.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Uz => "uz",
            Self::Ru => "ru",
            Self::Ar => "ar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "uz" => Ok(Self::Uz),
            "ru" => Ok(Self::Ru),
            "ar" => Ok(Self::Ar),
            other => Err(format!("unsupported language '{other}' (expected en, uz, ru or ar)")),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend REST root; endpoint paths are appended to it
    pub api_base_url: Url,
    /// Language for catalog content
    pub language: Language,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
    /// How long catalog listings stay cached
    pub catalog_cache_ttl: Duration,
    /// Where credentials are persisted, if anywhere
    pub credentials_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Build a configuration with defaults for everything but the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_base_url` is not an
    /// absolute http(s) URL.
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url("LOCKSHOP_API_BASE_URL", api_base_url)?,
            language: Language::default(),
            http_timeout: Duration::from_secs(30),
            catalog_cache_ttl: Duration::from_secs(300),
            credentials_path: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("LOCKSHOP_API_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("LOCKSHOP_API_BASE_URL".to_string()))?;
        let api_base_url = parse_base_url("LOCKSHOP_API_BASE_URL", &base_url)?;

        let language = get_or_default(&lookup, "LOCKSHOP_LANGUAGE", DEFAULT_LANGUAGE)
            .parse::<Language>()
            .map_err(|e| ConfigError::InvalidEnvVar("LOCKSHOP_LANGUAGE".to_string(), e))?;

        let http_timeout = parse_secs(&lookup, "LOCKSHOP_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let catalog_cache_ttl = parse_secs(
            &lookup,
            "LOCKSHOP_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?;

        let credentials_path = lookup("LOCKSHOP_CREDENTIALS_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_base_url,
            language,
            http_timeout,
            catalog_cache_ttl,
            credentials_path,
        })
    }

    /// Resolve an endpoint path (e.g. `/auth/refresh`) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the joined URL is malformed.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_base_url.join(path.trim_start_matches('/'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, forcing a trailing slash so `join` appends instead of replacing.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a variable with a default value.
fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Parse a whole number of seconds, rejecting zero.
fn parse_secs<F>(lookup: &F, key: &str, default: &str) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = get_or_default(lookup, key, default)
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_base_url() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "LOCKSHOP_API_BASE_URL"));
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[(
            "LOCKSHOP_API_BASE_URL",
            "http://localhost:8080/api/v1",
        )]))
        .unwrap();

        assert_eq!(config.language, Language::Ru);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert!(config.credentials_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("LOCKSHOP_API_BASE_URL", "https://shop.example.uz/api/v1/"),
            ("LOCKSHOP_LANGUAGE", "UZ"),
            ("LOCKSHOP_HTTP_TIMEOUT_SECS", "5"),
            ("LOCKSHOP_CATALOG_CACHE_TTL_SECS", "60"),
            ("LOCKSHOP_CREDENTIALS_PATH", "/tmp/lockshop.json"),
        ]))
        .unwrap();

        assert_eq!(config.language, Language::Uz);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(60));
        assert_eq!(
            config.credentials_path,
            Some(PathBuf::from("/tmp/lockshop.json"))
        );
    }

    #[test]
    fn test_invalid_values() {
        let base = ("LOCKSHOP_API_BASE_URL", "http://localhost:8080/api/v1");

        assert!(ClientConfig::from_lookup(lookup_from(&[base, ("LOCKSHOP_LANGUAGE", "de")])).is_err());
        assert!(
            ClientConfig::from_lookup(lookup_from(&[base, ("LOCKSHOP_HTTP_TIMEOUT_SECS", "0")]))
                .is_err()
        );
        assert!(
            ClientConfig::from_lookup(lookup_from(&[(
                "LOCKSHOP_API_BASE_URL",
                "ftp://localhost/api"
            )]))
            .is_err()
        );
        assert!(ClientConfig::new("not a url").is_err());
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let config = ClientConfig::new("http://localhost:8080/api/v1").unwrap();
        assert_eq!(
            config.endpoint("/auth/refresh").unwrap().as_str(),
            "http://localhost:8080/api/v1/auth/refresh"
        );
        assert_eq!(
            config.endpoint("comment/get-all-by-lock/4").unwrap().as_str(),
            "http://localhost:8080/api/v1/comment/get-all-by-lock/4"
        );
    }
}
