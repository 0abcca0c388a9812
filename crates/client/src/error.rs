//! Unified error handling for the storefront client.
//!
//! Every public operation returns `Result<T, ClientError>`. The variants map
//! onto how the UI should react:
//!
//! | Variant | Reaction |
//! |---|---|
//! | `Validation` | show inline, nothing was sent |
//! | `Auth` | credentials are gone or rejected, redirect to sign-in |
//! | `Network` | transient, let the user retry |
//! | `Server` | show the backend's message verbatim |

use reqwest::StatusCode;
use thiserror::Error;

use lockshop_core::{EmailError, ValidationError};

use crate::credentials::StorageError;

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Sign-in or sign-up was rejected.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The request was rejected with 401 and no refresh was possible.
    #[error("Session expired - sign in again")]
    SessionExpired,

    /// The refresh endpoint rejected the refresh token or could not be reached.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The request was still rejected after a successful refresh.
    #[error("Request unauthorized after token refresh")]
    UnauthorizedAfterRefresh,
}

/// Errors returned by the storefront client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input was rejected locally; no request was made.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Authentication failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The request could not be completed (connection, timeout, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a business failure.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status of the response.
        status: StatusCode,
        /// Message from the backend, unmodified.
        message: String,
    },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body did not have the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Credentials could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Whether the user should be sent back to sign-in.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Whether retrying the same action later can reasonably succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::Server { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

impl From<EmailError> for ClientError {
    fn from(err: EmailError) -> Self {
        Self::Validation(ValidationError::InvalidField {
            field: "email",
            reason: err.to_string(),
        })
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;
