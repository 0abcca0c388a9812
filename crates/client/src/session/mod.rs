//! Authenticated HTTP session.
//!
//! [`SessionClient`] is the only way the rest of the crate talks to the
//! backend. Every request goes through an explicit per-request state machine:
//!
//! ```text
//!            +---------+   2xx / non-401       +------+
//!  start --> | Attempt | --------------------> | Done |
//!            +---------+                       +------+
//!              |     ^
//!  401, first  |     | refreshed (retry once)
//!  attempt and |     |
//!  refresh     v     |
//!  token    +------------+  refresh failed    +--------+
//!  present  | Refreshing | -----------------> | Failed |  (credentials cleared)
//!           +------------+                    +--------+
//! ```
//!
//! A 401 without a refresh token, or a 401 on the retry, fails with
//! [`AuthError`] and leaves the stored credentials alone.
//!
//! # Refresh coalescing
//!
//! Refreshes are serialized by a single async gate. A request that enters
//! `Refreshing` first compares the stored access token with the one its
//! rejected attempt carried: if they differ, another request already
//! refreshed and this one simply retries with the new token. Concurrent 401s
//! therefore cost exactly one call to `/auth/refresh`.

pub mod auth;
mod request;

pub use auth::{AuthUser, IssuedTokens};
pub use request::{ApiEnvelope, ApiRequest};

use std::sync::Arc;

use reqwest::header::{ACCEPT_LANGUAGE, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{Span, debug, error, info, instrument, warn};
use uuid::Uuid;

use lockshop_core::Email;

use crate::config::ClientConfig;
use crate::credentials::{SessionCredentials, TokenStore};
use crate::error::{AuthError, ClientError, Result};

use request::ErrorBody;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const SIGN_IN_PATH: &str = "/auth/sign-in";
const SIGN_UP_PATH: &str = "/auth/sign-up";
const REFRESH_PATH: &str = "/auth/refresh";

/// Where a single logical request currently is.
#[derive(Debug)]
enum RequestState {
    /// Sending with whatever access token is stored.
    Attempt { retried: bool },
    /// The attempt was rejected with 401 while carrying `rejected`.
    Refreshing { rejected: Option<SecretString> },
}

/// HTTP client that attaches and refreshes session credentials.
///
/// Cloning is cheap; clones share the HTTP connection pool, the token store
/// and the refresh gate.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<SessionClientInner>,
}

struct SessionClientInner {
    client: reqwest::Client,
    config: ClientConfig,
    tokens: TokenStore,
    /// Held for the duration of a refresh.
    refresh_gate: Mutex<()>,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("api_base_url", &self.inner.config.api_base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    /// Create a client, persisting credentials as the configuration says.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the credential file cannot be read,
    /// `ClientError::Network` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let tokens = match &config.credentials_path {
            Some(path) => TokenStore::file(path)?,
            None => TokenStore::in_memory(),
        };
        Self::with_token_store(config, tokens)
    }

    /// Create a client around an existing token store.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Network` if the HTTP client cannot be built.
    pub fn with_token_store(config: ClientConfig, tokens: TokenStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(SessionClientInner {
                client,
                config,
                tokens,
                refresh_gate: Mutex::new(()),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The credential store this client reads and writes.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in with email and password and store the issued credentials.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a malformed email,
    /// `AuthError::InvalidCredentials` if the backend rejects the password.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<AuthUser> {
        let email = Email::parse(email)?;
        let url = self.inner.config.endpoint(SIGN_IN_PATH)?;
        let issued = auth::sign_in(&self.inner.client, url, &email, password).await?;

        let user = self.store_issued(issued, None, &email)?;
        info!(email = %email, "Signed in");
        Ok(user)
    }

    /// Register a new account and store the issued credentials.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a blank name or malformed email,
    /// `AuthError::InvalidCredentials` if the backend refuses the account.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthUser> {
        let name = name.trim();
        if name.is_empty() {
            return Err(lockshop_core::ValidationError::MissingField("name").into());
        }
        let email = Email::parse(email)?;
        let url = self.inner.config.endpoint(SIGN_UP_PATH)?;
        let issued = auth::sign_up(&self.inner.client, url, name, &email, password).await?;

        let user = self.store_issued(issued, Some(name), &email)?;
        info!(email = %email, "Signed up");
        Ok(user)
    }

    /// Forget all stored credentials.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the store cannot be written.
    pub fn sign_out(&self) -> Result<()> {
        self.inner.tokens.clear()?;
        info!("Signed out");
        Ok(())
    }

    /// Whether an access token is stored.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the store cannot be read.
    pub fn is_signed_in(&self) -> Result<bool> {
        Ok(self.inner.tokens.is_signed_in()?)
    }

    /// The stored display name of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the store cannot be read.
    pub fn display_name(&self) -> Result<Option<String>> {
        Ok(self.inner.tokens.display_name()?)
    }

    fn store_issued(
        &self,
        issued: IssuedTokens,
        fallback_name: Option<&str>,
        email: &Email,
    ) -> Result<AuthUser> {
        let tokens = &self.inner.tokens;
        tokens.set_credentials(&SessionCredentials::new(
            issued.access_token,
            issued.refresh_token,
        ))?;

        let user = issued.user.unwrap_or_default();
        let name = user
            .name
            .as_deref()
            .or(fallback_name)
            .unwrap_or_else(|| email.as_str());
        tokens.set_display_name(name)?;
        Ok(user)
    }

    // =========================================================================
    // Request execution
    // =========================================================================

    /// Send a request, refreshing the session at most once on 401.
    ///
    /// Returns the response only if its status is 2xx.
    ///
    /// # Errors
    ///
    /// - `ClientError::Auth` if the request stays unauthorized
    /// - `ClientError::Network` on transport failure
    /// - `ClientError::RateLimited`, `ClientError::NotFound` or
    ///   `ClientError::Server` for other non-2xx statuses
    #[instrument(
        skip(self, request),
        fields(method = %request.method, path = %request.path, request_id)
    )]
    pub async fn send(&self, request: &ApiRequest) -> Result<Response> {
        let request_id = Uuid::new_v4();
        Span::current().record("request_id", tracing::field::display(request_id));

        let mut state = RequestState::Attempt { retried: false };
        loop {
            state = match state {
                RequestState::Attempt { retried } => {
                    let token = self.inner.tokens.access_token()?;
                    let response = self.dispatch(request, token.as_ref(), request_id).await?;

                    if response.status() != StatusCode::UNAUTHORIZED {
                        return check_status(response).await;
                    }
                    if retried {
                        warn!("Still unauthorized after token refresh");
                        return Err(AuthError::UnauthorizedAfterRefresh.into());
                    }
                    if self.inner.tokens.refresh_token()?.is_none() {
                        debug!("Unauthorized and no refresh token stored");
                        return Err(AuthError::SessionExpired.into());
                    }
                    RequestState::Refreshing { rejected: token }
                }
                RequestState::Refreshing { rejected } => {
                    self.refresh_after_rejection(rejected.as_ref()).await?;
                    RequestState::Attempt { retried: true }
                }
            };
        }
    }

    /// Send a request and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Everything [`SessionClient::send`] returns, plus `ClientError::Parse`
    /// when the body does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                path = %request.path,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ClientError::Parse(e)
        })
    }

    /// Send a request whose response is an [`ApiEnvelope`].
    ///
    /// An envelope with `success: false` is turned into `ClientError::Server`
    /// carrying the backend's message.
    ///
    /// # Errors
    ///
    /// Everything [`SessionClient::send_json`] returns.
    pub async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<ApiEnvelope<T>> {
        let envelope: ApiEnvelope<T> = self.send_json(request).await?;
        if envelope.success == Some(false) {
            return Err(ClientError::Server {
                status: StatusCode::OK,
                message: envelope
                    .message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            });
        }
        Ok(envelope)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&SecretString>,
        request_id: Uuid,
    ) -> Result<Response> {
        let mut url = self.inner.config.endpoint(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let language = request.language.unwrap_or(self.inner.config.language);
        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), url)
            .header(ACCEPT_LANGUAGE, language.code())
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Make sure the stored access token is newer than `rejected`.
    ///
    /// Calls the refresh endpoint only if no other request has replaced the
    /// rejected token in the meantime. A failed refresh clears all stored
    /// credentials and is never retried.
    async fn refresh_after_rejection(&self, rejected: Option<&SecretString>) -> Result<()> {
        let _gate = self.inner.refresh_gate.lock().await;
        let tokens = &self.inner.tokens;

        if let Some(current) = tokens.access_token()? {
            let superseded =
                rejected.is_none_or(|r| r.expose_secret() != current.expose_secret());
            if superseded {
                debug!("Access token already refreshed by a concurrent request");
                return Ok(());
            }
        }

        let Some(refresh_token) = tokens.refresh_token()? else {
            return Err(AuthError::SessionExpired.into());
        };

        let url = self.inner.config.endpoint(REFRESH_PATH)?;
        match auth::refresh_access_token(&self.inner.client, url, &refresh_token).await {
            Ok(issued) => {
                tokens.set_access_token(&issued.access_token)?;
                if let Some(rotated) = &issued.refresh_token {
                    tokens.set_refresh_token(rotated)?;
                }
                info!("Access token refreshed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, clearing credentials");
                tokens.clear()?;
                let reason = match err {
                    ClientError::Auth(AuthError::RefreshFailed(reason)) => reason,
                    other => other.to_string(),
                };
                Err(AuthError::RefreshFailed(reason).into())
            }
        }
    }
}

/// Pass 2xx responses through and map everything else to a `ClientError`.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ClientError::RateLimited(retry_after));
    }

    let body = response.text().await?;
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| {
            let trimmed: String = body.trim().chars().take(200).collect();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                trimmed
            }
        });

    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(message));
    }

    error!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "Backend returned non-success status"
    );
    Err(ClientError::Server { status, message })
}
