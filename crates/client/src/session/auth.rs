//! Authentication endpoints.
//!
//! These calls bypass the session state machine: sign-in and sign-up need no
//! bearer token, and the refresh call must never trigger another refresh.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use lockshop_core::{Email, UserId};

use crate::error::{AuthError, ClientError};

/// Request body for `/auth/sign-in`.
#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Request body for `/auth/sign-up`.
#[derive(Serialize)]
struct SignUpRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Request body for `/auth/refresh`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response from sign-in, sign-up and refresh.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(alias = "access_token")]
    access_token: String,
    #[serde(default, alias = "refresh_token")]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
}

/// `{ success, data: { token: {..}, roles } }`, as sign-in answers on some
/// backend revisions.
#[derive(Deserialize)]
struct WrappedTokens {
    token: TokenResponse,
    #[serde(default)]
    roles: Vec<String>,
}

/// Either token shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum TokenPayload {
    Flat(TokenResponse),
    Wrapped { data: WrappedTokens },
}

/// Error response from the auth endpoints.
#[derive(Deserialize)]
struct AuthErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// User summary returned alongside tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Tokens issued by the backend.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub user: Option<AuthUser>,
}

impl From<TokenResponse> for IssuedTokens {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(response.access_token),
            refresh_token: response.refresh_token.map(SecretString::from),
            user: response.user,
        }
    }
}

impl From<TokenPayload> for IssuedTokens {
    fn from(payload: TokenPayload) -> Self {
        match payload {
            TokenPayload::Flat(response) => response.into(),
            TokenPayload::Wrapped { data } => {
                let mut issued = Self::from(data.token);
                if issued.user.is_none() && !data.roles.is_empty() {
                    issued.user = Some(AuthUser {
                        roles: data.roles,
                        ..AuthUser::default()
                    });
                }
                issued
            }
        }
    }
}

/// Authenticate with email and password.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the backend rejects the
/// credentials, `ClientError::Network` on transport failure.
#[instrument(skip(client, password), fields(email = %email))]
pub async fn sign_in(
    client: &reqwest::Client,
    url: Url,
    email: &Email,
    password: &SecretString,
) -> Result<IssuedTokens, ClientError> {
    let response = client
        .post(url)
        .json(&SignInRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        })
        .send()
        .await?;

    read_tokens(response).await
}

/// Create an account and sign in.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the backend refuses the
/// registration, `ClientError::Network` on transport failure.
#[instrument(skip(client, password), fields(email = %email))]
pub async fn sign_up(
    client: &reqwest::Client,
    url: Url,
    name: &str,
    email: &Email,
    password: &SecretString,
) -> Result<IssuedTokens, ClientError> {
    let response = client
        .post(url)
        .json(&SignUpRequest {
            name,
            email: email.as_str(),
            password: password.expose_secret(),
        })
        .send()
        .await?;

    read_tokens(response).await
}

/// Exchange a refresh token for a new access token.
///
/// # Errors
///
/// Returns `AuthError::RefreshFailed` if the refresh token is rejected,
/// `ClientError::Network` on transport failure.
#[instrument(skip(client, refresh_token))]
pub async fn refresh_access_token(
    client: &reqwest::Client,
    url: Url,
    refresh_token: &SecretString,
) -> Result<IssuedTokens, ClientError> {
    let response = client
        .post(url)
        .json(&RefreshRequest {
            refresh_token: refresh_token.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        let body: TokenPayload = response.json().await?;
        return Ok(body.into());
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AuthError::RefreshFailed(format!("HTTP {status}: {}", truncate(&error_text))).into())
}

async fn read_tokens(response: reqwest::Response) -> Result<IssuedTokens, ClientError> {
    let status = response.status();

    if status.is_success() {
        let body: TokenPayload = response.json().await?;
        return Ok(body.into());
    }

    if status.is_client_error() {
        let error_response: AuthErrorResponse =
            response.json().await.unwrap_or(AuthErrorResponse {
                error: None,
                message: None,
            });

        let message = error_response
            .message
            .or(error_response.error)
            .unwrap_or_else(|| "Invalid credentials".to_string());

        return Err(AuthError::InvalidCredentials(message).into());
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ClientError::Server {
        status,
        message: truncate(&message),
    })
}

fn truncate(text: &str) -> String {
    text.trim().chars().take(200).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_accepts_camel_and_snake_case() {
        let camel: TokenResponse =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r"}"#).unwrap();
        assert_eq!(camel.access_token, "a");
        assert_eq!(camel.refresh_token.as_deref(), Some("r"));

        let snake: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a2","refresh_token":"r2"}"#).unwrap();
        assert_eq!(snake.access_token, "a2");
        assert_eq!(snake.refresh_token.as_deref(), Some("r2"));

        let bare: TokenResponse = serde_json::from_str(r#"{"accessToken":"a3"}"#).unwrap();
        assert!(bare.refresh_token.is_none());
        assert!(bare.user.is_none());
    }

    #[test]
    fn test_token_response_with_user() {
        let body: TokenResponse = serde_json::from_str(
            r#"{"accessToken":"a","user":{"id":9,"name":"Aziz","roles":["ROLE_USER"]}}"#,
        )
        .unwrap();
        let user = body.user.unwrap();
        assert_eq!(user.id, Some(UserId::new(9)));
        assert_eq!(user.name.as_deref(), Some("Aziz"));
        assert_eq!(user.roles, vec!["ROLE_USER".to_string()]);
    }

    #[test]
    fn test_wrapped_token_payload() {
        let payload: TokenPayload = serde_json::from_str(
            r#"{"success":true,"data":{"token":{"accessToken":"a","refreshToken":"r"},"roles":["ROLE_ADMIN"]}}"#,
        )
        .unwrap();
        let issued = IssuedTokens::from(payload);
        assert_eq!(issued.access_token.expose_secret(), "a");
        assert_eq!(issued.refresh_token.unwrap().expose_secret(), "r");
        assert_eq!(issued.user.unwrap().roles, vec!["ROLE_ADMIN".to_string()]);

        let flat: TokenPayload = serde_json::from_str(r#"{"access_token":"b"}"#).unwrap();
        let issued = IssuedTokens::from(flat);
        assert_eq!(issued.access_token.expose_secret(), "b");
        assert!(issued.user.is_none());
    }

    #[test]
    fn test_refresh_request_wire_name() {
        let json = serde_json::to_value(RefreshRequest {
            refresh_token: "r",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "refreshToken": "r" }));
    }
}
