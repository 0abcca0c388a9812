//! Sign-in, sign-up and sign-out against the mock backend.

#![allow(clippy::unwrap_used)]

use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use lockshop_client::{AuthError, ClientError, SessionClient};
use lockshop_core::ValidationError;
use lockshop_integration_tests::{MockBackend, VALID_PASSWORD};

fn password(value: &str) -> SecretString {
    SecretString::from(value)
}

#[tokio::test]
async fn test_sign_in_stores_tokens_and_display_name() {
    let backend = MockBackend::start().await;
    let session = backend.session();
    assert!(!session.is_signed_in().unwrap());

    let user = session
        .sign_in(" aziz@example.uz ", &password(VALID_PASSWORD))
        .await
        .expect("sign in");
    assert_eq!(user.name.as_deref(), Some("Aziz"));
    assert_eq!(user.roles, vec!["ROLE_USER".to_string()]);

    let tokens = session.tokens();
    let access = tokens.access_token().unwrap().unwrap();
    assert_eq!(access.expose_secret(), backend.state().valid_access_token());
    assert!(tokens.refresh_token().unwrap().is_some());
    assert!(tokens.issued_at().unwrap().is_some());
    assert_eq!(session.display_name().unwrap().as_deref(), Some("Aziz"));

    let requests = backend.state().requests_to("/auth/sign-in");
    assert_eq!(requests.len(), 1);
    assert!(requests.iter().all(|r| r.authorization.is_none()));
}

#[tokio::test]
async fn test_wrong_password_stores_nothing() {
    let backend = MockBackend::start().await;
    let session = backend.session();

    let err = session
        .sign_in("aziz@example.uz", &password("hunter2"))
        .await
        .unwrap_err();
    match err {
        ClientError::Auth(AuthError::InvalidCredentials(message)) => {
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!session.is_signed_in().unwrap());
    assert!(session.display_name().unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_email_is_rejected_locally() {
    let backend = MockBackend::start().await;
    let session = backend.session();

    let err = session
        .sign_in("not-an-email", &password(VALID_PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::InvalidField { field: "email", .. })
    ));
    assert!(backend.state().requests().is_empty());
}

#[tokio::test]
async fn test_sign_up_uses_entered_name_when_backend_sends_no_user() {
    let backend = MockBackend::start().await;
    let session = backend.session();

    session
        .sign_up("Dilnoza", "dilnoza@example.uz", &password("s3cret"))
        .await
        .expect("sign up");

    assert!(session.is_signed_in().unwrap());
    assert_eq!(session.display_name().unwrap().as_deref(), Some("Dilnoza"));
}

#[tokio::test]
async fn test_sign_up_conflict_is_invalid_credentials() {
    let backend = MockBackend::start().await;
    let session = backend.session();

    let err = session
        .sign_up("Taken", "taken@example.uz", &password("s3cret"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Auth(AuthError::InvalidCredentials(_))
    ));
    assert!(!session.is_signed_in().unwrap());
}

#[tokio::test]
async fn test_sign_up_requires_name() {
    let backend = MockBackend::start().await;
    let err = backend
        .session()
        .sign_up("   ", "dilnoza@example.uz", &password("s3cret"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingField("name"))
    ));
    assert!(backend.state().requests().is_empty());
}

#[tokio::test]
async fn test_sign_out_clears_everything() {
    let backend = MockBackend::start().await;
    let session = backend.session();
    session
        .sign_in("aziz@example.uz", &password(VALID_PASSWORD))
        .await
        .unwrap();

    session.sign_out().unwrap();

    let tokens = session.tokens();
    assert!(tokens.access_token().unwrap().is_none());
    assert!(tokens.refresh_token().unwrap().is_none());
    assert!(tokens.issued_at().unwrap().is_none());
    assert!(session.display_name().unwrap().is_none());
}

#[tokio::test]
async fn test_file_credentials_survive_a_new_client() {
    let backend = MockBackend::start().await;
    let path = std::env::temp_dir().join(format!("lockshop-session-{}.json", Uuid::new_v4()));

    let mut config = backend.config();
    config.credentials_path = Some(path.clone());

    let session = SessionClient::new(config.clone()).unwrap();
    session
        .sign_in("aziz@example.uz", &password(VALID_PASSWORD))
        .await
        .unwrap();
    drop(session);

    let reopened = SessionClient::new(config).unwrap();
    assert!(reopened.is_signed_in().unwrap());
    assert_eq!(reopened.display_name().unwrap().as_deref(), Some("Aziz"));

    let profile = lockshop_client::account::fetch_profile(&reopened)
        .await
        .expect("profile with persisted token");
    assert_eq!(profile.first_name.as_deref(), Some("Aziz"));

    let _ = std::fs::remove_file(path);
}
