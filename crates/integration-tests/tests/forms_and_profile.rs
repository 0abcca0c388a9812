//! Contact, wholesale and profile endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use lockshop_client::account::{self, ProfileUpdate};
use lockshop_client::forms::{self, WholesaleApplication};
use lockshop_client::{AuthError, ClientError};
use lockshop_core::{ProductId, ValidationError};
use lockshop_integration_tests::MockBackend;

fn application(amount: u32) -> WholesaleApplication {
    WholesaleApplication {
        name: "Dilshod".to_string(),
        company: "Grand Hotel".to_string(),
        phone: "+998901234567".to_string(),
        lock_id: ProductId::new(1),
        lock_amount: amount,
        custom_logo: true,
        help_setup: true,
    }
}

#[tokio::test]
async fn test_contact_request_round_trip() {
    let backend = MockBackend::start().await;
    let session = backend.session();

    let echoed = forms::submit_contact(&session, " Aziz ", "aziz@example.uz")
        .await
        .unwrap();
    assert_eq!(echoed.name, "Aziz");
    assert_eq!(echoed.email, "aziz@example.uz");
    assert_eq!(backend.state().calls_to("/contact/add"), 1);
}

#[tokio::test]
async fn test_contact_with_bad_email_is_not_sent() {
    let backend = MockBackend::start().await;
    let err = forms::submit_contact(&backend.session(), "Aziz", "aziz@")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(backend.state().requests().is_empty());
}

#[tokio::test]
async fn test_wholesale_application_accepted() {
    let backend = MockBackend::start().await;
    forms::submit_application(&backend.session(), application(40))
        .await
        .unwrap();
    assert_eq!(backend.state().calls_to("/application/add"), 1);
}

#[tokio::test]
async fn test_wholesale_application_refused_by_backend() {
    let backend = MockBackend::start().await;
    let err = forms::submit_application(&backend.session(), application(50_000))
        .await
        .unwrap_err();
    match err {
        ClientError::Server { message, .. } => assert_eq!(message, "Amount too large"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_profile_requires_sign_in() {
    let backend = MockBackend::start().await;
    let err = account::fetch_profile(&backend.session())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Auth(AuthError::SessionExpired)));
    assert!(backend.state().requests().is_empty());
}

#[tokio::test]
async fn test_profile_update_renames_display_name() {
    let backend = MockBackend::start().await;
    let session = backend.signed_in_session();

    account::update_profile(
        &session,
        ProfileUpdate {
            name: Some("Aziz K.".to_string()),
            ..ProfileUpdate::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(session.display_name().unwrap().as_deref(), Some("Aziz K."));
    let requests = backend.state().requests_to("/user/update-profile");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "PUT");
}

#[tokio::test]
async fn test_empty_profile_update_is_rejected() {
    let backend = MockBackend::start().await;
    let err = account::update_profile(
        &backend.signed_in_session(),
        ProfileUpdate {
            name: Some("   ".to_string()),
            ..ProfileUpdate::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingField("profile"))
    ));
    assert!(backend.state().requests().is_empty());
}
