//! Order submission: validation, success and failure.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use lockshop_client::checkout::submit_order;
use lockshop_client::ClientError;
use lockshop_core::{Cart, OrderId, Price, ProductId, ValidationError};
use lockshop_integration_tests::{
    MockBackend, VALID_REFRESH_TOKEN, cart_product, checkout_form,
};

const ORDER: &str = "/order/add";

fn filled_cart() -> Cart {
    let mut cart = Cart::new();
    cart.add_item(cart_product(1, "Smart Lock X1", 100));
    cart.add_item(cart_product(1, "Smart Lock X1", 100));
    cart.add_item(cart_product(2, "Hotel Card Lock", 50));
    cart
}

#[tokio::test]
async fn test_empty_cart_makes_no_request() {
    let backend = MockBackend::start().await;
    let session = backend.signed_in_session();
    let mut cart = Cart::new();

    let err = submit_order(&session, &mut cart, &checkout_form())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::EmptyCart)
    ));
    assert!(backend.state().requests().is_empty());
}

#[tokio::test]
async fn test_missing_phone_makes_no_request() {
    let backend = MockBackend::start().await;
    let session = backend.signed_in_session();
    let mut cart = filled_cart();
    let mut form = checkout_form();
    form.phone = "  ".to_string();

    let err = submit_order(&session, &mut cart, &form).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingField("phone"))
    ));
    assert!(backend.state().requests().is_empty());
    assert_eq!(cart.len(), 2);
}

#[tokio::test]
async fn test_successful_order_clears_cart() {
    let backend = MockBackend::start().await;
    let session = backend.signed_in_session();
    let mut cart = filled_cart();
    assert_eq!(cart.total(), Price::from_whole(250));

    let confirmation = submit_order(&session, &mut cart, &checkout_form())
        .await
        .expect("order placed");
    assert_eq!(confirmation.order_id, Some(OrderId::new(101)));
    assert_eq!(confirmation.message.as_deref(), Some("Order accepted"));
    assert_eq!(confirmation.unit_count, 3);
    assert!(cart.is_empty());

    let orders = backend.state().orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(
        order["orderLines"],
        serde_json::json!([
            { "lockId": 1, "amount": 2 },
            { "lockId": 2, "amount": 1 }
        ])
    );
    assert_eq!(order["customerDto"]["name"], "Aziz");
    assert_eq!(order["orderDetailDto"]["paymentType"], "WITH_CARD");
    assert_eq!(order["orderDetailDto"]["setupLock"], true);
    assert_eq!(order["promoCode"], "WELCOME");
}

#[tokio::test]
async fn test_rejected_order_keeps_cart() {
    let backend = MockBackend::start().await;
    backend.state().reject_orders(true);
    let session = backend.signed_in_session();
    let mut cart = filled_cart();
    let before = cart.clone();

    let err = submit_order(&session, &mut cart, &checkout_form())
        .await
        .unwrap_err();
    match err {
        ClientError::Server { status, message } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(message, "Promo code expired");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(cart, before);
    assert_eq!(backend.state().calls_to(ORDER), 1);
}

#[tokio::test]
async fn test_order_with_expired_token_is_placed_once() {
    let backend = MockBackend::start().await;
    let session = backend.expired_session(Some(VALID_REFRESH_TOKEN));
    let mut cart = filled_cart();

    submit_order(&session, &mut cart, &checkout_form())
        .await
        .expect("order placed after refresh");

    assert!(cart.is_empty());
    assert_eq!(backend.state().calls_to(ORDER), 2);
    assert_eq!(backend.state().orders().len(), 1);
}

#[tokio::test]
async fn test_failed_refresh_during_checkout_keeps_cart() {
    let backend = MockBackend::start().await;
    let session = backend.expired_session(Some("refresh-revoked"));
    let mut cart = filled_cart();

    let err = submit_order(&session, &mut cart, &checkout_form())
        .await
        .unwrap_err();
    assert!(err.is_auth());
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity(), 2);
    assert!(backend.state().orders().is_empty());
}
