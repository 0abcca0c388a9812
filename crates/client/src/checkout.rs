//! Order submission.
//!
//! The order is validated and snapshotted from the cart before anything is
//! sent. The cart is cleared only after the backend accepts the order; on
//! any failure it is left exactly as it was. Orders are never retried
//! automatically.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use lockshop_core::{Cart, CheckoutForm, OrderId, OrderRequest};

use crate::error::{ClientError, Result};
use crate::session::{ApiRequest, SessionClient};

const ORDER_PATH: &str = "/order/add";

/// What the backend told us about an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    /// Order id, when the backend returns one.
    pub order_id: Option<OrderId>,
    /// Backend message, shown to the customer as is.
    pub message: Option<String>,
    /// Number of units ordered.
    pub unit_count: u64,
}

/// Validate the cart and form, submit the order and clear the cart.
///
/// # Errors
///
/// - `ClientError::Validation` if the cart is empty or a required field is
///   missing; no request is made
/// - `ClientError::Auth` if the session cannot be authenticated
/// - `ClientError::Server` if the backend refuses the order
#[instrument(skip_all, fields(lines = cart.len()))]
pub async fn submit_order(
    session: &SessionClient,
    cart: &mut Cart,
    form: &CheckoutForm,
) -> Result<OrderConfirmation> {
    let order = OrderRequest::from_cart(cart, form)?;
    let request = ApiRequest::post(ORDER_PATH).json(&order)?;

    let response = session.send(&request).await.inspect_err(|e| {
        warn!(error = %e, "Order submission failed, cart kept");
    })?;
    let body = response.text().await?;
    let (order_id, message) = read_confirmation(&body)?;

    cart.clear();
    info!(order_id = ?order_id, units = order.unit_count(), "Order placed");

    Ok(OrderConfirmation {
        order_id,
        message,
        unit_count: order.unit_count(),
    })
}

/// Pull the order id and message out of whatever 2xx body came back.
///
/// Accepts an empty body, a bare id, `{ id }`, `{ orderId }` and any of those
/// wrapped in `{ success, message, data }`. Only an explicit
/// `success: false` counts as a failure.
fn read_confirmation(body: &str) -> Result<(Option<OrderId>, Option<String>)> {
    if body.trim().is_empty() {
        return Ok((None, None));
    }
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok((None, None));
    };

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ClientError::Server {
            status: StatusCode::OK,
            message: message.unwrap_or_else(|| "Order was not accepted".to_string()),
        });
    }

    let payload = value.get("data").unwrap_or(&value);
    let order_id = id_from(payload).or_else(|| id_from(&value));

    Ok((order_id, message))
}

fn id_from(value: &Value) -> Option<OrderId> {
    value
        .as_i64()
        .or_else(|| value.get("orderId").and_then(Value::as_i64))
        .or_else(|| value.get("id").and_then(Value::as_i64))
        .map(OrderId::new)
}
