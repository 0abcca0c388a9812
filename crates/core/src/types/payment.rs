//! Payment method selected at checkout.

use serde::{Deserialize, Serialize};

/// How the customer pays for an order.
///
/// Payment itself happens outside the storefront; the backend only records
/// the customer's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Cash on delivery.
    #[default]
    WithCash,
    /// Card payment.
    WithCard,
}
