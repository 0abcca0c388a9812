//! Checkout form validation and order request assembly.
//!
//! An [`OrderRequest`] is a snapshot: it copies product ids and quantities
//! out of the cart at the moment it is built, so later cart edits cannot
//! change an order that is already in flight.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::types::{Email, PaymentType, ProductId};

/// Reasons a checkout is rejected before anything is sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The cart has no line items.
    #[error("cart is empty")]
    EmptyCart,

    /// A required form field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A form field has an invalid value.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Form field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Customer, delivery and payment fields entered on the checkout page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    /// First name (required).
    pub first_name: String,
    pub last_name: String,
    /// Contact phone (required).
    pub phone: String,
    /// Optional contact email; validated when present.
    pub email: Option<String>,
    pub city: String,
    /// Delivery service branch.
    pub branch: String,
    pub payment: PaymentType,
    /// Customer wants the lock installed and its software set up.
    pub installation: bool,
    pub comment: String,
    pub promo_code: String,
}

/// One ordered product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Product id (`lockId` on the wire).
    pub lock_id: ProductId,
    /// Quantity ordered.
    pub amount: u32,
}

/// Customer block of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub email: String,
}

/// Delivery and service block of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub city: String,
    pub branch: String,
    pub payment_type: PaymentType,
    pub setup_lock: bool,
    pub install_soft: bool,
    pub comment: String,
}

/// Body of `POST /order/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_lines: Vec<OrderLine>,
    #[serde(rename = "customerDto")]
    pub customer: CustomerDetails,
    #[serde(rename = "orderDetailDto")]
    pub details: OrderDetails,
    pub promo_code: String,
}

impl CheckoutForm {
    /// Check the form on its own, independent of the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for a blank name or phone and
    /// [`ValidationError::InvalidField`] for a malformed email.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.phone.trim().is_empty() {
            return Err(ValidationError::MissingField("phone"));
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            Email::parse(email).map_err(|e| ValidationError::InvalidField {
                field: "email",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

impl OrderRequest {
    /// Build an order from the current cart and the checkout form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCart`] if the cart has no lines, or the
    /// first form validation error.
    pub fn from_cart(cart: &Cart, form: &CheckoutForm) -> Result<Self, ValidationError> {
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        form.validate()?;

        let order_lines = cart
            .items()
            .iter()
            .map(|line| OrderLine {
                lock_id: line.product_id(),
                amount: line.quantity(),
            })
            .collect();

        Ok(Self {
            order_lines,
            customer: CustomerDetails {
                name: form.first_name.trim().to_owned(),
                surname: form.last_name.trim().to_owned(),
                phone: form.phone.trim().to_owned(),
                email: form
                    .email
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_owned(),
            },
            details: OrderDetails {
                city: form.city.clone(),
                branch: form.branch.clone(),
                payment_type: form.payment,
                setup_lock: form.installation,
                install_soft: form.installation,
                comment: form.comment.clone(),
            },
            promo_code: form.promo_code.trim().to_owned(),
        })
    }

    /// Total number of units in the order.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.order_lines
            .iter()
            .map(|line| u64::from(line.amount))
            .sum()
    }
}
