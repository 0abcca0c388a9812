//! Core types for the Lockshop storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod payment;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use payment::PaymentType;
pub use price::{Price, PriceError};
