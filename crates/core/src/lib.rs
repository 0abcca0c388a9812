//! Lockshop Core - Shared types and client-side state.
//!
//! This crate provides the pieces of the storefront that carry logic but no I/O:
//! - [`types`] - Newtype IDs, prices, emails and payment types
//! - [`cart`] - The shopping cart store (merge-on-add line items, derived total)
//! - [`order`] - Checkout form validation and order request assembly
//! - [`recency`] - Tickets for discarding superseded fetch results
//!
//! # Architecture
//!
//! Nothing here performs network or file access. The `lockshop-client` crate
//! layers HTTP session handling, catalog access and order submission on top
//! of these types.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod recency;
pub mod types;

pub use cart::{Cart, CartLineItem, CartProduct};
pub use order::{CheckoutForm, OrderLine, OrderRequest, ValidationError};
pub use recency::{FetchSequence, FetchTicket};
pub use types::*;
