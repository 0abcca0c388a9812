//! Lockshop storefront client.
//!
//! Everything in the storefront that talks to the backend:
//! - [`credentials`] - Token store over pluggable credential storage
//! - [`session`] - Authenticated HTTP client with single-retry token refresh
//! - [`catalog`] - Cached category and product listings, product reviews
//! - [`checkout`] - Order submission from a [`lockshop_core::Cart`]
//! - [`forms`] / [`account`] - Contact, wholesale and profile endpoints
//!
//! # Example
//!
//! ```no_run
//! use lockshop_client::{CatalogClient, ClientConfig, SessionClient};
//! use lockshop_core::Cart;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionClient::new(ClientConfig::from_env()?)?;
//! let catalog = CatalogClient::new(session.clone());
//!
//! let mut cart = Cart::new();
//! if let Some(product) = catalog.products(&Default::default()).await?.first() {
//!     cart.add_item(product.cart_product());
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod credentials;
pub mod error;
pub mod forms;
pub mod session;
pub mod telemetry;

pub use catalog::{CatalogClient, Category, Comment, NewComment, Product, ProductFilter};
pub use checkout::{OrderConfirmation, submit_order};
pub use config::{ClientConfig, ConfigError, Language};
pub use credentials::{CredentialStorage, FileStorage, MemoryStorage, TokenStore};
pub use error::{AuthError, ClientError, Result};
pub use session::{ApiEnvelope, ApiRequest, SessionClient};
