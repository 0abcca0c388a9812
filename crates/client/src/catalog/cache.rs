//! Cache types for catalog listings.

use std::sync::Arc;

use crate::config::Language;

use super::types::{Category, Product, ProductFilter};

/// Cache key for catalog listings.
///
/// Listings are localized, so the language is part of every key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories {
        language: Language,
        page: u32,
        size: u32,
    },
    Products {
        language: Language,
        filter: ProductFilter,
    },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Products(Arc<Vec<Product>>),
}
