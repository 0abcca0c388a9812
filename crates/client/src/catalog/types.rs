//! Catalog types as the backend returns them.

use serde::{Deserialize, Serialize};

use lockshop_core::{CartProduct, CategoryId, CommentId, Price, ProductId, ValidationError};

/// Image shown when a product has no photos.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.jpg";

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A lock offered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub lock_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    /// Whether a free gift comes with the lock.
    #[serde(default)]
    pub has_gift: bool,
    /// What the gift is.
    #[serde(default)]
    pub gift: Option<String>,
}

impl Product {
    /// The first photo, or the placeholder image.
    #[must_use]
    pub fn primary_image(&self) -> &str {
        self.photos.first().map_or(PLACEHOLDER_IMAGE, String::as_str)
    }

    /// The gift description, if the lock comes with one.
    #[must_use]
    pub fn gift_label(&self) -> Option<&str> {
        self.gift
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    /// The reference the cart stores when this product is added.
    #[must_use]
    pub fn cart_product(&self) -> CartProduct {
        CartProduct {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image: self.primary_image().to_string(),
            gift: self.gift_label().map(str::to_string),
        }
    }
}

/// A customer review of a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub lock_id: Option<ProductId>,
    #[serde(alias = "text")]
    pub content: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default, alias = "username")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A review to post with `/comment/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub lock_id: ProductId,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl NewComment {
    /// Highest star rating the review form offers.
    pub const MAX_RATING: u8 = 5;

    #[must_use]
    pub fn new(lock_id: ProductId, content: impl Into<String>) -> Self {
        Self {
            lock_id,
            content: content.into(),
            rating: None,
        }
    }

    #[must_use]
    pub const fn rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Trim the text and check the rating.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for blank text,
    /// `ValidationError::InvalidField` for a rating outside `1..=5`.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(ValidationError::MissingField("content"));
        }
        self.content = content.to_string();

        if let Some(rating) = self.rating.filter(|r| !(1..=Self::MAX_RATING).contains(r)) {
            return Err(ValidationError::InvalidField {
                field: "rating",
                reason: format!("{rating} is outside 1..={}", Self::MAX_RATING),
            });
        }
        Ok(self)
    }
}

/// Query for `/lock/get-all-by-filter`.
///
/// `a`, `b` and `c` are the lock body dimensions the filter page offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductFilter {
    pub start_price: Option<u64>,
    pub end_price: Option<u64>,
    pub a: Option<u32>,
    pub b: Option<u32>,
    pub c: Option<u32>,
    pub page: u32,
    pub size: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            start_price: None,
            end_price: None,
            a: None,
            b: None,
            c: None,
            page: 0,
            size: 10,
        }
    }
}

impl ProductFilter {
    /// Restrict to a price range (inclusive, whole so'm).
    #[must_use]
    pub const fn price_range(mut self, start: u64, end: u64) -> Self {
        self.start_price = Some(start);
        self.end_price = Some(end);
        self
    }

    #[must_use]
    pub const fn page(mut self, page: u32, size: u32) -> Self {
        self.page = page;
        self.size = size;
        self
    }
}
