//! Catalog access.
//!
//! Category and product listings are cached with `moka` for the configured
//! TTL (5 minutes by default). Keys include the language, so switching the
//! storefront language never serves a listing localized for another one.
//!
//! Reviews are not cached: a review a customer just posted must show up on
//! the next fetch.

mod cache;
mod types;

pub use types::{Category, Comment, NewComment, PLACEHOLDER_IMAGE, Product, ProductFilter};

use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, info, instrument};

use lockshop_core::ProductId;

use crate::config::Language;
use crate::error::{AuthError, ClientError, Result};
use crate::session::{ApiRequest, SessionClient};

use cache::{CacheKey, CacheValue};

const CATEGORIES_PATH: &str = "/category/get-all";
const PRODUCTS_PATH: &str = "/lock/get-all-by-filter";
const COMMENTS_PATH: &str = "/comment/get-all-by-lock";
const ADD_COMMENT_PATH: &str = "/comment/add";

/// Page size used when scanning listings for a single product.
const LOOKUP_PAGE_SIZE: u32 = 50;
/// Upper bound on pages scanned by [`CatalogClient::product`].
const LOOKUP_MAX_PAGES: u32 = 20;

/// Read access to categories and products.
///
/// Clones share the cache. [`CatalogClient::with_language`] returns a view
/// in another language over the same cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
    language: Language,
}

struct CatalogClientInner {
    session: SessionClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a catalog client using the session's configured language and
    /// cache TTL.
    #[must_use]
    pub fn new(session: SessionClient) -> Self {
        let config = session.config();
        let language = config.language;
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Self {
            inner: Arc::new(CatalogClientInner { session, cache }),
            language,
        }
    }

    /// The same catalog, localized for `language`.
    #[must_use]
    pub fn with_language(&self, language: Language) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            language,
        }
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// List categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing cannot be parsed.
    #[instrument(skip(self), fields(language = %self.language))]
    pub async fn categories(&self, page: u32, size: u32) -> Result<Arc<Vec<Category>>> {
        let key = CacheKey::Categories {
            language: self.language,
            page,
            size,
        };
        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let request = ApiRequest::get(CATEGORIES_PATH)
            .query("page", page)
            .query("size", size)
            .language(self.language);
        let categories = Arc::new(
            self.inner
                .session
                .send_envelope::<Vec<Category>>(&request)
                .await?
                .data_or_default(),
        );

        self.inner
            .cache
            .insert(key, CacheValue::Categories(Arc::clone(&categories)))
            .await;
        Ok(categories)
    }

    /// List products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing cannot be parsed.
    #[instrument(skip(self), fields(language = %self.language))]
    pub async fn products(&self, filter: &ProductFilter) -> Result<Arc<Vec<Product>>> {
        let key = CacheKey::Products {
            language: self.language,
            filter: *filter,
        };
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let request = ApiRequest::get(PRODUCTS_PATH)
            .query_opt("startPrice", filter.start_price)
            .query_opt("endPrice", filter.end_price)
            .query_opt("a", filter.a)
            .query_opt("b", filter.b)
            .query_opt("c", filter.c)
            .query("page", filter.page)
            .query("size", filter.size)
            .language(self.language);
        let products = Arc::new(
            self.inner
                .session
                .send_envelope::<Vec<Product>>(&request)
                .await?
                .data_or_default(),
        );

        self.inner
            .cache
            .insert(key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// Find a single product.
    ///
    /// The backend has no detail endpoint, so this walks the unfiltered
    /// listing page by page until the id shows up.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if no listing page contains `id`.
    #[instrument(skip(self), fields(language = %self.language))]
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        for page in 0..LOOKUP_MAX_PAGES {
            let filter = ProductFilter::default().page(page, LOOKUP_PAGE_SIZE);
            let products = self.products(&filter).await?;

            if let Some(product) = products.iter().find(|p| p.id == id) {
                return Ok(product.clone());
            }
            if products.len() < LOOKUP_PAGE_SIZE as usize {
                break;
            }
        }

        Err(ClientError::NotFound(format!("product {id}")))
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Reviews posted for a lock, as the backend orders them.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reviews cannot be parsed.
    #[instrument(skip(self), fields(language = %self.language))]
    pub async fn comments(&self, lock_id: ProductId) -> Result<Vec<Comment>> {
        let request =
            ApiRequest::get(format!("{COMMENTS_PATH}/{lock_id}")).language(self.language);
        Ok(self
            .inner
            .session
            .send_envelope::<Vec<Comment>>(&request)
            .await?
            .data_or_default())
    }

    /// Post a review as the signed-in user.
    ///
    /// Returns the stored review when the backend echoes it back.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for blank text or an out-of-range
    /// rating, `AuthError::SessionExpired` without a request when nobody is
    /// signed in, and the session's auth errors if the token cannot be
    /// refreshed.
    #[instrument(skip_all, fields(lock_id = %comment.lock_id))]
    pub async fn submit_comment(&self, comment: NewComment) -> Result<Option<Comment>> {
        let comment = comment.validated()?;
        let session = &self.inner.session;
        if !session.is_signed_in()? {
            return Err(AuthError::SessionExpired.into());
        }

        let request = ApiRequest::post(ADD_COMMENT_PATH).json(&comment)?;
        let stored = session
            .send_envelope::<serde_json::Value>(&request)
            .await?
            .data
            .and_then(|data| serde_json::from_value::<Comment>(data).ok());

        info!("Review posted");
        Ok(stored)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Drop every cached listing, in all languages.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("language", &self.language)
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}
