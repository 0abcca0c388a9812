//! Client-side shopping cart.
//!
//! The cart is an ordered list of line items, one per product. Adding a
//! product that is already present bumps its quantity instead of creating a
//! second line, and lines keep the position of their first insertion.
//!
//! The cart does no I/O. An application constructs one [`Cart`] per session
//! and hands `&mut Cart` to whatever needs to mutate it (page handlers, the
//! checkout flow); exclusive borrowing makes every mutation atomic.
//!
//! # Quantity policy
//!
//! [`Cart::set_quantity`] clamps anything below 1 up to 1. Removing a line is
//! always an explicit [`Cart::remove_item`] call.

use serde::Serialize;

use crate::types::{Price, ProductId};

/// The product data needed to put something in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartProduct {
    /// Catalog product id.
    pub id: ProductId,
    /// Name shown on the cart line.
    pub name: String,
    /// Price of a single unit.
    pub price: Price,
    /// Image shown on the cart line.
    pub image: String,
    /// Free gift attached to the product, if any.
    pub gift: Option<String>,
}

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    product_id: ProductId,
    display_name: String,
    unit_price: Price,
    quantity: u32,
    image_ref: String,
    gift_label: Option<String>,
}

impl CartLineItem {
    fn new(product: CartProduct) -> Self {
        Self {
            product_id: product.id,
            display_name: product.name,
            unit_price: product.price,
            quantity: 1,
            image_ref: product.image,
            gift_label: product.gift,
        }
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub const fn unit_price(&self) -> Price {
        self.unit_price
    }

    /// Always at least 1.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    #[must_use]
    pub fn image_ref(&self) -> &str {
        &self.image_ref
    }

    #[must_use]
    pub fn gift_label(&self) -> Option<&str> {
        self.gift_label.as_deref()
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add one unit of `product`.
    ///
    /// Increments the existing line for the same product id, otherwise
    /// appends a new line with quantity 1. Returns the line's new quantity.
    pub fn add_item(&mut self, product: CartProduct) -> u32 {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            line.quantity = line.quantity.saturating_add(1);
            return line.quantity;
        }
        self.items.push(CartLineItem::new(product));
        1
    }

    /// Set the quantity of an existing line, clamping values below 1 to 1.
    ///
    /// Unknown product ids are ignored. Returns `true` if a line was updated.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        self.items
            .iter_mut()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity = quantity.max(1))
            .is_some()
    }

    /// Remove the line for `product_id`, returning it if it existed.
    pub fn remove_item(&mut self, product_id: ProductId) -> Option<CartLineItem> {
        self.position(product_id)
            .map(|index| self.items.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of `unit_price × quantity` over all lines.
    ///
    /// A total beyond the decimal range saturates at the largest
    /// representable price.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Lines in display order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.product_id == product_id)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines (the cart badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|line| line.product_id == product_id)
    }
}
