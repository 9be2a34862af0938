//! Cart lines and the guest cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bbqstyle_core::{CartKey, Price, ProductId};

use super::de::flexible_u32;
use super::product::ProductDetail;

/// Errors raised by cart edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// No line with this key.
    #[error("item {0} is not in the cart")]
    ItemNotFound(CartKey),
    /// Quantities start at one.
    #[error("quantity must be at least 1")]
    QuantityBelowOne,
    /// Not enough stock for the requested quantity.
    #[error("Only {available} items available in stock")]
    ExceedsStock { available: u32 },
    /// A line cannot be checked out as-is.
    #[error("Please select variant for \"{title}\" or remove items with zero stock")]
    NotCheckoutReady { title: String },
}

/// Outcome of toggling a product in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartToggle {
    Added,
    Removed,
}

/// A single cart line: one product in one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub key: CartKey,
    pub product_id: ProductId,
    #[serde(default)]
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub variant_detail: Option<String>,
    pub quantity: u32,
    #[serde(default, alias = "image_path")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrp: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "flexible_u32"
    )]
    pub stock: Option<u32>,
    /// Variant values the product offers, filled in by a refresh.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variant_options: Vec<String>,
}

impl CartItem {
    /// Build a line, deriving its key from product and variant.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        title: impl Into<String>,
        price: Decimal,
        variant_detail: Option<String>,
        quantity: u32,
    ) -> Self {
        let key = CartKey::new(product_id, variant_detail.as_deref());
        Self {
            variant_detail: key.variant().map(str::to_owned),
            key,
            product_id,
            title: title.into(),
            price,
            quantity: quantity.max(1),
            image: None,
            mrp: None,
            stock: None,
            variant_options: Vec::new(),
        }
    }

    /// Build a line for `product` in `variant`, taking title, price, image
    /// and stock from the product.
    #[must_use]
    pub fn from_product(product: &ProductDetail, variant: Option<String>, quantity: u32) -> Self {
        let mut item = Self::new(
            product.product_id,
            product.title.clone(),
            product.price,
            variant,
            quantity,
        );
        item.refresh_from(product);
        item
    }

    /// Price of this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::inr(self.price).times(self.quantity)
    }

    /// Update title, price, stock and image from a fresh product lookup,
    /// clamping the quantity to the available stock. A sold-out line keeps
    /// its quantity so it is still there once the variant is restocked.
    pub fn refresh_from(&mut self, product: &ProductDetail) {
        if !product.title.is_empty() {
            self.title.clone_from(&product.title);
        }
        self.price = product.price;
        if product.mrp.is_some() {
            self.mrp = product.mrp;
        }
        self.variant_options = product.variant_options();
        self.stock = product.stock_for(self.variant_detail.as_deref());
        if let Some(image) = product.image_for(self.variant_detail.as_deref()) {
            self.image = Some(image.to_owned());
        }
        if let Some(stock) = self.stock.filter(|stock| *stock > 0) {
            self.quantity = self.quantity.min(stock).max(1);
        }
    }

    /// Whether this line can be ordered as-is.
    #[must_use]
    pub fn is_checkout_ready(&self) -> bool {
        let needs_variant = !self.variant_options.is_empty() && self.variant_detail.is_none();
        !needs_variant && self.stock != Some(0) && self.quantity >= 1
    }
}

/// Ordered collection of cart lines with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Build a cart from lines, collapsing duplicate keys (first wins).
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::default();
        for item in items {
            if !cart.contains(&item.key) {
                cart.items.push(item);
            }
        }
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CartItem> {
        self.items.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &CartKey) -> bool {
        self.items.iter().any(|i| &i.key == key)
    }

    #[must_use]
    pub fn get(&self, key: &CartKey) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.key == key)
    }

    fn position(&self, key: &CartKey) -> Option<usize> {
        self.items.iter().position(|i| &i.key == key)
    }

    /// Add the line if its key is absent, remove it if present.
    pub fn toggle(&mut self, item: CartItem) -> CartToggle {
        if let Some(index) = self.position(&item.key) {
            self.items.remove(index);
            CartToggle::Removed
        } else {
            self.items.push(item);
            CartToggle::Added
        }
    }

    /// Insert the line, or keep the larger quantity if the key exists.
    pub fn upsert(&mut self, item: CartItem) {
        match self.items.iter_mut().find(|i| i.key == item.key) {
            Some(existing) => existing.quantity = existing.quantity.max(item.quantity),
            None => self.items.push(item),
        }
    }

    /// Add the line's units to the cart, summing quantities for an existing
    /// key. The result is clamped to the known stock. Returns the line's new
    /// quantity.
    pub fn add(&mut self, item: CartItem) -> u32 {
        match self.items.iter_mut().find(|i| i.key == item.key) {
            Some(existing) => {
                if item.stock.is_some() {
                    existing.stock = item.stock;
                }
                let wanted = existing.quantity.saturating_add(item.quantity);
                existing.quantity = existing.stock.map_or(wanted, |s| wanted.min(s));
                existing.quantity
            }
            None => {
                let quantity = item.quantity;
                self.items.push(item);
                quantity
            }
        }
    }

    /// Remove the line with `key`.
    pub fn remove(&mut self, key: &CartKey) -> Option<CartItem> {
        self.position(key).map(|index| self.items.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityBelowOne`] for zero,
    /// [`CartError::ExceedsStock`] when more than the known stock is
    /// requested, and [`CartError::ItemNotFound`] for unknown keys.
    pub fn set_quantity(&mut self, key: &CartKey, quantity: u32) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::QuantityBelowOne);
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| &i.key == key)
            .ok_or_else(|| CartError::ItemNotFound(key.clone()))?;
        if let Some(available) = item.stock
            && quantity > available
        {
            return Err(CartError::ExceedsStock { available });
        }
        item.quantity = quantity;
        Ok(())
    }

    /// Move a line to another variant of the same product.
    ///
    /// The line is re-keyed and its quantity resets to one. If the cart
    /// already holds the target variant, the moved line is dropped so keys
    /// stay unique. Returns the line's new key.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] for unknown keys.
    pub fn change_variant(
        &mut self,
        key: &CartKey,
        variant: Option<&str>,
    ) -> Result<CartKey, CartError> {
        let index = self
            .position(key)
            .ok_or_else(|| CartError::ItemNotFound(key.clone()))?;
        let new_key = CartKey::new(key.product_id(), variant);
        if &new_key == key {
            return Ok(new_key);
        }
        if self.contains(&new_key) {
            self.items.remove(index);
            return Ok(new_key);
        }
        if let Some(item) = self.items.get_mut(index) {
            item.variant_detail = new_key.variant().map(str::to_owned);
            item.key = new_key.clone();
            item.quantity = 1;
            item.stock = None;
        }
        Ok(new_key)
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        let amount = self
            .items
            .iter()
            .map(|i| i.line_total().amount)
            .sum::<Decimal>();
        Price::inr(amount)
    }

    /// Total number of units.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check every line can be ordered.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotCheckoutReady`] for the first line that still
    /// needs a variant or has no stock.
    pub fn validate_for_checkout(&self) -> Result<(), CartError> {
        match self.items.iter().find(|i| !i.is_checkout_ready()) {
            Some(item) => Err(CartError::NotCheckoutReady {
                title: item.title.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl IntoIterator for Cart {
    type Item = CartItem;
    type IntoIter = std::vec::IntoIter<CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
