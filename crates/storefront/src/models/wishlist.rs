//! Wishlist entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bbqstyle_core::ProductId;

/// Guest wishlist entry as kept in the local store (`{"id": 12}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: ProductId,
}

/// Wishlist line as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    #[serde(alias = "product_id")]
    pub id: ProductId,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, alias = "image_path")]
    pub image: Option<String>,
}

/// Set of wishlisted products, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist {
    entries: Vec<WishlistEntry>,
}

impl Wishlist {
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Add if absent, remove if present. Returns whether the product is now
    /// wishlisted.
    pub fn toggle(&mut self, id: ProductId) -> bool {
        if self.remove(id) {
            false
        } else {
            self.entries.push(WishlistEntry { id });
            true
        }
    }

    /// Remove `id`. Returns whether it was present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ProductId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
