//! Cache types for public catalog lookups.

use bbqstyle_core::ProductId;

use crate::models::{ProductDetail, Review};

/// Cache key for catalog lookups.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Reviews(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<ProductDetail>),
    Reviews(Vec<Review>),
}
