//! Cart entry identity.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Variant segment used when a product is added without a variant.
const NO_VARIANT: &str = "no-variant";

/// Errors that can occur when parsing a [`CartKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartKeyError {
    /// No `_` separator between product and variant.
    #[error("cart key is missing the product/variant separator: {0}")]
    MissingSeparator(String),
    /// The product segment is not an integer id.
    #[error("cart key has an invalid product id: {0}")]
    InvalidProductId(String),
}

/// Unique identity of a cart entry: one product in one variant.
///
/// Formatted as `{product_id}_{variant}` with `no-variant` standing in for
/// products without a selected variant. Adding an entry whose key is already
/// in the cart removes it instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CartKey {
    product_id: ProductId,
    variant: Option<String>,
}

impl CartKey {
    /// Build the key for a product and optional variant.
    ///
    /// Blank variants are treated as no variant.
    #[must_use]
    pub fn new(product_id: ProductId, variant: Option<&str>) -> Self {
        let variant = variant
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != NO_VARIANT)
            .map(str::to_owned);
        Self {
            product_id,
            variant,
        }
    }

    /// Product this entry refers to.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Selected variant, if any.
    #[must_use]
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Parse a key in `{product_id}_{variant}` form.
    ///
    /// The variant may itself contain underscores; only the first one
    /// separates the product id.
    ///
    /// # Errors
    ///
    /// Returns an error if the separator is missing or the product id is not
    /// an integer.
    pub fn parse(s: &str) -> Result<Self, CartKeyError> {
        let (product, variant) = s
            .split_once('_')
            .ok_or_else(|| CartKeyError::MissingSeparator(s.to_owned()))?;
        let product_id = product
            .parse::<ProductId>()
            .map_err(|_| CartKeyError::InvalidProductId(s.to_owned()))?;
        Ok(Self::new(product_id, Some(variant)))
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.product_id,
            self.variant.as_deref().unwrap_or(NO_VARIANT)
        )
    }
}

impl std::str::FromStr for CartKey {
    type Err = CartKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CartKey {
    type Error = CartKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CartKey> for String {
    fn from(key: CartKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_with_and_without_variant() {
        let key = CartKey::new(ProductId::new(12), Some("Red"));
        assert_eq!(key.to_string(), "12_Red");

        let key = CartKey::new(ProductId::new(12), None);
        assert_eq!(key.to_string(), "12_no-variant");
        assert_eq!(CartKey::new(ProductId::new(12), Some("  ")), key);
    }

    #[test]
    fn test_parse_keeps_underscores_in_variant() {
        let key = CartKey::parse("7_Navy_Blue").unwrap();
        assert_eq!(key.product_id(), ProductId::new(7));
        assert_eq!(key.variant(), Some("Navy_Blue"));
    }

    #[test]
    fn test_parse_no_variant() {
        let key = CartKey::parse("7_no-variant").unwrap();
        assert_eq!(key.variant(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CartKey::parse("7"),
            Err(CartKeyError::MissingSeparator(_))
        ));
        assert!(matches!(
            CartKey::parse("abc_Red"),
            Err(CartKeyError::InvalidProductId(_))
        ));
    }

    #[test]
    fn test_same_product_different_variant_differs() {
        let red = CartKey::new(ProductId::new(1), Some("Red"));
        let blue = CartKey::new(ProductId::new(1), Some("Blue"));
        assert_ne!(red, blue);
    }
}
