//! Product lookups used to refresh cart lines and build orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bbqstyle_core::ProductId;

use super::de::{flexible_string, flexible_u32};

/// Errors raised while choosing a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    /// A required variant dimension was not chosen.
    #[error("Please select {0}.")]
    Missing(String),
    /// The chosen variant does not exist for this product.
    #[error("{0} is not available for this product")]
    Unknown(String),
}

/// Variant dimension names (`"Color"`, or `["Color", "Size"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantTypes {
    One(String),
    Many(Vec<String>),
}

impl VariantTypes {
    /// Dimension names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Comma-joined form sent with order lines.
    #[must_use]
    pub fn joined(&self) -> String {
        self.names().join(",")
    }
}

/// Per-variant image and stock row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    #[serde(default)]
    pub variant_detail: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default, deserialize_with = "flexible_u32")]
    pub stock: Option<u32>,
}

/// Public product detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(alias = "productId", alias = "id")]
    pub product_id: ProductId,
    #[serde(default)]
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub mrp: Option<Decimal>,
    #[serde(default)]
    pub variant_type: Option<VariantTypes>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
}

impl ProductDetail {
    /// Whether the product is sold in variants.
    #[must_use]
    pub fn has_variants(&self) -> bool {
        self.variant_type
            .as_ref()
            .is_some_and(|t| !t.names().is_empty())
            && self.images.iter().any(|i| i.variant_detail.is_some())
    }

    /// Variant values that have an image/stock row.
    #[must_use]
    pub fn variant_options(&self) -> Vec<String> {
        let mut options: Vec<String> = Vec::new();
        for detail in self.images.iter().filter_map(|i| i.variant_detail.as_deref()) {
            if !options.iter().any(|o| o == detail) {
                options.push(detail.to_owned());
            }
        }
        options
    }

    /// Stock for a variant.
    ///
    /// `None` when the product has no variant rows to consult; a variant
    /// without a row has zero stock.
    #[must_use]
    pub fn stock_for(&self, variant: Option<&str>) -> Option<u32> {
        match variant {
            Some(variant) => Some(
                self.images
                    .iter()
                    .find(|i| i.variant_detail.as_deref() == Some(variant))
                    .and_then(|i| i.stock)
                    .unwrap_or(0),
            ),
            None => None,
        }
    }

    /// Image for a variant, or the first in-stock image without one.
    #[must_use]
    pub fn image_for(&self, variant: Option<&str>) -> Option<&str> {
        match variant {
            Some(variant) => self
                .images
                .iter()
                .find(|i| i.variant_detail.as_deref() == Some(variant))
                .and_then(|i| i.image_path.as_deref()),
            None => self
                .images
                .iter()
                .find(|i| i.stock.unwrap_or(0) > 0)
                .or_else(|| self.images.first())
                .and_then(|i| i.image_path.as_deref()),
        }
    }

    /// Compose a variant value from one choice per dimension.
    ///
    /// Two-dimension products use `{first}-{second}` (e.g., `Red-M`).
    ///
    /// # Errors
    ///
    /// Returns [`VariantError::Missing`] naming the first dimension without a
    /// choice, or [`VariantError::Unknown`] if the composed value has no
    /// stock row.
    pub fn select_variant(&self, choices: &[String]) -> Result<Option<String>, VariantError> {
        let Some(types) = self.variant_type.as_ref().filter(|_| self.has_variants()) else {
            return Ok(None);
        };
        let names = types.names();
        let wanted = names.len().min(2);

        let picked: Vec<&str> = choices
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .take(wanted)
            .collect();
        if let Some(missing) = names.get(picked.len()).filter(|_| picked.len() < wanted) {
            return Err(VariantError::Missing(missing.to_lowercase()));
        }

        let variant = picked.join("-");
        if !self.variant_options().iter().any(|o| *o == variant) {
            return Err(VariantError::Unknown(variant));
        }
        Ok(Some(variant))
    }
}

/// Published product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub review_id: Option<i64>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default, alias = "rating", deserialize_with = "flexible_u32")]
    pub star_rating: Option<u32>,
    #[serde(default)]
    pub review_text: Option<String>,
    #[serde(default, alias = "first_name", deserialize_with = "flexible_string")]
    pub customer_name: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn tee() -> ProductDetail {
        serde_json::from_value(serde_json::json!({
            "product_id": 12,
            "title": "Cotton Tee",
            "price": "499.00",
            "mrp": 799,
            "variant_type": ["Color", "Size"],
            "images": [
                {"variant_detail": "Red-M", "image_path": "tee-red.jpg", "stock": 3},
                {"variant_detail": "Blue-M", "image_path": "tee-blue.jpg", "stock": 0}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_string_and_number_prices() {
        let product = tee();
        assert_eq!(product.price, Decimal::new(499, 0));
        assert_eq!(product.mrp, Some(Decimal::new(799, 0)));
        assert_eq!(product.variant_type.unwrap().joined(), "Color,Size");
    }

    #[test]
    fn test_stock_and_image_lookup() {
        let product = tee();
        assert_eq!(product.stock_for(Some("Red-M")), Some(3));
        assert_eq!(product.stock_for(Some("Green-L")), Some(0));
        assert_eq!(product.stock_for(None), None);
        assert_eq!(product.image_for(Some("Blue-M")), Some("tee-blue.jpg"));
        assert_eq!(product.image_for(None), Some("tee-red.jpg"));
    }

    #[test]
    fn test_select_variant() {
        let product = tee();
        assert_eq!(
            product.select_variant(&["Red".into(), "M".into()]).unwrap(),
            Some("Red-M".to_string())
        );
        assert_eq!(
            product.select_variant(&["Red".into()]),
            Err(VariantError::Missing("size".to_string()))
        );
        assert_eq!(
            product.select_variant(&[]),
            Err(VariantError::Missing("color".to_string()))
        );
        assert!(matches!(
            product.select_variant(&["Green".into(), "M".into()]),
            Err(VariantError::Unknown(_))
        ));
    }

    #[test]
    fn test_plain_product_needs_no_variant() {
        let product: ProductDetail = serde_json::from_value(serde_json::json!({
            "product_id": 3, "title": "Towel", "price": 199
        }))
        .unwrap();
        assert!(!product.has_variants());
        assert_eq!(product.select_variant(&[]).unwrap(), None);
    }
}
