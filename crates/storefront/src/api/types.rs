//! Request and response bodies for the backend.
//!
//! Request bodies borrow from the caller. Response bodies are adapted into
//! the domain models before they leave the `api` module, except for the
//! few small results that have no richer domain counterpart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bbqstyle_core::{OrderId, ProductId, ShipmentStatus};

use crate::models::de::{flexible_bool, flexible_string, flexible_u32};
use crate::models::{Cart, CartItem, ServerAddress, WishlistItem};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct MobileRequest<'a> {
    pub mobile: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyOtpRequest<'a> {
    pub mobile: &'a str,
    pub otp: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub mobile: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartLineRequest<'a> {
    pub product_id: ProductId,
    pub variant_detail: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromoRequest<'a> {
    pub promo_code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OfferUsageRequest<'a> {
    pub offer_code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackOrderRequest<'a> {
    pub tracking_input: &'a str,
}

// =============================================================================
// Responses
// =============================================================================

/// Any envelope whose payload we don't need.
#[derive(Debug, Deserialize)]
pub(crate) struct Ack {}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

/// Account lookup result for a mobile number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MobileAccount {
    #[serde(default, rename = "hasPassword", deserialize_with = "flexible_bool")]
    pub has_password: bool,
}

/// Admin session details. Customer tokens are refused.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddressList {
    #[serde(default)]
    pub addresses: Vec<ServerAddress>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddressCreated {
    #[serde(rename = "addressId", alias = "address_id")]
    pub address_id: bbqstyle_core::AddressId,
}

/// Cart line as the backend joins it with the product tables.
#[derive(Debug, Deserialize)]
pub(crate) struct ServerCartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub mrp: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_u32")]
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "flexible_u32")]
    pub stock: Option<u32>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub variant_detail: Option<String>,
}

impl From<ServerCartLine> for CartItem {
    fn from(line: ServerCartLine) -> Self {
        let mut item = Self::new(
            line.product_id,
            line.title,
            line.price,
            line.variant_detail,
            line.quantity.unwrap_or(1),
        );
        item.mrp = line.mrp;
        item.stock = line.stock;
        item.image = line.image_path;
        item
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerCart {
    #[serde(default)]
    pub cart: Vec<ServerCartLine>,
}

impl From<ServerCart> for Cart {
    fn from(cart: ServerCart) -> Self {
        Self::from_items(cart.cart.into_iter().map(CartItem::from))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WishlistResponse {
    #[serde(default)]
    pub wishlist: Vec<WishlistItem>,
}

/// Discount granted for a promo code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromo {
    pub discount_amount: Decimal,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub offer_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderCreated {
    #[serde(rename = "orderId", alias = "order_id")]
    pub order_id: OrderId,
}

/// Hosted payment page session for an online order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub payment_session_id: String,
    #[serde(default, deserialize_with = "flexible_string")]
    pub order_id: Option<String>,
}

/// Tracking details for an order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    #[serde(default, deserialize_with = "flexible_string")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub status: Option<ShipmentStatus>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub tracking_link: Option<String>,
}

impl TrackingInfo {
    /// Carrier link with a scheme, ready to open.
    #[must_use]
    pub fn tracking_url(&self) -> Option<String> {
        let link = self.tracking_link.as_deref()?.trim();
        if link.is_empty() {
            None
        } else if link.starts_with("http://") || link.starts_with("https://") {
            Some(link.to_owned())
        } else {
            Some(format!("https://{link}"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_cart_adapts() {
        let cart: ServerCart = serde_json::from_value(serde_json::json!({
            "success": true,
            "cart": [{
                "cart_id": 1, "product_id": 12, "title": "Cotton Tee",
                "price": "499.00", "mrp": "799.00", "quantity": 2, "stock": 5,
                "image_path": "tee.jpg", "category_name": "Apparel",
                "collection_name": null, "variant_detail": "Red-M"
            }, {
                "cart_id": 2, "product_id": 4, "title": "Mug",
                "price": 250, "quantity": 1, "variant_detail": null
            }],
            "totalItems": 3,
            "subtotal": 1248
        }))
        .unwrap();
        let cart = Cart::from(cart);
        assert_eq!(cart.len(), 2);
        let tee = cart.items().first().unwrap();
        assert_eq!(tee.key.to_string(), "12_Red-M");
        assert_eq!(tee.stock, Some(5));
        assert_eq!(tee.image.as_deref(), Some("tee.jpg"));
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_tracking_url_gets_scheme() {
        let info: TrackingInfo = serde_json::from_value(serde_json::json!({
            "success": true, "trackingLink": "carrier.example/t/123", "status": "in_transit"
        }))
        .unwrap();
        assert_eq!(
            info.tracking_url().as_deref(),
            Some("https://carrier.example/t/123")
        );
        assert_eq!(info.status, Some(ShipmentStatus::InTransit));
    }

    #[test]
    fn test_request_shapes() {
        let body = serde_json::to_value(CartLineRequest {
            product_id: ProductId::new(12),
            variant_detail: None,
            quantity: Some(2),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"productId": 12, "variantDetail": null, "quantity": 2})
        );

        let body = serde_json::to_value(PromoRequest { promo_code: "SAVE10" }).unwrap();
        assert_eq!(body, serde_json::json!({"promoCode": "SAVE10"}));
    }
}
