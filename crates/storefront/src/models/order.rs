//! Order summary and the order request body.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bbqstyle_core::{AddressId, PaymentMode, Price, ProductId};

use super::cart::{Cart, CartItem};

/// Running totals shown next to the checkout steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    /// Summary for a cart with no discount.
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        let subtotal = cart.subtotal().amount;
        Self {
            subtotal,
            discount: Decimal::ZERO,
            total: subtotal,
        }
    }

    /// Replace the discount; total becomes `subtotal - discount`.
    ///
    /// The total is floored at zero: a discount larger than the subtotal
    /// gives a free order, and the discount is recorded as sent. A negative
    /// discount counts as none.
    pub fn apply_discount(&mut self, discount: Decimal) {
        self.discount = discount.max(Decimal::ZERO);
        self.total = Price::inr(self.subtotal)
            .saturating_sub(self.discount)
            .amount;
    }

    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::inr(self.total)
    }
}

/// One line of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub variant_type: Option<String>,
    pub variant_detail: Option<String>,
}

impl OrderLine {
    /// Line for a cart item; `variant_type` comes from a product lookup.
    #[must_use]
    pub fn from_cart_item(item: &CartItem, variant_type: Option<String>) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            variant_type,
            variant_detail: item.variant_detail.clone(),
        }
    }
}

/// Body of `POST /api/orders` and `POST /api/create-payment-session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub address_id: AddressId,
    pub payment_mode: PaymentMode,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub items: Vec<OrderLine>,
    pub offer_code: Option<String>,
}

impl OrderDraft {
    #[must_use]
    pub fn new(
        address_id: AddressId,
        payment_mode: PaymentMode,
        summary: &OrderSummary,
        items: Vec<OrderLine>,
        offer_code: Option<String>,
    ) -> Self {
        Self {
            address_id,
            payment_mode,
            subtotal: summary.subtotal,
            discount: summary.discount,
            total_amount: summary.total,
            items,
            offer_code,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        Cart::from_items([
            CartItem::new(ProductId::new(1), "Tee", Decimal::new(500, 0), Some("Red-M".into()), 2),
            CartItem::new(ProductId::new(2), "Mug", Decimal::new(250, 0), None, 1),
        ])
    }

    #[test]
    fn test_discount_updates_total() {
        let mut summary = OrderSummary::for_cart(&cart());
        assert_eq!(summary.subtotal, Decimal::new(1250, 0));
        assert_eq!(summary.total, summary.subtotal);

        summary.apply_discount(Decimal::new(100, 0));
        assert_eq!(summary.total, Decimal::new(1150, 0));

    }

    #[test]
    fn test_total_never_below_zero() {
        let mut summary = OrderSummary::for_cart(&cart());
        summary.apply_discount(Decimal::new(5000, 0));
        assert_eq!(summary.discount, Decimal::new(5000, 0));
        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.total_price().to_string(), "₹0.00");

        summary.apply_discount(Decimal::new(-20, 0));
        assert_eq!(summary.discount, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::new(1250, 0));
    }

    #[test]
    fn test_draft_wire_shape() {
        let cart = cart();
        let mut summary = OrderSummary::for_cart(&cart);
        summary.apply_discount(Decimal::new(50, 0));
        let lines = cart
            .iter()
            .map(|item| {
                let variant_type = item.variant_detail.as_ref().map(|_| "Color,Size".to_owned());
                OrderLine::from_cart_item(item, variant_type)
            })
            .collect();
        let draft = OrderDraft::new(
            AddressId::new(9),
            PaymentMode::Cod,
            &summary,
            lines,
            Some("SAVE50".into()),
        );

        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["addressId"], 9);
        assert_eq!(value["paymentMode"], "COD");
        assert_eq!(value["subtotal"], 1250.0);
        assert_eq!(value["totalAmount"], 1200.0);
        assert_eq!(value["offerCode"], "SAVE50");
        assert_eq!(value["items"][0]["variantType"], "Color,Size");
        assert_eq!(value["items"][0]["variantDetail"], "Red-M");
        assert_eq!(value["items"][1]["variantDetail"], serde_json::Value::Null);
        assert_eq!(value["items"][1]["price"], 250.0);
    }
}
