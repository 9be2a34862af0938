//! Cart operations.
//!
//! Guests keep their cart in the local store. Once a token is loaded the
//! backend cart is the source of truth and every operation goes to the API;
//! [`CartService::sync_on_login`] moves a guest cart across at sign-in.

use tracing::{info, instrument, warn};

use bbqstyle_core::{CartKey, ProductId};

use crate::api::ApiError;
use crate::error::{AppError, Result};
use crate::models::{Cart, CartError, CartItem, CartToggle, VariantError};
use crate::state::Storefront;
use crate::store::keys;

/// Outcome of pushing guest entries to the account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries added to the account.
    pub pushed: usize,
    /// Entries already on the account whose quantity was raised.
    pub merged: usize,
    /// Entries already on the account with nothing to change.
    pub unchanged: usize,
    /// Entries that could not be pushed and stay local.
    pub failed: usize,
}

impl SyncReport {
    /// Whether every local entry reached the account.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Nothing was there to sync.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pushed + self.merged + self.unchanged + self.failed == 0
    }
}

/// Cart service over the local store or the backend.
pub struct CartService<'a> {
    state: &'a Storefront,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(state: &'a Storefront) -> Self {
        Self { state }
    }

    fn server_backed(&self) -> bool {
        self.state.is_authenticated()
    }

    /// The guest cart in the local store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn local(&self) -> Result<Cart> {
        Ok(self.state.storage().load_or_default(keys::CART)?)
    }

    fn save_local(&self, cart: &Cart) -> Result<()> {
        if cart.is_empty() {
            self.state.storage().remove(keys::CART)?;
        } else {
            self.state.storage().save_json(keys::CART, cart)?;
        }
        Ok(())
    }

    /// The current cart: the account's when signed in, the guest's otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the store cannot be read.
    pub async fn load(&self) -> Result<Cart> {
        if self.server_backed() {
            Ok(self.state.api().cart().await?)
        } else {
            self.local()
        }
    }

    /// Build a cart line for a product, checking the variant and stock.
    ///
    /// # Errors
    ///
    /// Returns a variant error when a variant product is added without a
    /// known variant, and [`CartError::ExceedsStock`] when it is sold out.
    #[instrument(skip(self))]
    pub async fn item_for(
        &self,
        product_id: ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<CartItem> {
        let product = self.state.api().product(product_id).await?;
        let variant = variant.map(str::trim).filter(|v| !v.is_empty());

        if product.has_variants() {
            let Some(variant) = variant else {
                let kind = product
                    .variant_type
                    .as_ref()
                    .and_then(|t| t.names().first().map(|n| n.to_lowercase()))
                    .unwrap_or_else(|| "variant".to_owned());
                return Err(VariantError::Missing(kind).into());
            };
            if !product.variant_options().iter().any(|o| o == variant) {
                return Err(VariantError::Unknown(variant.to_owned()).into());
            }
        }

        let item = CartItem::from_product(&product, variant.map(str::to_owned), quantity);
        if item.stock == Some(0) {
            return Err(CartError::ExceedsStock { available: 0 }.into());
        }
        Ok(item)
    }

    /// Add the line if absent, remove it if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the store rejects the change.
    #[instrument(skip(self, item), fields(key = %item.key))]
    pub async fn toggle(&self, item: CartItem) -> Result<CartToggle> {
        if self.server_backed() {
            let api = self.state.api();
            let cart = api.cart().await?;
            if cart.contains(&item.key) {
                api.cart_remove(item.product_id, item.key.variant()).await?;
                Ok(CartToggle::Removed)
            } else {
                api.cart_add(item.product_id, item.key.variant(), item.quantity)
                    .await?;
                Ok(CartToggle::Added)
            }
        } else {
            let mut cart = self.local()?;
            let outcome = cart.toggle(item);
            self.save_local(&cart)?;
            Ok(outcome)
        }
    }

    /// Add units of a line, summing with what is already in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the store rejects the change.
    #[instrument(skip(self, item), fields(key = %item.key, quantity = item.quantity))]
    pub async fn add(&self, item: CartItem) -> Result<()> {
        if self.server_backed() {
            self.state
                .api()
                .cart_add(item.product_id, item.key.variant(), item.quantity)
                .await?;
        } else {
            let mut cart = self.local()?;
            cart.add(item);
            self.save_local(&cart)?;
        }
        Ok(())
    }

    /// Replace the cart with a single line (buy now).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the store rejects the change.
    #[instrument(skip(self, item), fields(key = %item.key))]
    pub async fn buy_now(&self, item: CartItem) -> Result<()> {
        if self.server_backed() {
            let api = self.state.api();
            api.cart_clear().await?;
            api.cart_add(item.product_id, item.key.variant(), item.quantity)
                .await?;
        } else {
            self.save_local(&Cart::from_items([item]))?;
        }
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the line is not in the cart.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn remove(&self, key: &CartKey) -> Result<()> {
        if self.server_backed() {
            self.state
                .api()
                .cart_remove(key.product_id(), key.variant())
                .await
                .map_err(|e| not_found_as(e, key))?;
        } else {
            let mut cart = self.local()?;
            cart.remove(key)
                .ok_or_else(|| CartError::ItemNotFound(key.clone()))?;
            self.save_local(&cart)?;
        }
        Ok(())
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns a cart error for zero, for more than the known stock, or for
    /// a line that is not in the cart.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn set_quantity(&self, key: &CartKey, quantity: u32) -> Result<()> {
        let mut cart = self.load().await?;
        cart.set_quantity(key, quantity)?;
        if self.server_backed() {
            self.state
                .api()
                .cart_update(key.product_id(), key.variant(), quantity)
                .await
                .map_err(|e| not_found_as(e, key))?;
        } else {
            self.save_local(&cart)?;
        }
        Ok(())
    }

    /// Move a line to another variant. Returns the line's new key.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the line is not in the cart.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn change_variant(&self, key: &CartKey, variant: Option<&str>) -> Result<CartKey> {
        let mut cart = self.load().await?;
        let already_there = cart.contains(&CartKey::new(key.product_id(), variant));
        let new_key = cart.change_variant(key, variant)?;

        if self.server_backed() {
            if new_key != *key {
                let api = self.state.api();
                api.cart_remove(key.product_id(), key.variant()).await?;
                if !already_there {
                    api.cart_add(new_key.product_id(), new_key.variant(), 1)
                        .await?;
                }
            }
        } else {
            self.save_local(&cart)?;
        }
        Ok(new_key)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the store rejects the change.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.server_backed() {
            self.state.api().cart_clear().await?;
        } else {
            self.state.storage().remove(keys::CART)?;
        }
        Ok(())
    }

    /// Number of units in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be loaded.
    pub async fn count(&self) -> Result<u32> {
        Ok(self.load().await?.total_items())
    }

    /// Load the cart and refresh every line from a product lookup.
    ///
    /// Lines whose lookup fails keep their stored data. Quantities are
    /// clamped to the current stock. The refreshed guest cart is written
    /// back to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be loaded or saved.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) -> Result<Cart> {
        let mut cart = self.load().await?;
        let api = self.state.api();

        for item in cart.iter_mut() {
            match api.product(item.product_id).await {
                Ok(product) => item.refresh_from(&product),
                Err(e) => warn!(
                    product_id = %item.product_id,
                    error = %e,
                    "Product lookup failed, keeping stored cart line"
                ),
            }
        }

        if !self.server_backed() {
            self.save_local(&cart)?;
        }
        Ok(cart)
    }

    /// Push the guest cart to the signed-in account.
    ///
    /// Lines missing on the account are added; lines on both sides keep the
    /// larger quantity. Lines that fail stay in the local cart, the rest are
    /// removed from it.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is loaded or the account cart cannot be
    /// read.
    #[instrument(skip(self))]
    pub async fn sync_on_login(&self) -> Result<SyncReport> {
        if !self.server_backed() {
            return Err(ApiError::NotAuthenticated.into());
        }
        let local = self.local()?;
        let mut report = SyncReport::default();
        if local.is_empty() {
            return Ok(report);
        }

        let api = self.state.api();
        let server = api.cart().await?;
        let mut unsynced = Cart::default();

        for item in local {
            let variant = item.key.variant();
            let result = match server.get(&item.key) {
                Some(existing) if existing.quantity >= item.quantity => {
                    report.unchanged += 1;
                    Ok(())
                }
                Some(_) => api
                    .cart_update(item.product_id, variant, item.quantity)
                    .await
                    .map(|()| report.merged += 1),
                None => api
                    .cart_add(item.product_id, variant, item.quantity)
                    .await
                    .map(|()| report.pushed += 1),
            };
            if let Err(e) = result {
                warn!(key = %item.key, error = %e, "Could not sync cart line");
                report.failed += 1;
                unsynced.upsert(item);
            }
        }

        self.save_local(&unsynced)?;
        info!(
            pushed = report.pushed,
            merged = report.merged,
            failed = report.failed,
            "Guest cart synced"
        );
        Ok(report)
    }
}

fn not_found_as(err: ApiError, key: &CartKey) -> AppError {
    if err.is_not_found() {
        CartError::ItemNotFound(key.clone()).into()
    } else {
        err.into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::models::AuthToken;
    use crate::store::Storage;

    fn state_for(uri: &str) -> Storefront {
        let base: Url = uri.parse().unwrap();
        Storefront::with_storage(StorefrontConfig::with_base_url(&base).unwrap(), Storage::memory())
            .unwrap()
    }

    fn line(product: i64, variant: Option<&str>, quantity: u32) -> CartItem {
        CartItem::new(
            ProductId::new(product),
            format!("Product {product}"),
            Decimal::new(100, 0),
            variant.map(str::to_owned),
            quantity,
        )
    }

    #[tokio::test]
    async fn test_guest_toggle_persists() {
        let state = state_for("http://localhost:3000");
        let carts = CartService::new(&state);

        assert_eq!(carts.toggle(line(1, Some("Red"), 1)).await.unwrap(), CartToggle::Added);
        assert_eq!(carts.count().await.unwrap(), 1);
        assert_eq!(carts.toggle(line(1, Some("Red"), 1)).await.unwrap(), CartToggle::Removed);
        assert!(carts.local().unwrap().is_empty());
        assert_eq!(state.storage().get_raw(keys::CART).unwrap(), None);
    }

    #[tokio::test]
    async fn test_guest_buy_now_replaces_cart() {
        let state = state_for("http://localhost:3000");
        let carts = CartService::new(&state);
        carts.add(line(1, None, 2)).await.unwrap();
        carts.add(line(2, None, 1)).await.unwrap();

        carts.buy_now(line(3, Some("M"), 1)).await.unwrap();
        let cart = carts.local().unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items().first().unwrap().product_id, ProductId::new(3));
    }

    #[tokio::test]
    async fn test_signed_in_buy_now_clears_then_adds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart/clear"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add"))
            .and(body_json(serde_json::json!({"productId": 3, "variantDetail": "M", "quantity": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        state.api().set_token(AuthToken::new("tok"));
        CartService::new(&state)
            .buy_now(line(3, Some("M"), 2))
            .await
            .unwrap();
        assert_eq!(state.storage().get_raw(keys::CART).unwrap(), None);
    }

    #[tokio::test]
    async fn test_guest_remove_missing_line() {
        let state = state_for("http://localhost:3000");
        let err = CartService::new(&state)
            .remove(&CartKey::new(ProductId::new(5), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cart(CartError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_hydrate_keeps_line_when_lookup_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public/products/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "product_id": 1, "title": "Cotton Tee", "price": "450.00",
                "variant_type": "Size",
                "images": [{"variant_detail": "M", "image_path": "m.jpg", "stock": 2}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/public/products/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let carts = CartService::new(&state);
        carts.add(line(1, Some("M"), 5)).await.unwrap();
        carts.add(line(2, None, 1)).await.unwrap();

        let cart = carts.hydrate().await.unwrap();
        let tee = cart.get(&CartKey::new(ProductId::new(1), Some("M"))).unwrap();
        assert_eq!(tee.title, "Cotton Tee");
        assert_eq!(tee.quantity, 2);
        assert_eq!(tee.price, Decimal::new(450, 0));
        let other = cart.get(&CartKey::new(ProductId::new(2), None)).unwrap();
        assert_eq!(other.title, "Product 2");

        assert_eq!(carts.local().unwrap(), cart);
    }

    #[tokio::test]
    async fn test_item_for_requires_variant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public/products/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "product_id": 12, "title": "Cotton Tee", "price": "499.00",
                "variant_type": ["Color", "Size"],
                "images": [{"variant_detail": "Red-M", "stock": 3},
                           {"variant_detail": "Blue-M", "stock": 0}]
            })))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let carts = CartService::new(&state);
        let id = ProductId::new(12);

        assert!(matches!(
            carts.item_for(id, None, 1).await,
            Err(AppError::Variant(VariantError::Missing(_)))
        ));
        assert!(matches!(
            carts.item_for(id, Some("Blue-M"), 1).await,
            Err(AppError::Cart(CartError::ExceedsStock { available: 0 }))
        ));
        let item = carts.item_for(id, Some("Red-M"), 1).await.unwrap();
        assert_eq!(item.stock, Some(3));
    }

    #[tokio::test]
    async fn test_sync_on_login_merges() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "cart": [
                    {"product_id": 1, "title": "A", "price": 100, "quantity": 1, "variant_detail": "Red"},
                    {"product_id": 2, "title": "B", "price": 100, "quantity": 5, "variant_detail": null}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cart/update"))
            .and(body_json(serde_json::json!({"productId": 1, "variantDetail": "Red", "quantity": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add"))
            .and(body_json(serde_json::json!({"productId": 3, "variantDetail": null, "quantity": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add"))
            .and(body_json(serde_json::json!({"productId": 4, "variantDetail": null, "quantity": 1})))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "success": false, "message": "Product not available"
            })))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let carts = CartService::new(&state);
        carts.add(line(1, Some("Red"), 3)).await.unwrap();
        carts.add(line(2, None, 2)).await.unwrap();
        carts.add(line(3, None, 1)).await.unwrap();
        carts.add(line(4, None, 1)).await.unwrap();

        state.api().set_token(AuthToken::new("tok"));
        let report = carts.sync_on_login().await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                pushed: 1,
                merged: 1,
                unchanged: 1,
                failed: 1
            }
        );
        let left = carts.local().unwrap();
        assert_eq!(left.len(), 1);
        assert!(left.contains(&CartKey::new(ProductId::new(4), None)));
    }
}
