//! Wishlist operations.
//!
//! Same split as the cart: guests keep product ids in the local store,
//! signed-in customers use the backend wishlist.

use tracing::{info, instrument, warn};

use bbqstyle_core::ProductId;

use super::cart::SyncReport;
use crate::api::ApiError;
use crate::error::Result;
use crate::models::{Wishlist, WishlistItem};
use crate::state::Storefront;
use crate::store::keys;

pub struct WishlistService<'a> {
    state: &'a Storefront,
}

impl<'a> WishlistService<'a> {
    #[must_use]
    pub const fn new(state: &'a Storefront) -> Self {
        Self { state }
    }

    fn server_backed(&self) -> bool {
        self.state.is_authenticated()
    }

    /// The guest wishlist in the local store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn local(&self) -> Result<Wishlist> {
        Ok(self.state.storage().load_or_default(keys::WISHLIST)?)
    }

    fn save_local(&self, wishlist: &Wishlist) -> Result<()> {
        if wishlist.is_empty() {
            self.state.storage().remove(keys::WISHLIST)?;
        } else {
            self.state.storage().save_json(keys::WISHLIST, wishlist)?;
        }
        Ok(())
    }

    /// Wishlisted products with names and prices.
    ///
    /// Guest entries are filled in from product lookups; an entry whose
    /// lookup fails is listed by id only.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be loaded.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<WishlistItem>> {
        if self.server_backed() {
            return Ok(self.state.api().wishlist().await?);
        }

        let mut items = Vec::new();
        for id in self.local()?.ids() {
            let item = match self.state.api().product(id).await {
                Ok(product) => WishlistItem {
                    id,
                    image: product.image_for(None).map(str::to_owned),
                    name: product.title,
                    price: Some(product.price),
                },
                Err(e) => {
                    warn!(product_id = %id, error = %e, "Product lookup failed for wishlist entry");
                    WishlistItem {
                        id,
                        name: String::new(),
                        price: None,
                        image: None,
                    }
                }
            };
            items.push(item);
        }
        Ok(items)
    }

    /// Whether a product is wishlisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be loaded.
    pub async fn contains(&self, id: ProductId) -> Result<bool> {
        if self.server_backed() {
            let items = self.state.api().wishlist().await?;
            Ok(items.iter().any(|i| i.id == id))
        } else {
            Ok(self.local()?.contains(id))
        }
    }

    /// Add if absent, remove if present. Returns whether the product is now
    /// wishlisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the store rejects the change.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn toggle(&self, id: ProductId) -> Result<bool> {
        if self.server_backed() {
            if self.contains(id).await? {
                self.state.api().wishlist_remove(id).await?;
                Ok(false)
            } else {
                match self.state.api().wishlist_add(id).await {
                    Err(e) if e.is_conflict() => Ok(true),
                    other => other.map(|()| true).map_err(Into::into),
                }
            }
        } else {
            let mut wishlist = self.local()?;
            let present = wishlist.toggle(id);
            self.save_local(&wishlist)?;
            Ok(present)
        }
    }

    /// Remove a product. Returns whether it was wishlisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the store rejects the change.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove(&self, id: ProductId) -> Result<bool> {
        if self.server_backed() {
            match self.state.api().wishlist_remove(id).await {
                Ok(()) => Ok(true),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(e.into()),
            }
        } else {
            let mut wishlist = self.local()?;
            let removed = wishlist.remove(id);
            self.save_local(&wishlist)?;
            Ok(removed)
        }
    }

    /// Remove every product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the store rejects the change.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.server_backed() {
            let api = self.state.api();
            for item in api.wishlist().await? {
                api.wishlist_remove(item.id).await?;
            }
        } else {
            self.state.storage().remove(keys::WISHLIST)?;
        }
        Ok(())
    }

    /// Push guest wishlist entries to the signed-in account.
    ///
    /// Entries the account already has count as unchanged. Entries that
    /// fail stay in the local wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is loaded.
    #[instrument(skip(self))]
    pub async fn sync_on_login(&self) -> Result<SyncReport> {
        if !self.server_backed() {
            return Err(ApiError::NotAuthenticated.into());
        }
        let mut report = SyncReport::default();
        let mut unsynced = Wishlist::default();

        for id in self.local()?.ids() {
            match self.state.api().wishlist_add(id).await {
                Ok(()) => report.pushed += 1,
                Err(e) if e.is_conflict() => report.unchanged += 1,
                Err(e) => {
                    warn!(product_id = %id, error = %e, "Could not sync wishlist entry");
                    report.failed += 1;
                    unsynced.toggle(id);
                }
            }
        }

        self.save_local(&unsynced)?;
        info!(pushed = report.pushed, failed = report.failed, "Guest wishlist synced");
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
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

    #[tokio::test]
    async fn test_guest_toggle() {
        let state = state_for("http://localhost:3000");
        let wishlist = WishlistService::new(&state);
        assert!(wishlist.toggle(ProductId::new(3)).await.unwrap());
        assert!(wishlist.contains(ProductId::new(3)).await.unwrap());
        assert!(!wishlist.toggle(ProductId::new(3)).await.unwrap());
        assert!(!wishlist.remove(ProductId::new(3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_sync_counts_duplicates_as_synced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/wishlist/add"))
            .and(body_json(serde_json::json!({"productId": 1})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "success": true, "message": "Product added to wishlist"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/wishlist/add"))
            .and(body_json(serde_json::json!({"productId": 2})))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "success": false, "message": "Product already in wishlist"
            })))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let wishlist = WishlistService::new(&state);
        wishlist.toggle(ProductId::new(1)).await.unwrap();
        wishlist.toggle(ProductId::new(2)).await.unwrap();

        state.api().set_token(AuthToken::new("tok"));
        let report = wishlist.sync_on_login().await.unwrap();
        assert_eq!(report.pushed, 1);
        assert_eq!(report.unchanged, 1);
        assert!(report.is_complete());
        assert!(wishlist.local().unwrap().is_empty());
    }
}
