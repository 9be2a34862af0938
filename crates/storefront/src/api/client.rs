//! Backend REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP. Caches product and review lookups using
//! `moka` (TTL from config).

use std::sync::{Arc, PoisonError, RwLock};

use moka::future::Cache;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use bbqstyle_core::{AddressId, MobileNumber, OrderId, OtpCode, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    Ack, AddressCreated, AddressList, AppliedPromo, CartLineRequest, LoginRequest,
    MobileAccount, MobileRequest, OfferUsageRequest, OrderCreated, PaymentSession,
    ProductRequest, PromoRequest, RegisterRequest, ServerCart, SessionInfo, TokenResponse,
    TrackOrderRequest, TrackingInfo, VerifyOtpRequest, WishlistResponse,
};
use super::{ApiError, decode_body, truncate};
use crate::config::StorefrontConfig;
use crate::models::{
    AccountName, Address, AuthToken, Cart, NewAddress, OrderDraft, ProductDetail, Review,
    WishlistItem,
};

/// Whether an endpoint needs the customer's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Customer,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Cheap to clone; clones share the HTTP pool, the token slot and the cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<AuthToken>>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.has_token())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        // `Url::join` replaces the last segment unless the path ends in '/'.
        let mut base_url = config.api_base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                token: RwLock::new(None),
                cache,
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Token slot
    // =========================================================================

    /// Use `token` for customer endpoints from now on.
    pub fn set_token(&self, token: AuthToken) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Forget the bearer token.
    pub fn clear_token(&self) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a bearer token is set.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn bearer(&self) -> Option<SecretString> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| SecretString::from(t.expose().to_owned()))
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url, access: Access) -> Result<RequestBuilder, ApiError> {
        let builder = self.inner.client.request(method, url);
        match (self.bearer(), access) {
            (Some(token), _) => Ok(builder.bearer_auth(token.expose_secret())),
            (None, Access::Public) => Ok(builder),
            (None, Access::Customer) => Err(ApiError::NotAuthenticated),
        }
    }

    /// Send a request and decode the envelope.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Backend request failed");
            ApiError::Http(e)
        })?;

        let status = response.status();
        let url = response.url().path().to_owned();
        let body = response.text().await?;
        debug!(%status, path = %url, "Backend response");

        decode_body(status, &body).inspect_err(|e| {
            if status.is_server_error() {
                error!(%status, path = %url, body = %truncate(&body, 500), "Backend error");
            } else if matches!(e, ApiError::Parse(_)) {
                error!(error = %e, path = %url, body = %truncate(&body, 500), "Failed to parse backend response");
            } else {
                debug!(error = %e, path = %url, "Backend rejected request");
            }
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, access: Access) -> Result<T, ApiError> {
        let url = self.url(path)?;
        self.execute(self.request(Method::GET, url, access)?).await
    }

    async fn post<B, T>(&self, path: &str, body: &B, access: Access) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.execute(self.request(Method::POST, url, access)?.json(body))
            .await
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Create an account for a verified mobile number.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] with status 409 if the mobile number is
    /// already registered.
    #[instrument(skip(self, name, mobile), fields(mobile = %mobile.masked()))]
    pub async fn register(
        &self,
        name: &AccountName,
        mobile: &MobileNumber,
    ) -> Result<AuthToken, ApiError> {
        let body = RegisterRequest {
            first_name: &name.first_name,
            last_name: &name.last_name,
            mobile: mobile.as_str(),
            email: None,
        };
        let response: TokenResponse = self.post("api/register", &body, Access::Public).await?;
        Ok(AuthToken::new(response.token))
    }

    /// Email and password login.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] with status 401 for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<AuthToken, ApiError> {
        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        let response: TokenResponse = self.post("api/login", &body, Access::Public).await?;
        Ok(AuthToken::new(response.token))
    }

    /// Look up the account registered to a mobile number.
    ///
    /// Returns `None` when no account exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any other reason.
    #[instrument(skip(self, mobile), fields(mobile = %mobile.masked()))]
    pub async fn mobile_login_check(
        &self,
        mobile: &MobileNumber,
    ) -> Result<Option<MobileAccount>, ApiError> {
        let body = MobileRequest {
            mobile: mobile.as_str(),
        };
        match self.post("api/mobile-login-check", &body, Access::Public).await {
            Ok(account) => Ok(Some(account)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Token for a mobile number that has just passed OTP verification.
    ///
    /// # Errors
    ///
    /// Returns an error if no account exists or the request fails.
    #[instrument(skip(self, mobile), fields(mobile = %mobile.masked()))]
    pub async fn mobile_login_direct(&self, mobile: &MobileNumber) -> Result<AuthToken, ApiError> {
        let body = MobileRequest {
            mobile: mobile.as_str(),
        };
        let response: TokenResponse = self
            .post("api/mobile-login-direct", &body, Access::Public)
            .await?;
        Ok(AuthToken::new(response.token))
    }

    /// Admin session behind the current token.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error for customer tokens.
    #[instrument(skip(self))]
    pub async fn session(&self) -> Result<SessionInfo, ApiError> {
        self.get("api/session", Access::Customer).await
    }

    // =========================================================================
    // OTP
    // =========================================================================

    /// Ask the backend to text a one-time code.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend could not issue the code.
    #[instrument(skip(self, mobile), fields(mobile = %mobile.masked()))]
    pub async fn send_otp(&self, mobile: &MobileNumber) -> Result<(), ApiError> {
        let body = MobileRequest {
            mobile: mobile.as_str(),
        };
        let _: Ack = self.post("api/send-otp", &body, Access::Public).await?;
        Ok(())
    }

    /// Check a one-time code. `Ok(false)` means wrong or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails.
    #[instrument(skip(self, mobile, otp), fields(mobile = %mobile.masked()))]
    pub async fn verify_otp(&self, mobile: &MobileNumber, otp: &OtpCode) -> Result<bool, ApiError> {
        let body = VerifyOtpRequest {
            mobile: mobile.as_str(),
            otp: otp.as_str(),
        };
        match self.post::<_, Ack>("api/verify-otp", &body, Access::Public).await {
            Ok(_) => Ok(true),
            Err(ApiError::Rejected { status, .. }) if status < 300 => Ok(false),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Addresses saved on the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        let list: AddressList = self.get("api/addresses", Access::Customer).await?;
        Ok(list.addresses.into_iter().map(Address::from).collect())
    }

    /// Save an address on the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the address.
    #[instrument(skip(self, address))]
    pub async fn create_address(&self, address: &NewAddress) -> Result<AddressId, ApiError> {
        let created: AddressCreated = self
            .post("api/addresses", address, Access::Customer)
            .await?;
        Ok(created.address_id)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The account's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        let cart: ServerCart = self.get("api/cart", Access::Customer).await?;
        Ok(cart.into())
    }

    /// Add units of a product variant; quantities add up on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the line.
    #[instrument(skip(self))]
    pub async fn cart_add(
        &self,
        product_id: ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let body = CartLineRequest {
            product_id,
            variant_detail: variant,
            quantity: Some(quantity),
        };
        let _: Ack = self.post("api/cart/add", &body, Access::Customer).await?;
        Ok(())
    }

    /// Remove a product variant from the cart.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the line is not in the cart.
    #[instrument(skip(self))]
    pub async fn cart_remove(
        &self,
        product_id: ProductId,
        variant: Option<&str>,
    ) -> Result<(), ApiError> {
        let body = CartLineRequest {
            product_id,
            variant_detail: variant,
            quantity: None,
        };
        let _: Ack = self.post("api/cart/remove", &body, Access::Customer).await?;
        Ok(())
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self))]
    pub async fn cart_update(
        &self,
        product_id: ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let body = CartLineRequest {
            product_id,
            variant_detail: variant,
            quantity: Some(quantity),
        };
        let _: Ack = self.post("api/cart/update", &body, Access::Customer).await?;
        Ok(())
    }

    /// Empty the account's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn cart_clear(&self) -> Result<(), ApiError> {
        let _: Ack = self
            .post("api/cart/clear", &serde_json::json!({}), Access::Customer)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// The account's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn wishlist(&self) -> Result<Vec<WishlistItem>, ApiError> {
        let response: WishlistResponse = self.get("api/wishlist", Access::Customer).await?;
        Ok(response.wishlist)
    }

    /// Add a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns a conflict error if it is already there.
    #[instrument(skip(self))]
    pub async fn wishlist_add(&self, product_id: ProductId) -> Result<(), ApiError> {
        let body = ProductRequest { product_id };
        let _: Ack = self.post("api/wishlist/add", &body, Access::Customer).await?;
        Ok(())
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if it is not there.
    #[instrument(skip(self))]
    pub async fn wishlist_remove(&self, product_id: ProductId) -> Result<(), ApiError> {
        let body = ProductRequest { product_id };
        let _: Ack = self
            .post("api/wishlist/remove", &body, Access::Customer)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Price a promo code against the customer's order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] with the backend's reason when the code
    /// is not accepted.
    #[instrument(skip(self))]
    pub async fn apply_promo(&self, code: &str) -> Result<AppliedPromo, ApiError> {
        let body = PromoRequest { promo_code: code };
        self.post("api/apply-promo", &body, Access::Public).await
    }

    /// Place a cash-on-delivery order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the order.
    #[instrument(skip(self, draft), fields(address_id = %draft.address_id, items = draft.items.len()))]
    pub async fn create_order(&self, draft: &OrderDraft) -> Result<OrderId, ApiError> {
        let created: OrderCreated = self.post("api/orders", draft, Access::Customer).await?;
        Ok(created.order_id)
    }

    /// Open a hosted payment session for an online order.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment provider session cannot be created.
    #[instrument(skip(self, draft), fields(address_id = %draft.address_id, items = draft.items.len()))]
    pub async fn create_payment_session(
        &self,
        draft: &OrderDraft,
    ) -> Result<PaymentSession, ApiError> {
        self.post("api/create-payment-session", draft, Access::Customer)
            .await
    }

    /// Count one use of an offer code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn update_offer_usage(&self, code: &str) -> Result<(), ApiError> {
        let body = OfferUsageRequest { offer_code: code };
        let _: Ack = self
            .post("api/update-offer-usage", &body, Access::Public)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Public product detail, cached.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown products.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<ProductDetail, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: ProductDetail = self
            .get(&format!("api/public/products/{id}"), Access::Public)
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Published reviews for a product, cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn reviews(&self, id: ProductId) -> Result<Vec<Review>, ApiError> {
        let key = CacheKey::Reviews(id);
        if let Some(CacheValue::Reviews(reviews)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for reviews");
            return Ok(reviews);
        }

        let mut url = self.url("api/public/reviews")?;
        url.query_pairs_mut()
            .append_pair("product_id", &id.to_string());
        let reviews: Vec<Review> = self
            .execute(self.request(Method::GET, url, Access::Public)?)
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::Reviews(reviews.clone()))
            .await;

        Ok(reviews)
    }

    /// Drop a cached product.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.inner.cache.invalidate(&CacheKey::Product(id)).await;
    }

    /// Drop every cached lookup.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Tracking
    // =========================================================================

    /// Tracking details by order id or carrier tracking id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the order is unknown or has no
    /// tracking yet.
    #[instrument(skip(self))]
    pub async fn track_order(&self, input: &str) -> Result<TrackingInfo, ApiError> {
        let body = TrackOrderRequest {
            tracking_input: input,
        };
        self.post("api/track-order", &body, Access::Public).await
    }

    /// Record a storefront visit.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn track_visitor(&self) -> Result<(), ApiError> {
        let _: Ack = self
            .post("api/track-visitor", &serde_json::json!({}), Access::Public)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> ApiClient {
        let base: Url = server.uri().parse().unwrap();
        ApiClient::new(&StorefrontConfig::with_base_url(&base).unwrap()).unwrap()
    }

    fn mobile() -> MobileNumber {
        MobileNumber::parse("9876543210").unwrap()
    }

    #[tokio::test]
    async fn test_send_otp_posts_mobile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send-otp"))
            .and(body_json(serde_json::json!({"mobile": "9876543210"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "message": "OTP sent successfully"
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).await.send_otp(&mobile()).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_otp_false_on_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/verify-otp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false, "message": "Invalid or expired OTP"
            })))
            .mount(&server)
            .await;

        let otp = OtpCode::parse("123456").unwrap();
        let ok = client_for(&server).await.verify_otp(&mobile(), &otp).await.unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_mobile_login_check_404_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/mobile-login-check"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "success": false, "message": "No user exists with this mobile number"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.mobile_login_check(&mobile()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_customer_endpoint_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server).await.cart().await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/addresses"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "addresses": [{"address_id": 3, "full_name": "Asha", "mobile_no": "9876543210",
                    "address_line1": "12 MG Road", "city": "Jaipur", "state": "Rajasthan",
                    "pincode": "302001", "is_default": 1}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.set_token(AuthToken::new("tok"));
        let addresses = client.addresses().await.unwrap();
        assert_eq!(addresses.len(), 1);
        assert!(addresses.first().unwrap().is_default);
    }

    #[tokio::test]
    async fn test_product_lookup_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public/products/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "product_id": 12, "title": "Cotton Tee", "price": "499.00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let first = client.product(ProductId::new(12)).await.unwrap();
        let second = client.product(ProductId::new(12)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reviews_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public/reviews"))
            .and(query_param("product_id", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"review_id": 1, "product_id": 12, "star_rating": 5,
                 "review_text": "Great fit", "first_name": "Asha"}
            ])))
            .mount(&server)
            .await;

        let reviews = client_for(&server)
            .await
            .reviews(ProductId::new(12))
            .await
            .unwrap();
        assert_eq!(reviews.first().unwrap().customer_name.as_deref(), Some("Asha"));
    }

    #[tokio::test]
    async fn test_promo_rejection_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/apply-promo"))
            .and(body_json(serde_json::json!({"promoCode": "OLD"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false, "message": "Promo code usage limit reached"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.set_token(AuthToken::new("tok"));
        let err = client.apply_promo("OLD").await.unwrap_err();
        assert_eq!(err.backend_message(), Some("Promo code usage limit reached"));
    }
}
