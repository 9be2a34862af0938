//! Checkout state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, instrument, warn};

use bbqstyle_core::{AddressRef, MobileNumber, OtpCode, PaymentMode};

use super::{
    AccountStatus, CheckoutError, CheckoutStep, PlacementOutcome, VerificationOutcome,
    VerificationPrompt,
};
use crate::api::ApiError;
use crate::api::types::AppliedPromo;
use crate::error::Result;
use crate::models::{
    AccountName, Address, Cart, NewAddress, OrderDraft, OrderLine, OrderSummary,
};
use crate::services::{
    AddressBook, AuthError, AuthSession, CartService, OtpService, ResendCooldown, SyncReport,
    WishlistService,
};
use crate::state::Storefront;

#[derive(Debug)]
struct FlowState {
    step: CheckoutStep,
    addresses: Vec<Address>,
    selected: Option<AddressRef>,
    cart: Cart,
    summary: OrderSummary,
    offer_code: Option<String>,
    payment_mode: PaymentMode,
    cooldown: ResendCooldown,
    pending_mobile: Option<MobileNumber>,
}

impl FlowState {
    fn ensure_step(&self, expected: CheckoutStep) -> std::result::Result<(), CheckoutError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CheckoutError::InvalidStep {
                expected,
                actual: self.step,
            })
        }
    }
}

// =============================================================================
// CheckoutFlow
// =============================================================================

/// One customer's way through checkout.
///
/// All methods take `&self`. The step data sits behind a mutex that is never
/// held across a backend call, and order submission is guarded by an atomic
/// flag: a `place_order` issued while another is in flight is refused
/// without any request.
#[derive(Debug)]
pub struct CheckoutFlow {
    state: Storefront,
    inner: Mutex<FlowState>,
    submitting: AtomicBool,
}

impl CheckoutFlow {
    /// Open the checkout.
    ///
    /// Restores the session, loads the address book (pre-selecting the
    /// default address) and the cart, and checks every line can be ordered.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for an empty cart,
    /// `CheckoutError::Cart` when a line still needs a variant or is sold
    /// out, or the underlying error when loading fails.
    #[instrument(skip(state))]
    pub async fn start(state: Storefront) -> Result<Self> {
        let claims = AuthSession::new(&state).check()?;
        let addresses = AddressBook::new(&state).list().await?;
        let selected = addresses.iter().find(|a| a.is_default).map(|a| a.id);

        let cart = CartService::new(&state).hydrate().await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart.into());
        }
        cart.validate_for_checkout().map_err(CheckoutError::from)?;

        let summary = OrderSummary::for_cart(&cart);
        let cooldown = OtpService::new(&state).cooldown();
        info!(
            signed_in = claims.is_some(),
            lines = cart.len(),
            addresses = addresses.len(),
            subtotal = %summary.subtotal,
            "Checkout started"
        );

        Ok(Self {
            state,
            inner: Mutex::new(FlowState {
                step: CheckoutStep::AddressSelection,
                addresses,
                selected,
                cart,
                summary,
                offer_code: None,
                payment_mode: PaymentMode::default(),
                cooldown,
                pending_mobile: None,
            }),
            submitting: AtomicBool::new(false),
        })
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn state(&self) -> &Storefront {
        &self.state
    }

    #[must_use]
    pub fn step(&self) -> CheckoutStep {
        self.lock().step
    }

    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        self.lock().summary
    }

    #[must_use]
    pub fn addresses(&self) -> Vec<Address> {
        self.lock().addresses.clone()
    }

    #[must_use]
    pub fn selected_address(&self) -> Option<AddressRef> {
        self.lock().selected
    }

    #[must_use]
    pub fn cart(&self) -> Cart {
        self.lock().cart.clone()
    }

    #[must_use]
    pub fn payment_mode(&self) -> PaymentMode {
        self.lock().payment_mode
    }

    #[must_use]
    pub fn applied_offer_code(&self) -> Option<String> {
        self.lock().offer_code.clone()
    }

    /// Label of the resend button, with the countdown while it runs.
    #[must_use]
    pub fn resend_label(&self) -> String {
        self.lock().cooldown.label()
    }

    /// A copy of the resend cooldown, for driving a countdown display.
    #[must_use]
    pub fn resend_cooldown(&self) -> ResendCooldown {
        self.lock().cooldown
    }

    /// Whether an order submission is in flight or handed to the payment
    /// page.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    // =========================================================================
    // Address selection
    // =========================================================================

    /// Pick an address from the address book.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AddressNotFound` for an id not in the book.
    pub fn select_address(&self, id: AddressRef) -> Result<()> {
        let mut flow = self.lock();
        flow.ensure_step(CheckoutStep::AddressSelection)?;
        if !flow.addresses.iter().any(|a| a.id == id) {
            return Err(CheckoutError::AddressNotFound.into());
        }
        flow.selected = Some(id);
        Ok(())
    }

    /// Forget the selection, as when the customer opens the new-address form.
    pub fn clear_selection(&self) {
        self.lock().selected = None;
    }

    /// Save a new address, reload the book and select the new address.
    ///
    /// # Errors
    ///
    /// Returns an address error for incomplete forms, or the error that kept
    /// the address from being saved.
    #[instrument(skip(self, form))]
    pub async fn save_new_address(&self, form: NewAddress) -> Result<Address> {
        self.lock().ensure_step(CheckoutStep::AddressSelection)?;
        let book = AddressBook::new(&self.state);
        let saved = book.save(form).await?;
        let addresses = book.list().await?;

        let mut flow = self.lock();
        flow.addresses = addresses;
        if !flow.addresses.iter().any(|a| a.id == saved.id) {
            flow.addresses.push(saved.clone());
        }
        flow.selected = Some(saved.id);
        Ok(saved)
    }

    /// Whether the next-step button is enabled.
    #[must_use]
    pub fn can_proceed(&self) -> bool {
        let flow = self.lock();
        flow.step == CheckoutStep::AddressSelection && flow.selected.is_some()
    }

    /// Leave address selection.
    ///
    /// Signed-in customers go straight to the payment step and get `None`.
    /// Guests are sent an OTP at the selected address's mobile number and
    /// get the prompt to show.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NoAddressSelected`,
    /// `CheckoutError::MobileRequired` when the address has no usable
    /// number, or the error that kept the OTP from being sent.
    #[instrument(skip(self))]
    pub async fn proceed(&self) -> Result<Option<VerificationPrompt>> {
        let selected = {
            let flow = self.lock();
            flow.ensure_step(CheckoutStep::AddressSelection)?;
            flow.selected.ok_or(CheckoutError::NoAddressSelected)?
        };

        if self.state.is_authenticated() {
            self.lock().step = CheckoutStep::PaymentMethod;
            info!(address = %selected, "Address chosen");
            return Ok(None);
        }

        let mobile = AddressBook::new(&self.state)
            .mobile_for(selected)
            .await?
            .ok_or(CheckoutError::MobileRequired)?;
        OtpService::new(&self.state).send(&mobile).await?;

        let mut flow = self.lock();
        flow.cooldown.start();
        flow.pending_mobile = Some(mobile.clone());
        flow.step = CheckoutStep::GuestVerification;
        info!(mobile = %mobile.masked(), "Guest verification started");
        Ok(Some(VerificationPrompt {
            mobile,
            resend_in: flow.cooldown.remaining(),
        }))
    }

    // =========================================================================
    // Guest verification
    // =========================================================================

    /// Send the code again and restart the cooldown.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::ResendCooldown` while the cooldown runs.
    #[instrument(skip(self))]
    pub async fn resend_otp(&self) -> Result<VerificationPrompt> {
        let mobile = {
            let flow = self.lock();
            flow.ensure_step(CheckoutStep::GuestVerification)?;
            if !flow.cooldown.is_ready() {
                return Err(CheckoutError::ResendCooldown {
                    remaining_secs: flow.cooldown.remaining_secs(),
                }
                .into());
            }
            flow.pending_mobile
                .clone()
                .ok_or(CheckoutError::MobileRequired)?
        };
        OtpService::new(&self.state).send(&mobile).await?;

        let mut flow = self.lock();
        flow.cooldown.start();
        info!("OTP resent");
        Ok(VerificationPrompt {
            mobile,
            resend_in: flow.cooldown.remaining(),
        })
    }

    /// Check the code the guest entered and tie the number to an account.
    ///
    /// A number that already has an account is signed in to it; otherwise an
    /// account is registered under the name on the selected address. Guest
    /// addresses, cart and wishlist are then moved to the account and the
    /// selected address is switched to its new server id.
    ///
    /// # Errors
    ///
    /// Returns an OTP error for blank or malformed input,
    /// `CheckoutError::InvalidOtp` for a wrong or expired code, and
    /// `CheckoutError::VerificationFailed` when the backend could not be
    /// asked. The step is unchanged on error so the guest can try again.
    #[instrument(skip(self, input))]
    pub async fn submit_otp(&self, input: &str) -> Result<VerificationOutcome> {
        let (mobile, selected) = {
            let flow = self.lock();
            flow.ensure_step(CheckoutStep::GuestVerification)?;
            let mobile = flow
                .pending_mobile
                .clone()
                .ok_or(CheckoutError::MobileRequired)?;
            (mobile, flow.selected)
        };
        let code = OtpCode::parse(input)?;

        let verified = OtpService::new(&self.state)
            .verify(&mobile, &code)
            .await
            .map_err(|e| CheckoutError::VerificationFailed(e.to_string()))?;
        if !verified {
            info!("OTP rejected");
            return Err(CheckoutError::InvalidOtp.into());
        }

        let account = self.sign_in_verified(&mobile, selected).await?;

        let book = AddressBook::new(&self.state);
        let migration = book.migrate_local().await?;
        let remapped = selected.and_then(|s| migration.remap(s));
        let addresses = book.list().await?;

        let cart_report = self.sync_cart().await;
        let wishlist_report = self.sync_wishlist().await;
        let account_cart = match CartService::new(&self.state).load().await {
            Ok(cart) => Some(cart),
            Err(e) => {
                warn!(error = %e, "Could not reload cart after sign-in");
                None
            }
        };

        let mut guard = self.lock();
        let flow = &mut *guard;
        flow.addresses = addresses;
        flow.selected = remapped;
        flow.pending_mobile = None;
        if let Some(cart) = account_cart.filter(|c| !c.is_empty()) {
            let discount = flow.summary.discount;
            flow.summary = OrderSummary::for_cart(&cart);
            flow.summary.apply_discount(discount);
            flow.cart = cart;
        }
        flow.step = if remapped.is_some() {
            CheckoutStep::PaymentMethod
        } else {
            warn!("Selected address was not moved to the account, asking for a new one");
            CheckoutStep::AddressSelection
        };

        info!(
            account = ?account,
            migrated = migration.mapping.len(),
            next = %flow.step,
            "Guest verified"
        );
        Ok(VerificationOutcome {
            account,
            addresses: migration,
            cart: cart_report,
            wishlist: wishlist_report,
            next_step: flow.step,
        })
    }

    /// Close the verification prompt without verifying.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` outside verification.
    pub fn cancel_verification(&self) -> Result<()> {
        let mut flow = self.lock();
        flow.ensure_step(CheckoutStep::GuestVerification)?;
        flow.pending_mobile = None;
        flow.step = CheckoutStep::AddressSelection;
        info!("Guest verification cancelled");
        Ok(())
    }

    async fn sign_in_verified(
        &self,
        mobile: &MobileNumber,
        selected: Option<AddressRef>,
    ) -> Result<AccountStatus> {
        let auth = AuthSession::new(&self.state);
        let exists = match self.state.api().mobile_login_check(mobile).await {
            Ok(account) => account.is_some(),
            Err(ApiError::Rejected { status, .. }) if status < 500 => false,
            Err(e) => return Err(CheckoutError::VerificationFailed(e.to_string()).into()),
        };

        if exists {
            auth.login_with_mobile(mobile).await?;
            info!("Verified number has an account, signed in");
            return Ok(AccountStatus::LoggedInExisting);
        }

        let full_name = {
            let flow = self.lock();
            selected
                .and_then(|id| flow.addresses.iter().find(|a| a.id == id))
                .map(|a| a.full_name.clone())
                .unwrap_or_default()
        };
        let name = AccountName::from_full_name(&full_name);
        match auth.register(&name, mobile).await {
            Ok(_) => Ok(AccountStatus::Created),
            Err(AuthError::UserAlreadyExists) => {
                warn!("Account appeared during verification, signing in instead");
                auth.login_with_mobile(mobile).await?;
                Ok(AccountStatus::LoggedInExisting)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn sync_cart(&self) -> SyncReport {
        let service = CartService::new(&self.state);
        match service.sync_on_login().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Guest cart sync failed");
                SyncReport {
                    failed: service.local().map(|c| c.len()).unwrap_or_default(),
                    ..SyncReport::default()
                }
            }
        }
    }

    async fn sync_wishlist(&self) -> SyncReport {
        let service = WishlistService::new(&self.state);
        match service.sync_on_login().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Guest wishlist sync failed");
                SyncReport {
                    failed: service.local().map(|w| w.len()).unwrap_or_default(),
                    ..SyncReport::default()
                }
            }
        }
    }

    // =========================================================================
    // Payment and confirmation
    // =========================================================================

    /// Go back from payment to address selection.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` outside the payment step.
    pub fn back_to_address(&self) -> Result<()> {
        let mut flow = self.lock();
        flow.ensure_step(CheckoutStep::PaymentMethod)?;
        flow.step = CheckoutStep::AddressSelection;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` outside the payment step.
    pub fn choose_payment(&self, mode: PaymentMode) -> Result<()> {
        let mut flow = self.lock();
        flow.ensure_step(CheckoutStep::PaymentMethod)?;
        flow.payment_mode = mode;
        Ok(())
    }

    /// Open the confirmation prompt.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NoAddressSelected` if the selection was lost.
    pub fn request_confirmation(&self) -> Result<()> {
        let mut flow = self.lock();
        flow.ensure_step(CheckoutStep::PaymentMethod)?;
        if flow.selected.is_none() {
            return Err(CheckoutError::NoAddressSelected.into());
        }
        flow.step = CheckoutStep::Confirmation;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidStep` outside confirmation.
    pub fn cancel_confirmation(&self) -> Result<()> {
        let mut flow = self.lock();
        flow.ensure_step(CheckoutStep::Confirmation)?;
        flow.step = CheckoutStep::PaymentMethod;
        Ok(())
    }

    /// Apply a promo code to the running summary.
    ///
    /// Blank input is ignored and returns `None`. A later code replaces an
    /// earlier one.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::PromoRejected` with the backend's reason, or
    /// `CheckoutError::PromoFailed` when the request failed.
    #[instrument(skip(self))]
    pub async fn apply_promo(&self, input: &str) -> Result<Option<AppliedPromo>> {
        let code = input.trim();
        if code.is_empty() {
            return Ok(None);
        }
        if self.lock().step == CheckoutStep::Placed {
            return Err(CheckoutError::AlreadyPlaced.into());
        }

        let applied = self
            .state
            .api()
            .apply_promo(code)
            .await
            .map_err(|e| match e {
                ApiError::Rejected { message, .. } => CheckoutError::PromoRejected(message),
                other => CheckoutError::PromoFailed(other),
            })?;

        let mut flow = self.lock();
        flow.summary.apply_discount(applied.discount_amount);
        flow.offer_code = Some(code.to_owned());
        info!(
            discount = %applied.discount_amount,
            total = %flow.summary.total,
            "Promo code applied"
        );
        Ok(Some(applied))
    }

    // =========================================================================
    // Placing the order
    // =========================================================================

    /// Place the order.
    ///
    /// Cash-on-delivery orders re-check that the selected address still
    /// exists on the account before the order is created. Online orders get
    /// a payment session and the submission flag stays set while the
    /// customer is on the payment page.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AlreadySubmitting` while another submission is
    /// in flight and `CheckoutError::AlreadyPlaced` after success. Any other
    /// failure clears the flag so the customer can retry.
    #[instrument(skip(self))]
    pub async fn place_order(&self) -> Result<PlacementOutcome> {
        if self.lock().step == CheckoutStep::Placed {
            return Err(CheckoutError::AlreadyPlaced.into());
        }
        if self.submitting.swap(true, Ordering::AcqRel) {
            warn!("Order submission already in flight");
            return Err(CheckoutError::AlreadySubmitting.into());
        }

        let result = self.submit().await;
        match &result {
            Ok(PlacementOutcome::Placed { .. } | PlacementOutcome::PaymentRedirect { .. }) => {}
            Ok(PlacementOutcome::AddressReselectRequired) | Err(_) => {
                self.submitting.store(false, Ordering::Release);
            }
        }
        result
    }

    async fn submit(&self) -> Result<PlacementOutcome> {
        let (selected, cart, summary, offer_code, payment_mode) = {
            let flow = self.lock();
            flow.ensure_step(CheckoutStep::Confirmation)?;
            (
                flow.selected,
                flow.cart.clone(),
                flow.summary,
                flow.offer_code.clone(),
                flow.payment_mode,
            )
        };
        let address_id = selected
            .and_then(|s| s.server_id())
            .ok_or(CheckoutError::NoAddressSelected)?;

        let items = self.order_lines(&cart).await;
        let draft = OrderDraft::new(address_id, payment_mode, &summary, items, offer_code);

        match payment_mode {
            PaymentMode::Online => self.start_payment(&draft).await,
            PaymentMode::Cod => self.place_cod(&draft).await,
        }
    }

    async fn order_lines(&self, cart: &Cart) -> Vec<OrderLine> {
        let api = self.state.api();
        let mut lines = Vec::with_capacity(cart.len());
        for item in cart.iter() {
            let variant_type = match api.product(item.product_id).await {
                Ok(product) => product.variant_type.map(|t| t.joined()),
                Err(e) => {
                    warn!(product_id = %item.product_id, error = %e, "Variant type lookup failed");
                    None
                }
            };
            lines.push(OrderLine::from_cart_item(item, variant_type));
        }
        lines
    }

    async fn start_payment(&self, draft: &OrderDraft) -> Result<PlacementOutcome> {
        let session = self
            .state
            .api()
            .create_payment_session(draft)
            .await
            .map_err(CheckoutError::PaymentSessionFailed)?;
        info!(total = %draft.total_amount, "Payment session created");
        Ok(PlacementOutcome::PaymentRedirect {
            session,
            environment: self.state.config().payment_env,
        })
    }

    async fn place_cod(&self, draft: &OrderDraft) -> Result<PlacementOutcome> {
        let book = AddressBook::new(&self.state);
        let exists = book
            .exists_on_server(draft.address_id)
            .await
            .map_err(CheckoutError::AddressVerificationFailed)?;

        if !exists {
            warn!(address_id = %draft.address_id, "Selected address no longer exists");
            let addresses = book.list().await?;
            let mut flow = self.lock();
            flow.addresses = addresses;
            flow.selected = None;
            flow.step = CheckoutStep::AddressSelection;
            return Ok(PlacementOutcome::AddressReselectRequired);
        }

        let api = self.state.api();
        let order_id = api.create_order(draft).await.map_err(|e| match e {
            ApiError::Rejected { message, .. } => CheckoutError::OrderRejected(message),
            other => CheckoutError::OrderFailed(other),
        })?;
        info!(order_id = %order_id, total = %draft.total_amount, "Order placed");

        if let Some(code) = &draft.offer_code
            && let Err(e) = api.update_offer_usage(code).await
        {
            warn!(error = %e, "Could not record offer usage");
        }
        if let Err(e) = CartService::new(&self.state).clear().await {
            warn!(error = %e, "Could not clear cart after order");
        }

        let mut flow = self.lock();
        flow.cart = Cart::default();
        flow.step = CheckoutStep::Placed;
        Ok(PlacementOutcome::Placed { order_id })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use bbqstyle_core::{AddressId, OrderId, ProductId};

    use super::*;
    use crate::config::{PaymentEnvironment, StorefrontConfig};
    use crate::error::AppError;
    use crate::models::CartItem;
    use crate::models::address::tests::form;
    use crate::models::token::tests::token_with;
    use crate::store::{Storage, keys};

    fn state_for(uri: &str) -> Storefront {
        let base: Url = uri.parse().unwrap();
        Storefront::with_storage(StorefrontConfig::with_base_url(&base).unwrap(), Storage::memory())
            .unwrap()
    }

    fn signed_in(state: &Storefront) {
        let token = token_with(&json!({"userId": 5, "exp": 4_102_444_800_i64}));
        state
            .storage()
            .set_raw(keys::USER_TOKEN, token.expose())
            .unwrap();
    }

    fn ok(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    fn address_row(id: i64) -> serde_json::Value {
        json!({
            "address_id": id, "full_name": "Asha Verma", "mobile_no": "9876543210",
            "address_line1": "12 MG Road", "city": "Jaipur", "state": "Rajasthan",
            "pincode": "302001", "is_default": 1
        })
    }

    async fn mount_account(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/addresses"))
            .respond_with(ok(json!({"success": true, "addresses": [address_row(9)]})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ok(json!({"success": true, "cart": [{
                "product_id": 1, "title": "Grill Apron", "price": "450.00", "quantity": 2
            }]})))
            .mount(server)
            .await;
    }

    async fn confirmed_flow(state: Storefront) -> CheckoutFlow {
        let flow = CheckoutFlow::start(state).await.unwrap();
        assert_eq!(
            flow.selected_address(),
            Some(AddressRef::Server(AddressId::new(9)))
        );
        assert!(flow.proceed().await.unwrap().is_none());
        flow.request_confirmation().unwrap();
        flow
    }

    #[tokio::test]
    async fn test_empty_cart_refused() {
        let state = state_for("http://localhost:3000");
        let err = CheckoutFlow::start(state).await.unwrap_err();
        assert!(matches!(err, AppError::Checkout(CheckoutError::EmptyCart)));
        assert_eq!(err.user_message(), "Your cart is empty");
    }

    #[tokio::test]
    async fn test_guest_verification_creates_account_and_remaps_address() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send-otp"))
            .and(body_json(json!({"mobile": "9876543210"})))
            .respond_with(ok(json!({"success": true, "message": "OTP sent"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/verify-otp"))
            .and(body_json(json!({"mobile": "9876543210", "otp": "123456"})))
            .respond_with(ok(json!({"success": true})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/mobile-login-check"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false, "message": "No user exists with this mobile number"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .and(body_json(json!({
                "first_name": "Asha", "last_name": "Verma", "mobile": "9876543210"
            })))
            .respond_with(ok(json!({"success": true, "token": "new-token"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/addresses"))
            .respond_with(ok(json!({"success": true, "addressId": 31})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/addresses"))
            .respond_with(ok(json!({"success": true, "addresses": [address_row(31)]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ok(json!({"success": true, "cart": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add"))
            .and(body_json(json!({"productId": 1, "variantDetail": null, "quantity": 2})))
            .respond_with(ok(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let mut address = form("Asha Verma", "9876543210");
        address.is_default = true;
        let local = AddressBook::new(&state).save(address).await.unwrap();
        CartService::new(&state)
            .add(CartItem::new(
                ProductId::new(1),
                "Grill Apron".to_string(),
                Decimal::new(450, 0),
                None,
                2,
            ))
            .await
            .unwrap();

        let flow = CheckoutFlow::start(state.clone()).await.unwrap();
        assert_eq!(flow.selected_address(), Some(local.id));
        assert!(flow.can_proceed());

        let prompt = flow.proceed().await.unwrap().unwrap();
        assert_eq!(prompt.message(), "Enter the OTP sent to 9876543210");
        assert_eq!(flow.step(), CheckoutStep::GuestVerification);
        assert!(matches!(
            flow.resend_otp().await,
            Err(AppError::Checkout(CheckoutError::ResendCooldown { .. }))
        ));

        let outcome = flow.submit_otp(" 123456 ").await.unwrap();
        assert_eq!(outcome.account, AccountStatus::Created);
        assert_eq!(outcome.next_step, CheckoutStep::PaymentMethod);
        assert_eq!(outcome.cart.pushed, 1);
        assert_eq!(
            flow.selected_address(),
            Some(AddressRef::Server(AddressId::new(31)))
        );
        assert!(state.is_authenticated());
        assert!(AddressBook::new(&state).local().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_otp_keeps_guest_on_verification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send-otp"))
            .respond_with(ok(json!({"success": true})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/verify-otp"))
            .respond_with(ok(json!({"success": false, "message": "Invalid OTP"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(ok(json!({"success": true, "token": "t"})))
            .expect(0)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let saved = AddressBook::new(&state)
            .save(form("Asha Verma", "9876543210"))
            .await
            .unwrap();
        CartService::new(&state)
            .add(CartItem::new(
                ProductId::new(1),
                "Grill Apron".to_string(),
                Decimal::new(450, 0),
                None,
                1,
            ))
            .await
            .unwrap();

        let flow = CheckoutFlow::start(state).await.unwrap();
        assert!(!flow.can_proceed());
        flow.select_address(saved.id).unwrap();
        flow.proceed().await.unwrap();

        let err = flow.submit_otp("").await.unwrap_err();
        assert_eq!(err.user_message(), "Please enter OTP");
        let err = flow.submit_otp("000000").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid or expired OTP");
        assert_eq!(flow.step(), CheckoutStep::GuestVerification);

        flow.cancel_verification().unwrap();
        assert_eq!(flow.step(), CheckoutStep::AddressSelection);
    }

    #[tokio::test]
    async fn test_double_confirm_creates_one_order() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .and(body_partial_json(json!({
                "addressId": 9, "paymentMode": "COD", "totalAmount": 900.0
            })))
            .respond_with(ok(json!({"success": true, "orderId": 77})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cart/clear"))
            .respond_with(ok(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        signed_in(&state);
        let flow = confirmed_flow(state).await;

        let (first, second) = tokio::join!(flow.place_order(), flow.place_order());
        let results = [first, second];
        let placed = results
            .iter()
            .filter(|r| matches!(r, Ok(PlacementOutcome::Placed { order_id }) if *order_id == OrderId::new(77)))
            .count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Checkout(CheckoutError::AlreadySubmitting))))
            .count();
        assert_eq!((placed, refused), (1, 1));
        assert_eq!(flow.step(), CheckoutStep::Placed);

        assert!(matches!(
            flow.place_order().await,
            Err(AppError::Checkout(CheckoutError::AlreadyPlaced))
        ));
    }

    #[tokio::test]
    async fn test_stale_address_forces_reselection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/addresses"))
            .respond_with(ok(json!({"success": true, "addresses": [address_row(9)]})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/addresses"))
            .respond_with(ok(json!({"success": true, "addresses": [address_row(12)]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ok(json!({"success": true, "cart": [{
                "product_id": 1, "title": "Grill Apron", "price": 450, "quantity": 1
            }]})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .respond_with(ok(json!({"success": true, "orderId": 1})))
            .expect(0)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        signed_in(&state);
        let flow = confirmed_flow(state).await;

        let outcome = flow.place_order().await.unwrap();
        assert_eq!(outcome, PlacementOutcome::AddressReselectRequired);
        assert_eq!(flow.step(), CheckoutStep::AddressSelection);
        assert_eq!(flow.selected_address(), None);
        assert_eq!(flow.addresses().len(), 1);
        assert!(!flow.is_submitting());
    }

    #[tokio::test]
    async fn test_promo_updates_total() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/apply-promo"))
            .and(body_json(json!({"promoCode": "GRILL100"})))
            .respond_with(ok(json!({"success": true, "discountAmount": 100})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/apply-promo"))
            .and(body_json(json!({"promoCode": "OLD"})))
            .respond_with(ok(json!({"success": false, "message": "Offer expired"})))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        signed_in(&state);
        let flow = CheckoutFlow::start(state).await.unwrap();

        assert!(flow.apply_promo("   ").await.unwrap().is_none());
        flow.apply_promo(" GRILL100 ").await.unwrap().unwrap();
        let summary = flow.summary();
        assert_eq!(summary.subtotal, Decimal::new(900, 0));
        assert_eq!(summary.total, Decimal::new(800, 0));
        assert_eq!(flow.applied_offer_code().as_deref(), Some("GRILL100"));

        let err = flow.apply_promo("OLD").await.unwrap_err();
        assert_eq!(err.user_message(), "Offer expired");
        assert_eq!(flow.summary().total, Decimal::new(800, 0));
    }

    #[tokio::test]
    async fn test_online_payment_hands_off_once() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/create-payment-session"))
            .and(body_partial_json(json!({"paymentMode": "Online"})))
            .respond_with(ok(json!({
                "success": true, "paymentSessionId": "session_abc", "orderId": "BBQ1001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        signed_in(&state);
        let flow = CheckoutFlow::start(state).await.unwrap();
        flow.proceed().await.unwrap();
        flow.choose_payment(PaymentMode::Online).unwrap();
        flow.request_confirmation().unwrap();

        let PlacementOutcome::PaymentRedirect {
            session,
            environment,
        } = flow.place_order().await.unwrap()
        else {
            panic!("expected a payment redirect");
        };
        assert_eq!(session.payment_session_id, "session_abc");
        assert_eq!(environment, PaymentEnvironment::Sandbox);
        assert!(flow.is_submitting());
        assert!(matches!(
            flow.place_order().await,
            Err(AppError::Checkout(CheckoutError::AlreadySubmitting))
        ));
    }

    #[tokio::test]
    async fn test_place_order_outside_confirmation_resets_flag() {
        let server = MockServer::start().await;
        mount_account(&server).await;

        let state = state_for(&server.uri());
        signed_in(&state);
        let flow = CheckoutFlow::start(state).await.unwrap();

        let err = flow.place_order().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Checkout(CheckoutError::InvalidStep {
                expected: CheckoutStep::Confirmation,
                actual: CheckoutStep::AddressSelection,
            })
        ));
        assert!(!flow.is_submitting());
    }

    #[tokio::test]
    async fn test_order_server_error_allows_retry() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        signed_in(&state);
        let flow = confirmed_flow(state).await;

        for _ in 0..2 {
            let err = flow.place_order().await.unwrap_err();
            assert!(matches!(err, AppError::Checkout(CheckoutError::OrderFailed(_))));
            assert!(!flow.is_submitting());
            assert_eq!(flow.step(), CheckoutStep::Confirmation);
        }
    }

    #[tokio::test]
    async fn test_order_rejection_allows_retry() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .respond_with(ok(json!({"success": false, "message": "Out of stock"})))
            .expect(2)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        signed_in(&state);
        let flow = confirmed_flow(state).await;

        for _ in 0..2 {
            let err = flow.place_order().await.unwrap_err();
            assert!(matches!(
                &err,
                AppError::Checkout(CheckoutError::OrderRejected(message)) if message == "Out of stock"
            ));
            assert!(!flow.is_submitting());
            assert_eq!(flow.step(), CheckoutStep::Confirmation);
        }
        assert_eq!(flow.cart().len(), 1);
    }

    async fn online_flow(server: &MockServer) -> CheckoutFlow {
        let state = state_for(&server.uri());
        signed_in(&state);
        let flow = CheckoutFlow::start(state).await.unwrap();
        flow.proceed().await.unwrap();
        flow.choose_payment(PaymentMode::Online).unwrap();
        flow.request_confirmation().unwrap();
        flow
    }

    #[tokio::test]
    async fn test_payment_session_server_error_allows_retry() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/create-payment-session"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let flow = online_flow(&server).await;
        for _ in 0..2 {
            let err = flow.place_order().await.unwrap_err();
            assert!(matches!(err, AppError::Checkout(CheckoutError::PaymentSessionFailed(_))));
            assert!(!flow.is_submitting());
            assert_eq!(flow.step(), CheckoutStep::Confirmation);
        }
    }

    #[tokio::test]
    async fn test_payment_session_rejection_allows_retry() {
        let server = MockServer::start().await;
        mount_account(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/create-payment-session"))
            .respond_with(ok(json!({"success": false, "message": "Payment gateway unavailable"})))
            .expect(2)
            .mount(&server)
            .await;

        let flow = online_flow(&server).await;
        for _ in 0..2 {
            let err = flow.place_order().await.unwrap_err();
            assert!(matches!(
                err,
                AppError::Checkout(CheckoutError::PaymentSessionFailed(ApiError::Rejected { .. }))
            ));
            assert!(!flow.is_submitting());
            assert_eq!(flow.step(), CheckoutStep::Confirmation);
        }
    }
}
