//! Checkout flow.
//!
//! # Steps
//!
//! ```text
//! AddressSelection ──proceed──▶ (GuestVerification) ──▶ PaymentMethod
//!        ▲                              │                     │
//!        └──────── cancel / back ───────┴─────────────────────┤
//!                                                             ▼
//!                                  Placed ◀──place_order── Confirmation
//! ```
//!
//! Guests pass through `GuestVerification`: an OTP is sent to the selected
//! address's mobile number, and a verified number is either signed in to its
//! existing account or registered as a new one. Guest addresses, cart and
//! wishlist are moved to the account before payment is chosen.
//!
//! Promo codes can be applied at any step before the order is placed.

mod flow;

pub use flow::CheckoutFlow;

use std::time::Duration;

use thiserror::Error;

use bbqstyle_core::{MobileNumber, OrderId};

use crate::api::ApiError;
use crate::api::types::PaymentSession;
use crate::config::PaymentEnvironment;
use crate::error::api_message;
use crate::models::CartError;
use crate::services::{AddressMigration, SyncReport};

/// Where the customer is in the checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutStep {
    AddressSelection,
    GuestVerification,
    PaymentMethod,
    Confirmation,
    Placed,
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AddressSelection => "address selection",
            Self::GuestVerification => "mobile verification",
            Self::PaymentMethod => "payment method",
            Self::Confirmation => "confirmation",
            Self::Placed => "placed",
        };
        f.write_str(name)
    }
}

/// Errors raised by checkout steps.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("cart not ready: {0}")]
    Cart(#[from] CartError),

    #[error("no address selected")]
    NoAddressSelected,

    #[error("address is not in the address book")]
    AddressNotFound,

    #[error("selected address has no usable mobile number")]
    MobileRequired,

    /// The action does not belong to the current step.
    #[error("cannot do this during {actual}, expected {expected}")]
    InvalidStep {
        expected: CheckoutStep,
        actual: CheckoutStep,
    },

    #[error("resend available in {remaining_secs}s")]
    ResendCooldown { remaining_secs: u64 },

    #[error("OTP rejected")]
    InvalidOtp,

    /// Verification could not be completed for reasons other than a wrong
    /// code.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("order is already being placed")]
    AlreadySubmitting,

    #[error("order already placed")]
    AlreadyPlaced,

    #[error("promo code rejected: {0}")]
    PromoRejected(String),

    #[error("promo request failed: {0}")]
    PromoFailed(ApiError),

    #[error("payment session failed: {0}")]
    PaymentSessionFailed(ApiError),

    #[error("address check failed: {0}")]
    AddressVerificationFailed(ApiError),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("order request failed: {0}")]
    OrderFailed(ApiError),
}

impl CheckoutError {
    /// Whether the failure is on our side or the network's rather than a
    /// refusal the customer can act on.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::VerificationFailed(_)
                | Self::PromoFailed(_)
                | Self::PaymentSessionFailed(_)
                | Self::AddressVerificationFailed(_)
                | Self::OrderFailed(_)
        )
    }

    /// Text to show the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::Cart(err) => err.to_string(),
            Self::NoAddressSelected => "Please select an address first".to_string(),
            Self::AddressNotFound => "Please select a valid address".to_string(),
            Self::MobileRequired => "Mobile number is required for verification".to_string(),
            Self::InvalidStep { .. } => "This action is not available right now".to_string(),
            Self::ResendCooldown { remaining_secs } => {
                format!("You can resend the OTP in {remaining_secs}s")
            }
            Self::InvalidOtp => "Invalid or expired OTP".to_string(),
            Self::VerificationFailed(_) => "Verification failed".to_string(),
            Self::AlreadySubmitting => "Your order is being placed".to_string(),
            Self::AlreadyPlaced => "This order has already been placed".to_string(),
            Self::PromoRejected(message) => message.clone(),
            Self::PromoFailed(_) => "Failed to apply promo code".to_string(),
            Self::PaymentSessionFailed(err) => match err {
                ApiError::Rejected { message, .. } => message.clone(),
                _ => "Failed to create payment session".to_string(),
            },
            Self::AddressVerificationFailed(_) => {
                "Failed to verify address. Please try again.".to_string()
            }
            Self::OrderRejected(message) => message.clone(),
            Self::OrderFailed(err) => match err {
                ApiError::NotAuthenticated => api_message(err),
                _ => "Failed to place order".to_string(),
            },
        }
    }
}

/// Shown while the customer enters the code sent to their phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPrompt {
    pub mobile: MobileNumber,
    pub resend_in: Duration,
}

impl VerificationPrompt {
    #[must_use]
    pub fn message(&self) -> String {
        format!("Enter the OTP sent to {}", self.mobile)
    }
}

/// How a verified mobile number was tied to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// An account already used this number and is now signed in.
    LoggedInExisting,
    /// A new account was registered for the number.
    Created,
}

/// Result of a successful OTP submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub account: AccountStatus,
    pub addresses: AddressMigration,
    pub cart: SyncReport,
    pub wishlist: SyncReport,
    /// `PaymentMethod`, or `AddressSelection` when the selected address
    /// could not be moved to the account.
    pub next_step: CheckoutStep,
}

/// Result of confirming the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Cash-on-delivery order created.
    Placed { order_id: OrderId },
    /// Online payment continues on the hosted payment page.
    PaymentRedirect {
        session: PaymentSession,
        environment: PaymentEnvironment,
    },
    /// The selected address no longer exists; the flow is back at
    /// address selection with a refreshed address list.
    AddressReselectRequired,
}

impl PlacementOutcome {
    /// Text to show the customer.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "Order placed successfully!",
            Self::PaymentRedirect { .. } => "Redirecting to payment",
            Self::AddressReselectRequired => {
                "Selected address is invalid. Please select a valid address."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promo_messages() {
        assert_eq!(
            CheckoutError::PromoRejected("Offer expired".to_string()).user_message(),
            "Offer expired"
        );
        assert_eq!(
            CheckoutError::PromoFailed(ApiError::Status {
                status: 500,
                body: "boom".to_string()
            })
            .user_message(),
            "Failed to apply promo code"
        );
    }

    #[test]
    fn test_step_errors_are_not_internal() {
        let err = CheckoutError::InvalidStep {
            expected: CheckoutStep::Confirmation,
            actual: CheckoutStep::AddressSelection,
        };
        assert!(!err.is_internal());
        assert_eq!(
            err.to_string(),
            "cannot do this during address selection, expected confirmation"
        );
    }
}
