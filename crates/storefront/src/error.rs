//! Unified error handling.
//!
//! Provides a unified `AppError` type for every storefront operation. Callers
//! show [`AppError::user_message`] to the customer and call
//! [`AppError::report`] so internal failures reach the logs.

use thiserror::Error;

use bbqstyle_core::{MobileError, OtpError};

use crate::api::ApiError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::models::{AddressError, CartError, VariantError};
use crate::services::auth::AuthError;
use crate::services::pincode::PincodeError;
use crate::store::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Local store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart edit refused.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Variant choice refused.
    #[error("Variant error: {0}")]
    Variant(#[from] VariantError),

    /// Address form incomplete or malformed.
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Mobile number malformed.
    #[error("Mobile error: {0}")]
    Mobile(#[from] MobileError),

    /// One-time code malformed.
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    /// Checkout step failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Pincode lookup failed.
    #[error("Pincode error: {0}")]
    Pincode(#[from] PincodeError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the customer.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error comes from our side rather than the customer's
    /// input or the backend's verdict.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Store(_) => true,
            Self::Api(err) => !matches!(err, ApiError::Rejected { .. } | ApiError::NotAuthenticated),
            Self::Auth(err) => matches!(err, AuthError::Store(_)),
            Self::Checkout(err) => err.is_internal(),
            Self::Pincode(err) => matches!(err, PincodeError::Url(_)),
            _ => false,
        }
    }

    /// Log internal failures. Customer-facing failures are logged at debug.
    pub fn report(&self) {
        if self.is_internal() {
            tracing::error!(error = %self, "Storefront error");
        } else {
            tracing::debug!(error = %self, "Request refused");
        }
    }

    /// Text to show the customer.
    ///
    /// Internal details (HTTP bodies, I/O errors) are never included.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) | Self::Store(_) => "Something went wrong. Please try again.".to_string(),
            Self::Api(err) => api_message(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this mobile number already exists".to_string()
                }
                AuthError::UserNotFound => "No user exists with this mobile number".to_string(),
                AuthError::NotSignedIn => "Please log in to continue".to_string(),
                AuthError::Api(err) => api_message(err),
                AuthError::Store(_) => "Something went wrong. Please try again.".to_string(),
            },
            Self::Cart(err) => err.to_string(),
            Self::Variant(err) => err.to_string(),
            Self::Address(err) => err.to_string(),
            Self::Mobile(_) => "Please enter a valid 10-digit mobile number".to_string(),
            Self::Otp(OtpError::Empty) => "Please enter OTP".to_string(),
            Self::Otp(_) => "Invalid or expired OTP".to_string(),
            Self::Checkout(err) => err.user_message(),
            Self::Pincode(err) => match err {
                PincodeError::Invalid => "Pincode must be 6 digits".to_string(),
                PincodeError::NotFound(_) => "No location found for this pincode".to_string(),
                PincodeError::Http(_) | PincodeError::Url(_) => {
                    "Could not look up this pincode".to_string()
                }
            },
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(message) => message.clone(),
        }
    }
}

/// Customer-facing text for a backend failure.
pub(crate) fn api_message(err: &ApiError) -> String {
    match err {
        ApiError::Rejected { message, .. } => message.clone(),
        ApiError::NotAuthenticated => "Please log in to continue".to_string(),
        ApiError::Http(_) => "Network error. Please check your connection and try again.".to_string(),
        ApiError::Status { .. } | ApiError::Parse(_) | ApiError::Url(_) => {
            "Something went wrong. Please try again.".to_string()
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use bbqstyle_core::{CartKey, ProductId};

    use super::*;

    #[test]
    fn test_backend_message_shown() {
        let err = AppError::from(ApiError::Rejected {
            status: 200,
            message: "Invalid promo code".to_string(),
        });
        assert_eq!(err.user_message(), "Invalid promo code");
        assert!(!err.is_internal());
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::from(ApiError::Status {
            status: 502,
            body: "<html>upstream exploded</html>".to_string(),
        });
        assert!(err.is_internal());
        assert!(!err.user_message().contains("upstream"));
    }

    #[test]
    fn test_cart_and_otp_messages() {
        let err = AppError::from(CartError::ExceedsStock { available: 2 });
        assert_eq!(err.user_message(), "Only 2 items available in stock");

        let err = AppError::from(OtpError::Empty);
        assert_eq!(err.user_message(), "Please enter OTP");

        let key = CartKey::new(ProductId::new(7), None);
        let err = AppError::from(CartError::ItemNotFound(key));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_auth_messages() {
        assert_eq!(
            AppError::from(AuthError::from(ApiError::NotAuthenticated)).user_message(),
            "Please log in to continue"
        );
        assert_eq!(
            AppError::from(AuthError::UserNotFound).user_message(),
            "No user exists with this mobile number"
        );
    }
}
