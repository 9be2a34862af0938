//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already exists for this mobile number or email.
    #[error("user already exists")]
    UserAlreadyExists,

    /// No account exists for this mobile number.
    #[error("user not found")]
    UserNotFound,

    /// The operation needs a signed-in customer.
    #[error("not signed in")]
    NotSignedIn,

    /// Backend call failed.
    #[error("api error: {0}")]
    Api(ApiError),

    /// Reading or writing the stored token failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotAuthenticated => Self::NotSignedIn,
            other => Self::Api(other),
        }
    }
}
