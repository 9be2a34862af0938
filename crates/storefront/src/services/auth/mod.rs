//! Authentication service.
//!
//! Keeps the bearer token in the local store and in the API client's token
//! slot in step. Tokens are checked on load: an expired or undecodable
//! token is discarded, which signs the customer out.

mod error;

pub use error::AuthError;

use secrecy::SecretString;
use tracing::{info, instrument, warn};

use bbqstyle_core::MobileNumber;

use crate::models::{AccountName, AuthToken, TokenClaims};
use crate::state::Storefront;
use crate::store::keys;

/// Authentication service.
///
/// Handles token restore, login, registration and logout.
pub struct AuthSession<'a> {
    state: &'a Storefront,
}

impl<'a> AuthSession<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(state: &'a Storefront) -> Self {
        Self { state }
    }

    /// Whether a token is loaded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Load the stored token and check it.
    ///
    /// Returns the token's claims if it is usable. An expired or malformed
    /// token is removed from the store and the client is signed out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the store cannot be read or written.
    pub fn check(&self) -> Result<Option<TokenClaims>, AuthError> {
        let Some(raw) = self.state.storage().get_raw(keys::USER_TOKEN)? else {
            self.state.api().clear_token();
            return Ok(None);
        };

        let token = AuthToken::new(raw);
        match token.claims() {
            Some(claims) if !claims.is_expired() => {
                self.state.api().set_token(token);
                Ok(Some(claims))
            }
            Some(_) => {
                info!("Stored token expired, signing out");
                self.logout()?;
                Ok(None)
            }
            None => {
                warn!("Stored token is not a readable JWT, discarding");
                self.logout()?;
                Ok(None)
            }
        }
    }

    /// Email and password login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when the backend refuses them.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<TokenClaims, AuthError> {
        let token = self
            .state
            .api()
            .login(email, password)
            .await
            .map_err(|e| match e.status() {
                Some(400 | 401) => AuthError::InvalidCredentials,
                _ => AuthError::from(e),
            })?;
        self.adopt(token)
    }

    /// Sign in a mobile number that has just passed OTP verification.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account uses this number.
    #[instrument(skip(self, mobile), fields(mobile = %mobile.masked()))]
    pub async fn login_with_mobile(&self, mobile: &MobileNumber) -> Result<TokenClaims, AuthError> {
        let token = self
            .state
            .api()
            .mobile_login_direct(mobile)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    AuthError::UserNotFound
                } else {
                    AuthError::from(e)
                }
            })?;
        self.adopt(token)
    }

    /// Create an account for a verified mobile number and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the number is registered.
    #[instrument(skip(self, name, mobile), fields(mobile = %mobile.masked()))]
    pub async fn register(
        &self,
        name: &AccountName,
        mobile: &MobileNumber,
    ) -> Result<TokenClaims, AuthError> {
        let token = self
            .state
            .api()
            .register(name, mobile)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    AuthError::UserAlreadyExists
                } else {
                    AuthError::from(e)
                }
            })?;
        info!("Account created");
        self.adopt(token)
    }

    /// Forget the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the store cannot be written.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.state.api().clear_token();
        self.state.storage().remove(keys::USER_TOKEN)?;
        Ok(())
    }

    /// Ask the backend whether the token is an admin session.
    ///
    /// Customer tokens are refused by that endpoint, so this is `false` for
    /// every storefront customer.
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than an unauthorized answer.
    #[instrument(skip(self))]
    pub async fn has_admin_session(&self) -> Result<bool, AuthError> {
        match self.state.api().session().await {
            Ok(_) => Ok(true),
            Err(e) if e.is_unauthorized() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a freshly issued token and load it into the client.
    fn adopt(&self, token: AuthToken) -> Result<TokenClaims, AuthError> {
        let claims = token.claims().unwrap_or_default();
        self.state
            .storage()
            .set_raw(keys::USER_TOKEN, token.expose())?;
        self.state.api().set_token(token);
        Ok(claims)
    }
}
