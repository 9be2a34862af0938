//! Token restore, expiry and sign-in failures.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer};

use bbqstyle_core::UserId;
use bbqstyle_integration_tests::{customer_token, jwt, memory_storefront, ok, rejected};
use bbqstyle_storefront::AppError;
use bbqstyle_storefront::api::ApiError;
use bbqstyle_storefront::services::{AddressBook, AuthError, AuthSession};
use bbqstyle_storefront::store::keys;

#[tokio::test]
async fn test_restored_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    let token = customer_token(5, "9876543210");
    Mock::given(method("GET"))
        .and(path("/api/addresses"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ok(json!({"success": true, "addresses": []})))
        .expect(1)
        .mount(&server)
        .await;

    let state = memory_storefront(&server);
    state.storage().set_raw(keys::USER_TOKEN, &token).unwrap();
    let claims = AuthSession::new(&state).check().unwrap().unwrap();
    assert_eq!(claims.user_id, Some(UserId::new(5)));

    assert!(AddressBook::new(&state).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_token_signs_out() {
    let server = MockServer::start().await;
    let state = memory_storefront(&server);
    let expired = jwt(&json!({"userId": 5, "exp": 1_600_000_000_i64}));
    state.storage().set_raw(keys::USER_TOKEN, &expired).unwrap();

    assert!(AuthSession::new(&state).check().unwrap().is_none());
    assert!(!state.is_authenticated());
    assert_eq!(state.storage().get_raw(keys::USER_TOKEN).unwrap(), None);

    // Account-only endpoints are refused before any request is made.
    let err = state.api().addresses().await.unwrap_err();
    assert!(matches!(err, ApiError::NotAuthenticated));
    assert_eq!(
        AppError::from(err).user_message(),
        "Please log in to continue"
    );
}

#[tokio::test]
async fn test_wrong_password_is_reported_as_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(rejected(401, "Invalid email or password"))
        .mount(&server)
        .await;

    let state = memory_storefront(&server);
    let err = AuthSession::new(&state)
        .login("asha@example.com", &SecretString::from("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(!state.is_authenticated());
}

#[tokio::test]
async fn test_logout_forgets_token() {
    let server = MockServer::start().await;
    let state = memory_storefront(&server);
    state
        .storage()
        .set_raw(keys::USER_TOKEN, &customer_token(5, "9876543210"))
        .unwrap();
    let auth = AuthSession::new(&state);
    auth.check().unwrap().unwrap();

    auth.logout().unwrap();
    assert!(!auth.is_authenticated());
    assert!(auth.check().unwrap().is_none());
}
