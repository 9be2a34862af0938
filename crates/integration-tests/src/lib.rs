//! End-to-end tests for the BBQ Style storefront client.
//!
//! Every test starts a [`wiremock`] server standing in for the backend and
//! points a [`Storefront`] at it, so the suite needs no network access.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bbqstyle-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `guest_checkout` - Guest verification through to a placed order
//! - `cart_sync` - Guest data on disk and its move to an account
//! - `session` - Token restore, expiry and sign-in errors

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bbqstyle_storefront::Storefront;
use bbqstyle_storefront::config::StorefrontConfig;
use bbqstyle_storefront::store::Storage;

/// Expiry far in the future (2100-01-01).
pub const FAR_FUTURE: i64 = 4_102_444_800;

/// Storefront state over an in-memory store, talking to `server`.
pub fn memory_storefront(server: &MockServer) -> Storefront {
    Storefront::with_storage(config_for(server), Storage::memory()).unwrap()
}

/// Storefront state over a file store in `dir`, talking to `server`.
pub fn file_storefront(server: &MockServer, dir: &PathBuf) -> Storefront {
    let mut config = config_for(server);
    config.state_dir.clone_from(dir);
    Storefront::open(config).unwrap()
}

fn config_for(server: &MockServer) -> StorefrontConfig {
    let base: Url = server.uri().parse().unwrap();
    StorefrontConfig::with_base_url(&base).unwrap()
}

/// A fresh directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("bbqstyle-it-{}", uuid::Uuid::new_v4()))
}

/// Unsigned JWT carrying `claims`. The client never checks signatures.
pub fn jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Token for customer `user_id` that expires in 2100.
pub fn customer_token(user_id: i64, mobile: &str) -> String {
    jwt(&json!({"userId": user_id, "mobile": mobile, "exp": FAR_FUTURE}))
}

/// `200 OK` with a JSON body.
pub fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Error status with the backend's `{success: false, message}` envelope.
pub fn rejected(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({"success": false, "message": message}))
}

/// Address row as `GET /api/addresses` returns it.
pub fn address_row(id: i64, name: &str, mobile: &str) -> Value {
    json!({
        "address_id": id, "full_name": name, "mobile_no": mobile,
        "address_line1": "12 MG Road", "city": "Jaipur", "state": "Rajasthan",
        "pincode": "302001", "is_default": 1
    })
}

/// Answer OTP sends and accept `code` for any number.
pub async fn mount_otp(server: &MockServer, code: &str) {
    Mock::given(method("POST"))
        .and(path("/api/send-otp"))
        .respond_with(ok(json!({"success": true, "message": "OTP sent"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/verify-otp"))
        .and(wiremock::matchers::body_partial_json(json!({"otp": code})))
        .respond_with(ok(json!({"success": true})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/verify-otp"))
        .respond_with(ok(json!({"success": false, "message": "Invalid OTP"})))
        .mount(server)
        .await;
}

/// Product lookups fail so carts keep the lines they were given.
pub async fn mount_no_products(server: &MockServer) {
    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex(r"^/api/public/products/\d+$"))
        .respond_with(rejected(404, "Product not found"))
        .mount(server)
        .await;
}
