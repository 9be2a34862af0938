//! BBQ Style storefront client library.
//!
//! Talks to the storefront REST backend on behalf of one customer. Guests
//! keep their cart, wishlist and addresses in a local store; once signed in
//! the backend is the source of truth and guest state is moved across.
//!
//! # Modules
//!
//! - [`api`] - REST client, wire shapes and product cache
//! - [`checkout`] - Checkout state machine with OTP guest verification
//! - [`config`] - Environment-based configuration
//! - [`models`] - Cart, wishlist, address, order and token models
//! - [`services`] - Cart, wishlist, address, auth, OTP, tracking and pincode
//! - [`state`] - Shared client state
//! - [`store`] - Local key-value store

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

pub use error::{AppError, Result};
pub use state::Storefront;
