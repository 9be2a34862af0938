//! BBQ Style Core - Shared types library.
//!
//! This crate provides common types used across all BBQ Style components:
//! - `storefront` - Headless storefront client (cart, wishlist, checkout)
//! - `cli` - Command-line driver for the storefront client
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no local storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, mobile numbers,
//!   OTP codes, cart keys and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
