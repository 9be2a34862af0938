//! Core types for BBQ Style.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart_key;
pub mod id;
pub mod mobile;
pub mod otp;
pub mod price;
pub mod status;

pub use cart_key::{CartKey, CartKeyError};
pub use id::*;
pub use mobile::{MobileError, MobileNumber};
pub use otp::{OtpCode, OtpError};
pub use price::{CurrencyCode, Price};
pub use status::*;
