//! Business logic services for the storefront.
//!
//! Each service borrows the shared [`Storefront`](crate::state::Storefront)
//! state and is cheap to construct per operation.
//!
//! # Services
//!
//! - `auth` - Token restore, login, registration, logout
//! - `cart` - Guest and account carts, sync at sign-in
//! - `wishlist` - Guest and account wishlists, sync at sign-in
//! - `addresses` - Address book and guest address migration
//! - `otp` - One-time codes and the resend cooldown
//! - `tracking` - Order tracking and the visitor beacon
//! - `pincode` - District and state lookup for address forms

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod otp;
pub mod pincode;
pub mod tracking;
pub mod wishlist;

pub use addresses::{AddressBook, AddressMigration};
pub use auth::{AuthError, AuthSession};
pub use cart::{CartService, SyncReport};
pub use otp::{OtpService, ResendCooldown};
pub use pincode::{PincodeClient, PincodeError, PincodeLocation};
pub use tracking::TrackingService;
pub use wishlist::WishlistService;
