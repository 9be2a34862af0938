//! Domain models for the storefront.
//!
//! Wire shapes from the backend and the local store are adapted into these
//! types at the edges, so the services only ever see one schema.

pub mod address;
pub mod cart;
pub(crate) mod de;
pub mod order;
pub mod product;
pub mod token;
pub mod wishlist;

pub use address::{AccountName, Address, AddressError, LocalAddress, NewAddress, ServerAddress};
pub use cart::{Cart, CartError, CartItem, CartToggle};
pub use order::{OrderDraft, OrderLine, OrderSummary};
pub use product::{ProductDetail, ProductImage, Review, VariantError, VariantTypes};
pub use token::{AuthToken, TokenClaims};
pub use wishlist::{Wishlist, WishlistEntry, WishlistItem};
