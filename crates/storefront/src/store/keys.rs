//! Well-known local store keys.

/// Guest cart entries.
pub const CART: &str = "cart";

/// Guest wishlist entries.
pub const WISHLIST: &str = "wishlist";

/// Guest addresses awaiting migration to the backend.
pub const ADDRESSES: &str = "addresses";

/// Bearer token of the signed-in customer.
pub const USER_TOKEN: &str = "userToken";

/// Set once the visitor beacon has been sent.
pub const VISITOR_TRACKED: &str = "bbq_visitor_tracked";
