//! Business logic services for storefront.
//!
//! # Services
//!
//! - `session` - Guest session ids and records
//! - `guest_cart` - Guest cart in the key-value store
//! - `guest_favorites` - Guest favorites in the key-value store
//! - `transfer` - Merge a guest session into a user's persistent rows
//! - `cart` - Signed-in user's cart with catalog checks
//! - `favorites` - Signed-in user's favorites
//!
//! Services borrow their collaborators, so a handler builds one per request:
//!
//! ```rust,ignore
//! let cart = GuestCartService::new(state.kv());
//! let items = cart.get_cart(&session_id).await?;
//! ```

mod error;
pub mod keys;

pub mod cart;
pub mod favorites;
pub mod guest_cart;
pub mod guest_favorites;
pub mod session;
pub mod transfer;

pub use cart::CartService;
pub use error::ServiceError;
pub use favorites::FavoritesService;
pub use guest_cart::GuestCartService;
pub use guest_favorites::GuestFavoritesService;
pub use session::SessionService;
pub use transfer::TransferService;
