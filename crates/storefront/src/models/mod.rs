//! Domain models for storefront.
//!
//! These types represent validated domain objects separate from the raw
//! key-value entries and database rows they are built from.

pub mod cart;
pub mod catalog;
pub mod response;
pub mod session;
pub mod transfer;

pub use cart::{
    CartIssue, CartLine, CartRow, CartSummary, CartValidation, FavoriteRow, GuestCartItem,
};
pub use catalog::VariantDetails;
pub use response::ApiResponse;
pub use session::SessionData;
pub use transfer::{MergeOutcome, TransferEntity, TransferReport, TransferSummary};
