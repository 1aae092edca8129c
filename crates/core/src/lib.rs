//! Basket Core - Shared types library.
//!
//! This crate provides common types used across all Basket components:
//! - `storefront` - Guest/user cart, favorites and transfer service
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no key-value store clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for validated IDs, prices, and availability statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
