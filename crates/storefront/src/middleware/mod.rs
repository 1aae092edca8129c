//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (API-only policy)
//!
//! Identity is resolved per handler by extractors: [`GuestSession`] for the
//! guest cookie or header, [`RequireUser`] for the user id set by the auth
//! gateway.

pub mod auth;
pub mod guest;
pub mod request_id;
pub mod security_headers;

pub use auth::RequireUser;
pub use guest::{GUEST_COOKIE, GUEST_HEADER, GuestSession};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
