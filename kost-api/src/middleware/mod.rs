//! Middleware modules for the kost API
//!
//! - `identity`: maps the `X-API-Key` header to a [`kost_core::Requester`]
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/properties/:id/availability", put(handler))
//!     // Innermost
//!     .layer(middleware::from_fn_with_state(identity_state, identity_middleware))
//!     // Outermost: tracing, timeout, concurrency limit, CORS
//! ```

mod identity;

pub use identity::{
    identity_middleware, IdentityMiddlewareError, IdentityState, RequesterExtractor, API_KEY_HEADER,
};
