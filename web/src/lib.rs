//! # Storefront Web
//!
//! The Axum HTTP surface of the storefront: a JSON/form API over the
//! services in `storefront-commerce`.
//!
//! # Request Flow
//!
//! 1. **Correlation id** assigned by [`middleware`] and recorded on the span
//! 2. **Extract** state, client address, admin session and body
//!    ([`extractors`])
//! 3. **Call** one `Shop` operation
//! 4. **Map** the outcome to a response, or the [`ShopError`] to an
//!    [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::new(shop, sessions, config.secure_cookies);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```
//!
//! [`ShopError`]: storefront_core::ShopError

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{AdminSession, ClientIp, CorrelationId, Submission};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
