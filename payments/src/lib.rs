//! # Storefront Payments
//!
//! Stripe implementation of [`PaymentGateway`](storefront_core::PaymentGateway).
//!
//! - [`StripeGateway`]: hosted checkout sessions and line-item lookups over
//!   the REST API, plus webhook event construction
//! - [`signature`]: HMAC-SHA256 webhook signature verification

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod signature;
pub mod stripe;

pub use signature::{compute_signature, verify_at, DEFAULT_TOLERANCE_SECS};
pub use stripe::StripeGateway;
