//! # Storefront Commerce
//!
//! Services over the provider contracts in `storefront-core`:
//!
//! - [`Inventory`]: live stock counters, atomic batch decrement with a
//!   sequential fallback
//! - [`Catalog`]: product snapshots, visibility flags and admin saves
//! - [`OrderBook`]: order records and the order index
//! - [`Shop`]: the bundle, plus the operations that span services
//!   (webhook processing, checkout, shipping, conflict resolution)
//! - [`RateLimiter`] and [`AdminSessions`] for the HTTP layer
//!
//! ## Example
//!
//! ```rust,ignore
//! let shop = Shop::new(kv, payments, email, Arc::new(SystemClock), config);
//! let event = shop.payments.construct_event(&body, signature, now)?;
//! match shop.handle_payment_event(event).await? {
//!     WebhookOutcome::StockConflict(order) => { /* needs an admin */ }
//!     outcome => tracing::info!(outcome = outcome.label()),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod admin_session;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod fulfillment;
pub mod inventory;
pub mod notify;
pub mod orders;
pub mod rate_limit;
pub mod shop;
mod store;
pub mod webhook;

pub use admin_session::AdminSessions;
pub use catalog::Catalog;
pub use checkout::{CheckoutRedirect, CheckoutRequest};
pub use config::ShopConfig;
pub use fulfillment::{ResolveOutcome, ShipOutcome, ShippingDetails};
pub use inventory::{DecrementPath, DecrementReport, Inventory};
pub use notify::Notifier;
pub use orders::OrderBook;
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use shop::Shop;
pub use webhook::WebhookOutcome;
