//! # Storefront Core
//!
//! Domain types and pure decision logic for the storefront.
//!
//! This crate has no I/O. It defines:
//!
//! - **Stock planning**: request normalization, the all-or-nothing batch
//!   decrement check and low/zero threshold transitions
//! - **Orders**: lenient record normalization, status filtering and pagination
//! - **Products**: catalog records and admin drafts
//! - **Payments**: checkout session requests and verified webhook events
//! - **Providers**: the contracts the services expect from the key-value
//!   store, the payment processor and the email provider
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │  storefront-web (Axum handlers)           │
//! ├───────────────────────────────────────────┤
//! │  storefront-commerce (services)           │
//! ├───────────────────────────────────────────┤
//! │  storefront-core (types, pure logic)      │  ← this crate
//! ├───────────────────────────────────────────┤
//! │  Providers: Redis │ Stripe │ SMTP         │
//! └───────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod environment;
pub mod error;
pub mod keys;
pub mod loose;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod providers;
pub mod stock;

pub use environment::{Clock, SystemClock};
pub use error::{Result, ShopError};
pub use order::{OrderRecord, OrderStatus};
pub use product::Product;
pub use providers::{EmailProvider, KvStore, PaymentGateway};
pub use stock::{DecrementOutcome, StockChange, StockLine, StockRequest, StockTransition};
