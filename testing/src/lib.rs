//! # Storefront Testing
//!
//! In-memory implementations of the provider contracts, for unit and
//! integration tests across the workspace.
//!
//! This crate provides:
//! - [`MemoryKvStore`]: a KV store with an atomic decrement that can be
//!   switched off to exercise the fallback path, and write failures that
//!   can be aimed at a key prefix
//! - [`MockPaymentGateway`]: records checkout sessions and accepts a fixed
//!   webhook signature
//! - [`RecordingEmailProvider`]: captures sent emails, optionally failing
//! - [`FixedClock`]: deterministic, manually advanced time
//!
//! ## Example
//!
//! ```
//! use storefront_testing::FixedClock;
//! use storefront_core::Clock;
//!
//! let clock = FixedClock::at_unix(1_700_000_000);
//! assert_eq!(clock.unix_seconds(), 1_700_000_000);
//! clock.advance_secs(60);
//! assert_eq!(clock.unix_seconds(), 1_700_000_060);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]

pub mod mocks;

pub use mocks::clock::{test_clock, FixedClock};
pub use mocks::email::RecordingEmailProvider;
pub use mocks::kv::MemoryKvStore;
pub use mocks::payments::{MockPaymentGateway, TEST_SIGNATURE};
