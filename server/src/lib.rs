//! # Storefront Server
//!
//! Process wiring for the storefront: environment configuration, the email
//! provider choice, metric descriptions and the catalog seed loader. The
//! `storefront` binary serves HTTP; `storefront-seed` loads a catalog file
//! into Redis.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod mailer;
pub mod metrics;
pub mod seed;

pub use config::Config;
pub use mailer::Mailer;
