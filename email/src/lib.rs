//! # Storefront Email
//!
//! [`EmailProvider`](storefront_core::EmailProvider) implementations:
//!
//! - [`SmtpEmailProvider`]: sends through an SMTP relay with Lettre
//! - [`ConsoleEmailProvider`]: logs messages, for development
//!
//! Both render plain-text bodies with [`Templates`].

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod console;
pub mod smtp;
pub mod templates;

pub use console::ConsoleEmailProvider;
pub use smtp::SmtpEmailProvider;
pub use templates::{Rendered, Templates};
