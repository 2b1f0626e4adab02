//! HTTP request handlers, one module per area.

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod webhook;

pub use health::health_check;
