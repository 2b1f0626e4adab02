//! Mock implementations of the provider contracts.

pub mod clock;
pub mod email;
pub mod kv;
pub mod payments;

/// Error message returned by mocks told to fail.
pub const INJECTED_FAILURE: &str = "injected failure";
