//! Error types for storefront operations.

use thiserror::Error;

/// Result type alias for storefront operations.
pub type Result<T> = std::result::Result<T, ShopError>;

/// Error taxonomy shared by every storefront crate.
///
/// Variants are grouped by who caused the failure: the caller (bad input,
/// missing records, state conflicts) or an external collaborator (KV store,
/// payment processor, email provider).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShopError {
    // ═══════════════════════════════════════════════════════════
    // Caller Errors
    // ═══════════════════════════════════════════════════════════

    /// Requested record does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of record (e.g. "Order", "Product")
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Request payload failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation is not allowed in the record's current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or invalid admin credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Webhook payload could not be authenticated.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    // ═══════════════════════════════════════════════════════════
    // Collaborator Errors
    // ═══════════════════════════════════════════════════════════

    /// The KV store cannot evaluate server-side scripts.
    #[error("Atomic scripting is unavailable")]
    ScriptUnavailable,

    /// KV store request failed.
    #[error("Key-value store error: {0}")]
    Kv(String),

    /// Stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Payment processor request failed.
    #[error("Payment provider error: {0}")]
    Payment(String),

    /// Email delivery failed.
    #[error("Email delivery failed: {0}")]
    Email(String),

    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ShopError {
    /// Shorthand for [`ShopError::NotFound`].
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Returns `true` if the caller caused this error.
    ///
    /// # Examples
    ///
    /// ```
    /// # use storefront_core::ShopError;
    /// assert!(ShopError::InvalidInput("missing slug".into()).is_user_error());
    /// assert!(!ShopError::Kv("timeout".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidInput(_)
                | Self::Conflict(_)
                | Self::Unauthorized
                | Self::InvalidSignature(_)
        )
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
