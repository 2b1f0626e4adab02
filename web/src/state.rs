//! Application state for Axum handlers.

use axum::extract::FromRef;
use std::sync::Arc;
use storefront_commerce::{AdminSessions, Shop};

/// Application state shared across all HTTP handlers.
///
/// Generic over the KV store, payment gateway and email provider so the
/// same router runs against Redis and Stripe in production and against the
/// in-memory fakes in tests.
pub struct AppState<K, P, E> {
    /// Storefront services.
    pub shop: Arc<Shop<K, P, E>>,
    /// Admin session tokens.
    pub sessions: Arc<AdminSessions>,
    /// Add `Secure` to the session cookie.
    pub secure_cookies: bool,
}

impl<K, P, E> AppState<K, P, E> {
    /// Create the state.
    #[must_use]
    pub fn new(shop: Shop<K, P, E>, sessions: AdminSessions, secure_cookies: bool) -> Self {
        Self {
            shop: Arc::new(shop),
            sessions: Arc::new(sessions),
            secure_cookies,
        }
    }
}

// Manual impl: the providers themselves need not be `Clone`.
impl<K, P, E> Clone for AppState<K, P, E> {
    fn clone(&self) -> Self {
        Self {
            shop: Arc::clone(&self.shop),
            sessions: Arc::clone(&self.sessions),
            secure_cookies: self.secure_cookies,
        }
    }
}

impl<K, P, E> FromRef<AppState<K, P, E>> for Arc<AdminSessions> {
    fn from_ref(state: &AppState<K, P, E>) -> Self {
        Arc::clone(&state.sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_testing::{MemoryKvStore, MockPaymentGateway, RecordingEmailProvider};

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState<MemoryKvStore, MockPaymentGateway, RecordingEmailProvider>>();
    }
}
