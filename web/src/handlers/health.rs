//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use storefront_core::{EmailProvider, KvStore, PaymentGateway};

/// Liveness: the process is up. Dependencies are not checked.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness: the KV store answers.
///
/// ```text
/// GET /health/ready
/// ```
///
/// - 200 `ok`
/// - 503 `kv unavailable`
pub async fn readiness<K, P, E>(State(state): State<AppState<K, P, E>>) -> (StatusCode, &'static str)
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    match state.shop.catalog.list_slugs().await {
        Ok(_) => (StatusCode::OK, "ok"),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "kv unavailable")
        }
    }
}
