//! `POST /api/webhooks/payments`
//!
//! The body must reach signature verification byte for byte, so it is read
//! as raw [`Bytes`]. Replies are plain text. Any 5xx makes the processor
//! retry the delivery. A delivery that fails before its order is written
//! has released any stock it took, and one that fails after stops at the
//! existence check on retry.

use crate::error::AppError;
use crate::extractors::CorrelationId;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use storefront_core::{EmailProvider, KvStore, PaymentGateway, ShopError};
use tracing::info;

/// Signature header set by the processor.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verify, parse and process one event.
///
/// # Errors
///
/// - 400 `Missing Stripe signature` without the header
/// - 400 `Webhook Error: ...` for a bad signature or body
/// - 400 for completed checkouts without cart metadata
/// - 500 if the KV store fails
pub async fn receive_payment_event<K, P, E>(
    State(state): State<AppState<K, P, E>>,
    CorrelationId(correlation_id): CorrelationId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), AppError>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        return Err(AppError::bad_request("Missing Stripe signature"));
    };

    let shop = &state.shop;
    let event = shop
        .payments
        .construct_event(&body, signature, shop.clock.unix_seconds())
        .map_err(|err| AppError::bad_request(format!("Webhook Error: {}", short_reason(&err))))?;

    info!(%correlation_id, event_type = %event.event_type(), "Payment event received");

    let outcome = shop.handle_payment_event(event).await?;
    Ok((StatusCode::OK, outcome.response_text()))
}

fn short_reason(err: &ShopError) -> String {
    match err {
        ShopError::InvalidSignature(reason) | ShopError::Serialization(reason) => reason.clone(),
        other => other.to_string(),
    }
}
