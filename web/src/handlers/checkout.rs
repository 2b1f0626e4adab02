//! `POST /api/checkout`

use crate::error::AppError;
use crate::extractors::{ClientIp, Submission};
use crate::responses::RateLimitHeaders;
use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::{json, Value};
use storefront_commerce::CheckoutRequest;
use storefront_core::loose;
use storefront_core::{EmailProvider, KvStore, PaymentGateway, StockRequest};

/// Rate-limit namespace.
pub const CHECKOUT_NAMESPACE: &str = "checkout";

/// Start a hosted checkout.
///
/// A `slug` (form or JSON) redirects the browser with 303 to the hosted
/// page. A JSON `items` array creates a cart checkout and answers
/// `{ "ok": true, "url": ... }`. Every response carries the rate-limit
/// headers.
pub async fn create_checkout<K, P, E>(
    State(state): State<AppState<K, P, E>>,
    ClientIp(client): ClientIp,
    submission: Submission,
) -> Response
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let shop = &state.shop;
    let decision = shop
        .rate_limiter
        .check(CHECKOUT_NAMESPACE, &client, shop.config.checkout_rate_limit)
        .await;
    let headers = RateLimitHeaders(decision);

    if !decision.allowed {
        metrics::counter!("storefront_rate_limited_total", "namespace" => CHECKOUT_NAMESPACE).increment(1);
        return (
            headers,
            AppError::too_many_requests("Too many checkout attempts. Try again shortly."),
        )
            .into_response();
    }

    let (request, redirect) = match cart_items(&submission.value) {
        Some(items) => (CheckoutRequest::Cart { items }, false),
        None => (
            CheckoutRequest::Single {
                slug: submission.text("slug").unwrap_or_default().to_string(),
            },
            true,
        ),
    };

    match shop.create_checkout(request).await {
        Ok(session) if redirect => (headers, Redirect::to(&session.url)).into_response(),
        Ok(session) => (headers, Json(json!({ "ok": true, "url": session.url }))).into_response(),
        Err(err) => (headers, AppError::from(err)).into_response(),
    }
}

/// Cart lines from `{ "items": [{ "slug", "quantity" }] }`. A missing
/// quantity means one; rows without a slug are dropped.
fn cart_items(value: &Value) -> Option<Vec<StockRequest>> {
    let rows = value.get("items")?.as_array()?;
    Some(
        rows.iter()
            .filter_map(|row| {
                let slug = row.get("slug")?.as_str()?;
                let quantity = loose::whole(row.get("quantity")).unwrap_or(1);
                Some(StockRequest::new(slug, quantity))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_items_parsing() {
        let value = json!({
            "items": [
                { "slug": "ring", "quantity": 2 },
                { "slug": "cuff" },
                { "quantity": 4 }
            ]
        });
        assert_eq!(
            cart_items(&value),
            Some(vec![StockRequest::new("ring", 2), StockRequest::new("cuff", 1)])
        );
        assert_eq!(cart_items(&json!({ "slug": "ring" })), None);
    }
}
