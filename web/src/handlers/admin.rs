//! Admin API.
//!
//! Everything except login and logout requires an [`AdminSession`].
//! Mutations accept JSON or form bodies so the admin pages can post plain
//! HTML forms.

use crate::error::AppError;
use crate::extractors::{AdminSession, ClientIp, Submission};
use crate::handlers::catalog::with_live_stock;
use crate::responses::{cleared_session_cookie, session_cookie, RateLimitHeaders};
use crate::state::AppState;
use crate::WebResult;
use axum::{
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use storefront_commerce::{ResolveOutcome, ShipOutcome, ShippingDetails};
use storefront_core::order::{OrderQuery, StatusFilter};
use storefront_core::product::{sanitize_stock_updates, ProductDraft};
use storefront_core::{EmailProvider, KvStore, OrderRecord, PaymentGateway, ShopError};

/// Rate-limit namespace for logins.
pub const LOGIN_NAMESPACE: &str = "admin-login";

/// Where form product saves land.
const PRODUCTS_PAGE: &str = "/admin/products";

/// `POST /api/admin/login`
///
/// Reads `password` from JSON or form. Success sets the session cookie.
pub async fn login<K, P, E>(
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
        .check(LOGIN_NAMESPACE, &client, shop.config.login_rate_limit)
        .await;
    let headers = RateLimitHeaders(decision);

    if !decision.allowed {
        metrics::counter!("storefront_rate_limited_total", "namespace" => LOGIN_NAMESPACE).increment(1);
        return (
            headers,
            AppError::too_many_requests("Too many login attempts. Try again shortly."),
        )
            .into_response();
    }

    let password = submission.text("password").unwrap_or_default();
    match state.sessions.login(password) {
        Ok(token) => (
            headers,
            [(SET_COOKIE, session_cookie(&token, state.secure_cookies))],
            Json(json!({ "ok": true })),
        )
            .into_response(),
        Err(_) => (headers, AppError::unauthorized("Invalid credentials")).into_response(),
    }
}

/// `POST /api/admin/logout`: clears the cookie.
pub async fn logout<K, P, E>(State(state): State<AppState<K, P, E>>) -> impl IntoResponse {
    (
        [(SET_COOKIE, cleared_session_cookie(state.secure_cookies))],
        Json(json!({ "ok": true })),
    )
}

/// Query string of the order listing.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersParams {
    limit: Option<String>,
    page: Option<String>,
    status: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

/// `GET /api/admin/orders?limit&page&status&from&to`
///
/// # Errors
///
/// 400 for invalid dates, 500 if the KV store fails.
pub async fn list_orders<K, P, E>(
    _session: AdminSession,
    State(state): State<AppState<K, P, E>>,
    Query(params): Query<OrdersParams>,
) -> WebResult<Json<Value>>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let defaults = OrderQuery::default();
    let number = |value: Option<&String>, fallback: i64| {
        value.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(fallback)
    };
    let query = OrderQuery {
        limit: number(params.limit.as_ref(), defaults.limit),
        page: number(params.page.as_ref(), defaults.page),
        status: StatusFilter::parse(params.status.as_deref()),
        ..defaults
    }
    .with_date_range(params.from.as_deref(), params.to.as_deref())?;

    let page = state.shop.orders.list_page(&query).await?;
    let rows: Vec<Value> = page
        .rows
        .iter()
        .map(|order| order_row(order, &state.shop.payments))
        .collect();

    Ok(Json(json!({
        "ok": true,
        "rows": rows,
        "pagination": {
            "page": page.page,
            "limit": page.limit,
            "total": page.total,
            "totalPages": page.total_pages,
        },
    })))
}

/// An order as listed to the admin, with the derived display fields.
fn order_row<P: PaymentGateway>(order: &OrderRecord, payments: &P) -> Value {
    let mut row = serde_json::to_value(order).unwrap_or_else(|_| json!({ "id": order.id }));
    if let Value::Object(map) = &mut row {
        map.insert("customer_email".into(), json!(order.email));
        map.insert("payment_status".into(), json!(order.status.as_str()));
        map.insert(
            "payment_dashboard_url".into(),
            json!(payments.dashboard_url(&order.id)),
        );
    }
    row
}

/// `POST /api/admin/orders/ship`
///
/// Fields: `orderId`, `carrier`, `trackingNumber`, `trackingUrl`.
///
/// # Errors
///
/// 400 for missing fields, 404 for unknown orders, 409 for conflict orders.
pub async fn ship_order<K, P, E>(
    _session: AdminSession,
    State(state): State<AppState<K, P, E>>,
    submission: Submission,
) -> WebResult<Json<Value>>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let invalid = || AppError::bad_request("Invalid payload");
    let order_id = submission.text("orderId").ok_or_else(invalid)?;
    let details = ShippingDetails {
        carrier: submission.text("carrier").ok_or_else(invalid)?.to_string(),
        tracking_number: submission.text("trackingNumber").ok_or_else(invalid)?.to_string(),
        tracking_url: submission.text("trackingUrl").ok_or_else(invalid)?.to_string(),
    };

    match state.shop.ship_order(order_id, details).await? {
        ShipOutcome::Shipped(_) => Ok(Json(json!({ "ok": true }))),
        ShipOutcome::AlreadyShipped => Ok(Json(json!({ "ok": true, "already": true }))),
    }
}

/// `POST /api/admin/orders/resolve`
///
/// Fields: `orderId`, optional `note`.
///
/// # Errors
///
/// 400 without an order id, 404 for unknown orders, 409 for orders without
/// a stock conflict.
pub async fn resolve_conflict<K, P, E>(
    _session: AdminSession,
    State(state): State<AppState<K, P, E>>,
    submission: Submission,
) -> WebResult<Json<Value>>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let order_id = submission
        .text("orderId")
        .ok_or_else(|| AppError::bad_request("Invalid payload"))?;
    let note = submission.text("note").unwrap_or_default();

    match state.shop.resolve_conflict(order_id, note).await? {
        ResolveOutcome::Resolved(_) => Ok(Json(json!({ "ok": true }))),
        ResolveOutcome::AlreadyResolved => Ok(Json(json!({ "ok": true, "already": true }))),
    }
}

/// `GET /api/admin/products`: every product with its live stock.
///
/// # Errors
///
/// 500 if the KV store fails.
pub async fn list_products<K, P, E>(
    _session: AdminSession,
    State(state): State<AppState<K, P, E>>,
) -> WebResult<Json<Value>>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let products = state.shop.catalog.all_products().await?;
    let products = with_live_stock(&state.shop, products).await?;
    Ok(Json(json!({ "ok": true, "products": products })))
}

/// `POST /api/admin/products`
///
/// JSON callers get `{ "ok": true, "product": ... }`; form posts are
/// redirected back to the products page.
///
/// # Errors
///
/// 400 without a slug and title, 500 if a write fails.
pub async fn save_product<K, P, E>(
    _session: AdminSession,
    State(state): State<AppState<K, P, E>>,
    submission: Submission,
) -> WebResult<Response>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let draft = ProductDraft::from_value(&submission.value, submission.is_json)
        .ok_or_else(|| AppError::bad_request("Invalid payload"))?;
    let product = state.shop.catalog.save_product(draft).await?;

    if submission.is_json {
        Ok(Json(json!({ "ok": true, "product": product })).into_response())
    } else {
        Ok(Redirect::to(PRODUCTS_PAGE).into_response())
    }
}

/// `POST /api/admin/products/stock` with `{ "updates": [{ "slug", "stock" }] }`
///
/// # Errors
///
/// 400 when no row is valid, 500 if a write fails.
pub async fn bulk_stock<K, P, E>(
    _session: AdminSession,
    State(state): State<AppState<K, P, E>>,
    submission: Submission,
) -> WebResult<Json<Value>>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let updates = sanitize_stock_updates(&submission.value);
    if updates.is_empty() {
        return Err(ShopError::InvalidInput("No valid stock updates".into()).into());
    }
    let rows = state.shop.catalog.bulk_set_stock(&updates).await?;
    Ok(Json(json!({ "ok": true, "updated": rows.len(), "rows": rows })))
}
