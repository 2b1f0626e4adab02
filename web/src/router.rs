//! Route table.

use crate::handlers::{admin, catalog, checkout, health, webhook};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use storefront_core::{EmailProvider, KvStore, PaymentGateway};
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// ```text
/// GET  /health                       liveness
/// GET  /health/ready                 KV reachability
/// GET  /api/products                 shop items
/// GET  /api/products/:slug           one product with live stock
/// GET  /api/archive                  archive items
/// POST /api/checkout                 hosted checkout (rate limited)
/// POST /api/webhooks/payments        payment events
/// POST /api/admin/login              session cookie (rate limited)
/// POST /api/admin/logout
/// GET  /api/admin/orders             paginated orders        [session]
/// POST /api/admin/orders/ship                                [session]
/// POST /api/admin/orders/resolve                             [session]
/// GET  /api/admin/products                                   [session]
/// POST /api/admin/products                                   [session]
/// POST /api/admin/products/stock                             [session]
/// ```
pub fn build_router<K, P, E>(state: AppState<K, P, E>) -> Router
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let admin = Router::new()
        .route("/login", post(admin::login::<K, P, E>))
        .route("/logout", post(admin::logout::<K, P, E>))
        .route("/orders", get(admin::list_orders::<K, P, E>))
        .route("/orders/ship", post(admin::ship_order::<K, P, E>))
        .route("/orders/resolve", post(admin::resolve_conflict::<K, P, E>))
        .route(
            "/products",
            get(admin::list_products::<K, P, E>).post(admin::save_product::<K, P, E>),
        )
        .route("/products/stock", post(admin::bulk_stock::<K, P, E>));

    let api = Router::new()
        .route("/products", get(catalog::list_products::<K, P, E>))
        .route("/products/:slug", get(catalog::get_product::<K, P, E>))
        .route("/archive", get(catalog::list_archive::<K, P, E>))
        .route("/checkout", post(checkout::create_checkout::<K, P, E>))
        .route("/webhooks/payments", post(webhook::receive_payment_event::<K, P, E>))
        .nest("/admin", admin);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness::<K, P, E>))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
