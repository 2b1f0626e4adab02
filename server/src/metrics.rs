//! Storefront metrics.
//!
//! # Exported Metrics
//!
//! - `storefront_webhook_events_total{outcome}` - Webhook deliveries by outcome
//! - `storefront_stock_fallback_total` - Batch decrements that took the sequential path
//! - `storefront_stock_conflicts_total` - Paid orders that could not be fulfilled
//! - `storefront_checkout_sessions_total` - Hosted checkout sessions created
//! - `storefront_rate_limited_total{namespace}` - Rejected requests by limiter

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Register every metric description. Call once at startup, after the
/// recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "storefront_webhook_events_total",
        "Payment webhook deliveries by outcome"
    );
    describe_counter!(
        "storefront_stock_fallback_total",
        "Stock decrements that fell back to per-item writes"
    );
    describe_counter!(
        "storefront_stock_conflicts_total",
        "Paid orders flagged for insufficient stock"
    );
    describe_counter!(
        "storefront_checkout_sessions_total",
        "Hosted checkout sessions created"
    );
    describe_counter!(
        "storefront_rate_limited_total",
        "Requests rejected by the rate limiter"
    );
}

/// Install the Prometheus recorder with its own HTTP listener, then
/// register descriptions.
///
/// # Errors
///
/// Returns an error if the recorder or listener cannot be installed.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    Ok(())
}
