//! The service bundle.

use crate::catalog::Catalog;
use crate::config::ShopConfig;
use crate::inventory::Inventory;
use crate::notify::Notifier;
use crate::orders::OrderBook;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
use storefront_core::{Clock, EmailProvider, KvStore, PaymentGateway};

/// Every service wired to the same providers.
///
/// Webhook processing, checkout and fulfillment are implemented on this
/// type because they span several services.
pub struct Shop<K, P, E> {
    /// Product catalog.
    pub catalog: Catalog<K>,
    /// Stock counters.
    pub inventory: Inventory<K>,
    /// Order records.
    pub orders: OrderBook<K>,
    /// Email notifications.
    pub notifier: Notifier<E>,
    /// Per-client request limits.
    pub rate_limiter: RateLimiter<K>,
    /// Payment processor.
    pub payments: P,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Settings.
    pub config: ShopConfig,
}

impl<K, P, E> Shop<K, P, E>
where
    K: KvStore + Clone,
    P: PaymentGateway,
    E: EmailProvider,
{
    /// Wire the services.
    pub fn new(kv: K, payments: P, email: E, clock: Arc<dyn Clock>, config: ShopConfig) -> Self {
        let catalog = Catalog::new(kv.clone(), clock.clone());
        Self {
            inventory: Inventory::new(kv.clone(), catalog.clone(), config.low_stock_threshold),
            orders: OrderBook::new(kv.clone(), clock.clone()),
            notifier: Notifier::new(email, config.alert_recipient.clone()),
            rate_limiter: RateLimiter::new(kv, clock.clone()),
            catalog,
            payments,
            clock,
            config,
        }
    }
}
