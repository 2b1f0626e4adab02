//! Payment confirmation.
//!
//! A completed checkout turns into exactly one order record. The processor
//! delivers events at least once, so the session id doubles as an
//! idempotency key: if an order already exists for it, nothing happens.
//!
//! # Flow
//!
//! ```text
//! event ─▶ completed & paid? ──no──▶ Ignored
//!            │
//!            ▼
//!        order exists? ──yes──▶ AlreadyProcessed
//!            │
//!            ▼
//!        purchased items (cart metadata, else slug + line items)
//!            │
//!            ▼
//!        decrement_batch ──Insufficient──▶ stock_conflict order + oversell alert
//!            │
//!            ▼ Applied
//!        paid order ──write fails──▶ release stock, error
//!            │
//!            ▼
//!        index ─▶ sync snapshots ─▶ threshold alerts ─▶ order email
//! ```
//!
//! The order record is written right after the decrement. If that write
//! fails the stock is added back before the error is returned, so a
//! redelivery decrements once more against restored counters. Once the
//! order exists, index and snapshot failures are logged and the delivery
//! still succeeds: a redelivery would stop at the existence check.
//!
//! The existence check and the order write are separate KV calls. Two
//! deliveries of the same event processed concurrently can both pass the
//! check and both decrement stock; the processor rarely delivers duplicates
//! that close together.

use crate::shop::Shop;
use storefront_core::notification::OrderReceivedEmail;
use storefront_core::order::OrderStatus;
use storefront_core::payment::{parse_cart, CompletedCheckout, PaymentEvent, METADATA_CART, METADATA_SLUG};
use storefront_core::stock::{normalize_requests, DecrementOutcome, Shortfall, StockChange, StockLine, StockRequest};
use storefront_core::{EmailProvider, KvStore, OrderRecord, PaymentGateway, Result, ShopError};
use tracing::{error, info, warn};

/// Error message for completed checkouts that name no products.
pub const MISSING_CART: &str = "Missing cart metadata";

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a paid checkout completion.
    Ignored,
    /// An order already exists for this session.
    AlreadyProcessed,
    /// Stock was decremented and a paid order recorded.
    Recorded(OrderRecord),
    /// Stock ran out; a `stock_conflict` order was recorded.
    StockConflict(OrderRecord),
}

impl WebhookOutcome {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::AlreadyProcessed => "already_processed",
            Self::Recorded(_) => "recorded",
            Self::StockConflict(_) => "stock_conflict",
        }
    }

    /// Plain-text response body.
    #[must_use]
    pub const fn response_text(&self) -> &'static str {
        match self {
            Self::Ignored => "Ignored",
            Self::AlreadyProcessed => "Already processed",
            Self::Recorded(_) => "ok",
            Self::StockConflict(_) => "Stock conflict recorded",
        }
    }
}

impl<K, P, E> Shop<K, P, E>
where
    K: KvStore + Clone,
    P: PaymentGateway,
    E: EmailProvider,
{
    /// Process a verified payment event.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidInput`] with [`MISSING_CART`] when the
    /// session names no products, and KV or payment errors from the
    /// collaborators. No paid order is written on error, and stock taken for
    /// it has been released.
    pub async fn handle_payment_event(&self, event: PaymentEvent) -> Result<WebhookOutcome> {
        let outcome = self.process_event(event).await;
        let label = match &outcome {
            Ok(outcome) => outcome.label(),
            Err(err) if err.is_user_error() => "rejected",
            Err(_) => "failed",
        };
        metrics::counter!("storefront_webhook_events_total", "outcome" => label).increment(1);
        outcome
    }

    async fn process_event(&self, event: PaymentEvent) -> Result<WebhookOutcome> {
        let checkout = match event {
            PaymentEvent::CheckoutCompleted(checkout) if checkout.is_paid() => checkout,
            PaymentEvent::CheckoutCompleted(checkout) => {
                info!(session_id = %checkout.session_id, status = %checkout.payment_status, "Ignoring unpaid checkout");
                return Ok(WebhookOutcome::Ignored);
            }
            PaymentEvent::Other { event_type } => {
                info!(%event_type, "Ignoring webhook event");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        if self.orders.exists(&checkout.session_id).await? {
            info!(session_id = %checkout.session_id, "Webhook already processed");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        let requests = self.purchased_items(&checkout).await?;
        let lines = normalize_requests(&requests);
        if lines.is_empty() {
            warn!(session_id = %checkout.session_id, "Completed checkout has no cart metadata");
            return Err(ShopError::InvalidInput(MISSING_CART.into()));
        }

        let report = self.inventory.decrement_batch(&requests).await?;
        match report.outcome {
            DecrementOutcome::Applied(changes) => {
                self.record_paid(&checkout, lines, &changes).await.map(WebhookOutcome::Recorded)
            }
            DecrementOutcome::Insufficient(shortfall) => self
                .record_conflict(&checkout, lines, shortfall)
                .await
                .map(WebhookOutcome::StockConflict),
            DecrementOutcome::InvalidRequest => Err(ShopError::InvalidInput(MISSING_CART.into())),
        }
    }

    /// Items from `cart` metadata, else the `slug` metadata with the summed
    /// line-item quantity (at least 1).
    async fn purchased_items(&self, checkout: &CompletedCheckout) -> Result<Vec<StockRequest>> {
        if let Some(cart) = checkout.metadata.get(METADATA_CART) {
            let requests = parse_cart(cart);
            if !requests.is_empty() {
                return Ok(requests);
            }
        }

        let Some(slug) = checkout.metadata.get(METADATA_SLUG).filter(|s| !s.trim().is_empty()) else {
            return Ok(Vec::new());
        };
        let quantity = self.payments.line_item_quantity(&checkout.session_id).await?;
        Ok(vec![StockRequest::new(
            slug.clone(),
            i64::try_from(quantity).unwrap_or(i64::MAX).max(1),
        )])
    }

    fn base_order(&self, checkout: &CompletedCheckout, lines: Vec<StockLine>, status: OrderStatus) -> OrderRecord {
        OrderRecord {
            id: checkout.session_id.clone(),
            slug: lines.first().map(|line| line.slug.clone()),
            email: checkout.customer_email.clone(),
            created: checkout.created.unwrap_or_else(|| self.clock.unix_seconds()),
            quantity: lines.iter().map(|line| line.quantity).sum(),
            status,
            amount_total: checkout.amount_total,
            currency: checkout.currency.clone(),
            items: lines,
            shortfall: None,
            shipping: None,
            conflict_resolution: None,
        }
    }

    async fn record_paid(
        &self,
        checkout: &CompletedCheckout,
        lines: Vec<StockLine>,
        changes: &[StockChange],
    ) -> Result<OrderRecord> {
        let order = self.base_order(checkout, lines, OrderStatus::Paid);
        if let Err(err) = self.orders.write(&order).await {
            let released = self.inventory.release(changes).await;
            error!(
                order_id = %order.id,
                released,
                lines = changes.len(),
                error = %err,
                "Failed to write paid order; released stock"
            );
            return Err(err);
        }
        if let Err(err) = self.orders.append_to_index(&order.id).await {
            error!(order_id = %order.id, error = %err, "Failed to index paid order");
        }
        for change in changes {
            if let Err(err) = self.catalog.sync_stock_and_archive_state(&change.slug, change.next).await {
                warn!(slug = %change.slug, error = %err, "Failed to sync product snapshot");
            }
        }
        info!(
            order_id = %order.id,
            quantity = order.quantity,
            items = order.items.len(),
            "Order recorded"
        );

        for change in changes {
            if let Some(transition) = change.transition {
                warn!(
                    order_id = %order.id,
                    slug = %change.slug,
                    transition = transition.as_str(),
                    previous = change.previous,
                    next = change.next,
                    "Inventory threshold crossed"
                );
            }
        }
        self.notifier.stock_transitions(changes, &order.id).await;

        if let Some(customer_email) = order.email.clone() {
            let product_title = match order.slug.as_deref() {
                Some(slug) => self.catalog.get_product(slug).await.ok().flatten().map(|p| p.title),
                None => None,
            };
            self.notifier
                .order_received(&OrderReceivedEmail {
                    order_id: order.id.clone(),
                    customer_email,
                    product_title,
                    quantity: order.quantity,
                })
                .await;
        }

        Ok(order)
    }

    async fn record_conflict(
        &self,
        checkout: &CompletedCheckout,
        lines: Vec<StockLine>,
        shortfall: Shortfall,
    ) -> Result<OrderRecord> {
        let mut order = self.base_order(checkout, lines, OrderStatus::StockConflict);
        order.slug = Some(shortfall.slug.clone());
        order.shortfall = Some(shortfall.clone());

        self.orders.write(&order).await?;
        self.orders.append_to_index(&order.id).await?;
        metrics::counter!("storefront_stock_conflicts_total").increment(1);

        error!(
            order_id = %order.id,
            slug = %shortfall.slug,
            requested = shortfall.requested,
            available = shortfall.available,
            "Insufficient stock for paid order; recorded stock conflict"
        );

        self.notifier.oversell(&shortfall, &order.id).await;
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::ShopConfig;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use storefront_core::notification::AlertKind;
    use storefront_testing::{FixedClock, MemoryKvStore, MockPaymentGateway, RecordingEmailProvider};

    type TestShop = Shop<MemoryKvStore, MockPaymentGateway, RecordingEmailProvider>;

    async fn shop(kv: MemoryKvStore, email: RecordingEmailProvider) -> TestShop {
        let shop = Shop::new(
            kv,
            MockPaymentGateway::new(),
            email,
            Arc::new(FixedClock::at_unix(1_700_000_000)),
            ShopConfig::new("https://shop.test").with_alert_recipient(Some("owner@shop.test".into())),
        );
        shop.inventory.set_stock("ring", 3).await.unwrap();
        shop.inventory.set_stock("chain", 1).await.unwrap();
        shop
    }

    fn completed(session_id: &str, metadata: &[(&str, &str)]) -> PaymentEvent {
        PaymentEvent::CheckoutCompleted(CompletedCheckout {
            session_id: session_id.into(),
            payment_status: "paid".into(),
            customer_email: Some("buyer@example.com".into()),
            created: Some(1_699_999_999),
            amount_total: Some(9_000),
            currency: Some("usd".into()),
            metadata: metadata
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        })
    }

    #[tokio::test]
    async fn test_paid_cart_records_order_and_alerts() {
        let email = RecordingEmailProvider::new();
        let shop = shop(MemoryKvStore::new(), email.clone()).await;

        let outcome = shop
            .handle_payment_event(completed("cs_1", &[("cart", "ring:1,chain:1")]))
            .await
            .unwrap();

        let WebhookOutcome::Recorded(order) = outcome else {
            panic!("expected recorded order");
        };
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.quantity, 2);
        assert_eq!(order.slug.as_deref(), Some("ring"));
        assert_eq!(shop.inventory.get_stock("chain").await.unwrap(), 0);
        assert_eq!(shop.orders.list_recent(10).await.unwrap().len(), 1);

        let alerts = email.inventory_alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].1.kind, AlertKind::Zero);
        assert_eq!(email.order_received().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_order_write_releases_stock_for_redelivery() {
        let kv = MemoryKvStore::new();
        let email = RecordingEmailProvider::new();
        let shop = shop(kv.clone(), email.clone()).await;
        let event = completed("cs_1", &[("cart", "ring:1")]);
        kv.fail_next_write_to("order:cs_1").await;

        let err = shop.handle_payment_event(event.clone()).await.unwrap_err();
        assert!(matches!(err, ShopError::Kv(_)));
        assert_eq!(shop.inventory.get_stock("ring").await.unwrap(), 3);
        assert!(email.order_received().await.is_empty());

        let retried = shop.handle_payment_event(event).await.unwrap();
        assert!(matches!(retried, WebhookOutcome::Recorded(_)));
        assert_eq!(shop.inventory.get_stock("ring").await.unwrap(), 2);
        assert_eq!(shop.orders.list_recent(10).await.unwrap().len(), 1);
        assert_eq!(email.order_received().await.len(), 1);
    }

    #[tokio::test]
    async fn test_index_failure_after_order_write_is_not_fatal() {
        let kv = MemoryKvStore::new();
        let email = RecordingEmailProvider::new();
        let shop = shop(kv.clone(), email.clone()).await;
        kv.fail_next_write_to("orders:index").await;

        let outcome = shop
            .handle_payment_event(completed("cs_2", &[("cart", "ring:1")]))
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::Recorded(_)));
        assert_eq!(shop.inventory.get_stock("ring").await.unwrap(), 2);
        assert!(shop.orders.exists("cs_2").await.unwrap());
        assert_eq!(email.order_received().await.len(), 1);
    }

    #[tokio::test]
    async fn test_redelivery_is_short_circuited() {
        let email = RecordingEmailProvider::new();
        let shop = shop(MemoryKvStore::new(), email.clone()).await;
        let event = completed("cs_dup", &[("cart", "ring:1")]);

        shop.handle_payment_event(event.clone()).await.unwrap();
        let second = shop.handle_payment_event(event).await.unwrap();

        assert_eq!(second, WebhookOutcome::AlreadyProcessed);
        assert_eq!(shop.inventory.get_stock("ring").await.unwrap(), 2);
        assert_eq!(email.order_received().await.len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_records_conflict() {
        let email = RecordingEmailProvider::new();
        let shop = shop(MemoryKvStore::new(), email.clone()).await;

        let outcome = shop
            .handle_payment_event(completed("cs_late", &[("cart", "ring:1,chain:2")]))
            .await
            .unwrap();

        let WebhookOutcome::StockConflict(order) = outcome else {
            panic!("expected stock conflict");
        };
        assert_eq!(order.status, OrderStatus::StockConflict);
        assert_eq!(order.slug.as_deref(), Some("chain"));
        assert_eq!(order.shortfall.as_ref().unwrap().available, 1);
        assert_eq!(shop.inventory.get_stock("ring").await.unwrap(), 3);

        let stored = shop.orders.read("cs_late").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::StockConflict);

        let alerts = email.inventory_alerts().await;
        assert_eq!(alerts[0].1.kind, AlertKind::Oversell);
        assert!(email.order_received().await.is_empty());
    }

    #[tokio::test]
    async fn test_slug_metadata_uses_line_item_quantity() {
        let shop = shop(MemoryKvStore::new(), RecordingEmailProvider::new()).await;
        shop.payments.set_line_item_quantity("cs_single", 2).await;

        shop.handle_payment_event(completed("cs_single", &[("slug", "ring")]))
            .await
            .unwrap();
        assert_eq!(shop.inventory.get_stock("ring").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ignored_and_missing_cart() {
        let shop = shop(MemoryKvStore::new(), RecordingEmailProvider::new()).await;

        let other = PaymentEvent::Other { event_type: "invoice.paid".into() };
        assert_eq!(shop.handle_payment_event(other).await.unwrap(), WebhookOutcome::Ignored);

        let PaymentEvent::CheckoutCompleted(mut unpaid) = completed("cs_u", &[("cart", "ring:1")]) else {
            panic!("expected checkout");
        };
        unpaid.payment_status = "unpaid".into();
        assert_eq!(
            shop.handle_payment_event(PaymentEvent::CheckoutCompleted(unpaid)).await.unwrap(),
            WebhookOutcome::Ignored
        );

        let err = shop
            .handle_payment_event(completed("cs_empty", &[("cart", "bad")]))
            .await
            .unwrap_err();
        assert_eq!(err, ShopError::InvalidInput(MISSING_CART.into()));
        assert!(!shop.orders.exists("cs_empty").await.unwrap());
    }

    #[tokio::test]
    async fn test_email_failure_does_not_fail_webhook() {
        let email = RecordingEmailProvider::failing();
        let shop = shop(MemoryKvStore::new(), email).await;
        let outcome = shop
            .handle_payment_event(completed("cs_2", &[("cart", "ring:3")]))
            .await
            .unwrap();
        assert!(matches!(outcome, WebhookOutcome::Recorded(_)));
    }
}
