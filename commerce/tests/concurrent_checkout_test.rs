//! Concurrent checkouts against the same stock.
//!
//! These tests exercise the all-or-nothing decrement under contention: the
//! atomic path must never sell more than the counter holds, and webhooks
//! that lose the race must end up as stock conflicts rather than paid
//! orders.

#![allow(clippy::unwrap_used, clippy::panic)]

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use storefront_commerce::{DecrementPath, Shop, ShopConfig, WebhookOutcome};
use storefront_core::order::{OrderQuery, OrderStatus, StatusFilter};
use storefront_core::payment::{CompletedCheckout, PaymentEvent};
use storefront_core::stock::{DecrementOutcome, StockRequest};
use storefront_testing::{FixedClock, MemoryKvStore, MockPaymentGateway, RecordingEmailProvider};

type TestShop = Shop<MemoryKvStore, MockPaymentGateway, RecordingEmailProvider>;

fn shop(kv: MemoryKvStore) -> Arc<TestShop> {
    Arc::new(Shop::new(
        kv,
        MockPaymentGateway::new(),
        RecordingEmailProvider::new(),
        Arc::new(FixedClock::at_unix(1_700_000_000)),
        ShopConfig::new("https://shop.test").with_alert_recipient(Some("owner@shop.test".into())),
    ))
}

fn paid(session_id: &str, cart: &str) -> PaymentEvent {
    PaymentEvent::CheckoutCompleted(CompletedCheckout {
        session_id: session_id.into(),
        payment_status: "paid".into(),
        customer_email: Some(format!("{session_id}@example.com")),
        created: Some(1_700_000_000),
        amount_total: Some(4_500),
        currency: Some("usd".into()),
        metadata: BTreeMap::from([("cart".to_string(), cart.to_string())]),
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_atomic_decrements_never_oversell() {
    let shop = shop(MemoryKvStore::new());
    shop.inventory.set_stock("ring", 5).await.unwrap();
    shop.inventory.set_stock("chain", 3).await.unwrap();

    let tasks = (0..20).map(|_| {
        let shop = Arc::clone(&shop);
        tokio::spawn(async move {
            shop.inventory
                .decrement_batch(&[StockRequest::new("ring", 1), StockRequest::new("chain", 1)])
                .await
                .unwrap()
        })
    });
    let reports: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();

    let applied = reports.iter().filter(|r| r.outcome.is_applied()).count();
    assert_eq!(applied, 3);
    assert!(reports.iter().all(|r| r.path == DecrementPath::Atomic));
    assert_eq!(shop.inventory.get_stock("chain").await.unwrap(), 0);
    assert_eq!(shop.inventory.get_stock("ring").await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_webhooks_for_last_item_produce_one_conflict() {
    let shop = shop(MemoryKvStore::new());
    shop.inventory.set_stock("cuff", 1).await.unwrap();

    let tasks = ["cs_a", "cs_b"].map(|id| {
        let shop = Arc::clone(&shop);
        tokio::spawn(async move { shop.handle_payment_event(paid(id, "cuff:1")).await.unwrap() })
    });
    let outcomes: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();

    let recorded = outcomes.iter().filter(|o| matches!(o, WebhookOutcome::Recorded(_))).count();
    let conflicts = outcomes
        .iter()
        .filter(|o| matches!(o, WebhookOutcome::StockConflict(_)))
        .count();
    assert_eq!((recorded, conflicts), (1, 1));
    assert_eq!(shop.inventory.get_stock("cuff").await.unwrap(), 0);

    let query = OrderQuery {
        status: StatusFilter::Only(OrderStatus::StockConflict),
        ..OrderQuery::default()
    };
    assert_eq!(shop.orders.list_page(&query).await.unwrap().total, 1);
}

#[tokio::test]
async fn fallback_path_is_reported_and_still_all_or_nothing_sequentially() {
    let shop = shop(MemoryKvStore::without_scripting());
    shop.inventory.set_stock("ring", 2).await.unwrap();
    shop.inventory.set_stock("chain", 1).await.unwrap();

    let first = shop
        .inventory
        .decrement_batch(&[StockRequest::new("ring", 1), StockRequest::new("chain", 1)])
        .await
        .unwrap();
    assert_eq!(first.path, DecrementPath::Fallback);
    assert!(first.outcome.is_applied());

    let second = shop
        .inventory
        .decrement_batch(&[StockRequest::new("ring", 1), StockRequest::new("chain", 1)])
        .await
        .unwrap();
    let DecrementOutcome::Insufficient(shortfall) = second.outcome else {
        panic!("expected shortfall");
    };
    assert_eq!(shortfall.slug, "chain");
    assert_eq!(shop.inventory.get_stock("ring").await.unwrap(), 1);
}

#[tokio::test]
async fn conflict_order_blocks_shipping_until_resolved() {
    let shop = shop(MemoryKvStore::new());
    shop.inventory.set_stock("cuff", 0).await.unwrap();

    let outcome = shop.handle_payment_event(paid("cs_late", "cuff:1")).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::StockConflict(_)));

    let details = storefront_commerce::ShippingDetails {
        carrier: "UPS".into(),
        tracking_number: "1Z".into(),
        tracking_url: "https://ups.example/1Z".into(),
    };
    assert!(shop.ship_order("cs_late", details.clone()).await.is_err());
    shop.resolve_conflict("cs_late", "Refunded").await.unwrap();
    assert!(shop.ship_order("cs_late", details).await.is_err());

    let order = shop.orders.read("cs_late").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::ConflictResolved);
    assert_eq!(order.conflict_resolution.unwrap().note, "Refunded");
}
