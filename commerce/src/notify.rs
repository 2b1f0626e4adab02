//! Best-effort notifications.
//!
//! Email failures never fail the operation that triggered them; they are
//! logged and the caller moves on.

use storefront_core::notification::{AlertKind, InventoryAlert, OrderReceivedEmail, ShippedEmail};
use storefront_core::stock::{Shortfall, StockChange};
use storefront_core::EmailProvider;
use tracing::{debug, error, info};

/// Sends customer and owner emails.
#[derive(Clone)]
pub struct Notifier<E> {
    email: E,
    alert_recipient: Option<String>,
}

impl<E: EmailProvider> Notifier<E> {
    /// Create a notifier. Without a recipient, inventory alerts are skipped.
    pub fn new(email: E, alert_recipient: Option<String>) -> Self {
        Self {
            email,
            alert_recipient: alert_recipient.filter(|to| !to.trim().is_empty()),
        }
    }

    /// Send the order-received email.
    pub async fn order_received(&self, message: &OrderReceivedEmail) {
        match self.email.send_order_received(message).await {
            Ok(()) => info!(order_id = %message.order_id, "Order received email sent"),
            Err(err) => error!(order_id = %message.order_id, error = %err, "Order received email failed"),
        }
    }

    /// Send the shipped email.
    pub async fn shipped(&self, message: &ShippedEmail) {
        match self.email.send_shipped(message).await {
            Ok(()) => info!(order_id = %message.order_id, "Shipped email sent"),
            Err(err) => error!(order_id = %message.order_id, error = %err, "Shipped email failed"),
        }
    }

    /// Alert for every change that crossed a threshold. Returns how many
    /// alerts were sent.
    pub async fn stock_transitions(&self, changes: &[StockChange], order_id: &str) -> usize {
        let mut sent = 0;
        for change in changes {
            let Some(transition) = change.transition else {
                continue;
            };
            let alert = InventoryAlert {
                kind: AlertKind::from(transition),
                slug: change.slug.clone(),
                previous_stock: change.previous,
                current_stock: change.next,
                quantity: Some(change.requested),
                order_id: Some(order_id.to_string()),
            };
            if self.inventory_alert(&alert).await {
                sent += 1;
            }
        }
        sent
    }

    /// Alert that a paid order could not be filled.
    pub async fn oversell(&self, shortfall: &Shortfall, order_id: &str) -> bool {
        let alert = InventoryAlert {
            kind: AlertKind::Oversell,
            slug: shortfall.slug.clone(),
            previous_stock: shortfall.available,
            current_stock: shortfall.available,
            quantity: Some(shortfall.requested),
            order_id: Some(order_id.to_string()),
        };
        self.inventory_alert(&alert).await
    }

    async fn inventory_alert(&self, alert: &InventoryAlert) -> bool {
        let Some(to) = self.alert_recipient.as_deref() else {
            debug!(slug = %alert.slug, kind = alert.kind.as_str(), "No alert recipient; skipping inventory alert");
            return false;
        };
        match self.email.send_inventory_alert(to, alert).await {
            Ok(()) => {
                info!(slug = %alert.slug, kind = alert.kind.as_str(), "Inventory alert sent");
                true
            }
            Err(err) => {
                error!(slug = %alert.slug, kind = alert.kind.as_str(), error = %err, "Inventory alert failed");
                false
            }
        }
    }
}
