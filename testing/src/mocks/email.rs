//! Recording email provider.

use super::INJECTED_FAILURE;
use std::sync::Arc;
use storefront_core::notification::{InventoryAlert, OrderReceivedEmail, ShippedEmail};
use storefront_core::{EmailProvider, Result, ShopError};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Outbox {
    order_received: Vec<OrderReceivedEmail>,
    shipped: Vec<ShippedEmail>,
    inventory_alerts: Vec<(String, InventoryAlert)>,
}

/// Captures emails instead of sending them.
///
/// Clones share the outbox. A failing provider records nothing and
/// returns [`ShopError::Email`] from every send.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmailProvider {
    outbox: Arc<Mutex<Outbox>>,
    should_fail: bool,
}

impl RecordingEmailProvider {
    /// Provider that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that fails every send.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Order-received emails sent.
    pub async fn order_received(&self) -> Vec<OrderReceivedEmail> {
        self.outbox.lock().await.order_received.clone()
    }

    /// Shipped emails sent.
    pub async fn shipped(&self) -> Vec<ShippedEmail> {
        self.outbox.lock().await.shipped.clone()
    }

    /// Inventory alerts sent, with their recipient.
    pub async fn inventory_alerts(&self) -> Vec<(String, InventoryAlert)> {
        self.outbox.lock().await.inventory_alerts.clone()
    }

    fn check(&self) -> Result<()> {
        if self.should_fail {
            return Err(ShopError::Email(INJECTED_FAILURE.into()));
        }
        Ok(())
    }
}

impl EmailProvider for RecordingEmailProvider {
    async fn send_order_received(&self, email: &OrderReceivedEmail) -> Result<()> {
        self.check()?;
        self.outbox.lock().await.order_received.push(email.clone());
        Ok(())
    }

    async fn send_shipped(&self, email: &ShippedEmail) -> Result<()> {
        self.check()?;
        self.outbox.lock().await.shipped.push(email.clone());
        Ok(())
    }

    async fn send_inventory_alert(&self, to: &str, alert: &InventoryAlert) -> Result<()> {
        self.check()?;
        self.outbox
            .lock()
            .await
            .inventory_alerts
            .push((to.to_string(), alert.clone()));
        Ok(())
    }
}
