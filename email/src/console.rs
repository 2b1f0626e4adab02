//! Console email provider for development.

use crate::templates::{Rendered, Templates};
use storefront_core::notification::{InventoryAlert, OrderReceivedEmail, ShippedEmail};
use storefront_core::{EmailProvider, Result};
use tracing::info;

/// Logs emails instead of sending them.
///
/// Used when no SMTP server is configured.
#[derive(Clone, Debug, Default)]
pub struct ConsoleEmailProvider {
    templates: Templates,
}

impl ConsoleEmailProvider {
    /// Create a new console email provider.
    #[must_use]
    pub const fn new(templates: Templates) -> Self {
        Self { templates }
    }

    fn log(to: &str, rendered: &Rendered) {
        info!(
            to = %to,
            subject = %rendered.subject,
            body = %rendered.body,
            "Email (development mode)"
        );
    }
}

impl EmailProvider for ConsoleEmailProvider {
    async fn send_order_received(&self, email: &OrderReceivedEmail) -> Result<()> {
        Self::log(&email.customer_email, &self.templates.order_received(email));
        Ok(())
    }

    async fn send_shipped(&self, email: &ShippedEmail) -> Result<()> {
        Self::log(&email.customer_email, &self.templates.shipped(email));
        Ok(())
    }

    async fn send_inventory_alert(&self, to: &str, alert: &InventoryAlert) -> Result<()> {
        Self::log(to, &self.templates.inventory_alert(alert));
        Ok(())
    }
}
