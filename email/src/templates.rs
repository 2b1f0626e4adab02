//! Plain-text message bodies.

use storefront_core::notification::{InventoryAlert, OrderReceivedEmail, ShippedEmail};

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Renders every storefront email, closing each with the shop's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    signature: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self::new("Storefront")
    }
}

impl Templates {
    /// Templates signed `- {shop_name}`.
    #[must_use]
    pub fn new(shop_name: &str) -> Self {
        Self {
            signature: format!("- {shop_name}"),
        }
    }

    /// Order confirmation.
    #[must_use]
    pub fn order_received(&self, _email: &OrderReceivedEmail) -> Rendered {
        let body = [
            "Your order has been received.",
            "",
            "The piece will now be prepared and finished for shipment.",
            "Processing time is typically a few days.",
            "",
            "You will receive a separate message once the order has shipped.",
            "",
            "Thank you for your patience.",
            &self.signature,
        ]
        .join("\n");

        Rendered {
            subject: "Order received".to_string(),
            body,
        }
    }

    /// Shipping confirmation with tracking details.
    #[must_use]
    pub fn shipped(&self, email: &ShippedEmail) -> Rendered {
        let body = [
            "Your order has shipped.".to_string(),
            String::new(),
            format!("Carrier: {}", email.carrier),
            format!("Tracking: {}", email.tracking_number),
            String::new(),
            "You can follow the shipment here:".to_string(),
            email.tracking_url.clone(),
            String::new(),
            "Thank you for your patience.".to_string(),
            self.signature.clone(),
        ]
        .join("\n");

        Rendered {
            subject: "Your order has shipped".to_string(),
            body,
        }
    }

    /// Stock alert for the shop owner.
    #[must_use]
    pub fn inventory_alert(&self, alert: &InventoryAlert) -> Rendered {
        let mut lines = vec![
            "Inventory alert.".to_string(),
            String::new(),
            format!("Product slug: {}", alert.slug),
            format!("Transition: {}", alert.kind.as_str()),
            format!("Previous stock: {}", alert.previous_stock),
            format!("Current stock: {}", alert.current_stock),
        ];
        if let Some(quantity) = alert.quantity {
            lines.push(format!("Requested quantity: {quantity}"));
        }
        if let Some(order_id) = &alert.order_id {
            lines.push(format!("Order/session: {order_id}"));
        }
        lines.push(String::new());
        lines.push("Check admin inventory and payment dashboard orders.".to_string());
        lines.push(self.signature.clone());

        Rendered {
            subject: alert.subject(),
            body: lines.join("\n"),
        }
    }
}
