//! Email notification payloads.

use crate::stock::StockTransition;
use serde::{Deserialize, Serialize};

/// Sent to the customer once a paid order is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceivedEmail {
    /// Checkout session id.
    pub order_id: String,
    /// Recipient.
    pub customer_email: String,
    /// Title of the primary product, if it could be read.
    pub product_title: Option<String>,
    /// Total units.
    pub quantity: u64,
}

/// Sent to the customer when an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippedEmail {
    /// Checkout session id.
    pub order_id: String,
    /// Recipient.
    pub customer_email: String,
    /// Carrier name.
    pub carrier: String,
    /// Tracking number.
    pub tracking_number: String,
    /// Public tracking URL.
    pub tracking_url: String,
}

/// Kind of inventory alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Stock crossed the low threshold.
    Low,
    /// Stock ran out.
    Zero,
    /// A paid order could not be fulfilled from stock.
    Oversell,
}

impl AlertKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Zero => "zero",
            Self::Oversell => "oversell",
        }
    }
}

impl From<StockTransition> for AlertKind {
    fn from(transition: StockTransition) -> Self {
        match transition {
            StockTransition::Low => Self::Low,
            StockTransition::Zero => Self::Zero,
        }
    }
}

/// Sent to the shop owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAlert {
    /// Alert kind.
    pub kind: AlertKind,
    /// Product slug.
    pub slug: String,
    /// Stock before the change.
    pub previous_stock: u64,
    /// Stock now.
    pub current_stock: u64,
    /// Units involved.
    pub quantity: Option<u64>,
    /// Order or session that triggered the alert.
    pub order_id: Option<String>,
}

impl InventoryAlert {
    /// Subject line, e.g. `[Inventory] LOW silver-ring`.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("[Inventory] {} {}", self.kind.as_str().to_uppercase(), self.slug)
    }
}
