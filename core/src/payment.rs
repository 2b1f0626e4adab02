//! Checkout sessions and payment events.
//!
//! The shapes here follow the payment processor's checkout API closely
//! enough that the gateway crate can serialize them directly, without
//! leaking processor types into the services.

use crate::error::{Result, ShopError};
use crate::stock::{StockLine, StockRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Event type emitted when a hosted checkout completes.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Payment status of a captured checkout.
pub const PAYMENT_STATUS_PAID: &str = "paid";

/// Metadata key for multi-item carts (`slug:qty,slug:qty`).
pub const METADATA_CART: &str = "cart";

/// Metadata key for single-product checkouts.
pub const METADATA_SLUG: &str = "slug";

/// A verified webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// `checkout.session.completed`.
    CheckoutCompleted(CompletedCheckout),
    /// Any other event type.
    Other {
        /// Event type as sent.
        event_type: String,
    },
}

/// The session object of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletedCheckout {
    /// Checkout session id (`cs_...`).
    pub session_id: String,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: String,
    /// Customer email from the session's customer details.
    pub customer_email: Option<String>,
    /// Unix seconds.
    pub created: Option<i64>,
    /// Amount charged in minor units.
    pub amount_total: Option<i64>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Session metadata.
    pub metadata: BTreeMap<String, String>,
}

impl CompletedCheckout {
    /// Returns `true` if the payment was captured.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PAYMENT_STATUS_PAID
    }
}

impl PaymentEvent {
    /// Parse an event body (`{ "type", "data": { "object": {...} } }`).
    ///
    /// Signature verification happens before this; parsing only checks
    /// shape.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Serialization`] for bodies that are not JSON or
    /// lack a type, and for completed checkouts without a session id.
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        let event: Value = serde_json::from_slice(payload)?;
        let event_type = event
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ShopError::Serialization("event has no type".into()))?;

        if event_type != CHECKOUT_COMPLETED {
            return Ok(Self::Other {
                event_type: event_type.to_string(),
            });
        }

        let object = event
            .pointer("/data/object")
            .ok_or_else(|| ShopError::Serialization("event has no data.object".into()))?;
        let session_id = object
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ShopError::Serialization("checkout session has no id".into()))?;

        let text = |pointer: &str| object.pointer(pointer).and_then(Value::as_str).map(str::to_string);

        let metadata = object
            .get("metadata")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self::CheckoutCompleted(CompletedCheckout {
            session_id: session_id.to_string(),
            payment_status: text("/payment_status").unwrap_or_default(),
            customer_email: text("/customer_details/email").or_else(|| text("/customer_email")),
            created: object.get("created").and_then(Value::as_i64),
            amount_total: object.get("amount_total").and_then(Value::as_i64),
            currency: text("/currency"),
            metadata,
        }))
    }

    /// Event type string.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::CheckoutCompleted(_) => CHECKOUT_COMPLETED,
            Self::Other { event_type } => event_type,
        }
    }
}

/// Price of a checkout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePrice {
    /// A price object already configured at the processor.
    Catalog {
        /// Processor price id.
        price_id: String,
    },
    /// Ad-hoc price data.
    Inline {
        /// ISO currency code.
        currency: String,
        /// Unit amount in minor units.
        unit_amount: u64,
        /// Product name shown on the checkout page.
        name: String,
        /// Product description shown on the checkout page.
        description: String,
    },
}

/// Bounds for a customer-adjustable quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustableQuantity {
    /// Lowest quantity.
    pub minimum: u64,
    /// Highest quantity.
    pub maximum: u64,
}

/// One line of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    /// Initial quantity.
    pub quantity: u64,
    /// Price.
    pub price: LinePrice,
    /// Lets the customer change the quantity on the hosted page.
    pub adjustable: Option<AdjustableQuantity>,
}

/// Request to create a hosted checkout session in `payment` mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    /// Line items.
    pub line_items: Vec<CheckoutLineItem>,
    /// Redirect after payment; may contain `{CHECKOUT_SESSION_ID}`.
    pub success_url: String,
    /// Redirect when the customer backs out.
    pub cancel_url: String,
    /// Session metadata echoed back in the webhook.
    pub metadata: BTreeMap<String, String>,
}

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Session id.
    pub id: String,
    /// Hosted page URL.
    pub url: Option<String>,
}

/// Encode cart lines as session metadata (`slug:qty,slug:qty`).
#[must_use]
pub fn encode_cart(lines: &[StockLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{}:{}", line.slug, line.quantity))
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode cart metadata.
///
/// Entries without a slug or with a non-positive or non-numeric quantity
/// are dropped. Fractional quantities are floored, with a minimum of 1.
///
/// ```
/// use storefront_core::payment::parse_cart;
///
/// let requests = parse_cart("ring:2, chain:0.5,bad,:3");
/// assert_eq!(requests.len(), 2);
/// assert_eq!(requests[1].quantity, 1);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Floored and bounded below by 1
pub fn parse_cart(value: &str) -> Vec<StockRequest> {
    value
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(':');
            let slug = parts.next().unwrap_or_default().trim();
            let quantity = parts.next().unwrap_or("0").trim().parse::<f64>().ok()?;
            if slug.is_empty() || !quantity.is_finite() || quantity <= 0.0 {
                return None;
            }
            Some(StockRequest::new(slug, (quantity.floor() as i64).max(1)))
        })
        .collect()
}
