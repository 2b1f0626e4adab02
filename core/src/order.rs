//! Order records, status filtering and pagination.
//!
//! Orders are keyed by the payment processor's checkout session id, which is
//! also what makes webhook processing idempotent: a second delivery for the
//! same session finds the record and stops.

use crate::error::{Result, ShopError};
use crate::loose;
use crate::stock::{Shortfall, StockLine};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How many ids of the order index a listing scans.
pub const ORDER_INDEX_SCAN_LIMIT: usize = 1000;

/// Page size when none is given.
pub const DEFAULT_PAGE_LIMIT: i64 = 25;

/// Largest allowed page size.
pub const MAX_PAGE_LIMIT: i64 = 50;

/// Lifecycle of an order.
///
/// ```text
/// paid ──ship──▶ shipped
/// stock_conflict ──resolve──▶ conflict_resolved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Payment captured, stock decremented.
    Paid,
    /// Handed to a carrier.
    Shipped,
    /// Payment captured but stock was already gone. Needs a human.
    StockConflict,
    /// An admin settled the conflict (refund, substitute, ...). Never ships.
    ConflictResolved,
}

impl OrderStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::StockConflict => "stock_conflict",
            Self::ConflictResolved => "conflict_resolved",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "paid" => Some(Self::Paid),
            "shipped" => Some(Self::Shipped),
            "stock_conflict" => Some(Self::StockConflict),
            "conflict_resolved" => Some(Self::ConflictResolved),
            _ => None,
        }
    }
}

/// Status filter for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Every status.
    #[default]
    All,
    /// A single status.
    Only(OrderStatus),
}

impl StatusFilter {
    /// Parse a query parameter. Unknown or missing values mean `All`.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(OrderStatus::parse)
            .map_or(Self::All, Self::Only)
    }

    /// Returns `true` if `status` passes the filter.
    #[must_use]
    pub fn matches(self, status: OrderStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

/// Carrier details recorded when an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderShipping {
    /// Carrier name.
    pub carrier: String,
    /// Tracking number.
    pub tracking_number: String,
    /// Public tracking URL.
    pub tracking_url: String,
    /// Unix seconds.
    pub shipped_at: i64,
}

/// How an admin settled a stock conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    /// Free-form admin note.
    pub note: String,
    /// Unix seconds.
    pub resolved_at: i64,
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Checkout session id.
    pub id: String,
    /// Primary product (the failing one for stock conflicts).
    pub slug: Option<String>,
    /// Customer email.
    pub email: Option<String>,
    /// Unix seconds.
    pub created: i64,
    /// Total units across all lines.
    pub quantity: u64,
    /// Current status.
    pub status: OrderStatus,
    /// Amount charged in minor units.
    pub amount_total: Option<i64>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Purchased lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<StockLine>,
    /// What was missing, for `stock_conflict` orders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Shortfall>,
    /// Carrier details once shipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<OrderShipping>,
    /// Resolution details once a conflict is settled.
    #[serde(
        rename = "conflictResolution",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub conflict_resolution: Option<ConflictResolution>,
}

impl OrderRecord {
    /// Normalize a stored value.
    ///
    /// Older records used different field names (`customerEmail`,
    /// `createdAt`, `payment_status`, `amountTotal`); they are accepted as
    /// fallbacks. Returns `None` if the value has no usable id. Unknown
    /// statuses read as `paid`. Incomplete shipping details are dropped.
    #[must_use]
    pub fn from_value(value: &Value, now_unix: i64) -> Option<Self> {
        let obj = value.as_object()?;
        let id = loose::non_empty_str(obj.get("id"))?.to_string();

        let text = |key: &str| loose::non_empty_str(obj.get(key)).map(str::to_string);

        let quantity = loose::number(obj.get("quantity")).map_or(1, |q| loose::clamp_non_negative(q).max(1));

        let status = obj
            .get("status")
            .or_else(|| obj.get("payment_status"))
            .and_then(Value::as_str)
            .and_then(OrderStatus::parse)
            .unwrap_or(OrderStatus::Paid);

        Some(Self {
            id,
            slug: text("slug"),
            email: text("email").or_else(|| text("customerEmail")),
            created: loose::whole(obj.get("created"))
                .or_else(|| loose::whole(obj.get("createdAt")))
                .unwrap_or(now_unix),
            quantity,
            status,
            amount_total: loose::whole(obj.get("amount_total"))
                .or_else(|| loose::whole(obj.get("amountTotal"))),
            currency: text("currency"),
            items: obj
                .get("items")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
            shortfall: obj
                .get("shortfall")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            shipping: obj.get("shipping").and_then(normalize_shipping),
            conflict_resolution: obj
                .get("conflictResolution")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
        })
    }

    /// Returns `true` if the order may be handed to a carrier.
    #[must_use]
    pub const fn is_shippable(&self) -> bool {
        matches!(self.status, OrderStatus::Paid)
    }
}

fn normalize_shipping(value: &Value) -> Option<OrderShipping> {
    let obj = value.as_object()?;
    let text = |key: &str| loose::non_empty_str(obj.get(key)).map(str::to_string);
    Some(OrderShipping {
        carrier: text("carrier")?,
        tracking_number: text("trackingNumber")?,
        tracking_url: text("trackingUrl")?,
        shipped_at: loose::whole(obj.get("shippedAt"))?,
    })
}

/// Listing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderQuery {
    /// Requested page size (clamped to `1..=50`).
    pub limit: i64,
    /// Requested page, 1-based.
    pub page: i64,
    /// Status filter.
    pub status: StatusFilter,
    /// Inclusive lower bound on `created`.
    pub from_unix: Option<i64>,
    /// Inclusive upper bound on `created`.
    pub to_unix: Option<i64>,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            page: 1,
            status: StatusFilter::All,
            from_unix: None,
            to_unix: None,
        }
    }
}

impl OrderQuery {
    /// Set a created-date range from `YYYY-MM-DD` strings.
    ///
    /// `from` starts at 00:00:00 UTC and `to` ends at 23:59:59 UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidInput`] if a date does not parse or
    /// `from` falls after `to`.
    pub fn with_date_range(mut self, from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let parse = |value: &str, end_of_day: bool| -> Result<i64> {
            let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|_| ShopError::InvalidInput("Invalid date filter".into()))?;
            let time = if end_of_day {
                date.and_hms_opt(23, 59, 59)
            } else {
                date.and_hms_opt(0, 0, 0)
            };
            time.map(|t| t.and_utc().timestamp())
                .ok_or_else(|| ShopError::InvalidInput("Invalid date filter".into()))
        };

        self.from_unix = from.filter(|s| !s.is_empty()).map(|s| parse(s, false)).transpose()?;
        self.to_unix = to.filter(|s| !s.is_empty()).map(|s| parse(s, true)).transpose()?;

        if let (Some(from), Some(to)) = (self.from_unix, self.to_unix) {
            if from > to {
                return Err(ShopError::InvalidInput("`from` cannot be after `to`".into()));
            }
        }
        Ok(self)
    }

    /// Effective page size.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        usize::try_from(self.limit.clamp(1, MAX_PAGE_LIMIT)).unwrap_or(1)
    }

    fn matches(&self, order: &OrderRecord) -> bool {
        self.status.matches(order.status)
            && self.from_unix.is_none_or(|from| order.created >= from)
            && self.to_unix.is_none_or(|to| order.created <= to)
    }
}

/// One page of orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    /// Orders on this page, newest first.
    pub rows: Vec<OrderRecord>,
    /// Orders matching the filters.
    pub total: usize,
    /// Effective page (clamped to `total_pages`).
    pub page: usize,
    /// Effective page size.
    pub limit: usize,
    /// At least 1.
    pub total_pages: usize,
}

/// Filter, sort (newest first) and paginate orders.
#[must_use]
pub fn paginate(rows: Vec<OrderRecord>, query: &OrderQuery) -> OrderPage {
    let limit = query.effective_limit();
    let mut filtered: Vec<OrderRecord> = rows.into_iter().filter(|row| query.matches(row)).collect();
    filtered.sort_by(|a, b| b.created.cmp(&a.created));

    let total = filtered.len();
    let total_pages = total.div_ceil(limit).max(1);
    let requested = usize::try_from(query.page.max(1)).unwrap_or(1);
    let page = requested.min(total_pages);
    let start = (page - 1) * limit;

    OrderPage {
        rows: filtered.into_iter().skip(start).take(limit).collect(),
        total,
        page,
        limit,
        total_pages,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(id: &str, created: i64, status: OrderStatus) -> OrderRecord {
        OrderRecord {
            id: id.into(),
            slug: None,
            email: None,
            created,
            quantity: 1,
            status,
            amount_total: None,
            currency: None,
            items: Vec::new(),
            shortfall: None,
            shipping: None,
            conflict_resolution: None,
        }
    }

    #[test]
    fn test_from_value_accepts_legacy_fields() {
        let raw = json!({
            "id": "cs_1",
            "customerEmail": "a@example.com",
            "createdAt": 1_700_000_000,
            "payment_status": "shipped",
            "amountTotal": 24000,
            "quantity": 0
        });
        let order = OrderRecord::from_value(&raw, 0).unwrap();
        assert_eq!(order.email.as_deref(), Some("a@example.com"));
        assert_eq!(order.created, 1_700_000_000);
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.amount_total, Some(24000));
        assert_eq!(order.quantity, 1);
    }

    #[test]
    fn test_from_value_requires_id() {
        assert!(OrderRecord::from_value(&json!({"id": "  "}), 0).is_none());
        assert!(OrderRecord::from_value(&json!("cs_1"), 0).is_none());
    }

    #[test]
    fn test_unknown_status_reads_as_paid_and_created_defaults_to_now() {
        let order = OrderRecord::from_value(&json!({"id": "x", "status": "weird"}), 42).unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.created, 42);
    }

    #[test]
    fn test_incomplete_shipping_is_dropped() {
        let raw = json!({
            "id": "x",
            "shipping": {"carrier": "UPS", "trackingNumber": "1Z", "shippedAt": 5}
        });
        assert!(OrderRecord::from_value(&raw, 0).unwrap().shipping.is_none());
    }

    #[test]
    fn test_record_roundtrips_through_storage_shape() {
        let mut record = order("cs_9", 10, OrderStatus::ConflictResolved);
        record.conflict_resolution = Some(ConflictResolution {
            note: "refunded".into(),
            resolved_at: 11,
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "conflict_resolved");
        assert_eq!(value["conflictResolution"]["resolvedAt"], 11);
        assert_eq!(OrderRecord::from_value(&value, 0).unwrap(), record);
    }

    #[test]
    fn test_paginate_sorts_filters_and_clamps() {
        let rows = vec![
            order("a", 100, OrderStatus::Paid),
            order("b", 300, OrderStatus::Shipped),
            order("c", 200, OrderStatus::Paid),
            order("d", 400, OrderStatus::StockConflict),
        ];

        let page = paginate(rows.clone(), &OrderQuery { limit: 2, page: 9, ..OrderQuery::default() });
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.rows.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), vec!["c", "a"]);

        let paid = paginate(
            rows,
            &OrderQuery {
                status: StatusFilter::Only(OrderStatus::Paid),
                from_unix: Some(150),
                ..OrderQuery::default()
            },
        );
        assert_eq!(paid.rows.len(), 1);
        assert_eq!(paid.rows[0].id, "c");
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let page = paginate(Vec::new(), &OrderQuery { limit: 500, page: 0, ..OrderQuery::default() });
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 50);
    }

    #[test]
    fn test_date_range_validation() {
        let q = OrderQuery::default()
            .with_date_range(Some("2024-01-02"), Some("2024-01-02"))
            .unwrap();
        assert_eq!(q.from_unix, Some(1_704_153_600));
        assert_eq!(q.to_unix, Some(1_704_153_600 + 86_399));

        assert!(OrderQuery::default().with_date_range(Some("yesterday"), None).is_err());
        assert!(OrderQuery::default()
            .with_date_range(Some("2024-02-01"), Some("2024-01-01"))
            .is_err());
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!(StatusFilter::parse(Some("stock_conflict")), StatusFilter::Only(OrderStatus::StockConflict));
        assert_eq!(StatusFilter::parse(Some("all")), StatusFilter::All);
        assert_eq!(StatusFilter::parse(None), StatusFilter::All);
    }
}
