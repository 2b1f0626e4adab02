//! Admin order actions: shipping and conflict resolution.

use crate::shop::Shop;
use storefront_core::notification::ShippedEmail;
use storefront_core::order::{ConflictResolution, OrderShipping, OrderStatus};
use storefront_core::{EmailProvider, KvStore, OrderRecord, PaymentGateway, Result, ShopError};
use tracing::info;

/// Note stored when an admin resolves a conflict without one.
pub const DEFAULT_RESOLUTION_NOTE: &str = "Resolved in admin";

/// Carrier details entered by an admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingDetails {
    /// Carrier name.
    pub carrier: String,
    /// Tracking number.
    pub tracking_number: String,
    /// Public tracking URL.
    pub tracking_url: String,
}

/// Result of [`Shop::ship_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipOutcome {
    /// The order is now shipped.
    Shipped(OrderRecord),
    /// It had already shipped; nothing changed.
    AlreadyShipped,
}

/// Result of [`Shop::resolve_conflict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The conflict is now resolved.
    Resolved(OrderRecord),
    /// It had already been resolved; nothing changed.
    AlreadyResolved,
}

impl<K, P, E> Shop<K, P, E>
where
    K: KvStore + Clone,
    P: PaymentGateway,
    E: EmailProvider,
{
    /// Mark a paid order shipped and email the customer.
    ///
    /// # Errors
    ///
    /// - [`ShopError::NotFound`] for unknown orders
    /// - [`ShopError::Conflict`] for `stock_conflict` and
    ///   `conflict_resolved` orders, which never ship
    /// - KV errors from the store
    pub async fn ship_order(&self, order_id: &str, details: ShippingDetails) -> Result<ShipOutcome> {
        let mut order = self
            .orders
            .read(order_id)
            .await?
            .ok_or_else(|| ShopError::not_found("Order", order_id))?;

        match order.status {
            OrderStatus::StockConflict => {
                return Err(ShopError::Conflict(
                    "Order has stock conflict. Resolve/refund before shipping.".into(),
                ));
            }
            OrderStatus::ConflictResolved => {
                return Err(ShopError::Conflict(
                    "Order conflict already resolved. Shipping is disabled for this order.".into(),
                ));
            }
            OrderStatus::Shipped => return Ok(ShipOutcome::AlreadyShipped),
            OrderStatus::Paid => {}
        }

        order.status = OrderStatus::Shipped;
        order.shipping = Some(OrderShipping {
            carrier: details.carrier.clone(),
            tracking_number: details.tracking_number.clone(),
            tracking_url: details.tracking_url.clone(),
            shipped_at: self.clock.unix_seconds(),
        });
        self.orders.write(&order).await?;
        info!(order_id, carrier = %details.carrier, "Order shipped");

        if let Some(customer_email) = order.email.clone() {
            self.notifier
                .shipped(&ShippedEmail {
                    order_id: order.id.clone(),
                    customer_email,
                    carrier: details.carrier,
                    tracking_number: details.tracking_number,
                    tracking_url: details.tracking_url,
                })
                .await;
        }

        Ok(ShipOutcome::Shipped(order))
    }

    /// Close a stock conflict after the admin refunded or substituted.
    ///
    /// # Errors
    ///
    /// - [`ShopError::NotFound`] for unknown orders
    /// - [`ShopError::Conflict`] for orders without a stock conflict
    /// - KV errors from the store
    pub async fn resolve_conflict(&self, order_id: &str, note: &str) -> Result<ResolveOutcome> {
        let mut order = self
            .orders
            .read(order_id)
            .await?
            .ok_or_else(|| ShopError::not_found("Order", order_id))?;

        match order.status {
            OrderStatus::ConflictResolved => return Ok(ResolveOutcome::AlreadyResolved),
            OrderStatus::StockConflict => {}
            OrderStatus::Paid | OrderStatus::Shipped => {
                return Err(ShopError::Conflict("Only stock conflict orders can be resolved.".into()));
            }
        }

        let note = note.trim();
        order.status = OrderStatus::ConflictResolved;
        order.conflict_resolution = Some(ConflictResolution {
            note: if note.is_empty() { DEFAULT_RESOLUTION_NOTE.to_string() } else { note.to_string() },
            resolved_at: self.clock.unix_seconds(),
        });
        self.orders.write(&order).await?;
        info!(order_id, "Stock conflict resolved");

        Ok(ResolveOutcome::Resolved(order))
    }
}
