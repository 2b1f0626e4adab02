//! Contracts for the external services.
//!
//! The services in `storefront-commerce` are generic over these traits.
//! Production implementations live in `storefront-redis`,
//! `storefront-payments` and `storefront-email`; in-memory ones in
//! `storefront-testing`.

use crate::error::Result;
use crate::notification::{InventoryAlert, OrderReceivedEmail, ShippedEmail};
use crate::payment::{CheckoutSession, CheckoutSessionRequest, PaymentEvent};
use crate::stock::{AtomicDecrement, CounterDecrement};

/// Key-value store.
///
/// Values are opaque strings; callers own the encoding. Lists are ordered
/// and support pushing at either end.
pub trait KvStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`](crate::ShopError::Kv) if the store is
    /// unreachable.
    fn get(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`](crate::ShopError::Kv) on store failure.
    fn set(&self, key: &str, value: String) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete a key. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`](crate::ShopError::Kv) on store failure.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Push a value onto the head of a list.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`](crate::ShopError::Kv) on store failure.
    fn lpush(&self, key: &str, value: String) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Append values to the tail of a list, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`](crate::ShopError::Kv) on store failure.
    fn rpush(
        &self,
        key: &str,
        values: Vec<String>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Read an inclusive range of a list. Negative indexes count from the
    /// tail, as in Redis.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`](crate::ShopError::Kv) on store failure.
    fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Add to an integer value, creating it at zero. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`](crate::ShopError::Kv) on store failure or
    /// when the value is not an integer.
    fn incr_by(&self, key: &str, delta: i64) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Set a time-to-live on a key.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`](crate::ShopError::Kv) on store failure.
    fn expire(&self, key: &str, seconds: u64) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Check and decrement every counter as one indivisible step.
    ///
    /// If any counter holds less than its quantity, nothing is written and
    /// the first failing position is reported. Otherwise every counter is
    /// decremented (floored at zero). Concurrent callers never observe or
    /// produce a partial batch.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::ScriptUnavailable`](crate::ShopError::ScriptUnavailable)
    /// if the store cannot run server-side scripts, or
    /// [`ShopError::Kv`](crate::ShopError::Kv) if the script fails. Callers
    /// then fall back to the non-atomic path.
    fn atomic_decrement(
        &self,
        counters: &[CounterDecrement],
    ) -> impl std::future::Future<Output = Result<AtomicDecrement>> + Send;
}

/// Payment processor.
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Payment`](crate::ShopError::Payment) if the
    /// processor rejects the request or is unreachable.
    fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> impl std::future::Future<Output = Result<CheckoutSession>> + Send;

    /// Sum of line-item quantities of a session.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Payment`](crate::ShopError::Payment) on
    /// processor failure.
    fn line_item_quantity(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidSignature`](crate::ShopError::InvalidSignature)
    /// when the signature does not match or is too old, and
    /// [`ShopError::Serialization`](crate::ShopError::Serialization) for
    /// malformed bodies.
    fn construct_event(&self, payload: &[u8], signature: &str, now_unix: i64) -> Result<PaymentEvent>;

    /// Link to the session in the processor's dashboard.
    fn dashboard_url(&self, session_id: &str) -> Option<String>;
}

/// Transactional email.
///
/// Each method sends one message; implementations render the text.
pub trait EmailProvider: Send + Sync {
    /// Tell the customer their order was received.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Email`](crate::ShopError::Email) if delivery fails.
    fn send_order_received(
        &self,
        email: &OrderReceivedEmail,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Tell the customer their order shipped.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Email`](crate::ShopError::Email) if delivery fails.
    fn send_shipped(&self, email: &ShippedEmail) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Alert the shop owner about stock.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Email`](crate::ShopError::Email) if delivery fails.
    fn send_inventory_alert(
        &self,
        to: &str,
        alert: &InventoryAlert,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
