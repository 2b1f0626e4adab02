//! Order records and the order index.

use crate::store::{read_json, write_json};
use std::sync::Arc;
use storefront_core::keys;
use storefront_core::order::{paginate, OrderPage, OrderQuery, ORDER_INDEX_SCAN_LIMIT};
use storefront_core::{Clock, KvStore, OrderRecord, Result};

/// Order storage.
#[derive(Clone)]
pub struct OrderBook<K> {
    kv: K,
    clock: Arc<dyn Clock>,
}

impl<K: KvStore> OrderBook<K> {
    /// Create the service.
    pub fn new(kv: K, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Read and normalize an order.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn read(&self, id: &str) -> Result<Option<OrderRecord>> {
        let now = self.clock.unix_seconds();
        Ok(read_json(&self.kv, &keys::order(id))
            .await?
            .and_then(|value| OrderRecord::from_value(&value, now)))
    }

    /// Returns `true` if any value is stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.kv.get(&keys::order(id)).await?.is_some())
    }

    /// Write an order record.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the write fails.
    pub async fn write(&self, order: &OrderRecord) -> Result<()> {
        write_json(&self.kv, &keys::order(&order.id), order).await
    }

    /// Put an id at the head of `orders:index`.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the write fails.
    pub async fn append_to_index(&self, id: &str) -> Result<()> {
        self.kv.lpush(keys::ORDERS_INDEX, id.to_string()).await
    }

    /// The newest `limit` orders in index order.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<OrderRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);
        let ids = self.kv.lrange(keys::ORDERS_INDEX, 0, stop).await?;
        self.read_many(&ids).await
    }

    /// A filtered page of orders, newest first.
    ///
    /// Only the first [`ORDER_INDEX_SCAN_LIMIT`] ids of the index are
    /// considered. Unreadable records are skipped.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn list_page(&self, query: &OrderQuery) -> Result<OrderPage> {
        let rows = self.list_recent(ORDER_INDEX_SCAN_LIMIT).await?;
        Ok(paginate(rows, query))
    }

    async fn read_many(&self, ids: &[String]) -> Result<Vec<OrderRecord>> {
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = self.read(id).await? {
                rows.push(order);
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use storefront_core::order::{OrderStatus, StatusFilter};
    use storefront_testing::{FixedClock, MemoryKvStore};

    fn order(id: &str, created: i64, status: OrderStatus) -> OrderRecord {
        OrderRecord {
            id: id.into(),
            slug: Some("ring".into()),
            email: None,
            created,
            quantity: 1,
            status,
            amount_total: Some(100),
            currency: Some("usd".into()),
            items: Vec::new(),
            shortfall: None,
            shipping: None,
            conflict_resolution: None,
        }
    }

    #[tokio::test]
    async fn test_write_read_and_index() {
        let kv = MemoryKvStore::new();
        let book = OrderBook::new(kv.clone(), Arc::new(FixedClock::at_unix(50)));

        for (id, created) in [("a", 10), ("b", 30), ("c", 20)] {
            book.write(&order(id, created, OrderStatus::Paid)).await.unwrap();
            book.append_to_index(id).await.unwrap();
        }
        kv.lpush(keys::ORDERS_INDEX, "dangling".into()).await.unwrap();

        assert!(book.exists("a").await.unwrap());
        assert!(!book.exists("dangling").await.unwrap());

        let recent = book.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "c");

        let page = book.list_page(&OrderQuery::default()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.rows[0].id, "b");
    }

    #[tokio::test]
    async fn test_list_page_filters_status() {
        let kv = MemoryKvStore::new();
        let book = OrderBook::new(kv, Arc::new(FixedClock::at_unix(50)));
        book.write(&order("x", 1, OrderStatus::StockConflict)).await.unwrap();
        book.append_to_index("x").await.unwrap();
        book.write(&order("y", 2, OrderStatus::Paid)).await.unwrap();
        book.append_to_index("y").await.unwrap();

        let query = OrderQuery {
            status: StatusFilter::Only(OrderStatus::StockConflict),
            ..OrderQuery::default()
        };
        let page = book.list_page(&query).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].id, "x");
    }
}
