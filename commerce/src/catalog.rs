//! Product catalog.
//!
//! Each product lives in two places: the `product:{slug}` snapshot and the
//! `products` list. The snapshot wins on reads; writes update both. The
//! `published:{slug}` and `archived:{slug}` flags mirror the snapshot for
//! cheap visibility checks.

use crate::store::{read_flag, read_json, write_json};
use serde_json::Value;
use std::sync::Arc;
use storefront_core::keys;
use storefront_core::product::{ProductDraft, StockUpdate};
use storefront_core::{Clock, KvStore, Product, Result};
use tracing::{info, warn};

/// How many slugs of `products:index` are read.
const SLUG_INDEX_LIMIT: isize = 999;

/// Catalog reads and admin writes.
#[derive(Clone)]
pub struct Catalog<K> {
    kv: K,
    clock: Arc<dyn Clock>,
}

impl<K: KvStore> Catalog<K> {
    /// Create a catalog over `kv`.
    pub fn new(kv: K, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Every readable product in list order.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn all_products(&self) -> Result<Vec<Product>> {
        Ok(self.raw_list().await?.iter().filter_map(Product::from_value).collect())
    }

    /// A product by slug: the direct snapshot, else the list entry.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn get_product(&self, slug: &str) -> Result<Option<Product>> {
        if let Some(product) = read_json(&self.kv, &keys::product(slug))
            .await?
            .as_ref()
            .and_then(Product::from_value)
        {
            return Ok(Some(product));
        }
        Ok(self.all_products().await?.into_iter().find(|p| p.slug == slug))
    }

    /// Published, unarchived products.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn shop_items(&self) -> Result<Vec<Product>> {
        Ok(self
            .all_products()
            .await?
            .into_iter()
            .filter(Product::is_purchasable)
            .collect())
    }

    /// Archived products plus published products that sold out.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn archive_items(&self) -> Result<Vec<Product>> {
        Ok(self
            .all_products()
            .await?
            .into_iter()
            .filter(Product::is_archive_item)
            .collect())
    }

    /// The `published:{slug}` flag, else the product's own field.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn is_published(&self, slug: &str) -> Result<bool> {
        if let Some(flag) = read_flag(&self.kv, &keys::published(slug)).await? {
            return Ok(flag);
        }
        Ok(self.get_product(slug).await?.is_some_and(|p| p.published))
    }

    /// The `archived:{slug}` flag, else the product's own field.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn is_archived(&self, slug: &str) -> Result<bool> {
        if let Some(flag) = read_flag(&self.kv, &keys::archived(slug)).await? {
            return Ok(flag);
        }
        Ok(self.get_product(slug).await?.is_some_and(|p| p.archived))
    }

    /// Slugs from `products:index`, else from the product list.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn list_slugs(&self) -> Result<Vec<String>> {
        let indexed = self.kv.lrange(keys::PRODUCTS_INDEX, 0, SLUG_INDEX_LIMIT).await?;
        if !indexed.is_empty() {
            return Ok(indexed);
        }
        Ok(self.all_products().await?.into_iter().map(|p| p.slug).collect())
    }

    /// Save an admin submission.
    ///
    /// Replaces the list entry with the same slug or inserts at the front,
    /// then writes the snapshot, stock counter and flags and rebuilds
    /// `products:index`.
    ///
    /// # Errors
    ///
    /// Returns a KV error if any write fails. Earlier writes are not undone.
    pub async fn save_product(&self, draft: ProductDraft) -> Result<Product> {
        let product = draft.into_product(self.clock.unix_millis());
        let stored = serde_json::to_value(&product)?;

        let mut list = self.raw_list().await?;
        match list
            .iter()
            .position(|row| row.get("slug").and_then(Value::as_str) == Some(product.slug.as_str()))
        {
            Some(index) => list[index] = stored,
            None => list.insert(0, stored),
        }

        write_json(&self.kv, keys::PRODUCTS, &list).await?;
        write_json(&self.kv, &keys::product(&product.slug), &product).await?;
        write_json(&self.kv, &keys::stock(&product.slug), &product.stock).await?;
        write_json(&self.kv, &keys::published(&product.slug), &product.published).await?;
        write_json(&self.kv, &keys::archived(&product.slug), &product.archived).await?;

        let slugs: Vec<String> = list
            .iter()
            .filter_map(|row| row.get("slug").and_then(Value::as_str).map(str::to_string))
            .collect();
        self.kv.delete(keys::PRODUCTS_INDEX).await?;
        if !slugs.is_empty() {
            self.kv.rpush(keys::PRODUCTS_INDEX, slugs).await?;
        }

        info!(
            slug = %product.slug,
            stock = product.stock,
            published = product.published,
            archived = product.archived,
            "Product saved"
        );
        Ok(product)
    }

    /// Update the stock snapshot of a product and auto-archive it if it
    /// asks for that at zero. Returns `None` for unknown products.
    ///
    /// Does not touch the live counter.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn sync_stock_and_archive_state(&self, slug: &str, stock: u64) -> Result<Option<Product>> {
        let now = self.clock.unix_millis();
        let direct = read_json(&self.kv, &keys::product(slug))
            .await?
            .as_ref()
            .and_then(Product::from_value);
        let mut list = self.raw_list().await?;
        let index = list
            .iter()
            .position(|row| row.get("slug").and_then(Value::as_str) == Some(slug));

        let base = direct.or_else(|| index.and_then(|i| Product::from_value(&list[i])));
        let Some(mut product) = base else {
            warn!(slug, "Stock sync skipped for unknown product");
            return Ok(None);
        };

        let was_archived = product.archived;
        product.apply_stock(stock, now);

        write_json(&self.kv, &keys::product(slug), &product).await?;
        if let Some(i) = index {
            list[i] = serde_json::to_value(&product)?;
            write_json(&self.kv, keys::PRODUCTS, &list).await?;
        }
        write_json(&self.kv, &keys::archived(slug), &product.archived).await?;

        if product.archived && !was_archived {
            info!(slug, "Product auto-archived at zero stock");
        }
        Ok(Some(product))
    }

    /// Set several counters and merge the new levels into the snapshots.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn bulk_set_stock(&self, updates: &[StockUpdate]) -> Result<Vec<StockUpdate>> {
        for update in updates {
            write_json(&self.kv, &keys::stock(&update.slug), &update.stock).await?;
            self.sync_stock_and_archive_state(&update.slug, update.stock).await?;
        }
        info!(count = updates.len(), "Bulk stock update applied");
        Ok(updates.to_vec())
    }

    async fn raw_list(&self) -> Result<Vec<Value>> {
        Ok(match read_json(&self.kv, keys::PRODUCTS).await? {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        })
    }
}
