//! Catalog seeding from a JSON file.

use serde_json::Value;
use storefront_commerce::Catalog;
use storefront_core::product::ProductDraft;
use storefront_core::{KvStore, Result, ShopError};
use tracing::{info, warn};

/// What a seed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Slugs saved, in file order.
    pub saved: Vec<String>,
    /// Zero-based positions of entries without a slug and title.
    pub skipped: Vec<usize>,
}

/// Save every product of a JSON array.
///
/// Saves insert at the front of the product list, so entries are written
/// last to first to keep the file order.
///
/// # Errors
///
/// Returns [`ShopError::InvalidInput`] if `catalog` is not an array, or a
/// KV error if a save fails.
pub async fn load_catalog<K: KvStore + Clone>(catalog: &Catalog<K>, products: &Value) -> Result<SeedReport> {
    let rows = products
        .as_array()
        .ok_or_else(|| ShopError::InvalidInput("catalog must be a JSON array".into()))?;

    let mut report = SeedReport::default();
    for (index, row) in rows.iter().enumerate().rev() {
        let Some(draft) = ProductDraft::from_value(row, true) else {
            warn!(index, "Skipping catalog entry without slug and title");
            report.skipped.push(index);
            continue;
        };
        let product = catalog.save_product(draft).await?;
        report.saved.push(product.slug);
    }
    report.saved.reverse();
    report.skipped.reverse();

    info!(saved = report.saved.len(), skipped = report.skipped.len(), "Catalog seeded");
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use storefront_testing::{test_clock, MemoryKvStore};

    #[tokio::test]
    async fn test_load_catalog_keeps_file_order() {
        let catalog = Catalog::new(MemoryKvStore::new(), Arc::new(test_clock()));
        let products = json!([
            { "slug": "band", "title": "Band", "stock": 4, "published": true },
            { "title": "No slug" },
            { "slug": "chain", "title": "Chain", "stock": 0, "autoArchiveOnZero": true }
        ]);

        let report = load_catalog(&catalog, &products).await.unwrap();
        assert_eq!(report.saved, vec!["band", "chain"]);
        assert_eq!(report.skipped, vec![1]);

        let slugs = catalog.list_slugs().await.unwrap();
        assert_eq!(slugs, vec!["band", "chain"]);
        assert!(catalog.is_archived("chain").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_catalog_rejects_non_array() {
        let catalog = Catalog::new(MemoryKvStore::new(), Arc::new(test_clock()));
        let err = load_catalog(&catalog, &json!({ "slug": "band" })).await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidInput(_)));
    }
}
