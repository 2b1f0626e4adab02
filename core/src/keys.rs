//! Key layout in the key-value store.
//!
//! ```text
//! product:{slug}     JSON product snapshot
//! products           JSON array of every product
//! products:index     list of slugs
//! stock:{slug}       integer stock counter
//! published:{slug}   JSON bool
//! archived:{slug}    JSON bool
//! order:{id}         JSON order record
//! orders:index       list of order ids, newest first
//! ```

/// Key holding the JSON array of all products.
pub const PRODUCTS: &str = "products";

/// List of product slugs in catalog order.
pub const PRODUCTS_INDEX: &str = "products:index";

/// List of order ids, most recent first.
pub const ORDERS_INDEX: &str = "orders:index";

/// Direct product snapshot.
#[must_use]
pub fn product(slug: &str) -> String {
    format!("product:{slug}")
}

/// Stock counter.
#[must_use]
pub fn stock(slug: &str) -> String {
    format!("stock:{slug}")
}

/// Order record.
#[must_use]
pub fn order(id: &str) -> String {
    format!("order:{id}")
}

/// Archived flag.
#[must_use]
pub fn archived(slug: &str) -> String {
    format!("archived:{slug}")
}

/// Published flag.
#[must_use]
pub fn published(slug: &str) -> String {
    format!("published:{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(stock("silver-band-01"), "stock:silver-band-01");
        assert_eq!(order("cs_test_1"), "order:cs_test_1");
        assert_eq!(published("a"), "published:a");
    }
}
