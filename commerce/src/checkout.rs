//! Hosted checkout sessions.
//!
//! Stock is checked here but not reserved. Only the webhook decrements it,
//! which is why a late webhook can find stock gone and record a conflict.

use crate::shop::Shop;
use std::collections::BTreeMap;
use storefront_core::payment::{
    encode_cart, AdjustableQuantity, CheckoutLineItem, CheckoutSessionRequest, LinePrice, METADATA_CART,
    METADATA_SLUG,
};
use storefront_core::stock::{normalize_requests, StockRequest};
use storefront_core::{EmailProvider, KvStore, PaymentGateway, Product, Result, ShopError};
use tracing::info;

/// Placeholder the processor replaces with the session id.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Currency for inline prices.
const CURRENCY: &str = "usd";

/// What the customer wants to buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutRequest {
    /// One product; the quantity is chosen on the hosted page.
    Single {
        /// Product slug.
        slug: String,
    },
    /// Several products with fixed quantities.
    Cart {
        /// Raw cart lines.
        items: Vec<StockRequest>,
    },
}

/// A created session to redirect the customer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
    /// Session id.
    pub session_id: String,
    /// Hosted checkout URL.
    pub url: String,
}

impl<K, P, E> Shop<K, P, E>
where
    K: KvStore + Clone,
    P: PaymentGateway,
    E: EmailProvider,
{
    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// - [`ShopError::InvalidInput`] for a missing slug, an empty cart or
    ///   insufficient stock
    /// - [`ShopError::NotFound`] for unknown, unpublished or archived
    ///   products
    /// - [`ShopError::Payment`] if the processor fails or returns no URL
    pub async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutRedirect> {
        let session_request = match request {
            CheckoutRequest::Single { slug } => self.single_session(slug.trim()).await?,
            CheckoutRequest::Cart { items } => self.cart_session(&items).await?,
        };

        let session = self.payments.create_checkout_session(&session_request).await?;
        let Some(url) = session.url else {
            return Err(ShopError::Payment("Unable to create checkout session".into()));
        };

        metrics::counter!("storefront_checkout_sessions_total").increment(1);
        info!(
            session_id = %session.id,
            lines = session_request.line_items.len(),
            "Checkout session created"
        );
        Ok(CheckoutRedirect {
            session_id: session.id,
            url,
        })
    }

    async fn single_session(&self, slug: &str) -> Result<CheckoutSessionRequest> {
        if slug.is_empty() {
            return Err(ShopError::InvalidInput("Missing slug".into()));
        }
        let product = self.purchasable(slug).await?;
        let stock = self.inventory.get_stock(slug).await?;
        if stock == 0 {
            return Err(ShopError::InvalidInput("Out of stock".into()));
        }

        let base = format!("{}/products/{slug}", self.config.site_url);
        Ok(CheckoutSessionRequest {
            line_items: vec![CheckoutLineItem {
                quantity: 1,
                price: line_price(&product),
                adjustable: Some(AdjustableQuantity {
                    minimum: 1,
                    maximum: stock,
                }),
            }],
            success_url: format!("{base}?success=1&session_id={SESSION_ID_PLACEHOLDER}"),
            cancel_url: format!("{base}?canceled=1"),
            metadata: BTreeMap::from([(METADATA_SLUG.to_string(), slug.to_string())]),
        })
    }

    async fn cart_session(&self, items: &[StockRequest]) -> Result<CheckoutSessionRequest> {
        let lines = normalize_requests(items);
        if lines.is_empty() {
            return Err(ShopError::InvalidInput("Cart is empty".into()));
        }

        let mut line_items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = self.purchasable(&line.slug).await?;
            let stock = self.inventory.get_stock(&line.slug).await?;
            if stock < line.quantity {
                return Err(ShopError::InvalidInput(format!(
                    "Only {stock} left of {}",
                    product.title
                )));
            }
            line_items.push(CheckoutLineItem {
                quantity: line.quantity,
                price: line_price(&product),
                adjustable: None,
            });
        }

        let base = format!("{}/cart", self.config.site_url);
        Ok(CheckoutSessionRequest {
            line_items,
            success_url: format!("{base}?success=1&session_id={SESSION_ID_PLACEHOLDER}"),
            cancel_url: format!("{base}?canceled=1"),
            metadata: BTreeMap::from([(METADATA_CART.to_string(), encode_cart(&lines))]),
        })
    }

    async fn purchasable(&self, slug: &str) -> Result<Product> {
        self.catalog
            .get_product(slug)
            .await?
            .filter(Product::is_purchasable)
            .ok_or_else(|| ShopError::not_found("Product", slug))
    }
}

fn line_price(product: &Product) -> LinePrice {
    match &product.price_id {
        Some(price_id) => LinePrice::Catalog {
            price_id: price_id.clone(),
        },
        None => LinePrice::Inline {
            currency: CURRENCY.to_string(),
            unit_amount: product.price_cents,
            name: product.title.clone(),
            description: if product.description.is_empty() {
                product.subtitle.clone()
            } else {
                product.description.clone()
            },
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ShopConfig;
    use serde_json::json;
    use std::sync::Arc;
    use storefront_core::product::ProductDraft;
    use storefront_testing::{FixedClock, MemoryKvStore, MockPaymentGateway, RecordingEmailProvider};

    async fn shop() -> Shop<MemoryKvStore, MockPaymentGateway, RecordingEmailProvider> {
        let shop = Shop::new(
            MemoryKvStore::new(),
            MockPaymentGateway::new(),
            RecordingEmailProvider::new(),
            Arc::new(FixedClock::at_unix(0)),
            ShopConfig::new("https://shop.test/"),
        );
        for (slug, stock, published, price_id) in [
            ("ring", 3.0, true, None),
            ("chain", 0.0, true, Some("price_123")),
            ("draft", 5.0, false, None),
        ] {
            let mut draft = ProductDraft::from_value(
                &json!({"slug": slug, "title": slug, "subtitle": "Silver", "priceCents": 4500, "stock": stock, "published": published}),
                true,
            )
            .unwrap();
            draft.price_id = price_id.map(str::to_string);
            shop.catalog.save_product(draft).await.unwrap();
        }
        shop
    }

    #[tokio::test]
    async fn test_single_checkout_builds_adjustable_line() {
        let shop = shop().await;
        let redirect = shop
            .create_checkout(CheckoutRequest::Single { slug: " ring ".into() })
            .await
            .unwrap();
        assert!(redirect.url.starts_with("https://checkout.test/"));

        let sent = shop.payments.sessions().await;
        let request = &sent[0];
        assert_eq!(
            request.success_url,
            "https://shop.test/products/ring?success=1&session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.line_items[0].adjustable, Some(AdjustableQuantity { minimum: 1, maximum: 3 }));
        assert!(matches!(
            request.line_items[0].price,
            LinePrice::Inline { unit_amount: 4500, ref description, .. } if description == "Silver"
        ));
        assert_eq!(request.metadata.get("slug").map(String::as_str), Some("ring"));
    }

    #[tokio::test]
    async fn test_single_checkout_rejections() {
        let shop = shop().await;
        let out_of_stock = shop
            .create_checkout(CheckoutRequest::Single { slug: "chain".into() })
            .await
            .unwrap_err();
        assert_eq!(out_of_stock, ShopError::InvalidInput("Out of stock".into()));

        let hidden = shop
            .create_checkout(CheckoutRequest::Single { slug: "draft".into() })
            .await
            .unwrap_err();
        assert!(matches!(hidden, ShopError::NotFound { .. }));

        let missing = shop
            .create_checkout(CheckoutRequest::Single { slug: "  ".into() })
            .await
            .unwrap_err();
        assert!(matches!(missing, ShopError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_cart_checkout_encodes_metadata() {
        let shop = shop().await;
        shop.inventory.set_stock("chain", 4).await.unwrap();
        shop.create_checkout(CheckoutRequest::Cart {
            items: vec![
                StockRequest::new("ring", 1),
                StockRequest::new("chain", 2),
                StockRequest::new("ring", 1),
            ],
        })
        .await
        .unwrap();

        let request = &shop.payments.sessions().await[0];
        assert_eq!(request.metadata.get("cart").map(String::as_str), Some("ring:2,chain:2"));
        assert_eq!(request.line_items[1].price, LinePrice::Catalog { price_id: "price_123".into() });
        assert!(request.line_items.iter().all(|line| line.adjustable.is_none()));
    }

    #[tokio::test]
    async fn test_cart_checkout_rejects_overdraw_and_empty() {
        let shop = shop().await;
        assert!(shop
            .create_checkout(CheckoutRequest::Cart { items: vec![StockRequest::new("ring", 4)] })
            .await
            .is_err());
        assert!(shop
            .create_checkout(CheckoutRequest::Cart { items: Vec::new() })
            .await
            .is_err());
        assert!(shop.payments.sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_url_is_an_error() {
        let shop = shop().await;
        shop.payments.omit_urls(true).await;
        let err = shop
            .create_checkout(CheckoutRequest::Single { slug: "ring".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Payment(_)));
    }
}
