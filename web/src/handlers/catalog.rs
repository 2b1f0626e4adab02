//! Public catalog reads.

use crate::error::AppError;
use crate::state::AppState;
use crate::WebResult;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use storefront_commerce::Shop;
use storefront_core::{EmailProvider, KvStore, PaymentGateway, Product};

/// `GET /api/products`: published, unarchived products.
///
/// # Errors
///
/// 500 if the KV store fails.
pub async fn list_products<K, P, E>(State(state): State<AppState<K, P, E>>) -> WebResult<Json<Value>>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let items = state.shop.catalog.shop_items().await?;
    let products = with_live_stock(&state.shop, items).await?;
    Ok(Json(json!({ "ok": true, "products": products })))
}

/// `GET /api/archive`: archived and sold-out products.
///
/// # Errors
///
/// 500 if the KV store fails.
pub async fn list_archive<K, P, E>(State(state): State<AppState<K, P, E>>) -> WebResult<Json<Value>>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let products = state.shop.catalog.archive_items().await?;
    Ok(Json(json!({ "ok": true, "products": products })))
}

/// `GET /api/products/:slug`: one published product with its live stock.
///
/// # Errors
///
/// 404 for unknown or unpublished products, 500 if the KV store fails.
pub async fn get_product<K, P, E>(
    State(state): State<AppState<K, P, E>>,
    Path(slug): Path<String>,
) -> WebResult<Json<Value>>
where
    K: KvStore + Clone + 'static,
    P: PaymentGateway + 'static,
    E: EmailProvider + 'static,
{
    let catalog = &state.shop.catalog;
    let Some(mut product) = catalog.get_product(&slug).await? else {
        return Err(AppError::not_found("Product"));
    };
    if !catalog.is_published(&slug).await? {
        return Err(AppError::not_found("Product"));
    }
    product.stock = state.shop.inventory.get_stock(&slug).await?;
    Ok(Json(json!({ "ok": true, "product": product })))
}

/// Replace each snapshot stock with the live counter.
pub(crate) async fn with_live_stock<K, P, E>(shop: &Shop<K, P, E>, mut products: Vec<Product>) -> storefront_core::Result<Vec<Product>>
where
    K: KvStore + Clone,
    P: PaymentGateway,
    E: EmailProvider,
{
    for product in &mut products {
        product.stock = shop.inventory.get_stock(&product.slug).await?;
    }
    Ok(products)
}
