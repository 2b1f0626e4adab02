//! Load a catalog file into Redis.
//!
//! ```text
//! storefront-seed server/data/catalog.json
//! ```

use anyhow::Context;
use std::sync::Arc;
use storefront_commerce::Catalog;
use storefront_core::SystemClock;
use storefront_redis::RedisKvStore;
use storefront_server::seed::load_catalog;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: storefront-seed <catalog.json>")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let products: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
    let kv = RedisKvStore::new(&redis_url).await?;
    let catalog = Catalog::new(kv, Arc::new(SystemClock));

    let report = load_catalog(&catalog, &products).await?;
    info!(saved = ?report.saved, skipped = ?report.skipped, "Seeded products into KV");
    Ok(())
}
