//! Live stock counters.
//!
//! The `stock:{slug}` counter is the source of truth for availability. A
//! missing counter is seeded from the product snapshot the first time a
//! decrement touches it.
//!
//! # Decrement paths
//!
//! ```text
//! decrement_batch
//!   ├─ normalize (empty → InvalidRequest)
//!   ├─ ensure_stock_key for every line
//!   ├─ KvStore::atomic_decrement ──Ok──▶ outcome        (path = Atomic)
//!   └─ Err ─▶ sequential check/write with rollback      (path = Fallback)
//! ```
//!
//! The fallback is NOT atomic across products: a concurrent caller can read
//! a counter between this caller's read and write. Rollback restores the
//! values this caller read, which can overwrite a concurrent decrement.
//! A shortfall and a failed write on a later line both trigger the rollback.
//!
//! [`Inventory::release`] hands an applied batch back by adding the
//! quantities, for callers that fail after the decrement committed.

use crate::catalog::Catalog;
use crate::store::{read_counter, write_json};
use storefront_core::keys;
use storefront_core::stock::{
    normalize_requests, CounterDecrement, CounterStep, DecrementOutcome,
    PlanShortfall, StockChange, StockLine, StockRequest,
};
use storefront_core::{KvStore, Result};
use tracing::{debug, error, info, warn};

/// Which path executed a batch decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementPath {
    /// The store's server-side script.
    Atomic,
    /// Sequential read-check-write with rollback.
    Fallback,
    /// Nothing ran (empty batch).
    Skipped,
}

impl DecrementPath {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Fallback => "fallback",
            Self::Skipped => "skipped",
        }
    }
}

/// Result of [`Inventory::decrement_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecrementReport {
    /// What happened to the batch.
    pub outcome: DecrementOutcome,
    /// How it was executed.
    pub path: DecrementPath,
}

/// Stock counter service.
#[derive(Clone)]
pub struct Inventory<K> {
    kv: K,
    catalog: Catalog<K>,
    low_stock_threshold: u64,
}

impl<K: KvStore + Clone> Inventory<K> {
    /// Create the service.
    pub fn new(kv: K, catalog: Catalog<K>, low_stock_threshold: u64) -> Self {
        Self {
            kv,
            catalog,
            low_stock_threshold: low_stock_threshold.max(1),
        }
    }

    /// Current stock: the counter if present (negative reads as zero), else
    /// the product snapshot, else zero.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn get_stock(&self, slug: &str) -> Result<u64> {
        if let Some(counter) = read_counter(&self.kv, &keys::stock(slug)).await? {
            return Ok(u64::try_from(counter).unwrap_or(0));
        }
        Ok(self.catalog.get_product(slug).await?.map_or(0, |p| p.stock))
    }

    /// Overwrite the counter. Negative values are stored as zero.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the write fails.
    pub async fn set_stock(&self, slug: &str, stock: i64) -> Result<()> {
        write_json(&self.kv, &keys::stock(slug), &stock.max(0)).await
    }

    /// Seed a missing counter from the product snapshot and return its value.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn ensure_stock_key(&self, slug: &str) -> Result<u64> {
        if let Some(counter) = read_counter(&self.kv, &keys::stock(slug)).await? {
            return Ok(u64::try_from(counter).unwrap_or(0));
        }
        let baseline = self.catalog.get_product(slug).await?.map_or(0, |p| p.stock);
        write_json(&self.kv, &keys::stock(slug), &baseline).await?;
        debug!(slug, baseline, "Seeded stock counter from product snapshot");
        Ok(baseline)
    }

    /// Decrement one product.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store is unreachable.
    pub async fn decrement(&self, slug: &str, quantity: i64) -> Result<DecrementReport> {
        self.decrement_batch(&[StockRequest::new(slug, quantity)]).await
    }

    /// Decrement a batch all-or-nothing.
    ///
    /// Prefers the store's atomic script. Any script failure switches to
    /// the sequential fallback, which logs a warning and counts
    /// `storefront_stock_fallback_total`.
    ///
    /// # Errors
    ///
    /// Returns a KV error if the store fails on the fallback path. Lines
    /// written before the failure are restored first.
    pub async fn decrement_batch(&self, requests: &[StockRequest]) -> Result<DecrementReport> {
        let lines = normalize_requests(requests);
        if lines.is_empty() {
            return Ok(DecrementReport {
                outcome: DecrementOutcome::InvalidRequest,
                path: DecrementPath::Skipped,
            });
        }

        for line in &lines {
            self.ensure_stock_key(&line.slug).await?;
        }

        let counters: Vec<CounterDecrement> = lines
            .iter()
            .map(|line| CounterDecrement {
                key: keys::stock(&line.slug),
                quantity: line.quantity,
            })
            .collect();

        match self.kv.atomic_decrement(&counters).await {
            Ok(result) => {
                let outcome = DecrementOutcome::from_atomic(&lines, result, self.low_stock_threshold);
                debug!(items = lines.len(), applied = outcome.is_applied(), "Atomic stock decrement");
                Ok(DecrementReport {
                    outcome,
                    path: DecrementPath::Atomic,
                })
            }
            Err(err) => {
                warn!(
                    error = %err,
                    items = lines.len(),
                    "Atomic stock decrement unavailable; using sequential fallback. \
                     This path is not atomic across products and concurrent checkouts may interleave"
                );
                metrics::counter!("storefront_stock_fallback_total").increment(1);
                let outcome = self.decrement_sequential(&lines).await?;
                Ok(DecrementReport {
                    outcome,
                    path: DecrementPath::Fallback,
                })
            }
        }
    }

    /// Add the quantities of an applied batch back to their counters.
    ///
    /// Every line is attempted; a failed line is logged and does not stop
    /// the others. Returns how many lines were restored.
    pub async fn release(&self, changes: &[StockChange]) -> usize {
        let mut restored = 0;
        for change in changes {
            let delta = i64::try_from(change.requested).unwrap_or(i64::MAX);
            match self.kv.incr_by(&keys::stock(&change.slug), delta).await {
                Ok(_) => restored += 1,
                Err(err) => error!(
                    slug = %change.slug,
                    quantity = change.requested,
                    error = %err,
                    "Failed to release stock; counter is short"
                ),
            }
        }
        restored
    }

    async fn decrement_sequential(&self, lines: &[StockLine]) -> Result<DecrementOutcome> {
        let mut steps: Vec<CounterStep> = Vec::with_capacity(lines.len());

        for (index, line) in lines.iter().enumerate() {
            let current = match self.get_stock(&line.slug).await {
                Ok(current) => current,
                Err(err) => {
                    self.roll_back(lines, &steps, &line.slug).await;
                    return Err(err);
                }
            };
            if current < line.quantity {
                self.roll_back(lines, &steps, &line.slug).await;
                return Ok(DecrementOutcome::insufficient(
                    lines,
                    PlanShortfall {
                        index,
                        available: current,
                    },
                ));
            }

            let step = CounterStep {
                previous: current,
                next: current - line.quantity,
            };
            if let Err(err) = self
                .set_stock(&line.slug, i64::try_from(step.next).unwrap_or(i64::MAX))
                .await
            {
                self.roll_back(lines, &steps, &line.slug).await;
                return Err(err);
            }
            steps.push(step);
        }

        Ok(DecrementOutcome::applied(lines, &steps, self.low_stock_threshold))
    }

    /// Restore the values read for the lines already written, continuing
    /// past failed writes.
    async fn roll_back(&self, lines: &[StockLine], steps: &[CounterStep], failed_slug: &str) {
        if steps.is_empty() {
            return;
        }
        let mut restored = 0;
        for (applied, step) in lines.iter().zip(steps) {
            let previous = i64::try_from(step.previous).unwrap_or(i64::MAX);
            match self.set_stock(&applied.slug, previous).await {
                Ok(()) => restored += 1,
                Err(err) => error!(
                    slug = %applied.slug,
                    previous = step.previous,
                    error = %err,
                    "Failed to roll back fallback decrement"
                ),
            }
        }
        info!(
            rolled_back = restored,
            applied = steps.len(),
            failed_slug,
            "Rolled back partial fallback decrement"
        );
    }
}
