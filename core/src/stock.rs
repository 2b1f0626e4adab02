//! Stock decrement planning.
//!
//! A paid checkout consumes stock for one or more products. The whole batch
//! must succeed or fail together: if any product lacks stock, no counter is
//! touched and the first failing product is reported with its available
//! quantity.
//!
//! This module holds the pure parts of that operation. Executing it against
//! shared counters happens in two places:
//!
//! - a KV store that can run server-side scripts evaluates the check and the
//!   writes as one indivisible step (`KvStore::atomic_decrement`)
//! - otherwise the inventory service walks the batch sequentially and rolls
//!   back earlier writes on failure, which is NOT atomic across products
//!
//! # Example
//!
//! ```
//! use storefront_core::stock::{normalize_requests, plan_decrement, StockRequest};
//!
//! let lines = normalize_requests(&[
//!     StockRequest::new("ring", 1),
//!     StockRequest::new("chain", 2),
//!     StockRequest::new("ring", 1),
//! ]);
//! assert_eq!(lines.len(), 2);
//! assert_eq!(lines[0].quantity, 2);
//!
//! let steps = plan_decrement(&lines, &[5, 2]).unwrap();
//! assert_eq!((steps[0].previous, steps[0].next), (5, 3));
//! assert_eq!((steps[1].previous, steps[1].next), (2, 0));
//! ```

use serde::{Deserialize, Serialize};

/// Low-stock threshold used when none is configured.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u64 = 2;

/// A raw stock request as received from cart metadata or an API caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    /// Product slug (may contain surrounding whitespace).
    pub slug: String,
    /// Requested quantity (may be zero or negative).
    pub quantity: i64,
}

impl StockRequest {
    /// Create a request.
    #[must_use]
    pub fn new(slug: impl Into<String>, quantity: i64) -> Self {
        Self {
            slug: slug.into(),
            quantity,
        }
    }
}

/// A normalized request line: trimmed slug, positive quantity, one line
/// per slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    /// Product slug.
    pub slug: String,
    /// Total requested quantity for this slug.
    pub quantity: u64,
}

/// Collapse raw requests into one line per slug.
///
/// Blank slugs and non-positive quantities are dropped. Duplicate slugs sum
/// their quantities. Lines keep the order in which each slug first appeared.
#[must_use]
pub fn normalize_requests(input: &[StockRequest]) -> Vec<StockLine> {
    let mut lines: Vec<StockLine> = Vec::new();
    for request in input {
        let slug = request.slug.trim();
        if slug.is_empty() || request.quantity <= 0 {
            continue;
        }
        let quantity = request.quantity.unsigned_abs();
        match lines.iter_mut().find(|line| line.slug == slug) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => lines.push(StockLine {
                slug: slug.to_string(),
                quantity,
            }),
        }
    }
    lines
}

/// Previous and next value of one counter after a successful decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterStep {
    /// Counter value before the decrement.
    pub previous: u64,
    /// Counter value after the decrement.
    pub next: u64,
}

/// The first line whose request exceeded its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanShortfall {
    /// Position of the failing line in the batch.
    pub index: usize,
    /// Counter value at the time of the check.
    pub available: u64,
}

/// Result of an indivisible batch decrement evaluated by the KV store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicDecrement {
    /// Every counter was decremented; one step per line, in batch order.
    Applied(Vec<CounterStep>),
    /// Nothing was written.
    Insufficient(PlanShortfall),
}

/// One counter to decrement inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDecrement {
    /// Counter key.
    pub key: String,
    /// Amount to subtract; always positive.
    pub quantity: u64,
}

/// Check a batch against current counter values.
///
/// Negative or missing counter values count as zero. Returns the step for
/// every line when all requests fit, otherwise the first failing line.
///
/// # Errors
///
/// Returns [`PlanShortfall`] for the first line whose quantity exceeds its
/// counter. No partial plan is produced.
pub fn plan_decrement(
    lines: &[StockLine],
    current: &[i64],
) -> Result<Vec<CounterStep>, PlanShortfall> {
    let available = |index: usize| -> u64 {
        current
            .get(index)
            .copied()
            .map_or(0, |value| u64::try_from(value).unwrap_or(0))
    };

    if let Some(index) = lines
        .iter()
        .enumerate()
        .position(|(index, line)| available(index) < line.quantity)
    {
        return Err(PlanShortfall {
            index,
            available: available(index),
        });
    }

    Ok(lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let previous = available(index);
            CounterStep {
                previous,
                next: previous.saturating_sub(line.quantity),
            }
        })
        .collect())
}

/// Stock level crossing reported to the shop owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockTransition {
    /// Stock dropped from above the threshold to at or below it.
    Low,
    /// Stock ran out.
    Zero,
}

impl StockTransition {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Zero => "zero",
        }
    }
}

/// Classify a counter change against the low-stock threshold.
///
/// The threshold is at least 1.
///
/// ```
/// use storefront_core::stock::{classify_transition, StockTransition};
///
/// assert_eq!(classify_transition(3, 2, 2), Some(StockTransition::Low));
/// assert_eq!(classify_transition(1, 0, 2), Some(StockTransition::Zero));
/// assert_eq!(classify_transition(2, 1, 2), None);
/// ```
#[must_use]
pub fn classify_transition(previous: u64, next: u64, low_threshold: u64) -> Option<StockTransition> {
    let threshold = low_threshold.max(1);
    if previous > 0 && next == 0 {
        Some(StockTransition::Zero)
    } else if previous > threshold && next > 0 && next <= threshold {
        Some(StockTransition::Low)
    } else {
        None
    }
}

/// An applied per-product stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockChange {
    /// Product slug.
    pub slug: String,
    /// Quantity that was subtracted.
    pub requested: u64,
    /// Stock before.
    pub previous: u64,
    /// Stock after.
    pub next: u64,
    /// Threshold crossing, if any.
    pub transition: Option<StockTransition>,
}

/// The product that blocked a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    /// Product slug.
    pub slug: String,
    /// Quantity the batch asked for.
    pub requested: u64,
    /// Stock at the time of the check.
    pub available: u64,
}

/// Outcome of a batch decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// Every line was applied.
    Applied(Vec<StockChange>),
    /// A line exceeded its stock; nothing was applied.
    Insufficient(Shortfall),
    /// The batch had no valid lines.
    InvalidRequest,
}

impl DecrementOutcome {
    /// Build the outcome for `lines` from an atomic store result.
    #[must_use]
    pub fn from_atomic(lines: &[StockLine], result: AtomicDecrement, low_threshold: u64) -> Self {
        match result {
            AtomicDecrement::Applied(steps) => Self::applied(lines, &steps, low_threshold),
            AtomicDecrement::Insufficient(shortfall) => Self::insufficient(lines, shortfall),
        }
    }

    /// Pair lines with their counter steps.
    #[must_use]
    pub fn applied(lines: &[StockLine], steps: &[CounterStep], low_threshold: u64) -> Self {
        Self::Applied(
            lines
                .iter()
                .zip(steps)
                .map(|(line, step)| StockChange {
                    slug: line.slug.clone(),
                    requested: line.quantity,
                    previous: step.previous,
                    next: step.next,
                    transition: classify_transition(step.previous, step.next, low_threshold),
                })
                .collect(),
        )
    }

    /// Name the line behind a shortfall.
    #[must_use]
    pub fn insufficient(lines: &[StockLine], shortfall: PlanShortfall) -> Self {
        lines.get(shortfall.index).map_or(Self::InvalidRequest, |line| {
            Self::Insufficient(Shortfall {
                slug: line.slug.clone(),
                requested: line.quantity,
                available: shortfall.available,
            })
        })
    }

    /// Returns `true` when stock was decremented.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(slug: &str, quantity: u64) -> StockLine {
        StockLine {
            slug: slug.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_normalize_collapses_and_filters() {
        let lines = normalize_requests(&[
            StockRequest::new(" ring ", 1),
            StockRequest::new("", 3),
            StockRequest::new("chain", 0),
            StockRequest::new("chain", -2),
            StockRequest::new("ring", 2),
            StockRequest::new("hook", 1),
        ]);

        assert_eq!(lines, vec![line("ring", 3), line("hook", 1)]);
    }

    #[test]
    fn test_plan_reports_first_failure() {
        let lines = [line("a", 1), line("b", 5), line("c", 9)];
        let err = plan_decrement(&lines, &[4, 2, 1]).unwrap_err();
        assert_eq!(err, PlanShortfall { index: 1, available: 2 });
    }

    #[test]
    fn test_plan_treats_negative_and_missing_as_zero() {
        let lines = [line("a", 1)];
        assert_eq!(
            plan_decrement(&lines, &[-3]).unwrap_err(),
            PlanShortfall { index: 0, available: 0 }
        );
        assert_eq!(
            plan_decrement(&lines, &[]).unwrap_err(),
            PlanShortfall { index: 0, available: 0 }
        );
    }

    #[test]
    fn test_exact_stock_is_allowed() {
        let steps = plan_decrement(&[line("a", 4)], &[4]).unwrap();
        assert_eq!(steps, vec![CounterStep { previous: 4, next: 0 }]);
    }

    #[test]
    fn test_transitions() {
        assert_eq!(classify_transition(5, 2, 2), Some(StockTransition::Low));
        assert_eq!(classify_transition(5, 0, 2), Some(StockTransition::Zero));
        assert_eq!(classify_transition(2, 1, 2), None);
        assert_eq!(classify_transition(0, 0, 2), None);
        // Threshold of zero behaves like one.
        assert_eq!(classify_transition(3, 1, 0), Some(StockTransition::Low));
    }

    #[test]
    fn test_outcome_names_failing_slug() {
        let lines = [line("a", 1), line("b", 3)];
        let outcome = DecrementOutcome::from_atomic(
            &lines,
            AtomicDecrement::Insufficient(PlanShortfall { index: 1, available: 1 }),
            2,
        );
        assert_eq!(
            outcome,
            DecrementOutcome::Insufficient(Shortfall {
                slug: "b".into(),
                requested: 3,
                available: 1,
            })
        );
    }

    #[test]
    fn test_outcome_carries_transitions() {
        let lines = [line("a", 2)];
        let outcome = DecrementOutcome::from_atomic(
            &lines,
            AtomicDecrement::Applied(vec![CounterStep { previous: 4, next: 2 }]),
            2,
        );
        let DecrementOutcome::Applied(changes) = outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(changes[0].transition, Some(StockTransition::Low));
        assert_eq!(changes[0].requested, 2);
    }

    proptest! {
        #[test]
        fn prop_plan_is_all_or_nothing(
            quantities in prop::collection::vec(1u64..10, 1..6),
            stocks in prop::collection::vec(-3i64..15, 1..6),
        ) {
            let lines: Vec<StockLine> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| line(&format!("p{i}"), *q))
                .collect();

            let fits = lines.iter().enumerate().all(|(i, l)| {
                stocks.get(i).copied().unwrap_or(0).max(0).unsigned_abs() >= l.quantity
            });

            match plan_decrement(&lines, &stocks) {
                Ok(steps) => {
                    prop_assert!(fits);
                    prop_assert_eq!(steps.len(), lines.len());
                    for (step, l) in steps.iter().zip(&lines) {
                        prop_assert_eq!(step.previous - step.next, l.quantity);
                    }
                }
                Err(shortfall) => {
                    prop_assert!(!fits);
                    prop_assert!(shortfall.available < lines[shortfall.index].quantity);
                }
            }
        }

        #[test]
        fn prop_normalize_preserves_total(
            entries in prop::collection::vec((0usize..4, -2i64..6), 0..12),
        ) {
            let requests: Vec<StockRequest> = entries
                .iter()
                .map(|(i, q)| StockRequest::new(format!("s{i}"), *q))
                .collect();
            let expected: u64 = entries.iter().filter(|(_, q)| *q > 0).map(|(_, q)| q.unsigned_abs()).sum();
            let lines = normalize_requests(&requests);
            let total: u64 = lines.iter().map(|l| l.quantity).sum();
            prop_assert_eq!(total, expected);
            prop_assert!(lines.iter().all(|l| l.quantity > 0));
        }
    }
}
